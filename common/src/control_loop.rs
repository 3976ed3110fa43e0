use crate::{
    engine::{ControllerEngine, EngineAction},
    error::DriverError,
    ports::{Keypad, Notifier, RelayActuator, Thermocouple},
    types::RelayChannel,
};

#[derive(Debug, Default, PartialEq)]
pub struct StepReport {
    pub sampled: bool,
    pub message_expired: bool,
    pub key: Option<char>,
    pub relay_failures: Vec<DriverError>,
}

pub struct ControlLoop<K, T, R, N> {
    engine: ControllerEngine,
    keypad: K,
    thermocouple: T,
    relays: R,
    notifier: N,
    auto_out_of_sync: bool,
}

impl<K, T, R, N> ControlLoop<K, T, R, N>
where
    K: Keypad,
    T: Thermocouple,
    R: RelayActuator,
    N: Notifier,
{
    pub fn new(engine: ControllerEngine, keypad: K, thermocouple: T, relays: R, notifier: N) -> Self {
        Self {
            engine,
            keypad,
            thermocouple,
            relays,
            notifier,
            auto_out_of_sync: false,
        }
    }

    pub fn engine(&self) -> &ControllerEngine {
        &self.engine
    }

    pub fn relays(&self) -> &R {
        &self.relays
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn start(&mut self, now_ms: u64) -> Vec<DriverError> {
        let actions = self.engine.start();
        self.execute(actions, now_ms)
    }

    pub fn step(&mut self, now_ms: u64) -> StepReport {
        let mut report = StepReport::default();

        // Re-send the last commanded auto state after a failed write.
        if self.auto_out_of_sync {
            let on = self.engine.state().auto_relay_on;
            match self.relays.set_state(RelayChannel::Auto, on) {
                Ok(()) => self.auto_out_of_sync = false,
                Err(err) => report.relay_failures.push(err),
            }
        }

        if self.engine.sample_due(now_ms) {
            let reading = self.thermocouple.read_celsius();
            let actions = self.engine.on_sample(reading, now_ms);
            report.relay_failures.extend(self.execute(actions, now_ms));
            report.sampled = true;
        }

        let actions = self.engine.expire_message(now_ms);
        if !actions.is_empty() {
            report.message_expired = true;
            report.relay_failures.extend(self.execute(actions, now_ms));
        }

        if let Some(key) = self.keypad.poll() {
            let actions = self.engine.handle_key(key, now_ms);
            report.relay_failures.extend(self.execute(actions, now_ms));
            report.key = Some(key);
        }

        report
    }

    pub fn shutdown(&mut self) -> Vec<DriverError> {
        [RelayChannel::Manual, RelayChannel::Auto]
            .into_iter()
            .filter_map(|channel| self.relays.set_state(channel, false).err())
            .collect()
    }

    fn execute(&mut self, actions: Vec<EngineAction>, now_ms: u64) -> Vec<DriverError> {
        let mut failures = Vec::new();
        for action in actions {
            match action {
                EngineAction::SetRelay { channel, on } => {
                    let result = self.relays.set_state(channel, on);
                    if channel == RelayChannel::Auto {
                        self.auto_out_of_sync = result.is_err();
                    }
                    if let Err(err) = result {
                        failures.push(err);
                    }
                }
                EngineAction::ShowMessage(notice) => {
                    self.notifier.show_transient_message(notice.text());
                }
                EngineAction::RenderStatus => {
                    self.notifier.render_status(&self.engine.status());
                }
                EngineAction::LogStatus => {
                    match serde_json::to_string(&self.engine.status_payload(now_ms)) {
                        Ok(line) => self.notifier.log_line(&line),
                        Err(err) => self.notifier.log_line(&format!("status encode failed: {err}")),
                    }
                }
            }
        }
        failures
    }
}
