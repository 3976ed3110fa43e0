use crate::{
    config::ControllerConfig,
    error::DriverError,
    hysteresis::{self, Band, Decision},
    session,
    types::{ControllerState, ControllerStatus, Key, RelayChannel, SensorHealth, StatusPayload},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    InvalidMin,
    InvalidMax,
    MaxNotAboveMin,
    Ready,
    SensorFault,
    BandInverted,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Self::InvalidMin => "Invalid MIN",
            Self::InvalidMax => "Invalid MAX",
            Self::MaxNotAboveMin => "MAX<=MIN",
            Self::Ready => "Ready",
            Self::SensorFault => "Sensor fault",
            Self::BandInverted => "Check band",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    SetRelay { channel: RelayChannel, on: bool },
    ShowMessage(Notice),
    RenderStatus,
    LogStatus,
}

#[derive(Debug, Clone, Copy)]
struct ActiveMessage {
    notice: Notice,
    shown_at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ControllerEngine {
    pub config: ControllerConfig,
    state: ControllerState,

    latest_sample_c: Option<f32>,
    sensor: SensorHealth,
    last_sample_ms: Option<u64>,
    message: Option<ActiveMessage>,
    band_warned: bool,
}

impl ControllerEngine {
    pub fn new(mut config: ControllerConfig) -> Self {
        config.sanitize();
        let state = ControllerState::new(config.default_min_c, config.default_max_c);
        Self {
            config,
            state,
            latest_sample_c: None,
            sensor: SensorHealth::Unknown,
            last_sample_ms: None,
            message: None,
            band_warned: false,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn latest_sample_c(&self) -> Option<f32> {
        self.latest_sample_c
    }

    pub fn sensor_health(&self) -> SensorHealth {
        self.sensor
    }

    pub fn active_message(&self) -> Option<Notice> {
        self.message.map(|message| message.notice)
    }

    pub fn start(&self) -> Vec<EngineAction> {
        vec![
            EngineAction::SetRelay {
                channel: RelayChannel::Manual,
                on: self.state.manual_relay_on,
            },
            EngineAction::SetRelay {
                channel: RelayChannel::Auto,
                on: self.state.auto_relay_on,
            },
            EngineAction::RenderStatus,
        ]
    }

    pub fn handle_key(&mut self, c: char, now_ms: u64) -> Vec<EngineAction> {
        let Some(key) = Key::from_char(c) else {
            return Vec::new();
        };

        let before = self.state.clone();
        let mut actions = session::handle_key(&mut self.state, key);

        let notice = actions.iter().find_map(|action| match action {
            EngineAction::ShowMessage(notice) => Some(*notice),
            _ => None,
        });

        if let Some(notice) = notice {
            self.message = Some(ActiveMessage {
                notice,
                shown_at_ms: now_ms,
            });
        } else if self.state != before || !actions.is_empty() {
            // Typing over a message dismisses it.
            self.message = None;
            actions.push(EngineAction::RenderStatus);
        }

        let band_changed = self.state.min_temp_c != before.min_temp_c
            || self.state.max_temp_c != before.max_temp_c;
        let rearmed = self.state.auto_enabled && !before.auto_enabled;
        if band_changed || rearmed {
            self.band_warned = false;
        }

        actions
    }

    pub fn sample_due(&self, now_ms: u64) -> bool {
        self.last_sample_ms
            .map(|last| now_ms.saturating_sub(last) >= self.config.sample_interval_ms)
            .unwrap_or(true)
    }

    pub fn on_sample(&mut self, reading: Result<f32, DriverError>, now_ms: u64) -> Vec<EngineAction> {
        let mut actions = Vec::new();
        self.last_sample_ms = Some(now_ms);

        match reading {
            Ok(celsius) if self.config.is_plausible(celsius) => {
                self.latest_sample_c = Some(celsius);
                self.sensor = SensorHealth::Ok;
                self.evaluate_auto(celsius, now_ms, &mut actions);
            }
            _ => self.handle_sensor_fault(now_ms, &mut actions),
        }

        if self.message.is_none() {
            actions.push(EngineAction::RenderStatus);
        }
        actions.push(EngineAction::LogStatus);
        actions
    }

    pub fn expire_message(&mut self, now_ms: u64) -> Vec<EngineAction> {
        match self.message {
            Some(message)
                if now_ms.saturating_sub(message.shown_at_ms) >= self.config.message_timeout_ms =>
            {
                self.message = None;
                vec![EngineAction::RenderStatus]
            }
            _ => Vec::new(),
        }
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            mode: self.state.mode,
            min_temp_c: self.state.min_temp_c,
            max_temp_c: self.state.max_temp_c,
            manual_relay_on: self.state.manual_relay_on,
            auto_enabled: self.state.auto_enabled,
            auto_relay_on: self.state.auto_relay_on,
            entry: self.state.entry.as_str().to_string(),
            latest_sample_c: self.latest_sample_c,
            sensor: self.sensor,
        }
    }

    pub fn status_payload(&self, now_ms: u64) -> StatusPayload {
        StatusPayload {
            uptime_ms: now_ms,
            temp: self.latest_sample_c,
            sensor: self.sensor.as_str(),
            min: self.state.min_temp_c,
            max: self.state.max_temp_c,
            mode: self.state.mode.as_str(),
            manual_relay: self.state.manual_relay_on,
            auto_enabled: self.state.auto_enabled,
            auto_relay: self.state.auto_relay_on,
        }
    }

    fn evaluate_auto(&mut self, celsius: f32, now_ms: u64, actions: &mut Vec<EngineAction>) {
        let band = Band::new(self.state.min_temp_c, self.state.max_temp_c);
        let decision = hysteresis::decide(
            celsius,
            band,
            self.state.auto_enabled,
            self.state.auto_relay_on,
        );

        match decision {
            Some(Decision::TurnOn) => self.set_auto_relay(true, actions),
            Some(Decision::TurnOff) => self.set_auto_relay(false, actions),
            Some(Decision::InvertedBand) => {
                // No band to regulate against: keep the load off.
                if self.state.auto_relay_on {
                    self.set_auto_relay(false, actions);
                }
                if !self.band_warned {
                    self.band_warned = true;
                    self.show_message(Notice::BandInverted, now_ms, actions);
                }
            }
            Some(Decision::Hold) | None => {}
        }
    }

    fn handle_sensor_fault(&mut self, now_ms: u64, actions: &mut Vec<EngineAction>) {
        self.latest_sample_c = None;
        if self.state.auto_relay_on {
            self.set_auto_relay(false, actions);
        }
        if self.sensor != SensorHealth::Fault {
            self.show_message(Notice::SensorFault, now_ms, actions);
        }
        self.sensor = SensorHealth::Fault;
    }

    fn set_auto_relay(&mut self, on: bool, actions: &mut Vec<EngineAction>) {
        self.state.auto_relay_on = on;
        actions.push(EngineAction::SetRelay {
            channel: RelayChannel::Auto,
            on,
        });
    }

    fn show_message(&mut self, notice: Notice, now_ms: u64, actions: &mut Vec<EngineAction>) {
        self.message = Some(ActiveMessage {
            notice,
            shown_at_ms: now_ms,
        });
        actions.push(EngineAction::ShowMessage(notice));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn engine() -> ControllerEngine {
        ControllerEngine::new(ControllerConfig::default())
    }

    fn press(engine: &mut ControllerEngine, keys: &str, now_ms: u64) -> Vec<EngineAction> {
        keys.chars()
            .flat_map(|c| engine.handle_key(c, now_ms))
            .collect()
    }

    fn relay_commands(actions: &[EngineAction]) -> Vec<(RelayChannel, bool)> {
        actions
            .iter()
            .filter_map(|action| match action {
                EngineAction::SetRelay { channel, on } => Some((*channel, *on)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn starts_with_configured_band_and_relays_off() {
        let engine = engine();
        assert_eq!(engine.state().min_temp_c, 20.0);
        assert_eq!(engine.state().max_temp_c, 30.0);
        assert_eq!(
            engine.start(),
            vec![
                EngineAction::SetRelay {
                    channel: RelayChannel::Manual,
                    on: false,
                },
                EngineAction::SetRelay {
                    channel: RelayChannel::Auto,
                    on: false,
                },
                EngineAction::RenderStatus,
            ]
        );
    }

    #[test]
    fn automatic_relay_follows_band() {
        let mut engine = engine();
        press(&mut engine, "A25*35*", 0);
        let _ = engine.expire_message(10_000);
        press(&mut engine, "C", 10_000);
        // Arming switched the relay on; bring it back off to start from rest.
        let _ = engine.on_sample(Ok(36.0), 11_000);
        assert!(!engine.state().auto_relay_on);

        let mut commands = Vec::new();
        for (i, sample) in [24.0, 26.0, 35.0, 20.0].into_iter().enumerate() {
            let actions = engine.on_sample(Ok(sample), 12_000 + i as u64 * 1_000);
            commands.push(relay_commands(&actions));
        }

        assert_eq!(
            commands,
            vec![
                vec![(RelayChannel::Auto, true)],
                vec![],
                vec![(RelayChannel::Auto, false)],
                vec![(RelayChannel::Auto, true)],
            ]
        );
    }

    #[test]
    fn disarmed_engine_leaves_auto_relay_alone() {
        let mut engine = engine();
        let actions = engine.on_sample(Ok(5.0), 0);
        assert!(relay_commands(&actions).is_empty());
        assert!(!engine.state().auto_relay_on);
    }

    #[test]
    fn samples_follow_the_configured_cadence() {
        let mut engine = engine();
        assert!(engine.sample_due(0));
        let _ = engine.on_sample(Ok(22.0), 0);
        assert!(!engine.sample_due(999));
        assert!(engine.sample_due(1_000));
    }

    #[test]
    fn every_sample_is_logged_and_rendered() {
        let mut engine = engine();
        let actions = engine.on_sample(Ok(22.0), 0);
        assert_eq!(
            actions,
            vec![EngineAction::RenderStatus, EngineAction::LogStatus]
        );
        assert_eq!(engine.latest_sample_c(), Some(22.0));
    }

    #[test]
    fn message_expires_once() {
        let mut engine = engine();
        let actions = press(&mut engine, "A400*", 1_000);
        assert_eq!(
            actions.last(),
            Some(&EngineAction::ShowMessage(Notice::InvalidMin))
        );
        assert_eq!(engine.active_message(), Some(Notice::InvalidMin));

        assert!(engine.expire_message(2_999).is_empty());
        assert_eq!(engine.expire_message(3_000), vec![EngineAction::RenderStatus]);
        assert!(engine.expire_message(3_001).is_empty());
        assert_eq!(engine.active_message(), None);
    }

    #[test]
    fn ticks_do_not_overwrite_an_active_message() {
        let mut engine = engine();
        press(&mut engine, "A20*30*", 0);
        assert_eq!(engine.active_message(), Some(Notice::Ready));

        let actions = engine.on_sample(Ok(22.0), 500);
        assert_eq!(actions, vec![EngineAction::LogStatus]);
    }

    #[test]
    fn typing_dismisses_the_message() {
        let mut engine = engine();
        press(&mut engine, "A400*", 0);
        let actions = press(&mut engine, "4", 100);
        assert_eq!(actions, vec![EngineAction::RenderStatus]);
        assert_eq!(engine.active_message(), None);
    }

    #[test]
    fn unknown_and_ignored_keys_produce_nothing() {
        let mut engine = engine();
        assert!(press(&mut engine, "x*#B7", 0).is_empty());
    }

    #[test]
    fn sensor_fault_switches_auto_relay_off_and_recovers() {
        let mut engine = engine();
        press(&mut engine, "C", 0);
        assert!(engine.state().auto_relay_on);

        let actions = engine.on_sample(Err(DriverError::OpenCircuit), 1_000);
        assert_eq!(relay_commands(&actions), vec![(RelayChannel::Auto, false)]);
        assert!(actions.contains(&EngineAction::ShowMessage(Notice::SensorFault)));
        assert!(engine.state().auto_enabled);
        assert_eq!(engine.sensor_health(), SensorHealth::Fault);
        assert_eq!(engine.latest_sample_c(), None);

        // Same fault episode: no repeated message.
        let actions = engine.on_sample(Ok(f32::NAN), 2_000);
        assert!(!actions.contains(&EngineAction::ShowMessage(Notice::SensorFault)));

        let actions = engine.on_sample(Ok(15.0), 3_000);
        assert_eq!(relay_commands(&actions), vec![(RelayChannel::Auto, true)]);
        assert_eq!(engine.sensor_health(), SensorHealth::Ok);
    }

    #[test]
    fn implausible_reading_counts_as_fault() {
        let mut engine = engine();
        let _ = engine.on_sample(Ok(-127.0), 0);
        assert_eq!(engine.sensor_health(), SensorHealth::Fault);
    }

    #[test]
    fn inverted_band_keeps_relay_off_and_warns_once() {
        let mut engine = engine();
        // Commit a minimum above the old maximum, then abandon the maximum.
        press(&mut engine, "A50*B", 0);
        assert!(!engine.state().band_is_ordered());
        press(&mut engine, "C", 100);

        let actions = engine.on_sample(Ok(40.0), 1_000);
        assert_eq!(relay_commands(&actions), vec![(RelayChannel::Auto, false)]);
        assert!(actions.contains(&EngineAction::ShowMessage(Notice::BandInverted)));

        let actions = engine.on_sample(Ok(40.0), 2_000);
        assert!(relay_commands(&actions).is_empty());
        assert!(!actions.contains(&EngineAction::ShowMessage(Notice::BandInverted)));
    }

    #[test]
    fn rearming_with_inverted_band_warns_again() {
        let mut engine = engine();
        press(&mut engine, "A50*B", 0);
        press(&mut engine, "C", 100);
        let actions = engine.on_sample(Ok(40.0), 1_000);
        assert!(actions.contains(&EngineAction::ShowMessage(Notice::BandInverted)));

        press(&mut engine, "CC", 1_500);
        let actions = engine.on_sample(Ok(40.0), 2_000);
        assert_eq!(relay_commands(&actions), vec![(RelayChannel::Auto, false)]);
        assert!(actions.contains(&EngineAction::ShowMessage(Notice::BandInverted)));
    }

    #[test]
    fn status_payload_serializes_for_the_log() {
        let mut engine = engine();
        let _ = engine.on_sample(Ok(21.5), 0);
        press(&mut engine, "D", 10);

        let json = serde_json::to_value(engine.status_payload(42)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "uptimeMs": 42,
                "temp": 21.5,
                "sensor": "OK",
                "min": 20.0,
                "max": 30.0,
                "mode": "NORMAL",
                "manualRelay": true,
                "autoEnabled": false,
                "autoRelay": false,
            })
        );
    }
}
