use std::{
    io::{BufRead, ErrorKind},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use thermoband_common::{
    display::Screen, ControlLoop, ControllerEngine, ControllerStatus, DriverError, Keypad,
    Notifier, RelayActuator, RelayChannel, RuntimeConfig, Thermocouple,
};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = ConfigStore::from_env();
    let mut runtime = store.load().unwrap_or_else(|err| {
        warn!("failed to load config from {}: {err:#}", store.path.display());
        RuntimeConfig::default()
    });
    runtime.sanitize();

    let heater = Arc::new(AtomicBool::new(false));
    let plant = Plant::from_env();
    info!(
        "simulated plant: ambient {:.1}C, heating {:.2}C/s, loss {:.3}/s",
        plant.ambient_c, plant.heat_rate_c_per_s, plant.loss_per_s
    );

    let mut control = ControlLoop::new(
        ControllerEngine::new(runtime.controller.clone()),
        StdinKeypad::spawn(),
        SimulatedThermocouple::new(plant, heater.clone()),
        HostRelays::new(runtime.hardware.relay_active_low, heater),
        ConsoleNotifier::default(),
    );

    for err in control.start(monotonic_ms()) {
        warn!("relay initialization failed: {err}");
    }
    info!(
        "controller running: type keypad keys (0-9 # * A B C D) and press enter, ctrl-c to stop"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut interval =
        tokio::time::interval(Duration::from_millis(runtime.hardware.loop_period_ms));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = control.step(monotonic_ms());
                for err in report.relay_failures {
                    warn!("relay command failed: {err}");
                }
            }
            result = &mut shutdown => {
                result.context("failed to listen for ctrl-c")?;
                info!("shutdown requested");
                break;
            }
        }
    }

    for err in control.shutdown() {
        warn!("relay release failed: {err}");
    }
    Ok(())
}

struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    fn from_env() -> Self {
        let path = std::env::var("THERMOBAND_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.thermoband/config.json"));
        Self { path }
    }

    fn load(&self) -> anyhow::Result<RuntimeConfig> {
        load_runtime_config(&self.path)
    }
}

fn load_runtime_config(path: &Path) -> anyhow::Result<RuntimeConfig> {
    match std::fs::read(path) {
        Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw)
            .with_context(|| format!("invalid config json in {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

struct StdinKeypad {
    rx: mpsc::UnboundedReceiver<char>,
}

impl StdinKeypad {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                for key in line.chars().filter_map(normalize_key) {
                    if tx.send(key).is_err() {
                        return;
                    }
                }
            }
            debug!("stdin closed; keypad input ended");
        });
        Self { rx }
    }
}

impl Keypad for StdinKeypad {
    fn poll(&mut self) -> Option<char> {
        self.rx.try_recv().ok()
    }
}

fn normalize_key(c: char) -> Option<char> {
    let c = c.to_ascii_uppercase();
    matches!(c, '0'..='9' | '#' | '*' | 'A'..='D').then_some(c)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Plant {
    ambient_c: f32,
    heat_rate_c_per_s: f32,
    loss_per_s: f32,
    temp_c: f32,
}

impl Plant {
    fn from_env() -> Self {
        let ambient_c = env_f32("THERMOBAND_AMBIENT_C").unwrap_or(22.0);
        Self {
            ambient_c,
            heat_rate_c_per_s: env_f32("THERMOBAND_HEAT_RATE").unwrap_or(0.5),
            loss_per_s: env_f32("THERMOBAND_LOSS").unwrap_or(0.01),
            temp_c: env_f32("THERMOBAND_START_C").unwrap_or(ambient_c),
        }
    }

    fn advance(&mut self, dt_s: f32, heating: bool) {
        let gain = if heating { self.heat_rate_c_per_s } else { 0.0 };
        let loss = self.loss_per_s * (self.temp_c - self.ambient_c);
        self.temp_c += (gain - loss) * dt_s;
    }
}

struct SimulatedThermocouple {
    plant: Plant,
    heater: Arc<AtomicBool>,
    last_read: Option<Instant>,
}

impl SimulatedThermocouple {
    fn new(plant: Plant, heater: Arc<AtomicBool>) -> Self {
        Self {
            plant,
            heater,
            last_read: None,
        }
    }
}

impl Thermocouple for SimulatedThermocouple {
    fn read_celsius(&mut self) -> Result<f32, DriverError> {
        let now = Instant::now();
        if let Some(last) = self.last_read {
            let dt_s = now.duration_since(last).as_secs_f32();
            self.plant
                .advance(dt_s, self.heater.load(Ordering::Relaxed));
        }
        self.last_read = Some(now);
        Ok(self.plant.temp_c)
    }
}

struct HostRelays {
    active_low: bool,
    heater: Arc<AtomicBool>,
    levels: [Option<bool>; 2],
}

impl HostRelays {
    fn new(active_low: bool, heater: Arc<AtomicBool>) -> Self {
        Self {
            active_low,
            heater,
            levels: [None; 2],
        }
    }

    fn pin_high(&self, on: bool) -> bool {
        on != self.active_low
    }
}

impl RelayActuator for HostRelays {
    fn set_state(&mut self, channel: RelayChannel, on: bool) -> Result<(), DriverError> {
        let slot = match channel {
            RelayChannel::Manual => 0,
            RelayChannel::Auto => 1,
        };
        if channel == RelayChannel::Auto {
            self.heater.store(on, Ordering::Relaxed);
        }

        let high = self.pin_high(on);
        if self.levels[slot] != Some(high) {
            self.levels[slot] = Some(high);
            info!(
                "relay {channel} {} (pin {})",
                if on { "ON" } else { "OFF" },
                if high { "HIGH" } else { "LOW" }
            );
        }
        Ok(())
    }
}

#[derive(Default)]
struct ConsoleNotifier {
    screen: Screen,
}

impl Notifier for ConsoleNotifier {
    fn render_status(&mut self, status: &ControllerStatus) {
        if let Some([top, bottom]) = self.screen.status(status) {
            info!(target: "lcd", "|{top}|");
            info!(target: "lcd", "|{bottom}|");
        }
    }

    fn show_transient_message(&mut self, text: &str) {
        let [top, bottom] = self.screen.message(text);
        info!(target: "lcd", "|{top}|");
        info!(target: "lcd", "|{bottom}|");
    }

    fn log_line(&mut self, line: &str) {
        debug!(target: "serial", "{line}");
    }
}

fn env_f32(name: &str) -> Option<f32> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<f32>().ok())
        .filter(|value| value.is_finite())
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
