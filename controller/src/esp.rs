use std::{
    sync::OnceLock,
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use esp_idf_hal::{
    delay::Ets,
    gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, Input, Output, PinDriver, Pull},
};
use esp_idf_svc::log::EspLogger;
use log::{debug, info, warn};

use thermoband_common::{
    display::Screen, ControlLoop, ControllerEngine, ControllerStatus, DriverError, HardwareConfig,
    Keypad, Notifier, RelayActuator, RelayChannel, RuntimeConfig, Thermocouple,
};

const WATCHDOG_TIMEOUT_SEC: u32 = 10;
const KEYPAD_SETTLE_US: u32 = 10;
const MAX6675_CLOCK_US: u32 = 1;

const KEYPAD_LAYOUT: [[char; 4]; 4] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', 'D'],
];

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    // Settings are not persisted; the board always boots with compiled-in defaults.
    let mut runtime = RuntimeConfig::default();
    runtime.sanitize();

    init_watchdog(WATCHDOG_TIMEOUT_SEC)?;
    if let Err(err) = add_current_task_to_watchdog() {
        warn!("failed to register control loop with watchdog: {err:#}");
    }

    let hardware = &runtime.hardware;
    let keypad = MatrixKeypad::new(hardware).context("keypad init failed")?;
    let thermocouple = Max6675::new(hardware).context("thermocouple init failed")?;
    let relays = GpioRelays::new(hardware).context("relay init failed")?;

    let mut control = ControlLoop::new(
        ControllerEngine::new(runtime.controller.clone()),
        keypad,
        thermocouple,
        relays,
        SerialNotifier::default(),
    );

    for err in control.start(monotonic_ms()) {
        warn!("relay initialization failed: {err}");
    }
    info!(
        "controller running: band {:.1}..{:.1}C, sampling every {}ms",
        runtime.controller.default_min_c,
        runtime.controller.default_max_c,
        runtime.controller.sample_interval_ms
    );

    let period = Duration::from_millis(hardware.loop_period_ms);
    loop {
        feed_watchdog();
        let report = control.step(monotonic_ms());
        for err in report.relay_failures {
            warn!("relay command failed: {err}");
        }
        thread::sleep(period);
    }
}

struct MatrixKeypad {
    rows: Vec<PinDriver<'static, AnyOutputPin, Output>>,
    cols: Vec<PinDriver<'static, AnyIOPin, Input>>,
    held: Option<char>,
}

impl MatrixKeypad {
    fn new(hardware: &HardwareConfig) -> anyhow::Result<Self> {
        let mut rows = Vec::with_capacity(4);
        for pin in hardware.keypad_row_pins {
            let mut driver = unsafe { PinDriver::output(AnyOutputPin::new(pin)) }
                .with_context(|| format!("keypad row GPIO{pin}"))?;
            driver.set_high()?;
            rows.push(driver);
        }

        let mut cols = Vec::with_capacity(4);
        for pin in hardware.keypad_col_pins {
            let mut driver = unsafe { PinDriver::input(AnyIOPin::new(pin)) }
                .with_context(|| format!("keypad column GPIO{pin}"))?;
            driver.set_pull(Pull::Up)?;
            cols.push(driver);
        }

        Ok(Self {
            rows,
            cols,
            held: None,
        })
    }

    fn scan(&mut self) -> Option<char> {
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            if row.set_low().is_err() {
                continue;
            }
            Ets::delay_us(KEYPAD_SETTLE_US);
            let hit = self.cols.iter().position(|col| col.is_low());
            let _ = row.set_high();

            if let Some(col_index) = hit {
                return Some(KEYPAD_LAYOUT[row_index][col_index]);
            }
        }
        None
    }
}

impl Keypad for MatrixKeypad {
    fn poll(&mut self) -> Option<char> {
        let current = self.scan();
        let pressed = match (self.held, current) {
            (None, Some(key)) => Some(key),
            _ => None,
        };
        self.held = current;
        pressed
    }
}

struct Max6675 {
    sck: PinDriver<'static, AnyOutputPin, Output>,
    cs: PinDriver<'static, AnyOutputPin, Output>,
    so: PinDriver<'static, AnyInputPin, Input>,
}

impl Max6675 {
    fn new(hardware: &HardwareConfig) -> anyhow::Result<Self> {
        let mut sck = unsafe { PinDriver::output(AnyOutputPin::new(hardware.thermocouple_sck_pin)) }
            .context("MAX6675 SCK")?;
        let mut cs = unsafe { PinDriver::output(AnyOutputPin::new(hardware.thermocouple_cs_pin)) }
            .context("MAX6675 CS")?;
        let so = unsafe { PinDriver::input(AnyInputPin::new(hardware.thermocouple_so_pin)) }
            .context("MAX6675 SO")?;

        sck.set_low()?;
        cs.set_high()?;
        Ok(Self { sck, cs, so })
    }

    fn read_frame(&mut self) -> anyhow::Result<u16> {
        self.cs.set_low()?;
        Ets::delay_us(MAX6675_CLOCK_US);

        let mut frame = 0_u16;
        for _ in 0..16 {
            self.sck.set_low()?;
            Ets::delay_us(MAX6675_CLOCK_US);
            frame = (frame << 1) | u16::from(self.so.is_high());
            self.sck.set_high()?;
            Ets::delay_us(MAX6675_CLOCK_US);
        }

        self.sck.set_low()?;
        self.cs.set_high()?;
        Ok(frame)
    }
}

impl Thermocouple for Max6675 {
    fn read_celsius(&mut self) -> Result<f32, DriverError> {
        let frame = self
            .read_frame()
            .map_err(|err| DriverError::Thermocouple(format!("{err:#}")))?;
        decode_max6675(frame)
    }
}

fn decode_max6675(frame: u16) -> Result<f32, DriverError> {
    if frame & 0x0004 != 0 {
        return Err(DriverError::OpenCircuit);
    }
    Ok(f32::from(frame >> 3) * 0.25)
}

struct GpioRelays {
    manual: PinDriver<'static, AnyOutputPin, Output>,
    auto: PinDriver<'static, AnyOutputPin, Output>,
    active_low: bool,
}

impl GpioRelays {
    fn new(hardware: &HardwareConfig) -> anyhow::Result<Self> {
        let manual = unsafe { PinDriver::output(AnyOutputPin::new(hardware.manual_relay_pin)) }
            .with_context(|| format!("manual relay GPIO{}", hardware.manual_relay_pin))?;
        let auto = unsafe { PinDriver::output(AnyOutputPin::new(hardware.auto_relay_pin)) }
            .with_context(|| format!("auto relay GPIO{}", hardware.auto_relay_pin))?;

        let mut relays = Self {
            manual,
            auto,
            active_low: hardware.relay_active_low,
        };
        for channel in [RelayChannel::Manual, RelayChannel::Auto] {
            relays.set_state(channel, false)?;
        }
        Ok(relays)
    }
}

impl RelayActuator for GpioRelays {
    fn set_state(&mut self, channel: RelayChannel, on: bool) -> Result<(), DriverError> {
        let pin = match channel {
            RelayChannel::Manual => &mut self.manual,
            RelayChannel::Auto => &mut self.auto,
        };
        let result = if on != self.active_low {
            pin.set_high()
        } else {
            pin.set_low()
        };
        result.map_err(|err| DriverError::Relay {
            channel,
            reason: err.to_string(),
        })
    }
}

#[derive(Default)]
struct SerialNotifier {
    screen: Screen,
}

impl Notifier for SerialNotifier {
    fn render_status(&mut self, status: &ControllerStatus) {
        if let Some([top, bottom]) = self.screen.status(status) {
            info!("|{top}|");
            info!("|{bottom}|");
        }
    }

    fn show_transient_message(&mut self, text: &str) {
        let [top, bottom] = self.screen.message(text);
        info!("|{top}|");
        info!("|{bottom}|");
    }

    fn log_line(&mut self, line: &str) {
        debug!("{line}");
    }
}

fn init_watchdog(timeout_sec: u32) -> anyhow::Result<()> {
    let config = esp_idf_svc::sys::esp_task_wdt_config_t {
        timeout_ms: timeout_sec.saturating_mul(1000),
        idle_core_mask: 0,
        trigger_panic: true,
    };
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_init(&config) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_init failed with code {}", rc))
}

fn add_current_task_to_watchdog() -> anyhow::Result<()> {
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_add(core::ptr::null_mut()) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_add failed with code {}", rc))
}

fn feed_watchdog() {
    let _ = unsafe { esp_idf_svc::sys::esp_task_wdt_reset() };
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
