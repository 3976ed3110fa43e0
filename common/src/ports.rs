use crate::{
    error::DriverError,
    types::{ControllerStatus, RelayChannel},
};

pub trait Keypad {
    fn poll(&mut self) -> Option<char>;
}

pub trait Thermocouple {
    fn read_celsius(&mut self) -> Result<f32, DriverError>;
}

/// Switches a relay line. Implementations handle the electrical polarity;
/// `on` always means the load is energized.
pub trait RelayActuator {
    fn set_state(&mut self, channel: RelayChannel, on: bool) -> Result<(), DriverError>;
}

pub trait Notifier {
    fn render_status(&mut self, status: &ControllerStatus);
    fn show_transient_message(&mut self, text: &str);
    fn log_line(&mut self, line: &str);
}
