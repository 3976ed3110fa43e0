pub mod config;
pub mod control_loop;
pub mod display;
pub mod engine;
pub mod entry;
pub mod error;
pub mod hysteresis;
pub mod ports;
pub mod session;
pub mod types;

pub use config::{ControllerConfig, HardwareConfig, RuntimeConfig};
pub use control_loop::{ControlLoop, StepReport};
pub use engine::{ControllerEngine, EngineAction, Notice};
pub use entry::EntryBuffer;
pub use error::{DriverError, EntryError};
pub use ports::{Keypad, Notifier, RelayActuator, Thermocouple};
pub use types::{ControlMode, ControllerState, ControllerStatus, Key, RelayChannel, SensorHealth};
