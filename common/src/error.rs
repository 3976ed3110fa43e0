use thiserror::Error;

use crate::types::RelayChannel;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EntryError {
    #[error("nothing entered")]
    EmptyInput,
    #[error("{value} is outside {min}..={max}")]
    OutOfRange { value: f32, min: f32, max: f32 },
    #[error("maximum {max} must be above minimum {min}")]
    InvalidOrder { min: f32, max: f32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("thermocouple read failed: {0}")]
    Thermocouple(String),
    #[error("thermocouple is not connected")]
    OpenCircuit,
    #[error("relay {channel} could not be switched: {reason}")]
    Relay {
        channel: RelayChannel,
        reason: String,
    },
}
