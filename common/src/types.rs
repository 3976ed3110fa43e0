use serde::Serialize;

use crate::entry::EntryBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Normal,
    SettingMin,
    SettingMax,
}

impl ControlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::SettingMin => "SETTING_MIN",
            Self::SettingMax => "SETTING_MAX",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayChannel {
    Manual,
    Auto,
}

impl RelayChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Auto => "AUTO",
        }
    }
}

impl core::fmt::Display for RelayChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(char),
    Point,
    Confirm,
    EditBand,
    Cancel,
    ToggleAuto,
    ToggleManual,
}

impl Key {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => Some(Self::Digit(c)),
            '#' => Some(Self::Point),
            '*' => Some(Self::Confirm),
            'A' => Some(Self::EditBand),
            'B' => Some(Self::Cancel),
            'C' => Some(Self::ToggleAuto),
            'D' => Some(Self::ToggleManual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorHealth {
    Unknown,
    Ok,
    Fault,
}

impl SensorHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Ok => "OK",
            Self::Fault => "FAULT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    pub mode: ControlMode,
    pub min_temp_c: f32,
    pub max_temp_c: f32,
    pub manual_relay_on: bool,
    pub auto_enabled: bool,
    pub auto_relay_on: bool,
    pub entry: EntryBuffer,
}

impl ControllerState {
    pub fn new(min_temp_c: f32, max_temp_c: f32) -> Self {
        Self {
            mode: ControlMode::Normal,
            min_temp_c,
            max_temp_c,
            manual_relay_on: false,
            auto_enabled: false,
            auto_relay_on: false,
            entry: EntryBuffer::new(),
        }
    }

    pub fn band_is_ordered(&self) -> bool {
        self.max_temp_c > self.min_temp_c
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    pub mode: ControlMode,
    pub min_temp_c: f32,
    pub max_temp_c: f32,
    pub manual_relay_on: bool,
    pub auto_enabled: bool,
    pub auto_relay_on: bool,
    pub entry: String,
    pub latest_sample_c: Option<f32>,
    pub sensor: SensorHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload {
    #[serde(rename = "uptimeMs")]
    pub uptime_ms: u64,
    pub temp: Option<f32>,
    pub sensor: &'static str,
    pub min: f32,
    pub max: f32,
    pub mode: &'static str,
    #[serde(rename = "manualRelay")]
    pub manual_relay: bool,
    #[serde(rename = "autoEnabled")]
    pub auto_enabled: bool,
    #[serde(rename = "autoRelay")]
    pub auto_relay: bool,
}
