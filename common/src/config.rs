use serde::{Deserialize, Serialize};

pub const BAND_FLOOR_C: f32 = 0.0;
pub const BAND_CEILING_C: f32 = 300.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub sample_interval_ms: u64,
    pub message_timeout_ms: u64,
    pub default_min_c: f32,
    pub default_max_c: f32,
    pub min_valid_c: f32,
    pub max_valid_c: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1_000,
            message_timeout_ms: 2_000,
            default_min_c: 20.0,
            default_max_c: 30.0,
            min_valid_c: -20.0,
            max_valid_c: 1_024.0,
        }
    }
}

impl ControllerConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        // MAX6675 needs ~220 ms per conversion.
        self.sample_interval_ms = self.sample_interval_ms.clamp(250, 60_000);
        self.message_timeout_ms = self.message_timeout_ms.clamp(250, 30_000);

        if !self.default_min_c.is_finite() || !self.default_max_c.is_finite() {
            self.default_min_c = defaults.default_min_c;
            self.default_max_c = defaults.default_max_c;
        }
        self.default_min_c = self.default_min_c.clamp(BAND_FLOOR_C, BAND_CEILING_C);
        self.default_max_c = self.default_max_c.clamp(BAND_FLOOR_C, BAND_CEILING_C);
        if self.default_max_c <= self.default_min_c {
            self.default_min_c = defaults.default_min_c;
            self.default_max_c = defaults.default_max_c;
        }

        if !(self.min_valid_c.is_finite()
            && self.max_valid_c.is_finite()
            && self.max_valid_c > self.min_valid_c)
        {
            self.min_valid_c = defaults.min_valid_c;
            self.max_valid_c = defaults.max_valid_c;
        }
    }

    pub fn is_plausible(&self, reading_c: f32) -> bool {
        reading_c.is_finite() && (self.min_valid_c..=self.max_valid_c).contains(&reading_c)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HardwareConfig {
    pub relay_active_low: bool,
    pub loop_period_ms: u64,
    pub keypad_row_pins: [i32; 4],
    pub keypad_col_pins: [i32; 4],
    pub manual_relay_pin: i32,
    pub auto_relay_pin: i32,
    pub thermocouple_sck_pin: i32,
    pub thermocouple_cs_pin: i32,
    pub thermocouple_so_pin: i32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            relay_active_low: true,
            loop_period_ms: 20,
            keypad_row_pins: [13, 12, 14, 27],
            keypad_col_pins: [26, 25, 33, 32],
            manual_relay_pin: 16,
            auto_relay_pin: 17,
            thermocouple_sck_pin: 18,
            thermocouple_cs_pin: 5,
            thermocouple_so_pin: 19,
        }
    }
}

impl HardwareConfig {
    pub fn sanitize(&mut self) {
        self.loop_period_ms = self.loop_period_ms.clamp(1, 200);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.controller.sanitize();
        self.hardware.sanitize();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sanitize_keeps_defaults_untouched() {
        let mut config = RuntimeConfig::default();
        config.sanitize();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn sanitize_repairs_an_unordered_default_band() {
        let mut config = ControllerConfig {
            default_min_c: 80.0,
            default_max_c: 40.0,
            ..ControllerConfig::default()
        };
        config.sanitize();
        assert_eq!(config.default_min_c, 20.0);
        assert_eq!(config.default_max_c, 30.0);
    }

    #[test]
    fn sanitize_clamps_intervals_and_band() {
        let mut config = ControllerConfig {
            sample_interval_ms: 10,
            message_timeout_ms: 1_000_000,
            default_min_c: -5.0,
            default_max_c: 500.0,
            ..ControllerConfig::default()
        };
        config.sanitize();
        assert_eq!(config.sample_interval_ms, 250);
        assert_eq!(config.message_timeout_ms, 30_000);
        assert_eq!(config.default_min_c, 0.0);
        assert_eq!(config.default_max_c, 300.0);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let raw = r#"{ "controller": { "sample_interval_ms": 500 } }"#;
        let config: RuntimeConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.controller.sample_interval_ms, 500);
        assert_eq!(config.controller.message_timeout_ms, 2_000);
        assert_eq!(config.hardware, HardwareConfig::default());
    }

    #[test]
    fn plausibility_rejects_sentinels() {
        let config = ControllerConfig::default();
        assert!(config.is_plausible(23.5));
        assert!(!config.is_plausible(f32::NAN));
        assert!(!config.is_plausible(-127.0));
        assert!(!config.is_plausible(2_000.0));
    }
}
