use crate::types::{ControlMode, ControllerStatus, SensorHealth};

pub const LCD_COLUMNS: usize = 16;

pub fn status_lines(status: &ControllerStatus) -> [String; 2] {
    match status.mode {
        ControlMode::Normal => [
            fit(&format!(
                "T:{} A:{}",
                temperature_text(status),
                auto_text(status)
            )),
            fit(&format!(
                "{:.1}-{:.1} M:{}",
                status.min_temp_c,
                status.max_temp_c,
                on_off(status.manual_relay_on)
            )),
        ],
        ControlMode::SettingMin => [
            fit(&format!("MIN: {}_", status.entry)),
            fit("*=OK #=. B=Back"),
        ],
        ControlMode::SettingMax => [
            fit(&format!("MAX: {}_", status.entry)),
            fit(&format!("MIN {:.1} *=OK", status.min_temp_c)),
        ],
    }
}

pub fn message_lines(text: &str) -> [String; 2] {
    [center(text), fit("")]
}

#[derive(Debug, Clone, Default)]
pub struct Screen {
    shown: Option<[String; 2]>,
}

impl Screen {
    /// Returns the lines to draw, or `None` when the LCD already shows them.
    pub fn status(&mut self, status: &ControllerStatus) -> Option<[String; 2]> {
        let lines = status_lines(status);
        if self.shown.as_ref() == Some(&lines) {
            return None;
        }
        self.shown = Some(lines.clone());
        Some(lines)
    }

    pub fn message(&mut self, text: &str) -> [String; 2] {
        let lines = message_lines(text);
        self.shown = Some(lines.clone());
        lines
    }
}

fn temperature_text(status: &ControllerStatus) -> String {
    match (status.sensor, status.latest_sample_c) {
        (SensorHealth::Fault, _) => "ERR".to_string(),
        (_, Some(celsius)) => format!("{celsius:.1}C"),
        (_, None) => "--.-C".to_string(),
    }
}

fn auto_text(status: &ControllerStatus) -> &'static str {
    match (status.auto_enabled, status.auto_relay_on) {
        (false, _) => "OFF",
        (true, true) => "ON",
        (true, false) => "IDLE",
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

fn fit(text: &str) -> String {
    let mut line: String = text.chars().take(LCD_COLUMNS).collect();
    while line.chars().count() < LCD_COLUMNS {
        line.push(' ');
    }
    line
}

fn center(text: &str) -> String {
    let len = text.chars().count().min(LCD_COLUMNS);
    let pad = (LCD_COLUMNS - len) / 2;
    fit(&format!("{}{}", " ".repeat(pad), text))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn status() -> ControllerStatus {
        ControllerStatus {
            mode: ControlMode::Normal,
            min_temp_c: 20.0,
            max_temp_c: 30.0,
            manual_relay_on: false,
            auto_enabled: true,
            auto_relay_on: true,
            entry: String::new(),
            latest_sample_c: Some(23.46),
            sensor: SensorHealth::Ok,
        }
    }

    #[test]
    fn normal_screen_shows_reading_band_and_relays() {
        assert_eq!(
            status_lines(&status()),
            [
                "T:23.5C A:ON    ".to_string(),
                "20.0-30.0 M:OFF ".to_string(),
            ]
        );
    }

    #[test]
    fn fault_shows_err() {
        let mut status = status();
        status.sensor = SensorHealth::Fault;
        status.latest_sample_c = None;
        assert!(status_lines(&status)[0].starts_with("T:ERR"));
    }

    #[test]
    fn entry_screens_echo_the_buffer() {
        let mut status = status();
        status.mode = ControlMode::SettingMax;
        status.entry = "45.2".to_string();
        let lines = status_lines(&status);
        assert_eq!(lines[0], "MAX: 45.2_      ");
        assert_eq!(lines[1], "MIN 20.0 *=OK   ");
    }

    #[test]
    fn screen_skips_unchanged_frames() {
        let mut screen = Screen::default();
        assert!(screen.status(&status()).is_some());
        assert!(screen.status(&status()).is_none());

        screen.message("Ready");
        assert!(screen.status(&status()).is_some());
    }

    #[test]
    fn messages_are_centered() {
        let lines = message_lines("Ready");
        assert_eq!(lines[0], "     Ready      ");
        assert_eq!(lines[1].len(), LCD_COLUMNS);
    }
}
