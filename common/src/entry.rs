use heapless::String;

use crate::{error::EntryError, types::Key};

pub const ENTRY_CAPACITY: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryBuffer {
    text: String<ENTRY_CAPACITY>,
}

impl EntryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn has_point(&self) -> bool {
        self.text.contains('.')
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn append(&mut self, key: Key) -> bool {
        match key {
            Key::Digit(c) if c.is_ascii_digit() => self.text.push(c).is_ok(),
            Key::Point if !self.is_empty() && !self.has_point() => self.text.push('.').is_ok(),
            _ => false,
        }
    }

    pub fn parse(&self) -> Result<f32, EntryError> {
        if self.is_empty() {
            return Err(EntryError::EmptyInput);
        }
        Ok(leading_number(self.as_str()))
    }
}

/// Converts the longest numeric prefix of `text`, like C's `atof`: trailing
/// characters are ignored and text without any digits reads as zero.
pub fn leading_number(text: &str) -> f32 {
    let mut end = 0;
    let mut seen_point = false;
    for (index, c) in text.char_indices() {
        match c {
            '0'..='9' => end = index + 1,
            '.' if !seen_point => {
                seen_point = true;
                end = index + 1;
            }
            _ => break,
        }
    }

    let prefix = text[..end].trim_end_matches('.');
    if !prefix.bytes().any(|b| b.is_ascii_digit()) {
        return 0.0;
    }
    prefix.parse().unwrap_or(0.0)
}
