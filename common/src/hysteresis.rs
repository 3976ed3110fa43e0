#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min_c: f32,
    pub max_c: f32,
}

impl Band {
    pub fn new(min_c: f32, max_c: f32) -> Self {
        Self { min_c, max_c }
    }

    pub fn is_ordered(&self) -> bool {
        self.max_c > self.min_c
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    TurnOn,
    TurnOff,
    Hold,
    /// `max <= min`: no command is safe to issue.
    InvertedBand,
}

pub fn decide(sample_c: f32, band: Band, auto_enabled: bool, relay_on: bool) -> Option<Decision> {
    if !auto_enabled {
        return None;
    }

    if !band.is_ordered() {
        return Some(Decision::InvertedBand);
    }

    let decision = if sample_c >= band.max_c && relay_on {
        Decision::TurnOff
    } else if sample_c < band.min_c && !relay_on {
        Decision::TurnOn
    } else {
        Decision::Hold
    };
    Some(decision)
}
