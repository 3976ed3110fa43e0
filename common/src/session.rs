use crate::{
    config::{BAND_CEILING_C, BAND_FLOOR_C},
    engine::{EngineAction, Notice},
    error::EntryError,
    types::{ControlMode, ControllerState, Key, RelayChannel},
};

pub fn handle_key(state: &mut ControllerState, key: Key) -> Vec<EngineAction> {
    let mut actions = Vec::new();

    match (state.mode, key) {
        (ControlMode::Normal, Key::ToggleManual) => {
            state.manual_relay_on = !state.manual_relay_on;
            actions.push(EngineAction::SetRelay {
                channel: RelayChannel::Manual,
                on: state.manual_relay_on,
            });
        }
        (ControlMode::Normal, Key::EditBand) => {
            disarm_auto(state, &mut actions);
            state.entry.clear();
            state.mode = ControlMode::SettingMin;
        }
        (ControlMode::Normal, Key::ToggleAuto) => {
            state.auto_enabled = !state.auto_enabled;
            // Arming switches the relay on straight away; the next sample
            // decides whether it stays on.
            state.auto_relay_on = state.auto_enabled;
            actions.push(EngineAction::SetRelay {
                channel: RelayChannel::Auto,
                on: state.auto_relay_on,
            });
        }
        (ControlMode::SettingMin | ControlMode::SettingMax, Key::Digit(_) | Key::Point) => {
            state.entry.append(key);
        }
        (ControlMode::SettingMin, Key::Confirm) => confirm_min(state, &mut actions),
        (ControlMode::SettingMax, Key::Confirm) => confirm_max(state, &mut actions),
        (ControlMode::SettingMin | ControlMode::SettingMax, Key::Cancel) => {
            state.entry.clear();
            state.mode = ControlMode::Normal;
        }
        _ => {}
    }

    actions
}

pub fn validate_min(value: f32) -> Result<f32, EntryError> {
    if (BAND_FLOOR_C..=BAND_CEILING_C).contains(&value) {
        Ok(value)
    } else {
        Err(EntryError::OutOfRange {
            value,
            min: BAND_FLOOR_C,
            max: BAND_CEILING_C,
        })
    }
}

pub fn validate_max(value: f32, min: f32) -> Result<f32, EntryError> {
    if value <= min {
        return Err(EntryError::InvalidOrder { min, max: value });
    }
    if value > BAND_CEILING_C {
        return Err(EntryError::OutOfRange {
            value,
            min: BAND_FLOOR_C,
            max: BAND_CEILING_C,
        });
    }
    Ok(value)
}

fn confirm_min(state: &mut ControllerState, actions: &mut Vec<EngineAction>) {
    let Ok(value) = state.entry.parse() else {
        return;
    };
    state.entry.clear();

    match validate_min(value) {
        Ok(min) => {
            state.min_temp_c = min;
            state.mode = ControlMode::SettingMax;
        }
        Err(_) => actions.push(EngineAction::ShowMessage(Notice::InvalidMin)),
    }
}

fn confirm_max(state: &mut ControllerState, actions: &mut Vec<EngineAction>) {
    let Ok(value) = state.entry.parse() else {
        return;
    };
    state.entry.clear();

    match validate_max(value, state.min_temp_c) {
        Ok(max) => {
            state.max_temp_c = max;
            state.mode = ControlMode::Normal;
            disarm_auto(state, actions);
            actions.push(EngineAction::ShowMessage(Notice::Ready));
        }
        Err(EntryError::InvalidOrder { .. }) => {
            actions.push(EngineAction::ShowMessage(Notice::MaxNotAboveMin));
        }
        Err(_) => actions.push(EngineAction::ShowMessage(Notice::InvalidMax)),
    }
}

fn disarm_auto(state: &mut ControllerState, actions: &mut Vec<EngineAction>) {
    state.auto_enabled = false;
    state.auto_relay_on = false;
    actions.push(EngineAction::SetRelay {
        channel: RelayChannel::Auto,
        on: false,
    });
}
