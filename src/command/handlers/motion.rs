//! Motion handlers
//!
//! No travel time or limits are simulated: a move lands immediately and the
//! unit stays `IDLE`.

use super::expect_params;
use crate::command::CommandError;
use crate::device::DeviceState;
use lst_shared::{CommandName, MoveMode, Reply};
use tracing::{debug, info};

/// Handle `home`
///
/// Homing does not touch the position.
pub fn handle_home(device: &DeviceState, params: &[String]) -> Result<Reply, CommandError> {
    expect_params::<0>(CommandName::Home, params)?;
    info!(position = device.position(), "Home requested");
    Ok(device.snapshot())
}

/// Handle `move abs <n>` and `move rel <n>`
///
/// The position is left untouched unless the whole request is valid.
pub fn handle_move(device: &mut DeviceState, params: &[String]) -> Result<Reply, CommandError> {
    let [mode, value] = expect_params::<2>(CommandName::Move, params)?;

    let mode: MoveMode = mode.parse()?;
    let value: i64 = value.parse().map_err(|source| CommandError::InvalidInteger {
        value: value.clone(),
        source,
    })?;

    let from = device.position();
    let target = match mode {
        MoveMode::Absolute => value,
        MoveMode::Relative => from
            .checked_add(value)
            .ok_or(CommandError::PositionOverflow {
                position: from,
                offset: value,
            })?,
    };

    device.set_position(target);
    debug!(?mode, from, to = target, "Move");

    Ok(device.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lst_shared::ProtocolError;

    fn params(mode: &str, value: &str) -> Vec<String> {
        vec![mode.to_string(), value.to_string()]
    }

    #[test]
    fn test_absolute_then_relative() {
        let mut device = DeviceState::default();

        let reply = handle_move(&mut device, &params("abs", "500")).expect("abs move");
        assert_eq!(reply.payload, 0);
        assert_eq!(device.position(), 500);

        handle_move(&mut device, &params("rel", "-20")).expect("rel move");
        assert_eq!(device.position(), 480);
    }

    #[test]
    fn test_unknown_mode_keeps_position() {
        let mut device = DeviceState::default();
        handle_move(&mut device, &params("abs", "10")).expect("abs move");

        let result = handle_move(&mut device, &params("vel", "5"));
        assert!(matches!(
            result,
            Err(CommandError::Protocol(ProtocolError::UnknownMode(_)))
        ));
        assert_eq!(device.position(), 10);
    }

    #[test]
    fn test_non_integer_keeps_position() {
        let mut device = DeviceState::default();
        let result = handle_move(&mut device, &params("abs", "12.5"));
        assert!(matches!(result, Err(CommandError::InvalidInteger { .. })));
        assert_eq!(device.position(), 0);
    }

    #[test]
    fn test_relative_overflow_keeps_position() {
        let mut device = DeviceState::default();
        handle_move(&mut device, &params("abs", &i64::MAX.to_string())).expect("abs move");

        let result = handle_move(&mut device, &params("rel", "1"));
        assert!(matches!(result, Err(CommandError::PositionOverflow { .. })));
        assert_eq!(device.position(), i64::MAX);
    }

    #[test]
    fn test_home_keeps_position() {
        let mut device = DeviceState::default();
        handle_move(&mut device, &params("abs", "77")).expect("abs move");
        handle_home(&device, &[]).expect("home");
        assert_eq!(device.position(), 77);
    }

    #[test]
    fn test_move_needs_two_parameters() {
        let mut device = DeviceState::default();
        let result = handle_move(&mut device, &["abs".to_string()]);
        assert!(matches!(
            result,
            Err(CommandError::ArgumentCount { expected: 2, supplied: 1, .. })
        ));
    }
}
