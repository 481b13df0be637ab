//! Command handlers for the supported commands
//!
//! Read-only handlers take `&DeviceState`; only `move` gets `&mut DeviceState`.

mod get;
mod motion;
mod status;

pub use get::handle_get;
pub use motion::{handle_home, handle_move};
pub use status::{handle_identify, handle_status};

use crate::command::CommandError;
use lst_shared::CommandName;

/// Borrow exactly `N` positional parameters
pub(crate) fn expect_params<const N: usize>(
    command: CommandName,
    params: &[String],
) -> Result<&[String; N], CommandError> {
    debug_assert_eq!(N, command.arity(), "{} declares a different arity", command);
    params.try_into().map_err(|_| CommandError::ArgumentCount {
        command,
        expected: N,
        supplied: params.len(),
    })
}
