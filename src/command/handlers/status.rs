//! Identify and status handlers

use super::expect_params;
use crate::command::CommandError;
use crate::device::DeviceState;
use lst_shared::{CommandName, Reply};
use tracing::debug;

/// Handle `identify`
pub fn handle_identify(device: &DeviceState, params: &[String]) -> Result<Reply, CommandError> {
    expect_params::<0>(CommandName::Identify, params)?;
    debug!(device = device.device_number(), "Identify");
    Ok(device.snapshot())
}

/// Handle `status`, which is also the answer to every fallback
pub fn handle_status(device: &DeviceState, params: &[String]) -> Result<Reply, CommandError> {
    expect_params::<0>(CommandName::Status, params)?;
    Ok(device.snapshot())
}
