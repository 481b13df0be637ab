//! `get` handler

use super::expect_params;
use crate::command::CommandError;
use crate::device::DeviceState;
use lst_shared::device::PRODUCT_DEVICE_ID;
use lst_shared::{CommandName, Field, Reply};
use tracing::debug;

/// Handle `get <field>`
pub fn handle_get(device: &DeviceState, params: &[String]) -> Result<Reply, CommandError> {
    let [field] = expect_params::<1>(CommandName::Get, params)?;

    let reply = match field.parse::<Field>()? {
        Field::Position => device.reply_with(device.position()),
        Field::Status => device.snapshot(),
        Field::DeviceId => device.reply_with(PRODUCT_DEVICE_ID),
    };

    debug!(field = %field, payload = reply.payload, "Get");
    Ok(reply)
}
