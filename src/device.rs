//! Simulated stage state

use lst_shared::{device, DeviceStatus, Reply};

/// The single simulated unit behind the controller
///
/// Position is only ever written by the `move` handler; everything else reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    device_number: u32,
    position: i64,
    status: DeviceStatus,
}

impl DeviceState {
    /// Create a unit at position 0 reporting `IDLE`
    pub fn new(device_number: u32) -> Self {
        Self {
            device_number,
            position: 0,
            status: DeviceStatus::Idle,
        }
    }

    pub fn device_number(&self) -> u32 {
        self.device_number
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Reply carrying the current status with payload `0`
    pub fn snapshot(&self) -> Reply {
        self.reply_with(0)
    }

    /// Reply carrying the current status and the given payload
    pub fn reply_with(&self, payload: i64) -> Reply {
        Reply::new(self.device_number, self.status, payload)
    }

    pub(crate) fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new(device::DEFAULT_DEVICE_NUMBER)
    }
}
