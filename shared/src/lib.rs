//! Linear-stage shared protocol types
//!
//! This crate provides the ASCII command vocabulary, reply format, line codec
//! and request state machine shared by the mock controller and its clients.

pub mod codec;
pub mod protocol;
pub mod state_machine;

pub use protocol::*;

/// Fixed identifiers reported by the simulated unit
pub mod device {
    /// Device number used in the `@<n>` reply prefix unless configured otherwise
    pub const DEFAULT_DEVICE_NUMBER: u32 = 1;

    /// Value reported by `get device.id`
    pub const PRODUCT_DEVICE_ID: i64 = 30342;
}
