pub mod mock_serial;
pub mod serial;
pub mod tcp;
pub mod traits;

pub use mock_serial::{MockSerial, SerialError};
pub use serial::{SerialAcceptor, SerialSettings, DEFAULT_BAUD_RATE};
pub use tcp::TcpAcceptor;
pub use traits::{TransportAcceptor, TransportStream};
