//! Byte channels to an SRFP device.
//!
//! - **Unix sockets**: a device (or VM serial port) exposed as a socket file
//! - **Serial**: a physical or virtual serial line
//! - **Null**: a sink that never answers, for dry runs
//!
//! # Example
//!
//! ```rust,ignore
//! use srfp_fs::transport::{connect, TransportAddress};
//! use srfp_fs::TransportOptions;
//!
//! let transport = connect("serial:/dev/ttyS1", &TransportOptions::new().baud_rate(9600))?;
//! ```

mod address;
mod null;
mod serial;
mod traits;
mod unix;

pub use address::{connect, TransportAddress};
pub use null::NullTransport;
pub use serial::{SerialTransport, DEFAULT_BAUD_RATE};
pub use traits::{Transport, TransportError};
pub use unix::UnixTransport;
