//! `method:path` transport addresses.

use super::{NullTransport, SerialTransport, Transport, UnixTransport};
use crate::config::TransportOptions;
use crate::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A parsed transport address.
///
/// ```text
/// unix:/tmp/virtualbox-sock
/// serial:/dev/ttyS1
/// serial:COM1
/// null:
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAddress {
    Unix(PathBuf),
    Serial(String),
    Null,
}

impl TransportAddress {
    /// Open the transport this address names.
    pub fn open(&self, options: &TransportOptions) -> Result<Box<dyn Transport>, Error> {
        let transport: Box<dyn Transport> = match self {
            TransportAddress::Unix(path) => Box::new(UnixTransport::connect(path)?),
            TransportAddress::Serial(port) => {
                Box::new(SerialTransport::open(port, options.baud_rate)?)
            }
            TransportAddress::Null => Box::new(NullTransport::new()),
        };
        tracing::info!(target: "srfp::transport", address = %self, "transport opened");
        Ok(transport)
    }
}

impl FromStr for TransportAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (method, path) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;

        match method {
            "unix" if !path.is_empty() => Ok(TransportAddress::Unix(PathBuf::from(path))),
            "serial" if !path.is_empty() => Ok(TransportAddress::Serial(path.to_string())),
            "null" => Ok(TransportAddress::Null),
            _ => Err(Error::InvalidAddress(s.to_string())),
        }
    }
}

impl fmt::Display for TransportAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportAddress::Unix(path) => write!(f, "unix:{}", path.display()),
            TransportAddress::Serial(port) => write!(f, "serial:{}", port),
            TransportAddress::Null => write!(f, "null:"),
        }
    }
}

/// Parse `address` and open the transport it names.
pub fn connect(address: &str, options: &TransportOptions) -> Result<Box<dyn Transport>, Error> {
    address.parse::<TransportAddress>()?.open(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addresses() {
        assert_eq!(
            "unix:/tmp/virtualbox-sock".parse::<TransportAddress>().unwrap(),
            TransportAddress::Unix(PathBuf::from("/tmp/virtualbox-sock"))
        );
        assert_eq!(
            "serial:/dev/ttyS1".parse::<TransportAddress>().unwrap(),
            TransportAddress::Serial("/dev/ttyS1".to_string())
        );
        assert_eq!(
            "serial:COM1".parse::<TransportAddress>().unwrap(),
            TransportAddress::Serial("COM1".to_string())
        );
        assert_eq!(
            "null:".parse::<TransportAddress>().unwrap(),
            TransportAddress::Null
        );
    }

    #[test]
    fn test_invalid_addresses() {
        for bad in ["tcp:localhost:9", "unix:", "serial:", "/tmp/sock", ""] {
            match bad.parse::<TransportAddress>() {
                Err(Error::InvalidAddress(addr)) => assert_eq!(addr, bad),
                other => panic!("{:?} parsed as {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_display_roundtrip() {
        for addr in ["unix:/run/dev.sock", "serial:/dev/ttyUSB0", "null:"] {
            let parsed: TransportAddress = addr.parse().unwrap();
            assert_eq!(parsed.to_string(), addr);
        }
    }

    #[test]
    fn test_connect_null() {
        let transport = connect("null:", &TransportOptions::default()).unwrap();
        assert_eq!(transport.describe(), "null:");
    }
}
