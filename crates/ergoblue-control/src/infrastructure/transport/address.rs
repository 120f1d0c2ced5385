//! Bluetooth device addresses.
//!
//! The kernel stores an address least-significant byte first; people (and
//! the configuration file) write it most-significant first, colon
//! separated.  [`BdAddr`] always holds the printable order.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A 48-bit Bluetooth device address in printable byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BdAddr(pub [u8; 6]);

/// Error for a string that is not `XX:XX:XX:XX:XX:XX`.
#[derive(Debug, Error, PartialEq)]
#[error("invalid Bluetooth address: {0:?}")]
pub struct AddressParseError(pub String);

impl BdAddr {
    /// The all-zero address the kernel uses for "any local adapter".
    pub const ANY: BdAddr = BdAddr([0; 6]);

    /// Converts from the kernel's little-endian byte order.
    pub fn from_wire(bytes: [u8; 6]) -> Self {
        let mut printable = bytes;
        printable.reverse();
        Self(printable)
    }

    /// The kernel's little-endian byte order.
    pub fn to_wire(self) -> [u8; 6] {
        let mut wire = self.0;
        wire.reverse();
        wire
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BdAddr {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressParseError(s.to_string());
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in &mut bytes {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_use_printable_order() {
        // Arrange
        let text = "DC:A6:32:0b:1C:FF";

        // Act
        let addr: BdAddr = text.parse().expect("valid address");

        // Assert
        assert_eq!(addr.0, [0xDC, 0xA6, 0x32, 0x0B, 0x1C, 0xFF]);
        assert_eq!(addr.to_string(), "DC:A6:32:0B:1C:FF");
    }

    #[test]
    fn test_wire_order_is_reversed() {
        let addr = BdAddr::from_wire([0xFF, 0x1C, 0x0B, 0x32, 0xA6, 0xDC]);
        assert_eq!(addr.to_string(), "DC:A6:32:0B:1C:FF");
        assert_eq!(addr.to_wire(), [0xFF, 0x1C, 0x0B, 0x32, 0xA6, 0xDC]);
    }

    #[test]
    fn test_malformed_addresses_are_rejected() {
        for text in [
            "",
            "00:00:00:00:00",
            "00:00:00:00:00:00:00",
            "0:00:00:00:00:00",
            "GG:00:00:00:00:00",
            "000000000000",
        ] {
            assert_eq!(
                text.parse::<BdAddr>(),
                Err(AddressParseError(text.to_string())),
                "{text:?}"
            );
        }
    }
}
