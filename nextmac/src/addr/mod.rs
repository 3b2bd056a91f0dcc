//! MAC address codec and the carry-propagating increment.
//!
//! Only the three vendor-assignable octets (indices 3..=5) ever change when
//! deriving candidates; the OUI in octets 0..=2 is fixed, except that private
//! pool addresses force the locally-administered nibble into octet 0.

use std::fmt;
use std::str::FromStr;

use nextmac_shared::constants::limits::MAC_STRING_LEN;
use nextmac_shared::errors::MacError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// First vendor-assignable octet; carries never propagate below it.
const FIRST_ASSIGNABLE_OCTET: usize = 3;

/// Low nibble of octet 0 for private addresses: locally administered, unicast.
const PRIVATE_NIBBLE: u8 = 0x02;

/// A six-octet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

/// Incrementing would carry out of the vendor-assignable octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("address range exhausted after {0}")]
pub struct RangeExhausted(pub MacAddress);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Whether the locally-administered bit of octet 0 is set.
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    /// This address moved into the private (locally administered) space.
    pub fn to_private(self) -> Self {
        let mut octets = self.0;
        octets[0] = (octets[0] & 0xF0) | PRIVATE_NIBBLE;
        Self(octets)
    }

    /// Copy of this address with the last octet replaced.
    pub fn with_last_octet(self, value: u8) -> Self {
        let mut octets = self.0;
        octets[5] = value;
        Self(octets)
    }

    /// Successor within the vendor-assignable octets.
    ///
    /// Octet 5 is incremented and wraps into octet 4, then octet 3. Wrapping
    /// past `xx:xx:xx:ff:ff:ff` fails instead of touching the OUI. For the
    /// private pool the locally-administered nibble is forced first.
    pub fn increment(self, kind: PoolKind) -> Result<Self, RangeExhausted> {
        let start = match kind {
            PoolKind::Global => self,
            PoolKind::Private => self.to_private(),
        };

        let mut octets = start.0;
        for index in (FIRST_ASSIGNABLE_OCTET..octets.len()).rev() {
            let (next, wrapped) = octets[index].overflowing_add(1);
            octets[index] = next;
            if !wrapped {
                return Ok(Self(octets));
            }
        }

        Err(RangeExhausted(self))
    }

    /// Structural check used for persisted strings: exactly 17 characters,
    /// hex digits with `:` at every third position.
    pub fn is_well_formed(s: &str) -> bool {
        s.len() == MAC_STRING_LEN
            && s.bytes().enumerate().all(|(i, b)| {
                if i % 3 == 2 {
                    b == b':'
                } else {
                    b.is_ascii_hexdigit()
                }
            })
    }
}

impl FromStr for MacAddress {
    type Err = MacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_well_formed(s) {
            return Err(MacError::Format(format!("'{}' is not a colon-hex MAC address", s)));
        }

        let mut octets = [0u8; 6];
        for (octet, pair) in octets.iter_mut().zip(s.split(':')) {
            *octet = u8::from_str_radix(pair, 16)
                .map_err(|e| MacError::Format(format!("bad octet '{}' in '{}': {}", pair, s, e)))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl Serialize for MacAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which address space a request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// Externally visible, bounded by the whitelist.
    Global,
    /// Locally administered, never quota-checked.
    Private,
}

impl PoolKind {
    pub fn from_global(is_global: bool) -> Self {
        if is_global {
            PoolKind::Global
        } else {
            PoolKind::Private
        }
    }
}

/// Which persisted pool a request belongs to. Each variant has its own
/// whitelist, registry and boot marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolVariant {
    #[default]
    Standard,
    /// The extended radio band (6G) pool.
    Extended,
}

impl PoolVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolVariant::Standard => "standard",
            PoolVariant::Extended => "extended",
        }
    }
}

impl fmt::Display for PoolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolVariant {
    type Err = MacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "std" => Ok(PoolVariant::Standard),
            "extended" | "6g" => Ok(PoolVariant::Extended),
            other => Err(MacError::Config(format!(
                "unknown pool variant '{}' (expected 'standard' or '6g')",
                other
            ))),
        }
    }
}
