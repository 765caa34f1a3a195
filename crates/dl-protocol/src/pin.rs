//! Pin identifiers

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a physical pin (BCM numbering on a Raspberry Pi)
///
/// Coordinators are inconsistent about whether they send pins as numbers
/// or strings, so deserialization accepts both `17` and `"17"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PinId(u8);

impl PinId {
    /// Create a new pin ID
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    /// Get the raw pin number
    pub const fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for PinId {
    fn from(number: u8) -> Self {
        Self(number)
    }
}

impl FromStr for PinId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u8>().map(Self)
    }
}

impl<'de> Deserialize<'de> for PinId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => u8::try_from(n)
                .map(PinId)
                .map_err(|_| serde::de::Error::custom(format!("pin {} out of range", n))),
            Raw::Text(s) => s
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid pin '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_from_number_or_string() {
        let a: PinId = serde_json::from_str("17").unwrap();
        let b: PinId = serde_json::from_str("\"17\"").unwrap();
        assert_eq!(a, PinId::new(17));
        assert_eq!(a, b);
    }

    #[test]
    fn test_pin_rejects_garbage() {
        assert!(serde_json::from_str::<PinId>("\"relay\"").is_err());
        assert!(serde_json::from_str::<PinId>("300").is_err());
        assert!(serde_json::from_str::<PinId>("-1").is_err());
    }

    #[test]
    fn test_pin_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(PinId::new(18), true);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"18":true}"#);
    }
}
