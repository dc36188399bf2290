use std::fmt;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// A raw on-chain integer amount paired with the decimals of the token it
/// was read from. Rendering is exact: `raw / 10^decimals` with no float step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedAmount {
    #[serde(with = "u256_dec")]
    pub raw: U256,
    pub decimals: u8,
}

impl NormalizedAmount {
    pub fn new(raw: U256, decimals: u8) -> Self {
        NormalizedAmount { raw, decimals }
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Express the same quantity in a token with `decimals` places.
    /// Scaling down truncates toward zero. `None` when the scaled amount
    /// does not fit in 256 bits.
    pub fn rescale(&self, decimals: u8) -> Option<NormalizedAmount> {
        Some(NormalizedAmount {
            raw: rescale(self.raw, self.decimals, decimals)?,
            decimals,
        })
    }
}

impl fmt::Display for NormalizedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_units(self.raw, self.decimals))
    }
}

/// Exact decimal rendering of `raw / 10^decimals`, trailing zeros trimmed.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let width = decimals as usize;
    if width == 0 {
        return digits;
    }

    let (int_part, frac_part) = if digits.len() > width {
        let (i, f) = digits.split_at(digits.len() - width);
        (i.to_string(), f.to_string())
    } else {
        ("0".to_string(), format!("{digits:0>width$}"))
    };

    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        int_part
    } else {
        format!("{int_part}.{frac}")
    }
}

/// Largest decimals value whose scale factor `10^decimals` fits in a U256.
pub const MAX_DECIMALS: u8 = 77;

pub fn pow10(exp: u8) -> Option<U256> {
    U256::from(10u64).checked_pow(U256::from(exp))
}

pub fn rescale(raw: U256, from_decimals: u8, to_decimals: u8) -> Option<U256> {
    if to_decimals >= from_decimals {
        raw.checked_mul(pow10(to_decimals - from_decimals)?)
    } else {
        // 10^exp past U256 range dwarfs any raw amount
        Some(match pow10(from_decimals - to_decimals) {
            Some(scale) => raw / scale,
            None => U256::ZERO,
        })
    }
}

/// Serde adapter: U256 as a base-10 string.
pub mod u256_dec {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}
