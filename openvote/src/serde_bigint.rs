//! Decimal-string serialization for big integers.
//!
//! Scalars and coordinates always travel as decimal-digit strings, never
//! as fixed-width binary, so different implementations cannot disagree on
//! sign or width. For use in `#[serde(with = "crate::serde_bigint")]`.

use num_bigint::BigInt;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_str_radix(10))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
where
    D: Deserializer<'de>,
{
    let digits = String::deserialize(deserializer)?;
    digits
        .parse::<BigInt>()
        .map_err(|e| D::Error::custom(format!("invalid decimal integer: {}", e)))
}
