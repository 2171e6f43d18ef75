//! Lenient field decoders for the console API.
//!
//! The backend is inconsistent about scalar encoding: ids arrive as numbers on
//! some endpoints and strings on others, and pagination counters are sometimes
//! quoted. Everything is normalized to `String` ids and unsigned counts here so
//! the rest of the crate compares like with like.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    fn into_id(self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Str(s) => s.trim().to_string(),
        }
    }

    fn into_f64(self) -> Option<f64> {
        match self {
            Scalar::Int(n) => Some(n as f64),
            Scalar::Float(f) => Some(f),
            Scalar::Str(s) => s.trim().parse().ok(),
        }
    }
}

pub fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Scalar::deserialize(d).map(Scalar::into_id)
}

pub fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .map(Scalar::into_id)
        .filter(|id| !id.is_empty()))
}

pub fn de_amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .and_then(Scalar::into_f64)
        .unwrap_or_default())
}

pub fn de_count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .and_then(Scalar::into_f64)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u64)
        .unwrap_or_default())
}

pub fn de_opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .and_then(Scalar::into_f64)
        .filter(|n| *n >= 1.0)
        .map(|n| n as u32))
}
