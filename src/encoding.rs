//! Text decoding policy for field content.
//!
//! Field bytes are decoded as UTF-8 regardless of what leader position 9
//! claims; mislabelled records are common in large exports. What happens with
//! byte sequences that are not valid UTF-8 is chosen by the caller through
//! [`TextPolicy`] and applied while a record is assembled, never afterwards.

use crate::record::Value;
use encoding_rs::UTF_8;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How field bytes become [`Value`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPolicy {
    /// Invalid sequences make the record malformed.
    Strict,
    /// Invalid sequences are replaced with U+FFFD and reading continues (default).
    #[default]
    Lossy,
    /// Bytes are kept as-is; decoding is left to the caller.
    Raw,
}

impl TextPolicy {
    /// Decode `bytes` under this policy.
    ///
    /// # Errors
    ///
    /// Under [`TextPolicy::Strict`], returns the offset of the first byte
    /// that does not start a valid UTF-8 sequence.
    pub fn decode(self, bytes: &[u8]) -> Result<Value, usize> {
        match self {
            TextPolicy::Strict => std::str::from_utf8(bytes)
                .map(|s| Value::Text(s.to_owned()))
                .map_err(|e| e.valid_up_to()),
            TextPolicy::Lossy => {
                let (text, _had_errors) = UTF_8.decode_without_bom_handling(bytes);
                Ok(Value::Text(text.into_owned()))
            },
            TextPolicy::Raw => Ok(Value::Raw(bytes.to_vec())),
        }
    }
}

impl fmt::Display for TextPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextPolicy::Strict => "strict",
            TextPolicy::Lossy => "lossy",
            TextPolicy::Raw => "raw",
        })
    }
}

impl FromStr for TextPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(TextPolicy::Strict),
            "lossy" => Ok(TextPolicy::Lossy),
            "raw" => Ok(TextPolicy::Raw),
            other => Err(format!(
                "unknown text policy {other:?}, expected strict, lossy or raw"
            )),
        }
    }
}
