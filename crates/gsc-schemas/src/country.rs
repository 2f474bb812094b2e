use std::fmt;

use serde::{Deserialize, Serialize};

/// ISO 3166-1 user-assigned code used for "unknown country".
const UNSPECIFIED_CODE: &str = "ZZ";

/// Canonical country value.
///
/// Known countries are stored as an upper-case ISO 3166-1 alpha-2 code.
/// Free text that cannot be resolved maps to [`Country::Unspecified`], which
/// serializes as `"ZZ"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Country {
    Known([u8; 2]),
    Unspecified,
}

/// Returned when a string is not a two-letter ASCII country code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidCountryCode(pub String);

impl fmt::Display for InvalidCountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not an ISO 3166-1 alpha-2 country code", self.0)
    }
}

impl std::error::Error for InvalidCountryCode {}

impl Country {
    /// Parse an ISO alpha-2 code (case-insensitive). `"ZZ"` is unspecified.
    pub fn from_code(code: &str) -> Result<Self, InvalidCountryCode> {
        let trimmed = code.trim();
        let bytes = trimmed.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(InvalidCountryCode(code.to_string()));
        }
        let upper = [bytes[0].to_ascii_uppercase(), bytes[1].to_ascii_uppercase()];
        if &upper == UNSPECIFIED_CODE.as_bytes() {
            return Ok(Country::Unspecified);
        }
        Ok(Country::Known(upper))
    }

    pub fn code(&self) -> &str {
        match self {
            // Construction guarantees ASCII letters.
            Country::Known(code) => std::str::from_utf8(code).unwrap_or(UNSPECIFIED_CODE),
            Country::Unspecified => UNSPECIFIED_CODE,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Country::Known(_))
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for Country {
    type Error = InvalidCountryCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Country::from_code(&value)
    }
}

impl From<Country> for String {
    fn from(value: Country) -> Self {
        value.code().to_string()
    }
}
