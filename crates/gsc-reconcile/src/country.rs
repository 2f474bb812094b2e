//! Free-text country resolution against an injected alias table.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use gsc_schemas::Country;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CountryTableError {
    InvalidCode(String),
    EmptyAlias { code: String },
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },
}

impl fmt::Display for CountryTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCode(code) => {
                write!(f, "country table key '{code}' is not an ISO 3166-1 alpha-2 code")
            }
            Self::EmptyAlias { code } => {
                write!(f, "country {code} has an alias that is empty after normalization")
            }
            Self::DuplicateAlias {
                alias,
                first,
                second,
            } => write!(
                f,
                "country alias '{alias}' maps to both {first} and {second}"
            ),
        }
    }
}

impl std::error::Error for CountryTableError {}

/// Resolves free text ("U.K.", "United States of America", "gb") to a
/// canonical [`Country`]. A pure function of the input and the table the
/// resolver was built with.
#[derive(Clone, Debug, Default)]
pub struct CountryResolver {
    by_alias: HashMap<String, Country>,
}

impl CountryResolver {
    /// Build from `code -> aliases`. Each code also resolves as itself.
    pub fn new(table: &BTreeMap<String, Vec<String>>) -> Result<Self, CountryTableError> {
        let mut by_alias: HashMap<String, Country> = HashMap::new();
        for (code, aliases) in table {
            let country = Country::from_code(code)
                .map_err(|_| CountryTableError::InvalidCode(code.clone()))?;
            let spellings = std::iter::once(code).chain(aliases.iter());
            for alias in spellings {
                let key = normalize(alias);
                if key.is_empty() {
                    return Err(CountryTableError::EmptyAlias {
                        code: country.code().to_string(),
                    });
                }
                match by_alias.get(&key) {
                    Some(existing) if *existing != country => {
                        return Err(CountryTableError::DuplicateAlias {
                            alias: alias.clone(),
                            first: existing.code().to_string(),
                            second: country.code().to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        by_alias.insert(key, country);
                    }
                }
            }
        }
        Ok(Self { by_alias })
    }

    /// Unrecognized text resolves to [`Country::Unspecified`].
    pub fn resolve(&self, free_text: &str) -> Country {
        self.by_alias
            .get(&normalize(free_text))
            .copied()
            .unwrap_or(Country::Unspecified)
    }

    /// Like [`resolve`](Self::resolve) but blank or absent input stays absent.
    pub fn resolve_opt(&self, free_text: Option<&str>) -> Option<Country> {
        free_text
            .filter(|s| !s.trim().is_empty())
            .map(|s| self.resolve(s))
    }

    pub fn len(&self) -> usize {
        self.by_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }
}

pub(crate) fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        match c {
            '.' | ',' | '\'' | '(' | ')' => {}
            '&' => out.push_str(" and "),
            '-' | '_' => out.push(' '),
            c => out.extend(c.to_lowercase()),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
