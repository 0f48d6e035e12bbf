//! Reader configuration.
//!
//! [`DbfReaderConfig`] can be built in code, deserialized with serde, or
//! assembled from a flat string property map ([`DbfOptions`]) such as the
//! `WITH (...)` options of a `CREATE SOURCE` statement:
//!
//! | Key | Type | Default |
//! |-----|------|---------|
//! | `batch.size` | positive integer | `2048` |
//! | `projection` | comma-separated field indices | all fields |
//! | `invalid.utf8` | `lossy` \| `null` | `lossy` |

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DbfError, DbfResult};
use crate::schema::DbfSchema;

/// Default number of rows per batch, matching a typical vector size.
pub const DEFAULT_BATCH_SIZE: usize = 2048;

const KEY_BATCH_SIZE: &str = "batch.size";
const KEY_PROJECTION: &str = "projection";
const KEY_INVALID_UTF8: &str = "invalid.utf8";

/// How text fields whose bytes are not valid UTF-8 are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Utf8Strategy {
    /// Replace invalid sequences with U+FFFD.
    #[default]
    Lossy,
    /// Emit null and count the cell as a parse error.
    Null,
}

str_enum!(Utf8Strategy, lowercase, "invalid.utf8",
    Lossy => "lossy", "replace";
    Null => "null");

/// A flat, string-keyed property map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbfOptions {
    properties: HashMap<String, String>,
}

impl DbfOptions {
    /// Creates an empty option map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Parses the value for `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::InvalidConfig`] if the value does not parse.
    pub fn get_parsed<T>(&self, key: &str) -> DbfResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| DbfError::InvalidConfig {
                    key: key.to_string(),
                    message: format!("cannot parse '{raw}': {e}"),
                })
            })
            .transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DbfOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Configuration for [`DbfReader`](crate::reader::DbfReader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbfReaderConfig {
    /// Rows per batch for iterator-driven reads. Default: 2048.
    pub batch_size: usize,

    /// Field indices to materialize, in output order. `None` reads every
    /// field. Unprojected fields are skipped without decoding.
    pub projection: Option<Vec<usize>>,

    /// Handling of text bytes that are not valid UTF-8. Default: `Lossy`.
    pub invalid_utf8: Utf8Strategy,
}

impl Default for DbfReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            projection: None,
            invalid_utf8: Utf8Strategy::default(),
        }
    }
}

impl DbfReaderConfig {
    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Restricts output to the fields at `indices`.
    #[must_use]
    pub fn with_projection(mut self, indices: Vec<usize>) -> Self {
        self.projection = Some(indices);
        self
    }

    /// Sets the invalid UTF-8 strategy.
    #[must_use]
    pub fn with_invalid_utf8(mut self, strategy: Utf8Strategy) -> Self {
        self.invalid_utf8 = strategy;
        self
    }

    /// Builds a config from a flat property map.
    ///
    /// Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::InvalidConfig`] if a known key has a malformed
    /// value or `batch.size` is zero.
    pub fn from_options(options: &DbfOptions) -> DbfResult<Self> {
        let batch_size = options
            .get_parsed::<usize>(KEY_BATCH_SIZE)?
            .unwrap_or(DEFAULT_BATCH_SIZE);

        let projection = options
            .get(KEY_PROJECTION)
            .map(parse_projection)
            .transpose()?;

        let invalid_utf8 = options
            .get(KEY_INVALID_UTF8)
            .map(str::parse::<Utf8Strategy>)
            .transpose()?
            .unwrap_or_default();

        let config = Self {
            batch_size,
            projection,
            invalid_utf8,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings that do not depend on a file.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::InvalidConfig`] if `batch_size` is zero.
    pub fn validate(&self) -> DbfResult<()> {
        if self.batch_size == 0 {
            return Err(DbfError::InvalidConfig {
                key: KEY_BATCH_SIZE.to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Checks the settings against a parsed schema.
    ///
    /// # Errors
    ///
    /// Returns [`DbfError::InvalidConfig`] if the config is invalid on its
    /// own, a projected index does not name a field, or a field is
    /// projected more than once.
    pub fn validate_for(&self, schema: &DbfSchema) -> DbfResult<()> {
        self.validate()?;
        let Some(projection) = &self.projection else {
            return Ok(());
        };
        let mut seen = vec![false; schema.len()];
        for &index in projection {
            let Some(slot) = seen.get_mut(index) else {
                return Err(DbfError::InvalidConfig {
                    key: KEY_PROJECTION.to_string(),
                    message: format!(
                        "field index {index} out of range (schema has {} fields)",
                        schema.len()
                    ),
                });
            };
            if std::mem::replace(slot, true) {
                return Err(DbfError::InvalidConfig {
                    key: KEY_PROJECTION.to_string(),
                    message: format!("field index {index} listed more than once"),
                });
            }
        }
        Ok(())
    }
}

fn parse_projection(raw: &str) -> DbfResult<Vec<usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>().map_err(|_| DbfError::InvalidConfig {
                key: KEY_PROJECTION.to_string(),
                message: format!("'{s}' is not a field index"),
            })
        })
        .collect()
}
