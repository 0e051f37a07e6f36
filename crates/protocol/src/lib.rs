//! Shared vocabulary for dacdoc crates: check identifiers, check outcomes, anchor states and
//! the indicator assets that visualise them.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod href;

pub use href::resource_href;

/// Characters allowed in a check identifier besides ASCII alphanumerics.
pub const CHECK_ID_PUNCTUATION: &[char] = &['-', '_', '.'];

#[must_use]
pub fn is_check_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || CHECK_ID_PUNCTUATION.contains(&ch)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckIdError {
    #[error("check id is empty")]
    Empty,

    #[error("check id {id:?} contains invalid character {found:?}")]
    InvalidCharacter { id: String, found: char },
}

/// Identifier correlating an anchor with an external check.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct CheckId(String);

impl CheckId {
    pub fn new(raw: impl Into<String>) -> std::result::Result<Self, CheckIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(CheckIdError::Empty);
        }
        if let Some(found) = raw.chars().find(|ch| !is_check_id_char(*ch)) {
            return Err(CheckIdError::InvalidCharacter { id: raw, found });
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CheckId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CheckId {
    type Error = CheckIdError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CheckId {
    type Error = CheckIdError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CheckId> for String {
    fn from(value: CheckId) -> Self {
        value.0
    }
}

/// Result reported by an external check-evaluation capability.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Pass,
    Fail,
    Stale,
    /// The capability has no check registered under this identifier.
    Unknown,
}

impl CheckOutcome {
    #[must_use]
    pub const fn state(self) -> AnchorState {
        match self {
            Self::Pass => AnchorState::Passing,
            Self::Fail => AnchorState::Failing,
            Self::Stale => AnchorState::Stale,
            Self::Unknown => AnchorState::Indeterminate,
        }
    }
}

/// Resolution state of one anchor.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnchorState {
    #[default]
    Unresolved,
    Passing,
    Failing,
    Indeterminate,
    Stale,
}

impl AnchorState {
    #[must_use]
    pub const fn indicator(self) -> Indicator {
        match self {
            Self::Unresolved | Self::Indeterminate => Indicator::Grey,
            Self::Passing => Indicator::Green,
            Self::Stale => Indicator::Orange,
            Self::Failing => Indicator::Red,
        }
    }

    #[must_use]
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// One of the four fixed visual indicators.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Grey,
    Green,
    Orange,
    Red,
}

impl Indicator {
    pub const ALL: [Self; 4] = [Self::Grey, Self::Green, Self::Orange, Self::Red];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grey => "grey",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File names of the indicator assets inside the resource directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct IndicatorSet {
    pub grey: String,
    pub green: String,
    pub orange: String,
    pub red: String,
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self {
            grey: "grey.svg".to_string(),
            green: "green.svg".to_string(),
            orange: "orange.svg".to_string(),
            red: "red.svg".to_string(),
        }
    }
}

impl IndicatorSet {
    #[must_use]
    pub fn file_name(&self, indicator: Indicator) -> &str {
        match indicator {
            Indicator::Grey => &self.grey,
            Indicator::Green => &self.green,
            Indicator::Orange => &self.orange,
            Indicator::Red => &self.red,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Indicator, &str)> + '_ {
        Indicator::ALL
            .into_iter()
            .map(move |indicator| (indicator, self.file_name(indicator)))
    }
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
