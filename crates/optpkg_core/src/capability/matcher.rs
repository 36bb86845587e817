//! Package family-name matching rules.
//!
//! A capability is backed by whichever declared package satisfies its matcher.
//! Matchers are plain data so they can come from config or be injected by the
//! host for tests.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Matching rule applied to a package family name.
#[derive(Clone)]
pub enum PackageMatcher {
    /// Family name contains the value.
    Contains(String),
    /// Family name equals the value.
    Exact(String),
    /// Family name matches the regular expression.
    Pattern(Regex),
    /// Host-supplied predicate.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl PackageMatcher {
    pub fn contains(value: impl Into<String>) -> Self {
        Self::Contains(value.into())
    }

    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    pub fn pattern(value: &str) -> Result<Self, MatcherError> {
        Regex::new(value)
            .map(Self::Pattern)
            .map_err(|err| MatcherError::InvalidPattern {
                pattern: value.to_string(),
                message: err.to_string(),
            })
    }

    pub fn predicate(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(predicate))
    }

    /// Returns whether `family_name` belongs to this capability.
    pub fn matches(&self, family_name: &str) -> bool {
        match self {
            Self::Contains(value) => family_name.contains(value.as_str()),
            Self::Exact(value) => family_name == value,
            Self::Pattern(regex) => regex.is_match(family_name),
            Self::Predicate(predicate) => predicate(family_name),
        }
    }
}

impl Debug for PackageMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contains(value) => f.debug_tuple("Contains").field(value).finish(),
            Self::Exact(value) => f.debug_tuple("Exact").field(value).finish(),
            Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Config-file form of a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub kind: MatcherKind,
    pub value: String,
}

/// Matcher kinds accepted in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    Contains,
    Exact,
    Pattern,
}

impl MatcherConfig {
    pub fn contains(value: impl Into<String>) -> Self {
        Self {
            kind: MatcherKind::Contains,
            value: value.into(),
        }
    }

    /// Builds the runtime matcher.
    ///
    /// # Errors
    /// - `EmptyValue` when `value` is blank.
    /// - `InvalidPattern` when a `pattern` value is not a valid regex.
    pub fn build(&self) -> Result<PackageMatcher, MatcherError> {
        let value = self.value.trim();
        if value.is_empty() {
            return Err(MatcherError::EmptyValue);
        }
        match self.kind {
            MatcherKind::Contains => Ok(PackageMatcher::contains(value)),
            MatcherKind::Exact => Ok(PackageMatcher::exact(value)),
            MatcherKind::Pattern => PackageMatcher::pattern(value),
        }
    }
}

/// Matcher construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
    EmptyValue,
    InvalidPattern { pattern: String, message: String },
}

impl Display for MatcherError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyValue => write!(f, "matcher value must not be empty"),
            Self::InvalidPattern { pattern, message } => {
                write!(f, "matcher pattern `{pattern}` is invalid: {message}")
            }
        }
    }
}

impl Error for MatcherError {}
