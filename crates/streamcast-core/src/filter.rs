//! Stream filtering.
//!
//! A filter policy plus an ordered list of stream names decide which
//! streams produce visible notices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The rule determining which streams produce notices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    /// All streams pass.
    #[default]
    Open,
    /// Only listed streams pass.
    Whitelist,
    /// Listed streams are suppressed.
    Blacklist,
}

impl FilterPolicy {
    /// Get the policy name as used in settings and the admin API.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Whitelist => "whitelist",
            Self::Blacklist => "blacklist",
        }
    }

    /// Whether a stream passes this policy given the filter list.
    #[must_use]
    pub fn allows(&self, list: &FilterList, stream: &str) -> bool {
        match self {
            Self::Open => true,
            Self::Whitelist => list.contains(stream),
            Self::Blacklist => !list.contains(stream),
        }
    }
}

impl fmt::Display for FilterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a policy string is not one of the three values.
#[derive(Debug, Error)]
#[error("unknown filter policy: {0}")]
pub struct UnknownPolicy(pub String);

impl FromStr for FilterPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "whitelist" => Ok(Self::Whitelist),
            "blacklist" => Ok(Self::Blacklist),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Ordered, duplicate-free list of stream names.
///
/// Serializes as a plain JSON array, preserving insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterList(Vec<String>);

impl FilterList {
    /// Create an empty filter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a stream name is listed.
    #[must_use]
    pub fn contains(&self, stream: &str) -> bool {
        self.0.iter().any(|s| s == stream)
    }

    /// Add a stream name.
    ///
    /// Returns `false` if the name was already listed (nothing changes).
    pub fn add(&mut self, stream: impl Into<String>) -> bool {
        let stream = stream.into();
        if self.contains(&stream) {
            return false;
        }
        self.0.push(stream);
        true
    }

    /// Remove a stream name.
    ///
    /// Returns `false` if the name was not listed.
    pub fn remove(&mut self, stream: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s != stream);
        self.0.len() != before
    }

    /// Get the listed names in insertion order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Get the number of listed names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FilterList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut list = Self::new();
        for name in iter {
            list.add(name);
        }
        list
    }
}
