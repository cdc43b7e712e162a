//! Member account name type.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The name of a member account: a voter, candidate, custodian, proxy,
/// or one of the community's bookkeeping accounts.
///
/// Names are compared lexicographically; the ordering is used as the
/// deterministic tie-break across all ranked selections.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberName(String);

impl MemberName {
    /// Create a member name from a raw string.
    ///
    /// # Panics
    /// Panics if the string is empty.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(!s.is_empty(), "member name must not be empty");
        Self(s)
    }

    /// Return the raw name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MemberName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TypeError::EmptyName);
        }
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for MemberName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MemberName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for MemberName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
