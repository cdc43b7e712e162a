//! Community (DAC) identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one community, the tenant scope for all custodian state.
///
/// Every table the engine keeps (config, candidates, votes, custodians,
/// pending payments) is keyed by a `CommunityId`; no state crosses scopes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommunityId(String);

impl CommunityId {
    /// Create a community id from a raw string.
    ///
    /// # Panics
    /// Panics if the string is empty.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(!s.is_empty(), "community id must not be empty");
        Self(s)
    }

    /// Return the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommunityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
