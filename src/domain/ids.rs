//! Domain identifier types with validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable cross-system identifier of a User, Employee, Department, Position or Pshr
///
/// The identifier is issued by the upstream HR system and never generated
/// locally. Surrounding whitespace is stripped on construction so that two
/// GUIDs compare equal regardless of how the upstream padded them.
///
/// # Examples
///
/// ```
/// use mdsync::domain::ids::Guid;
/// use std::str::FromStr;
///
/// let guid = Guid::from_str(" 7d44b88c-4199-4bad-97dc-d78268e01398 ").unwrap();
/// assert_eq!(guid.as_str(), "7d44b88c-4199-4bad-97dc-d78268e01398");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Guid(String);

impl Guid {
    /// Creates a new Guid from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(Guid)` if the identifier is non-empty after trimming, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("GUID cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the GUID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Guid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Guid {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Guid> for String {
    fn from(guid: Guid) -> Self {
        guid.0
    }
}

impl AsRef<str> for Guid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Row identifier of an exchange record
pub type RecordId = i32;
