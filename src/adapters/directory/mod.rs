//! Corporate directory lookups
//!
//! The resolver only needs one question answered: which mailbox belongs to a
//! personnel identifier. [`DirectoryLookup`] is that seam; [`LdapDirectory`]
//! answers it against an LDAP server.

pub mod ldap;

pub use ldap::LdapDirectory;

use crate::domain::Result;
use async_trait::async_trait;

/// Mailbox lookup by personnel identifier
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    /// Mailbox of the first matching entry, empty when nothing matches
    ///
    /// # Errors
    ///
    /// Returns `MdError::Lookup` when the directory is unreachable or the
    /// search fails
    async fn lookup_email(&self, identifier: &str) -> Result<String>;
}
