//! CLI command implementations
//!
//! One module per subcommand; [`common`] holds the setup they share.

pub mod birthdays;
pub(crate) mod common;
pub mod deliver;
pub mod init;
pub mod observers;
pub mod ping;
pub mod query;
pub mod sync;
pub mod validate;
