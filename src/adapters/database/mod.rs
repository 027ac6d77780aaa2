//! Store abstraction layer
//!
//! Trait-based access to the master data store, so the reconciler, exchange
//! queue and birthday aggregator can run against PostgreSQL or in-memory fakes.

pub mod factory;
pub mod traits;

pub use factory::{create_store, Stores};
pub use traits::{BirthdayStore, DirectoryQueryStore, ExchangeStore, MasterDataStore};

use crate::domain::{MdError, Result};

/// Picks the user a personnel code refers to
///
/// `candidates` are `(user_guid, user_code)` pairs whose code contains the
/// searched one. An exact match on the trimmed code wins; otherwise the code
/// must match exactly one user.
pub fn resolve_user_code(code: &str, candidates: &[(String, String)]) -> Result<String> {
    let code = code.trim();
    let exact: Vec<&String> = candidates
        .iter()
        .filter(|(_, candidate)| candidate.trim() == code)
        .map(|(guid, _)| guid)
        .collect();

    match (exact.as_slice(), candidates) {
        ([guid], _) => Ok((*guid).clone()),
        ([], []) => Err(MdError::NotFound(format!("user with code {code}"))),
        ([], [(guid, _)]) => Ok(guid.clone()),
        _ => Err(MdError::Validation(format!("code {code} is ambiguous"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(rows: &[(&str, &str)]) -> Vec<(String, String)> {
        rows.iter()
            .map(|(guid, code)| (guid.to_string(), code.to_string()))
            .collect()
    }

    #[test]
    fn test_single_partial_match_resolves() {
        let rows = candidates(&[("U1", "000100")]);
        assert_eq!(resolve_user_code("100", &rows).unwrap(), "U1");
    }

    #[test]
    fn test_exact_match_beats_partial_ones() {
        let rows = candidates(&[("U1", "100"), ("U2", "1"), ("U3", "210")]);
        assert_eq!(resolve_user_code(" 1 ", &rows).unwrap(), "U2");
    }

    #[test]
    fn test_several_partial_matches_are_ambiguous() {
        let rows = candidates(&[("U1", "100"), ("U2", "210")]);
        let err = resolve_user_code("1", &rows).unwrap_err();
        assert!(matches!(err, MdError::Validation(ref msg) if msg == "code 1 is ambiguous"));
    }

    #[test]
    fn test_no_match_is_not_found() {
        assert!(matches!(
            resolve_user_code("404", &[]),
            Err(MdError::NotFound(_))
        ));
    }
}
