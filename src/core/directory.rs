//! Contact address resolution through the corporate directory

use crate::adapters::directory::DirectoryLookup;
use crate::domain::User;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Which field of the user a candidate identifier came from
///
/// Variant order is the tie-break order within one employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CandidateKind {
    EmployeeCode,
    UserCode,
    TabNumber,
}

/// One identifier to look up, with its position in the tie-break order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub employee_index: usize,
    pub kind: CandidateKind,
    pub identifier: String,
}

/// Candidate identifiers of `user`, deduplicated, in tie-break order
pub fn candidates(user: &User) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (employee_index, employee) in user.employees.iter().enumerate() {
        let fields = [
            (CandidateKind::EmployeeCode, employee.code.as_str()),
            (CandidateKind::UserCode, user.code.as_str()),
            (CandidateKind::TabNumber, employee.tab_number.as_str()),
        ];
        for (kind, value) in fields {
            let identifier = value.trim();
            if identifier.is_empty() || !seen.insert(identifier.to_string()) {
                continue;
            }
            out.push(Candidate {
                employee_index,
                kind,
                identifier: identifier.to_string(),
            });
        }
    }
    out
}

/// Finds a user's mailbox by looking up every candidate identifier
#[derive(Clone)]
pub struct DirectoryResolver {
    directory: Arc<dyn DirectoryLookup>,
}

impl DirectoryResolver {
    pub fn new(directory: Arc<dyn DirectoryLookup>) -> Self {
        Self { directory }
    }

    /// Resolves the contact address of `user`, empty when nothing is found
    ///
    /// All lookups run concurrently and are all awaited. A failed lookup is
    /// logged and counts as empty. The first non-empty result in candidate
    /// order wins, whatever order the lookups complete in.
    pub async fn resolve_contact_address(&self, user: &User) -> String {
        let candidates = candidates(user);
        if candidates.is_empty() {
            return String::new();
        }

        let mut tasks = JoinSet::new();
        for (position, candidate) in candidates.iter().enumerate() {
            let directory = Arc::clone(&self.directory);
            let identifier = candidate.identifier.clone();
            tasks.spawn(async move {
                let result = directory.lookup_email(&identifier).await;
                (position, identifier, result)
            });
        }

        let mut found: Vec<Option<String>> = vec![None; candidates.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, _, Ok(email))) => {
                    let email = email.trim().to_string();
                    if !email.is_empty() {
                        found[position] = Some(email);
                    }
                }
                Ok((_, identifier, Err(e))) => {
                    tracing::warn!(
                        user = %user.guid,
                        identifier = %identifier,
                        error = %e,
                        "Directory lookup failed"
                    );
                }
                Err(e) => {
                    tracing::error!(user = %user.guid, error = %e, "Directory lookup task failed");
                }
            }
        }

        let email = found.into_iter().flatten().next().unwrap_or_default();
        tracing::debug!(
            user = %user.guid,
            candidates = candidates.len(),
            resolved = !email.is_empty(),
            "Contact address resolved"
        );
        email
    }
}
