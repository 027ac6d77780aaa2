//! LDAP implementation of [`DirectoryLookup`]

use super::DirectoryLookup;
use crate::config::DirectoryConfig;
use crate::domain::{MdError, Result};
use async_trait::async_trait;
use ldap3::{ldap_escape, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use secrecy::ExposeSecret;
use std::time::Duration;

const MAIL_NICKNAME: &str = "mailNickname";
const MAIL: &str = "mail";

/// Directory lookups over a fresh LDAP connection per query
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    async fn search(&self, identifier: &str) -> Result<String> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.timeout());
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url)
            .await
            .map_err(|e| {
                MdError::Lookup(format!("Failed to connect to {}: {}", self.config.url, e))
            })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(error = %e, "LDAP connection driver error");
            }
        });

        let result = async {
            let bind = ldap
                .with_timeout(self.timeout())
                .simple_bind(
                    &self.config.bind_dn,
                    self.config.bind_password.expose_secret().as_ref(),
                )
                .await
                .map_err(|e| MdError::Lookup(format!("LDAP bind failed: {e}")))?;
            if bind.rc != 0 {
                return Err(MdError::Lookup(format!(
                    "LDAP bind failed with code {}: {}",
                    bind.rc, bind.text
                )));
            }

            let filter = employee_filter(identifier);
            tracing::debug!(filter = %filter, base_dn = %self.config.base_dn, "Searching directory");

            let (entries, _) = ldap
                .with_timeout(self.timeout())
                .search(&self.config.base_dn, Scope::Subtree, &filter, vec![MAIL_NICKNAME, MAIL])
                .await
                .map_err(|e| MdError::Lookup(format!("LDAP search failed: {e}")))?
                .success()
                .map_err(|e| MdError::Lookup(format!("LDAP search failed: {e}")))?;

            let entries: Vec<SearchEntry> = entries.into_iter().map(SearchEntry::construct).collect();
            Ok::<String, MdError>(first_mailbox(&entries))
        }
        .await;

        if let Err(e) = ldap.unbind().await {
            tracing::warn!(error = %e, "Error during LDAP unbind");
        }
        if let Err(e) = driver.await {
            tracing::warn!(error = %e, "LDAP connection driver task failed");
        }

        result
    }
}

#[async_trait]
impl DirectoryLookup for LdapDirectory {
    async fn lookup_email(&self, identifier: &str) -> Result<String> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(String::new());
        }
        self.search(identifier).await
    }
}

/// `(employeeNumber=*<id>)`, matching numbers with any prefix
fn employee_filter(identifier: &str) -> String {
    format!("(employeeNumber=*{})", ldap_escape(identifier))
}

/// Mail of the first entry that also carries a mail nickname
fn first_mailbox(entries: &[SearchEntry]) -> String {
    entries
        .iter()
        .filter(|entry| first_value(entry, MAIL_NICKNAME).is_some())
        .find_map(|entry| first_value(entry, MAIL))
        .unwrap_or_default()
}

fn first_value(entry: &SearchEntry, attribute: &str) -> Option<String> {
    entry
        .attrs
        .get(attribute)
        .and_then(|values| values.first())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
