//! Downstream delivery transport

use crate::adapters::upstream::basic_auth_header;
use crate::config::{DownstreamConfig, DownstreamTarget};
use crate::domain::{DeliveryReason, MdError, Result, User};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use std::time::Duration;

/// Raw HTTP answer of a downstream target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one batch of subjects to the target of a delivery reason
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// PUTs `{"users": [...]}` and returns the raw response
    ///
    /// Transport failures (connect errors, timeouts) are returned as `Err`;
    /// any HTTP status is returned as `Ok`.
    async fn put_users(&self, reason: DeliveryReason, users: &[User]) -> Result<TransportResponse>;
}

#[derive(Serialize)]
struct UsersPayload<'a> {
    users: &'a [User],
}

/// reqwest-backed transport, one client per target so each keeps its timeout
pub struct HttpDeliveryTransport {
    hr_notify: (Client, DownstreamTarget),
    account_create: (Client, DownstreamTarget),
}

impl HttpDeliveryTransport {
    /// # Errors
    ///
    /// Returns `MdError::Configuration` when an HTTP client cannot be built
    pub fn new(config: &DownstreamConfig) -> Result<Self> {
        Ok(Self {
            hr_notify: (build_client(&config.hr_notify)?, config.hr_notify.clone()),
            account_create: (
                build_client(&config.account_create)?,
                config.account_create.clone(),
            ),
        })
    }

    fn target(&self, reason: DeliveryReason) -> &(Client, DownstreamTarget) {
        match reason {
            DeliveryReason::NotifyHr => &self.hr_notify,
            DeliveryReason::CreateAccount => &self.account_create,
        }
    }
}

fn build_client(target: &DownstreamTarget) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(target.timeout_seconds))
        .build()
        .map_err(|e| MdError::Configuration(format!("Failed to build HTTP client: {e}")))
}

#[async_trait]
impl DeliveryTransport for HttpDeliveryTransport {
    async fn put_users(&self, reason: DeliveryReason, users: &[User]) -> Result<TransportResponse> {
        let (client, target) = self.target(reason);

        let mut request = client
            .put(&target.url)
            .header("Content-Type", "application/json")
            .json(&UsersPayload { users });
        if let Some(auth) = basic_auth_header(&target.username, &target.password) {
            request = request.header("Authorization", auth);
        }

        tracing::debug!(%reason, url = %target.url, count = users.len(), "Sending delivery batch");

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
