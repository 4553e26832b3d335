// SPDX-License-Identifier: AGPL-3.0-or-later
//! Health-gated trigger
//!
//! Probes only the primary slot. When the primary is a standalone node that is
//! ready to be promoted, it fires a bare GET at the configured callback URL to
//! start an orchestration run elsewhere. The callback response is logged but
//! not interpreted.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::cluster::{keys, Credentials, SlotAddress};
use crate::config::{Config, TransportConfig};
use crate::deployment::{DeploymentApi, DeploymentClient};
use crate::error::{BootstrapError, Result};
use crate::orchestrator::{probe, NodeClassification, Slot};
use crate::settings::SettingsProvider;

/// Response to a fired callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResponse {
    pub status: u16,
    pub body: String,
}

/// Target invoked when the primary becomes eligible
#[async_trait]
pub trait Callback: Send + Sync {
    async fn invoke(&self) -> Result<CallbackResponse>;
}

/// Callback that issues a plain GET to a URL
pub struct HttpCallback {
    client: reqwest::Client,
    url: Url,
}

impl HttpCallback {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl Callback for HttpCallback {
    async fn invoke(&self) -> Result<CallbackResponse> {
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(CallbackResponse { status, body })
    }
}

/// Build the client used to invoke the callback
///
/// Shares the request timeout of the management transport but never its
/// certificate policy: the callback URL carries the function access key.
pub fn callback_client(transport: &TransportConfig) -> Result<reqwest::Client> {
    let transport = callback_transport(transport);
    let client = reqwest::ClientBuilder::new()
        .timeout(transport.request_timeout())
        .danger_accept_invalid_certs(transport.accept_invalid_certs)
        .build()?;
    Ok(client)
}

fn callback_transport(transport: &TransportConfig) -> TransportConfig {
    TransportConfig {
        accept_invalid_certs: false,
        ..transport.clone()
    }
}

/// What one trigger check did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The primary was eligible and the callback was invoked
    Fired(CallbackResponse),
    /// The primary was reachable but not eligible
    NotEligible(NodeClassification),
    /// The primary could not be probed
    Unreachable,
    /// The primary was eligible but the callback could not be invoked
    CallbackFailed(String),
}

/// Trigger that fires a callback once the primary is ready for promotion
pub struct HealthTrigger<'a> {
    api: &'a dyn DeploymentApi,
    callback: &'a dyn Callback,
    primary: SlotAddress,
}

impl<'a> HealthTrigger<'a> {
    pub fn new(api: &'a dyn DeploymentApi, callback: &'a dyn Callback, primary: SlotAddress) -> Self {
        Self {
            api,
            callback,
            primary,
        }
    }

    /// Probe the primary once and fire the callback if it is eligible
    pub async fn check_once(&self) -> TriggerOutcome {
        let classification =
            probe(self.api, &self.primary.ip, &self.primary.fqdn, Slot::Primary).await;

        match classification {
            NodeClassification::PrimaryEligible => {
                info!(ip = %self.primary.ip, "Primary is ready for promotion, invoking callback");
                match self.callback.invoke().await {
                    Ok(response) => {
                        info!(
                            status = response.status,
                            body = %response.body,
                            "Callback invoked"
                        );
                        TriggerOutcome::Fired(response)
                    }
                    Err(e) => {
                        warn!(error = %e, "Callback invocation failed");
                        TriggerOutcome::CallbackFailed(e.to_string())
                    }
                }
            }
            NodeClassification::Unreachable => {
                info!(ip = %self.primary.ip, "Primary is not reachable");
                TriggerOutcome::Unreachable
            }
            other => {
                info!(
                    ip = %self.primary.ip,
                    classification = %other,
                    "Primary does not meet the conditions for triggering a run"
                );
                TriggerOutcome::NotEligible(other)
            }
        }
    }

    /// Check the primary on a fixed interval until Ctrl-C
    pub async fn watch(&self, interval: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "Watching primary node");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_once().await;
                }
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Stopping watch");
                    return Ok(());
                }
            }
        }
    }
}

/// Everything the trigger needs, read from the settings store
pub struct TriggerSettings {
    pub credentials: Credentials,
    pub primary: SlotAddress,
    pub callback_url: Url,
}

impl TriggerSettings {
    /// Read the primary slot, credentials and callback URL
    pub fn load(settings: &dyn SettingsProvider) -> Result<Self> {
        let callback_url = Url::parse(&settings.get(keys::FUNCTION_URL)?)?;
        if callback_url.scheme() != "http" && callback_url.scheme() != "https" {
            return Err(BootstrapError::InvalidConfig {
                message: format!("callback URL must be http or https: {}", callback_url),
            });
        }

        Ok(Self {
            credentials: Credentials {
                username: settings.get(keys::ADMIN_USERNAME)?,
                password: settings.get(keys::ADMIN_PASSWORD)?,
            },
            primary: SlotAddress {
                ip: settings.get(keys::PRIMARY_IP)?,
                fqdn: settings.get(keys::PRIMARY_FQDN)?,
            },
            callback_url,
        })
    }

    /// Build the deployment client and callback for these settings
    pub fn connect(&self, config: &Config) -> Result<(DeploymentClient, HttpCallback)> {
        let client = DeploymentClient::new(
            &config.transport,
            self.primary.ip.clone(),
            self.credentials.clone(),
        )?;
        let callback = HttpCallback::new(
            callback_client(&config.transport)?,
            self.callback_url.clone(),
        );
        Ok((client, callback))
    }
}
