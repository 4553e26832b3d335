// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP implementation of the deployment API

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

use super::model::{
    NodeDetailsResponse, NodeRegistration, NodeStatusReport, NODE_PATH, PRIMARY_PATH,
};
use super::DeploymentApi;
use crate::cluster::{Credentials, NodeAssignment};
use crate::config::TransportConfig;
use crate::error::{BootstrapError, Result};

const APPLICATION_JSON: &str = "application/json";

/// Build the HTTP client shared by every outbound call
///
/// Redirects are not followed and every request is bounded by the configured
/// timeout.
pub fn http_client(transport: &TransportConfig) -> Result<reqwest::Client> {
    let client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(transport.request_timeout())
        .danger_accept_invalid_certs(transport.accept_invalid_certs)
        .build()?;
    Ok(client)
}

/// Deployment API client bound to the primary node
///
/// Status queries go to whichever node is asked about; all mutations are
/// issued against the primary node's management endpoint.
pub struct DeploymentClient {
    inner: reqwest::Client,
    scheme: String,
    primary_ip: String,
    credentials: Credentials,
}

impl DeploymentClient {
    /// Create a client for the deployment rooted at `primary_ip`
    pub fn new(
        transport: &TransportConfig,
        primary_ip: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self> {
        Ok(Self {
            inner: http_client(transport)?,
            scheme: transport.scheme.clone(),
            primary_ip: primary_ip.into(),
            credentials,
        })
    }

    fn endpoint(&self, ip: &str, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}://{}{}", self.scheme, ip, path))?)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.inner
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, APPLICATION_JSON)
    }

    async fn post_mutation<B: serde::Serialize + ?Sized>(
        &self,
        operation: &str,
        ip: &str,
        path: &str,
        body: &B,
    ) -> Result<String> {
        let url = self.endpoint(ip, path)?;
        debug!(operation = %operation, url = %url, "Issuing deployment mutation");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::OK {
            info!(operation = %operation, status = status.as_u16(), "Deployment mutation accepted");
            Ok(text)
        } else {
            warn!(
                operation = %operation,
                status = status.as_u16(),
                body = %text,
                "Deployment mutation rejected"
            );
            Err(BootstrapError::MutationFailed {
                operation: operation.to_string(),
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

#[async_trait]
impl DeploymentApi for DeploymentClient {
    async fn node_status(&self, ip: &str) -> Result<NodeStatusReport> {
        let url = self.endpoint(ip, NODE_PATH)?;

        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| BootstrapError::NodeUnreachable {
                ip: ip.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BootstrapError::NodeUnreachable {
                ip: ip.to_string(),
                message: e.to_string(),
            })?;
        debug!(ip = %ip, status = status.as_u16(), body = %text, "Node status response");

        if status != StatusCode::OK {
            return Err(BootstrapError::NodeUnreachable {
                ip: ip.to_string(),
                message: format!("status {}", status.as_u16()),
            });
        }

        let parsed: NodeDetailsResponse =
            serde_json::from_str(&text).map_err(|e| BootstrapError::MalformedResponse {
                ip: ip.to_string(),
                message: e.to_string(),
            })?;

        let details = parsed.response.into_iter().next().ok_or_else(|| {
            BootstrapError::MalformedResponse {
                ip: ip.to_string(),
                message: "response contains no node entries".to_string(),
            }
        })?;

        Ok(NodeStatusReport::from_details(ip, details))
    }

    async fn promote_to_primary(&self, ip: &str) -> Result<String> {
        self.post_mutation("promote-primary", ip, PRIMARY_PATH, &serde_json::json!({}))
            .await
    }

    async fn promote_to_secondary(&self, node: &NodeAssignment) -> Result<String> {
        let body = NodeRegistration::new(
            node,
            &self.credentials.username,
            &self.credentials.password,
        );
        self.post_mutation("promote-secondary", &self.primary_ip, NODE_PATH, &body)
            .await
    }

    async fn register_psn(&self, node: &NodeAssignment) -> Result<String> {
        let body = NodeRegistration::new(
            node,
            &self.credentials.username,
            &self.credentials.password,
        );
        self.post_mutation("register-psn", &self.primary_ip, NODE_PATH, &body)
            .await
    }
}
