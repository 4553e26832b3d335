// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node deployment API
//!
//! Everything the orchestrator needs from a management node goes through the
//! [`DeploymentApi`] trait: one read-only status query and the three
//! deployment mutations. [`DeploymentClient`] is the HTTP implementation.

mod client;
pub mod model;

pub use client::{http_client, DeploymentClient};
pub use model::{NodeRegistration, NodeStatus, NodeStatusReport};

use async_trait::async_trait;

use crate::cluster::NodeAssignment;
use crate::error::Result;

/// Operations against the node management API
///
/// Mutations return the raw response body on HTTP 200 and
/// [`crate::BootstrapError::MutationFailed`] for any other status. No
/// implementation retries.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Query the deployment status reported by the node at `ip`
    async fn node_status(&self, ip: &str) -> Result<NodeStatusReport>;

    /// Promote the standalone node at `ip` to primary administration node
    async fn promote_to_primary(&self, ip: &str) -> Result<String>;

    /// Join a node to the deployment as secondary administration node
    async fn promote_to_secondary(&self, node: &NodeAssignment) -> Result<String>;

    /// Register a policy service node with the primary
    async fn register_psn(&self, node: &NodeAssignment) -> Result<String>;
}
