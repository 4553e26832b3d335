// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire types for the node deployment API

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cluster::{NodeAssignment, TokenList};

/// Path of the node status and node registration endpoint
pub const NODE_PATH: &str = "/api/v1/deployment/node";
/// Path of the primary promotion endpoint
pub const PRIMARY_PATH: &str = "/api/v1/deployment/primary";

/// Role reported by a node that has not joined any deployment
pub const ROLE_STANDALONE: &str = "Standalone";
/// Role reported by the primary administration node
pub const ROLE_PRIMARY_ADMIN: &str = "PrimaryAdmin";

/// Connection status reported by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Connected,
    Other(String),
}

impl From<String> for NodeStatus {
    fn from(value: String) -> Self {
        if value == "Connected" {
            NodeStatus::Connected
        } else {
            NodeStatus::Other(value)
        }
    }
}

impl From<NodeStatus> for String {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Connected => "Connected".to_string(),
            NodeStatus::Other(value) => value,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Connected => write!(formatter, "Connected"),
            NodeStatus::Other(value) => write!(formatter, "{}", value),
        }
    }
}

/// One node entry of the status response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetails {
    pub node_status: NodeStatus,
    #[serde(default)]
    pub roles: Vec<String>,
    pub fqdn: String,
}

/// Body of `GET /api/v1/deployment/node`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDetailsResponse {
    #[serde(default)]
    pub response: Vec<NodeDetails>,
}

/// Status of one node as observed by a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatusReport {
    pub ip: String,
    pub fqdn: String,
    pub status: NodeStatus,
    pub roles: Vec<String>,
}

impl NodeStatusReport {
    pub fn from_details(ip: &str, details: NodeDetails) -> Self {
        Self {
            ip: ip.to_string(),
            fqdn: details.fqdn,
            status: details.node_status,
            roles: details.roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Body of `POST /api/v1/deployment/node`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRegistration {
    pub allow_cert_import: bool,
    pub fqdn: String,
    pub user_name: String,
    pub password: String,
    pub roles: TokenList,
    pub services: TokenList,
}

impl NodeRegistration {
    pub fn new(node: &NodeAssignment, user_name: &str, password: &str) -> Self {
        Self {
            allow_cert_import: true,
            fqdn: node.fqdn.clone(),
            user_name: user_name.to_string(),
            password: password.to_string(),
            roles: node.roles.clone(),
            services: node.services.clone(),
        }
    }
}
