// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node status probing and classification

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::deployment::model::{ROLE_PRIMARY_ADMIN, ROLE_STANDALONE};
use crate::deployment::{DeploymentApi, NodeStatus, NodeStatusReport};

/// Admin slot a node is probed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Primary,
    Secondary,
}

impl fmt::Display for Slot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Primary => write!(formatter, "primary"),
            Slot::Secondary => write!(formatter, "secondary"),
        }
    }
}

/// Eligibility derived from one live status probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeClassification {
    /// Standalone node holding the primary FQDN
    PrimaryEligible,
    /// Node already acting as primary administration node
    PrimaryAlreadyAdmin,
    /// Standalone node holding the secondary FQDN
    SecondaryEligible,
    /// Reachable, but in no state the orchestrator acts on
    NotReady,
    /// Status query failed
    Unreachable,
}

impl fmt::Display for NodeClassification {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NodeClassification::PrimaryEligible => "eligible-primary",
            NodeClassification::PrimaryAlreadyAdmin => "already-primary-admin",
            NodeClassification::SecondaryEligible => "eligible-secondary",
            NodeClassification::NotReady => "not-ready",
            NodeClassification::Unreachable => "unreachable",
        };
        write!(formatter, "{}", text)
    }
}

/// Classify a status report for the given slot
///
/// A connected node reporting `Standalone` under the expected FQDN is
/// eligible for the slot's role. A connected node reporting `PrimaryAdmin`
/// under the expected FQDN has already been promoted. Everything else is
/// not ready.
pub fn classify(report: &NodeStatusReport, expected_fqdn: &str, slot: Slot) -> NodeClassification {
    if report.status != NodeStatus::Connected || report.fqdn != expected_fqdn {
        return NodeClassification::NotReady;
    }

    if report.has_role(ROLE_STANDALONE) {
        match slot {
            Slot::Primary => NodeClassification::PrimaryEligible,
            Slot::Secondary => NodeClassification::SecondaryEligible,
        }
    } else if report.has_role(ROLE_PRIMARY_ADMIN) {
        NodeClassification::PrimaryAlreadyAdmin
    } else {
        NodeClassification::NotReady
    }
}

/// Query a node and classify it for a slot
///
/// Never fails: any transport or protocol error yields
/// [`NodeClassification::Unreachable`].
pub async fn probe(
    api: &dyn DeploymentApi,
    ip: &str,
    expected_fqdn: &str,
    slot: Slot,
) -> NodeClassification {
    match api.node_status(ip).await {
        Ok(report) => {
            let classification = classify(&report, expected_fqdn, slot);
            info!(
                ip = %ip,
                slot = %slot,
                fqdn = %report.fqdn,
                status = %report.status,
                roles = ?report.roles,
                classification = %classification,
                "Node probed"
            );
            classification
        }
        Err(e) => {
            warn!(ip = %ip, slot = %slot, error = %e, "Node status query failed");
            NodeClassification::Unreachable
        }
    }
}
