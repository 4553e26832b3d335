// SPDX-License-Identifier: AGPL-3.0-or-later
//! Promotion plan
//!
//! The plan is decided once, from the two admin-slot classifications, before
//! any mutation is issued. Mutation results never change it.

use serde::Serialize;

use super::probe::NodeClassification;
use crate::cluster::{ClusterConfig, NodeAssignment};

/// Mutations one run will issue, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionPlan {
    /// Promote the primary-slot node and wait for it to settle
    pub promote_primary: bool,
    /// Secondary promotions to issue
    pub secondaries: Vec<NodeAssignment>,
    /// PSN registrations to issue, with their effective service lists
    pub psns: Vec<NodeAssignment>,
}

impl PromotionPlan {
    /// Decide which mutations to issue
    ///
    /// * primary promotion only when the primary slot is eligible;
    /// * secondary promotion when the primary is eligible or already admin,
    ///   and the secondary slot is eligible;
    /// * PSN registration whenever the primary is eligible or already admin.
    pub fn decide(
        primary: NodeClassification,
        secondary: NodeClassification,
        cluster: &ClusterConfig,
    ) -> Self {
        let primary_eligible = primary == NodeClassification::PrimaryEligible;
        let primary_admin = primary == NodeClassification::PrimaryAlreadyAdmin;
        let secondary_eligible = secondary == NodeClassification::SecondaryEligible;

        let secondaries = if (primary_eligible || primary_admin) && secondary_eligible {
            cluster.secondaries.clone()
        } else {
            Vec::new()
        };

        let psns = if primary_eligible || primary_admin {
            cluster
                .psns
                .iter()
                .map(NodeAssignment::for_psn_registration)
                .collect()
        } else {
            Vec::new()
        };

        Self {
            promote_primary: primary_eligible,
            secondaries,
            psns,
        }
    }

    /// Whether the plan issues no mutation at all
    pub fn is_empty(&self) -> bool {
        !self.promote_primary && self.secondaries.is_empty() && self.psns.is_empty()
    }

    /// Number of mutations the plan issues
    pub fn mutation_count(&self) -> usize {
        usize::from(self.promote_primary) + self.secondaries.len() + self.psns.len()
    }
}
