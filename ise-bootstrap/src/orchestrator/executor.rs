// SPDX-License-Identifier: AGPL-3.0-or-later
//! Promotion executor
//!
//! Probes both admin slots, decides the plan, then issues the mutations in
//! order: primary promotion, the settling wait, secondary promotions, PSN
//! registrations. Every mutation is attempted independently; a failure is
//! recorded and the run moves on.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::plan::PromotionPlan;
use super::probe::{probe, NodeClassification, Slot};
use crate::cluster::{ClusterConfig, NodeAssignment};
use crate::deployment::DeploymentApi;

/// Kind of deployment mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    PromotePrimary,
    PromoteSecondary,
    RegisterPsn,
}

impl fmt::Display for Operation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::PromotePrimary => write!(formatter, "promote-primary"),
            Operation::PromoteSecondary => write!(formatter, "promote-secondary"),
            Operation::RegisterPsn => write!(formatter, "register-psn"),
        }
    }
}

/// One mutation to issue
enum Mutation<'a> {
    PromotePrimary { ip: &'a str },
    PromoteSecondary(&'a NodeAssignment),
    RegisterPsn(&'a NodeAssignment),
}

impl Mutation<'_> {
    fn operation(&self) -> Operation {
        match self {
            Mutation::PromotePrimary { .. } => Operation::PromotePrimary,
            Mutation::PromoteSecondary(_) => Operation::PromoteSecondary,
            Mutation::RegisterPsn(_) => Operation::RegisterPsn,
        }
    }

    fn target(&self) -> &str {
        match self {
            Mutation::PromotePrimary { ip } => *ip,
            Mutation::PromoteSecondary(node) | Mutation::RegisterPsn(node) => node.fqdn.as_str(),
        }
    }
}

/// Outcome of one mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationStatus {
    Succeeded,
    Failed,
    /// Not issued (dry run)
    Skipped,
}

impl fmt::Display for MutationStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationStatus::Succeeded => write!(formatter, "succeeded"),
            MutationStatus::Failed => write!(formatter, "failed"),
            MutationStatus::Skipped => write!(formatter, "skipped"),
        }
    }
}

/// Result of issuing a single mutation
#[derive(Debug, Clone, Serialize)]
pub struct MutationRecord {
    pub operation: Operation,
    /// Node IP for primary promotion, node FQDN otherwise
    pub target: String,
    pub status: MutationStatus,
    /// Raw response body, error text, or dry-run note
    pub detail: Option<String>,
    pub duration_ms: u64,
}

/// Result of one orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub primary: NodeClassification,
    pub secondary: NodeClassification,
    pub plan: PromotionPlan,
    pub mutations: Vec<MutationRecord>,
    pub total_duration_ms: u64,
    pub mutations_succeeded: usize,
    pub mutations_failed: usize,
}

impl RunReport {
    /// Records of the mutations that failed
    pub fn failures(&self) -> impl Iterator<Item = &MutationRecord> {
        self.mutations
            .iter()
            .filter(|m| m.status == MutationStatus::Failed)
    }
}

/// Executor for one orchestration run
pub struct PromotionExecutor<'a> {
    api: &'a dyn DeploymentApi,
    settle_delay: Duration,
    /// Whether to run in dry-run mode (probe and plan only)
    dry_run: bool,
}

impl<'a> PromotionExecutor<'a> {
    /// Create a new executor
    pub fn new(api: &'a dyn DeploymentApi, settle_delay: Duration) -> Self {
        Self {
            api,
            settle_delay,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Probe the primary and secondary slots
    ///
    /// Failures are isolated per node.
    pub async fn probe_admin_slots(
        &self,
        cluster: &ClusterConfig,
    ) -> (NodeClassification, NodeClassification) {
        let primary = probe(
            self.api,
            &cluster.primary.ip,
            &cluster.primary.fqdn,
            Slot::Primary,
        )
        .await;
        let secondary = probe(
            self.api,
            &cluster.secondary.ip,
            &cluster.secondary.fqdn,
            Slot::Secondary,
        )
        .await;
        (primary, secondary)
    }

    /// Probe, plan, and issue every planned mutation
    pub async fn execute(&self, cluster: &ClusterConfig) -> RunReport {
        let start_time = Instant::now();

        let (primary, secondary) = self.probe_admin_slots(cluster).await;
        let plan = PromotionPlan::decide(primary, secondary, cluster);

        info!(
            primary = %primary,
            secondary = %secondary,
            promote_primary = plan.promote_primary,
            secondaries = plan.secondaries.len(),
            psns = plan.psns.len(),
            dry_run = self.dry_run,
            "Promotion plan decided"
        );

        let mut mutations = Vec::with_capacity(plan.mutation_count());

        if plan.promote_primary {
            let issued_at = Instant::now();
            mutations.push(
                self.issue(Mutation::PromotePrimary {
                    ip: &cluster.primary.ip,
                })
                .await,
            );
            self.settle(issued_at).await;
        }

        for node in &plan.secondaries {
            mutations.push(self.issue(Mutation::PromoteSecondary(node)).await);
        }

        if !plan.psns.is_empty() {
            info!(count = plan.psns.len(), "Starting PSN registration");
        }
        for node in &plan.psns {
            mutations.push(self.issue(Mutation::RegisterPsn(node)).await);
        }

        let mutations_succeeded = mutations
            .iter()
            .filter(|m| m.status == MutationStatus::Succeeded)
            .count();
        let mutations_failed = mutations
            .iter()
            .filter(|m| m.status == MutationStatus::Failed)
            .count();
        let total_duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            duration_ms = total_duration_ms,
            succeeded = mutations_succeeded,
            failed = mutations_failed,
            "Orchestration run completed"
        );

        RunReport {
            primary,
            secondary,
            plan,
            mutations,
            total_duration_ms,
            mutations_succeeded,
            mutations_failed,
        }
    }

    /// Sleep until the settle budget, measured from `issued_at`, is spent
    async fn settle(&self, issued_at: Instant) {
        if self.dry_run {
            debug!("Skipping settling wait in dry-run mode");
            return;
        }

        let remaining = self.settle_delay.saturating_sub(issued_at.elapsed());
        if remaining.is_zero() {
            return;
        }

        info!(
            remaining_secs = remaining.as_secs_f64(),
            "Waiting for the primary node to settle"
        );
        tokio::time::sleep(remaining).await;
    }

    /// Issue a single mutation and record its outcome
    async fn issue(&self, mutation: Mutation<'_>) -> MutationRecord {
        let operation = mutation.operation();
        let target = mutation.target().to_string();

        if self.dry_run {
            info!(operation = %operation, target = %target, "[DRY RUN] Would issue mutation");
            return MutationRecord {
                operation,
                target,
                status: MutationStatus::Skipped,
                detail: Some(format!("[DRY RUN] Would {}", operation)),
                duration_ms: 0,
            };
        }

        if let Mutation::RegisterPsn(node) | Mutation::PromoteSecondary(node) = &mutation {
            debug!(
                operation = %operation,
                fqdn = %node.fqdn,
                roles = %node.roles,
                services = %node.services,
                "Issuing mutation"
            );
        }

        let start_time = Instant::now();
        let result = match mutation {
            Mutation::PromotePrimary { ip } => self.api.promote_to_primary(ip).await,
            Mutation::PromoteSecondary(node) => self.api.promote_to_secondary(node).await,
            Mutation::RegisterPsn(node) => self.api.register_psn(node).await,
        };
        let duration_ms = start_time.elapsed().as_millis() as u64;

        match result {
            Ok(body) => {
                info!(operation = %operation, target = %target, response = %body, "Mutation succeeded");
                MutationRecord {
                    operation,
                    target,
                    status: MutationStatus::Succeeded,
                    detail: Some(body),
                    duration_ms,
                }
            }
            Err(e) => {
                error!(operation = %operation, target = %target, error = %e, "Mutation failed");
                if operation == Operation::PromotePrimary {
                    warn!("Continuing with dependent mutations after failed primary promotion");
                }
                MutationRecord {
                    operation,
                    target,
                    status: MutationStatus::Failed,
                    detail: Some(e.to_string()),
                    duration_ms,
                }
            }
        }
    }
}
