// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node promotion orchestration
//!
//! One run re-reads the settings store, re-probes both admin slots and
//! re-derives the plan from scratch; nothing is persisted between runs, so a
//! crashed run is recovered by simply running again.

mod executor;
mod plan;
mod probe;

pub use executor::{MutationRecord, MutationStatus, Operation, PromotionExecutor, RunReport};
pub use plan::PromotionPlan;
pub use probe::{classify, probe, NodeClassification, Slot};

#[cfg(test)]
pub(crate) use executor::tests as executor_tests;

use serde::Serialize;
use tracing::{error, info};

use crate::cluster::ClusterConfig;
use crate::config::Config;
use crate::deployment::{DeploymentApi, DeploymentClient};
use crate::error::Result;
use crate::settings::SettingsProvider;

/// Outcome of one orchestration run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum RunOutcome {
    /// Every issued mutation succeeded (possibly none were needed)
    Success { report: RunReport },
    /// The run completed but at least one mutation failed
    PartialFailure {
        report: RunReport,
        failures: Vec<String>,
    },
    /// The run did not start
    Fatal { cause: String },
}

impl RunOutcome {
    /// Classify a finished run
    pub fn from_report(report: RunReport) -> Self {
        let failures: Vec<String> = report
            .failures()
            .map(|m| {
                format!(
                    "{} {}: {}",
                    m.operation,
                    m.target,
                    m.detail.as_deref().unwrap_or("no detail")
                )
            })
            .collect();

        if failures.is_empty() {
            RunOutcome::Success { report }
        } else {
            RunOutcome::PartialFailure { report, failures }
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Success { report } | RunOutcome::PartialFailure { report, .. } => {
                Some(report)
            }
            RunOutcome::Fatal { .. } => None,
        }
    }

    /// Human-readable completion message
    pub fn message(&self) -> String {
        match self {
            RunOutcome::Success { report } if report.mutations.is_empty() => format!(
                "Node bootstrap run done: nothing to do (primary {}, secondary {})",
                report.primary, report.secondary
            ),
            RunOutcome::Success { report } => format!(
                "Node bootstrap run done: {} mutation(s) completed (primary {}, secondary {})",
                report.mutations.len(),
                report.primary,
                report.secondary
            ),
            RunOutcome::PartialFailure { report, failures } => format!(
                "Node bootstrap run done with errors: {} of {} mutation(s) failed",
                failures.len(),
                report.mutations.len()
            ),
            RunOutcome::Fatal { cause } => format!("Node bootstrap run did not start: {}", cause),
        }
    }

    /// Process exit code for the outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Success { .. } => 0,
            RunOutcome::PartialFailure { .. } => 1,
            RunOutcome::Fatal { .. } => 2,
        }
    }
}

/// Load and check everything a run needs before any node is contacted
pub fn prepare(config: &Config, settings: &dyn SettingsProvider) -> Result<ClusterConfig> {
    let cluster = ClusterConfig::load(settings, config.orchestration.secondary_assignment_offset)?;
    config.check_run_ceiling(cluster.secondaries.len(), cluster.psns.len())?;

    info!(
        primary = %cluster.primary.fqdn,
        secondary = %cluster.secondary.fqdn,
        secondaries = cluster.secondaries.len(),
        psns = cluster.psns.len(),
        "Cluster settings loaded"
    );
    Ok(cluster)
}

/// Run one orchestration against an already loaded cluster
pub async fn run_with_api(
    config: &Config,
    cluster: &ClusterConfig,
    api: &dyn DeploymentApi,
    dry_run: bool,
) -> RunOutcome {
    let executor =
        PromotionExecutor::new(api, config.orchestration.settle_delay()).with_dry_run(dry_run);
    RunOutcome::from_report(executor.execute(cluster).await)
}

/// Run one complete orchestration
///
/// Failures before the first probe (settings, sizing, client construction)
/// yield [`RunOutcome::Fatal`]; everything after that is reported per node.
pub async fn run(config: &Config, settings: &dyn SettingsProvider, dry_run: bool) -> RunOutcome {
    let cluster = match prepare(config, settings) {
        Ok(cluster) => cluster,
        Err(e) => {
            error!(error = %e, "Cannot start orchestration run");
            return RunOutcome::Fatal {
                cause: e.to_string(),
            };
        }
    };

    let client = match DeploymentClient::new(
        &config.transport,
        cluster.primary.ip.clone(),
        cluster.credentials.clone(),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Cannot build deployment client");
            return RunOutcome::Fatal {
                cause: e.to_string(),
            };
        }
    };

    run_with_api(config, &cluster, &client, dry_run).await
}

#[cfg(test)]
mod tests {
    use super::executor::tests::{
        cluster, RecordingApi, PRIMARY_FQDN, PRIMARY_IP, SECONDARY_FQDN, SECONDARY_IP,
    };
    use super::*;
    use crate::cluster::{keys, labels};
    use crate::settings::FileSettings;

    #[tokio::test(start_paused = true)]
    async fn test_outcome_success_without_mutations() {
        let api = RecordingApi::default();
        let outcome = run_with_api(&Config::default(), &cluster(), &api, false).await;

        assert_eq!(outcome.exit_code(), 0);
        assert!(outcome.message().contains("nothing to do"));
        assert!(outcome.message().contains("unreachable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_partial_failure() {
        let api = RecordingApi::default()
            .with_node(PRIMARY_IP, PRIMARY_FQDN, &["PrimaryAdmin"])
            .with_node(SECONDARY_IP, SECONDARY_FQDN, &["Standalone"])
            .rejecting("mnt-1.example.com");
        let outcome = run_with_api(&Config::default(), &cluster(), &api, false).await;

        assert_eq!(outcome.exit_code(), 1);
        match &outcome {
            RunOutcome::PartialFailure { report, failures } => {
                assert_eq!(report.mutations.len(), 4);
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("register-psn mnt-1.example.com"));
            }
            other => panic!("Expected PartialFailure, got {:?}", other),
        }
        assert!(outcome.message().contains("1 of 4"));
    }

    #[tokio::test]
    async fn test_missing_settings_are_fatal() {
        let settings = FileSettings::builder()
            .value(keys::ADMIN_USERNAME, "admin")
            .build();
        let outcome = run(&Config::default(), &settings, false).await;

        assert_eq!(outcome.exit_code(), 2);
        assert!(outcome.report().is_none());
        assert!(outcome.message().contains(keys::ADMIN_PASSWORD));
    }

    #[tokio::test]
    async fn test_run_ceiling_is_fatal() {
        let settings = FileSettings::builder()
            .value(keys::ADMIN_USERNAME, "admin")
            .value(keys::ADMIN_PASSWORD, "secret")
            .value(keys::PRIMARY_IP, PRIMARY_IP)
            .value(keys::PRIMARY_FQDN, PRIMARY_FQDN)
            .value(keys::SECONDARY_IP, SECONDARY_IP)
            .value(keys::SECONDARY_FQDN, SECONDARY_FQDN)
            .labeled(labels::PSN_FQDN, "psn-1.example.com")
            .labeled(labels::PSN_ROLES, "")
            .labeled(labels::PSN_SERVICES, "Session")
            .build();

        let mut config = Config::default();
        config.orchestration.run_ceiling_secs = Some(120);

        match run(&config, &settings, false).await {
            RunOutcome::Fatal { cause } => assert!(cause.contains("ceiling")),
            other => panic!("Expected Fatal, got {:?}", other),
        }
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = RunOutcome::Fatal {
            cause: "boom".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "fatal");
        assert_eq!(json["cause"], "boom");
    }
}
