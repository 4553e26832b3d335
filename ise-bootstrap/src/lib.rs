// SPDX-License-Identifier: AGPL-3.0-or-later
//! ISE bootstrap: promotes freshly installed identity-service nodes into a
//! deployment
//!
//! The controller polls the management API of each node and, once the
//! preconditions hold, issues the role-assignment calls that build a fixed
//! topology: one primary administration node, one secondary administration
//! node, and a set of policy service nodes (PSNs).
//!
//! # Features
//!
//! * **Orchestration run:** probe both admin slots, decide a plan, promote the
//!   primary, wait for it to settle, then promote the secondary and register PSNs
//! * **Health-gated trigger:** watch the primary and fire a callback once it is
//!   ready for promotion
//! * **Stateless recovery:** every run re-derives its plan from live node status

pub mod cluster;
pub mod config;
pub mod deployment;
pub mod error;
pub mod orchestrator;
pub mod settings;
pub mod trigger;

pub use cluster::ClusterConfig;
pub use config::Config;
pub use error::{BootstrapError, Result};
pub use orchestrator::RunOutcome;
