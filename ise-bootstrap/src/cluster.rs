// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cluster description
//!
//! [`ClusterConfig`] is read once from the settings store at the start of a
//! run and never changes afterwards. All string normalization (comma
//! splitting, trimming, blank role strings) happens here.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BootstrapError, Result};
use crate::settings::SettingsProvider;

/// Role that turns a PSN into a dedicated monitoring node
pub const PRIMARY_DEDICATED_MONITORING: &str = "PrimaryDedicatedMonitoring";
/// Role that turns a PSN into a dedicated monitoring node
pub const SECONDARY_DEDICATED_MONITORING: &str = "SecondaryDedicatedMonitoring";

/// Label families read from the settings store
pub mod labels {
    pub const PSN_FQDN: &str = "psn_fqdn";
    pub const PSN_ROLES: &str = "psn_roles";
    pub const PSN_SERVICES: &str = "psn_services";
    pub const PAN_ROLES: &str = "pan_roles";
    pub const PAN_SERVICES: &str = "pan_services";
}

/// Keys read from the settings store
pub mod keys {
    pub const ADMIN_USERNAME: &str = "admin_username";
    pub const ADMIN_PASSWORD: &str = "admin_password";
    pub const PRIMARY_FQDN: &str = "primary_fqdn";
    pub const SECONDARY_FQDN: &str = "secondary_fqdn";
    pub const PRIMARY_IP: &str = "primary_ip";
    pub const SECONDARY_IP: &str = "secondary_ip";
    pub const FUNCTION_URL: &str = "function_url";
}

/// Ordered set of role or service names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenList(Vec<String>);

impl TokenList {
    /// Parse a comma-separated list, trimming whitespace and dropping blanks
    /// and duplicates
    pub fn parse(raw: &str) -> Self {
        raw.split(',').collect()
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for TokenList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        for token in iter {
            let token = token.as_ref().trim();
            if !token.is_empty() && !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
        Self(tokens)
    }
}

impl fmt::Display for TokenList {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{}]", self.0.join(", "))
    }
}

/// Admin credential pair used for every management API call
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Address of one admin slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAddress {
    pub ip: String,
    pub fqdn: String,
}

/// Roles and services to assign to one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAssignment {
    pub fqdn: String,
    pub roles: TokenList,
    pub services: TokenList,
}

impl NodeAssignment {
    /// Whether the node is a dedicated monitoring node
    pub fn is_dedicated_monitoring(&self) -> bool {
        self.roles.contains(PRIMARY_DEDICATED_MONITORING)
            || self.roles.contains(SECONDARY_DEDICATED_MONITORING)
    }

    /// The assignment actually sent for PSN registration
    ///
    /// Dedicated monitoring nodes cannot host services, so their service list
    /// is always empty regardless of what was configured.
    pub fn for_psn_registration(&self) -> NodeAssignment {
        if self.is_dedicated_monitoring() {
            NodeAssignment {
                services: TokenList::empty(),
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }
}

/// Immutable description of the cluster for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    pub credentials: Credentials,
    pub primary: SlotAddress,
    pub secondary: SlotAddress,
    /// Secondary-slot promotions, in order
    pub secondaries: Vec<NodeAssignment>,
    /// PSN registrations, in order
    pub psns: Vec<NodeAssignment>,
}

impl ClusterConfig {
    /// Read the cluster description from the settings store
    ///
    /// `secondary_offset` is the index of the first `pan_roles`/`pan_services`
    /// entry that describes a secondary promotion; earlier entries are
    /// reserved for the primary.
    pub fn load(settings: &dyn SettingsProvider, secondary_offset: usize) -> Result<Self> {
        let credentials = Credentials {
            username: settings.get(keys::ADMIN_USERNAME)?,
            password: settings.get(keys::ADMIN_PASSWORD)?,
        };

        let primary = SlotAddress {
            ip: settings.get(keys::PRIMARY_IP)?,
            fqdn: settings.get(keys::PRIMARY_FQDN)?,
        };
        let secondary = SlotAddress {
            ip: settings.get(keys::SECONDARY_IP)?,
            fqdn: settings.get(keys::SECONDARY_FQDN)?,
        };

        let pan_roles = settings.list_by_label(labels::PAN_ROLES)?;
        let pan_services = settings.list_by_label(labels::PAN_SERVICES)?;
        if pan_roles.len() != pan_services.len() {
            return Err(BootstrapError::ConfigInconsistent {
                message: format!(
                    "{} has {} entries but {} has {}",
                    labels::PAN_ROLES,
                    pan_roles.len(),
                    labels::PAN_SERVICES,
                    pan_services.len()
                ),
            });
        }

        let secondaries = pan_roles
            .iter()
            .zip(pan_services.iter())
            .skip(secondary_offset)
            .map(|(roles, services)| NodeAssignment {
                fqdn: secondary.fqdn.clone(),
                roles: TokenList::parse(roles),
                services: TokenList::parse(services),
            })
            .collect();

        let psn_fqdns = settings.list_by_label(labels::PSN_FQDN)?;
        let psn_roles = settings.list_by_label(labels::PSN_ROLES)?;
        let psn_services = settings.list_by_label(labels::PSN_SERVICES)?;
        if psn_fqdns.len() != psn_roles.len() || psn_fqdns.len() != psn_services.len() {
            return Err(BootstrapError::ConfigInconsistent {
                message: format!(
                    "PSN lists differ in length: {} fqdns, {} role entries, {} service entries",
                    psn_fqdns.len(),
                    psn_roles.len(),
                    psn_services.len()
                ),
            });
        }

        let mut psns = Vec::with_capacity(psn_fqdns.len());
        for ((fqdn, roles), services) in psn_fqdns.iter().zip(&psn_roles).zip(&psn_services) {
            let fqdn = fqdn.trim();
            if fqdn.is_empty() {
                return Err(BootstrapError::ConfigInconsistent {
                    message: format!("PSN entry {} has an empty fqdn", psns.len()),
                });
            }
            psns.push(NodeAssignment {
                fqdn: fqdn.to_string(),
                roles: TokenList::parse(roles),
                services: TokenList::parse(services),
            });
        }

        Ok(Self {
            credentials,
            primary,
            secondary,
            secondaries,
            psns,
        })
    }
}
