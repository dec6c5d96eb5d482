// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Environments, subnets, and the top-level plan.
//!
//! A plan is a build-time artifact: constructed once from
//! configuration, validated, then handed to a provisioning tool. It is
//! never mutated by a running application.

use crate::firewall::RuleSetCfg;
use crate::ip::IpCidr;
use crate::tunnel::TunnelCfg;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Display;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Namespace for deriving stable plan-entity identifiers.
///
/// Identifiers are UUIDv5 values derived from this namespace and the
/// entity's `<env>/<subnet>` path, so re-validating an unchanged plan
/// always yields the same identifiers.
pub const PLAN_ID_NAMESPACE: Uuid =
    Uuid::from_u128(0x662e_1b9d_40ce_43f8_ae22_82a9_0d93_21d5);

/// Return the stable identifier for a subnet.
pub fn subnet_id(env: &str, subnet: &str) -> Uuid {
    let path = format!("{env}/{subnet}");
    Uuid::new_v5(&PLAN_ID_NAMESPACE, path.as_bytes())
}

/// The function a subnet serves within its environment.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetRole {
    /// Internet-facing: load balancers, application gateways.
    Public,

    /// Application workloads with no direct external exposure.
    PrivateWorkload,

    /// Data stores. Reachable only from inside the plan's address
    /// space.
    PrivateData,

    /// Hosts the VPN appliance terminating the cross-environment
    /// tunnel. At most one per environment; both target providers
    /// require a single, specifically named gateway subnet.
    Gateway,
}

impl SubnetRole {
    pub fn is_gateway(&self) -> bool {
        matches!(self, SubnetRole::Gateway)
    }
}

impl FromStr for SubnetRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private-workload" => Ok(Self::PrivateWorkload),
            "private-data" => Ok(Self::PrivateData),
            "gateway" => Ok(Self::Gateway),
            lower => Err(format!(
                "unexpected subnet role {lower} -- expected 'public', \
                 'private-workload', 'private-data', or 'gateway'"
            )),
        }
    }
}

impl Display for SubnetRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::PrivateWorkload => write!(f, "private-workload"),
            Self::PrivateData => write!(f, "private-data"),
            Self::Gateway => write!(f, "gateway"),
        }
    }
}

/// One requested subnet within an environment.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SubnetCfg {
    /// Name of the subnet, unique within its environment.
    pub name: String,

    /// The requested sub-block. Must lie inside the environment's
    /// block and be disjoint from every sibling.
    pub block: IpCidr,

    pub role: SubnetRole,

    /// Name of the attached rule set, if any. A subnet with no rule
    /// set has no firewall policy of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<String>,
}

/// One cloud environment: a deployment context with a top-level
/// address block partitioned into subnets.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EnvironmentCfg {
    /// Identifier for the environment, e.g. `"aws"` or `"azure"`.
    pub id: String,

    /// The environment's top-level address block. Must be disjoint
    /// from every other environment's block; the tunnel cannot route
    /// correctly otherwise.
    pub block: IpCidr,

    #[serde(default)]
    pub subnets: Vec<SubnetCfg>,
}

impl EnvironmentCfg {
    /// Iterate the subnets tagged with the gateway role.
    pub fn gateway_subnets(&self) -> impl Iterator<Item = &SubnetCfg> {
        self.subnets.iter().filter(|s| s.role.is_gateway())
    }
}

/// The complete declarative plan handed to the validator.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlanCfg {
    #[serde(default)]
    pub environments: Vec<EnvironmentCfg>,

    #[serde(default)]
    pub rule_sets: Vec<RuleSetCfg>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel: Option<TunnelCfg>,
}

impl PlanCfg {
    pub fn environment(&self, id: &str) -> Option<&EnvironmentCfg> {
        self.environments.iter().find(|e| e.id == id)
    }

    pub fn rule_set(&self, name: &str) -> Option<&RuleSetCfg> {
        self.rule_sets.iter().find(|rs| rs.name == name)
    }
}
