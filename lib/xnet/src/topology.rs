// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Subnet topology: the partition of an environment's address block.

use crate::addr;
use crate::api::DiagKind;
use crate::api::Diagnostic;
use crate::api::EnvironmentCfg;
use crate::api::IpCidr;
use crate::api::PlanCfg;
use crate::api::SubnetRole;
use crate::api::subnet_id;
use alloc::string::String;
use alloc::vec::Vec;
use serde::Serialize;
use uuid::Uuid;

/// A subnet with its stable identifier assigned.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Subnet {
    /// Stable identifier: UUIDv5 of `<env>/<name>`, identical across
    /// validation runs of the same plan.
    pub id: Uuid,
    pub name: String,
    pub block: IpCidr,
    pub role: SubnetRole,
    pub rule_set: Option<String>,
}

/// One environment's assembled topology.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EnvTopology {
    pub env: String,
    pub block: IpCidr,
    pub subnets: Vec<Subnet>,
}

impl EnvTopology {
    /// The environment's gateway subnet, if it has exactly one or
    /// more; callers that need the tunnel use the first and rely on
    /// validation to reject plans with extras.
    pub fn gateway(&self) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.role.is_gateway())
    }

    pub fn subnet(&self, name: &str) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.name == name)
    }
}

/// Assemble one environment's topology, collecting every violation.
pub fn build(cfg: &EnvironmentCfg) -> (EnvTopology, Vec<Diagnostic>) {
    let mut diags = Vec::new();

    // Duplicate subnet names make the derived identifiers collide and
    // make rule-set attachment ambiguous.
    for (i, sub) in cfg.subnets.iter().enumerate() {
        if cfg.subnets[..i].iter().any(|prev| prev.name == sub.name) {
            diags.push(Diagnostic::new(
                DiagKind::UnresolvedReference,
                format!(
                    "subnet name `{}` defined more than once in \
                     environment `{}`",
                    sub.name, cfg.id
                ),
            ));
        }
    }

    for sub in &cfg.subnets {
        if !cfg.block.covers(&sub.block) {
            diags.push(Diagnostic::new(
                DiagKind::OutOfBounds,
                format!(
                    "subnet `{}/{}` ({}) is not contained in environment \
                     `{}` block ({})",
                    cfg.id, sub.name, sub.block, cfg.id, cfg.block
                ),
            ));
        }
    }

    let labels: Vec<String> = cfg
        .subnets
        .iter()
        .map(|s| format!("subnet `{}/{}`", cfg.id, s.name))
        .collect();
    let blocks: Vec<(&str, IpCidr)> = labels
        .iter()
        .map(String::as_str)
        .zip(cfg.subnets.iter().map(|s| s.block))
        .collect();
    diags.extend(addr::check_disjoint(&blocks));

    let gateways: Vec<&str> = cfg
        .gateway_subnets()
        .map(|s| s.name.as_str())
        .collect();
    if gateways.len() > 1 {
        diags.push(Diagnostic::new(
            DiagKind::DuplicateGatewayRole,
            format!(
                "environment `{}` has {} gateway subnets: {}",
                cfg.id,
                gateways.len(),
                gateways.join(", ")
            ),
        ));
    }

    let topo = EnvTopology {
        env: cfg.id.clone(),
        block: cfg.block,
        subnets: cfg
            .subnets
            .iter()
            .map(|s| Subnet {
                id: subnet_id(&cfg.id, &s.name),
                name: s.name.clone(),
                block: s.block,
                role: s.role,
                rule_set: s.rule_set.clone(),
            })
            .collect(),
    };

    (topo, diags)
}

/// Assemble every environment in declaration order.
pub fn build_all(cfg: &PlanCfg) -> (Vec<EnvTopology>, Vec<Diagnostic>) {
    let mut topos = Vec::with_capacity(cfg.environments.len());
    let mut diags = Vec::new();

    for env in &cfg.environments {
        let (topo, d) = build(env);
        topos.push(topo);
        diags.extend(d);
    }

    (topos, diags)
}
