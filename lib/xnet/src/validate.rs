// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The topology validator.
//!
//! Runs every check over the complete plan and returns the aggregated
//! diagnostic list. The validator never stops at the first violation
//! and never partially applies anything; it is a pure function of the
//! plan, safe to run repeatedly as a pre-flight gate before real
//! provisioning.

use crate::addr;
use crate::api::Diagnostic;
use crate::api::IpCidr;
use crate::api::PlanCfg;
use crate::firewall::RuleSet;
use crate::plan;
use crate::topology;
use crate::tunnel;
use alloc::string::String;
use alloc::vec::Vec;

/// The validator's verdict: either the plan is valid, or here is
/// everything wrong with it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Validation {
    diags: Vec<Diagnostic>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.diags.is_empty()
    }

    /// The violations, in the deterministic order the walk found them:
    /// resolution first, then the address plan, then each environment
    /// and rule set in declaration order, the tunnel last.
    pub fn diags(&self) -> &[Diagnostic] {
        &self.diags
    }

    pub fn into_diags(self) -> Vec<Diagnostic> {
        self.diags
    }
}

/// Validate a complete plan.
pub fn validate(cfg: &PlanCfg) -> Validation {
    let (resolved, mut diags) = plan::resolve(cfg);

    // The address plan: every environment's top-level block must be
    // disjoint from every other's, or the tunnel cannot route.
    let labels: Vec<String> = resolved
        .envs
        .iter()
        .map(|e| format!("environment `{}`", e.id))
        .collect();
    let blocks: Vec<(&str, IpCidr)> = labels
        .iter()
        .map(|s| s.as_str())
        .zip(resolved.envs.iter().map(|e| e.block))
        .collect();
    diags.extend(addr::check_disjoint(&blocks));

    let (topos, topo_diags) = topology::build_all(cfg);
    diags.extend(topo_diags);

    for rs in &cfg.rule_sets {
        if let Err(d) = RuleSet::finalize(rs) {
            diags.extend(d);
        }
    }

    if let Some(t) = &resolved.tunnel {
        let (_, tunnel_diags) = tunnel::validate_tunnel(t, &topos);
        diags.extend(tunnel_diags);
    }

    Validation { diags }
}
