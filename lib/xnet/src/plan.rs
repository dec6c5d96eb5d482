// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Plan resolution.
//!
//! The source configuration names things by string: a subnet names its
//! rule set, the tunnel names its environments. Before any semantic
//! check runs, those references are resolved into an explicit
//! dependency graph so that every later stage works with direct links
//! and a dangling name surfaces exactly once, here, instead of
//! cascading through the checks that depend on it.

use crate::api::DiagKind;
use crate::api::Diagnostic;
use crate::api::EnvironmentCfg;
use crate::api::PlanCfg;
use crate::api::RuleSetCfg;
use crate::api::TunnelCfg;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// The tunnel with its environment references resolved.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedTunnel<'a> {
    pub cfg: &'a TunnelCfg,
    pub envs: [&'a EnvironmentCfg; 2],
}

/// A plan with every internal reference resolved.
#[derive(Clone, Debug)]
pub struct ResolvedPlan<'a> {
    pub envs: Vec<&'a EnvironmentCfg>,
    pub rule_sets: BTreeMap<&'a str, &'a RuleSetCfg>,

    /// `None` when the plan has no tunnel, or when the tunnel's
    /// references did not resolve; in the latter case the resolution
    /// diagnostics carry the reason and tunnel checks are skipped.
    pub tunnel: Option<ResolvedTunnel<'a>>,
}

/// Resolve a plan's internal references.
pub fn resolve(cfg: &PlanCfg) -> (ResolvedPlan<'_>, Vec<Diagnostic>) {
    let mut diags = Vec::new();

    for (i, env) in cfg.environments.iter().enumerate() {
        if cfg.environments[..i].iter().any(|prev| prev.id == env.id) {
            diags.push(Diagnostic::new(
                DiagKind::UnresolvedReference,
                format!(
                    "environment id `{}` defined more than once; \
                     references are ambiguous",
                    env.id
                ),
            ));
        }
    }

    let mut rule_sets: BTreeMap<&str, &RuleSetCfg> = BTreeMap::new();
    for rs in &cfg.rule_sets {
        if rule_sets.insert(rs.name.as_str(), rs).is_some() {
            diags.push(Diagnostic::new(
                DiagKind::UnresolvedReference,
                format!(
                    "rule set `{}` defined more than once; references \
                     are ambiguous",
                    rs.name
                ),
            ));
        }
    }

    for env in &cfg.environments {
        for sub in &env.subnets {
            let Some(name) = &sub.rule_set else {
                continue;
            };

            if !rule_sets.contains_key(name.as_str()) {
                diags.push(Diagnostic::new(
                    DiagKind::UnresolvedReference,
                    format!(
                        "subnet `{}/{}` references unknown rule set `{}`",
                        env.id, sub.name, name
                    ),
                ));
            }
        }
    }

    let tunnel = cfg.tunnel.as_ref().and_then(|t| {
        let mut envs = [None, None];
        for (i, side) in t.sides.iter().enumerate() {
            envs[i] = cfg.environment(&side.env);
            if envs[i].is_none() {
                diags.push(Diagnostic::new(
                    DiagKind::UnresolvedReference,
                    format!(
                        "tunnel references unknown environment `{}`",
                        side.env
                    ),
                ));
            }
        }

        if t.sides[0].env == t.sides[1].env {
            diags.push(Diagnostic::new(
                DiagKind::UnresolvedReference,
                format!(
                    "tunnel must connect two distinct environments, \
                     but `{}` appears on both sides",
                    t.sides[0].env
                ),
            ));
            return None;
        }

        match envs {
            [Some(a), Some(b)] => {
                Some(ResolvedTunnel { cfg: t, envs: [a, b] })
            }
            _ => None,
        }
    });

    let envs = cfg.environments.iter().collect();
    (ResolvedPlan { envs, rule_sets, tunnel }, diags)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::FirewallAction;
    use crate::api::SubnetCfg;
    use crate::api::SubnetRole;
    use alloc::string::ToString;

    fn plan() -> PlanCfg {
        PlanCfg {
            environments: vec![
                EnvironmentCfg {
                    id: "azure".to_string(),
                    block: "10.0.0.0/16".parse().unwrap(),
                    subnets: vec![SubnetCfg {
                        name: "workload".to_string(),
                        block: "10.0.1.0/24".parse().unwrap(),
                        role: SubnetRole::PrivateWorkload,
                        rule_set: Some("workload".to_string()),
                    }],
                },
                EnvironmentCfg {
                    id: "aws".to_string(),
                    block: "10.1.0.0/16".parse().unwrap(),
                    subnets: vec![],
                },
            ],
            rule_sets: vec![RuleSetCfg {
                name: "workload".to_string(),
                default_in: FirewallAction::Deny,
                default_out: FirewallAction::Allow,
                rules: vec![],
            }],
            tunnel: None,
        }
    }

    #[test]
    fn clean_plan_resolves() {
        let cfg = plan();
        let (resolved, diags) = resolve(&cfg);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(resolved.envs.len(), 2);
        assert!(resolved.rule_sets.contains_key("workload"));
        assert!(resolved.tunnel.is_none());
    }

    #[test]
    fn dangling_rule_set_reference() {
        let mut cfg = plan();
        cfg.environments[0].subnets[0].rule_set = Some("nope".to_string());

        let (_, diags) = resolve(&cfg);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagKind::UnresolvedReference);
        assert!(diags[0].message.contains("azure/workload"));
        assert!(diags[0].message.contains("`nope`"));
    }

    #[test]
    fn duplicate_environment_id() {
        let mut cfg = plan();
        cfg.environments[1].id = "azure".to_string();
        cfg.environments[1].block = "10.2.0.0/16".parse().unwrap();

        let (_, diags) = resolve(&cfg);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagKind::UnresolvedReference);
        assert!(diags[0].message.contains("`azure`"));
    }
}
