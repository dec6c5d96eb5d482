// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Security rule set finalization and evaluation.
//!
//! A configured rule set arrives unordered. Finalization sorts it by
//! ascending priority and rejects priority collisions; evaluation
//! walks the sorted rules and returns the first matching rule's
//! action.

use crate::api::Decision;
use crate::api::DiagKind;
use crate::api::Diagnostic;
use crate::api::Direction;
use crate::api::FirewallAction;
use crate::api::Protocol;
use crate::api::RuleSetCfg;
use crate::api::SecurityRule;
use alloc::string::String;
use alloc::vec::Vec;
use core::net::IpAddr;

/// A rule set in evaluation order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuleSet {
    name: String,
    default_in: FirewallAction,
    default_out: FirewallAction,
    rules: Vec<SecurityRule>,
}

impl RuleSet {
    /// Sort the configured rules by ascending priority and verify the
    /// priorities are unique.
    ///
    /// Every colliding priority is reported, naming the priority and
    /// both rule names, before the call fails.
    pub fn finalize(cfg: &RuleSetCfg) -> Result<Self, Vec<Diagnostic>> {
        let mut rules = cfg.rules.clone();
        rules.sort_by_key(|r| r.priority);

        let diags: Vec<Diagnostic> = rules
            .windows(2)
            .filter(|w| w[0].priority == w[1].priority)
            .map(|w| {
                Diagnostic::new(
                    DiagKind::DuplicatePriority,
                    format!(
                        "rule set `{}`: rules `{}` and `{}` share \
                         priority {}",
                        cfg.name, w[0].name, w[1].name, w[0].priority
                    ),
                )
            })
            .collect();

        if !diags.is_empty() {
            return Err(diags);
        }

        Ok(Self {
            name: cfg.name.clone(),
            default_in: cfg.default_in,
            default_out: cfg.default_out,
            rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[SecurityRule] {
        &self.rules
    }

    /// The rule set's declared policy for flows no rule matches.
    pub fn default_for(&self, dir: Direction) -> FirewallAction {
        match dir {
            Direction::In => self.default_in,
            Direction::Out => self.default_out,
        }
    }

    /// Evaluate a flow against the rules: first match in ascending
    /// priority order wins.
    ///
    /// [`Decision::NoMatch`] means no rule applied; the caller's
    /// declared default policy governs. This function never folds the
    /// default in itself.
    pub fn decide(
        &self,
        dir: Direction,
        proto: Protocol,
        port: Option<u16>,
        src: IpAddr,
        dst: IpAddr,
    ) -> Decision {
        for rule in &self.rules {
            if rule.direction != dir {
                continue;
            }

            if rule.filters.matches(proto, port, src, dst) {
                return rule.action.into();
            }
        }

        Decision::NoMatch
    }

    /// Evaluate a flow and fold [`Decision::NoMatch`] into the rule
    /// set's explicit default policy for the direction.
    pub fn apply(
        &self,
        dir: Direction,
        proto: Protocol,
        port: Option<u16>,
        src: IpAddr,
        dst: IpAddr,
    ) -> FirewallAction {
        match self.decide(dir, proto, port, src, dst) {
            Decision::Allow => FirewallAction::Allow,
            Decision::Deny => FirewallAction::Deny,
            Decision::NoMatch => self.default_for(dir),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::string::ToString;

    fn rule(spec: &str) -> SecurityRule {
        spec.parse().unwrap()
    }

    fn rule_set(rules: &[&str]) -> RuleSetCfg {
        RuleSetCfg {
            name: "rds".to_string(),
            default_in: FirewallAction::Deny,
            default_out: FirewallAction::Allow,
            rules: rules.iter().map(|r| rule(r)).collect(),
        }
    }

    fn flow(src: &str, dst: &str) -> (IpAddr, IpAddr) {
        (src.parse().unwrap(), dst.parse().unwrap())
    }

    #[test]
    fn rules_sorted_by_priority() {
        let cfg = rule_set(&[
            "name=c dir=in action=deny priority=300",
            "name=a dir=in action=allow priority=100",
            "name=b dir=in action=allow priority=200",
        ]);

        let rs = RuleSet::finalize(&cfg).unwrap();
        let order: Vec<&str> =
            rs.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn duplicate_priority_names_both_rules() {
        let cfg = rule_set(&[
            "name=first dir=in action=allow priority=100",
            "name=second dir=in action=deny priority=100",
        ]);

        let diags = RuleSet::finalize(&cfg).unwrap_err();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagKind::DuplicatePriority);
        assert!(diags[0].message.contains("first"));
        assert!(diags[0].message.contains("second"));
        assert!(diags[0].message.contains("100"));
    }

    #[test]
    fn first_match_wins() {
        let cfg = rule_set(&[
            "name=deny-all dir=in action=deny priority=200 protocol=tcp",
            "name=pg dir=in action=allow priority=100 protocol=tcp \
             port=5432",
        ]);
        let rs = RuleSet::finalize(&cfg).unwrap();
        let (src, dst) = flow("10.0.1.9", "10.1.10.4");

        // The lower-priority (more important) allow rule matches
        // first, even though a deny rule also matches.
        assert_eq!(
            rs.decide(Direction::In, Protocol::TCP, Some(5432), src, dst),
            Decision::Allow
        );

        // A port the allow rule does not cover falls to the deny rule.
        assert_eq!(
            rs.decide(Direction::In, Protocol::TCP, Some(80), src, dst),
            Decision::Deny
        );
    }

    #[test]
    fn no_match_is_not_a_policy() {
        let cfg = rule_set(&[
            "name=pg dir=in action=allow priority=100 protocol=tcp \
             port=5432",
        ]);
        let rs = RuleSet::finalize(&cfg).unwrap();
        let (src, dst) = flow("10.0.1.9", "10.1.10.4");

        // UDP matches nothing: decide() reports that fact and apply()
        // folds in the declared default.
        assert_eq!(
            rs.decide(Direction::In, Protocol::UDP, Some(53), src, dst),
            Decision::NoMatch
        );
        assert_eq!(
            rs.apply(Direction::In, Protocol::UDP, Some(53), src, dst),
            FirewallAction::Deny
        );
        assert_eq!(
            rs.apply(Direction::Out, Protocol::UDP, Some(53), src, dst),
            FirewallAction::Allow
        );
    }

    #[test]
    fn direction_is_part_of_the_match() {
        let cfg = rule_set(&[
            "name=pg-in dir=in action=allow priority=100 protocol=tcp \
             port=5432",
        ]);
        let rs = RuleSet::finalize(&cfg).unwrap();
        let (src, dst) = flow("10.0.1.9", "10.1.10.4");

        assert_eq!(
            rs.decide(Direction::Out, Protocol::TCP, Some(5432), src, dst),
            Decision::NoMatch
        );
    }

    #[test]
    fn source_selector_respected() {
        let cfg = rule_set(&[
            "name=pg-peer dir=in action=allow priority=100 protocol=tcp \
             port=5432 src=subnet=10.0.0.0/16",
        ]);
        let rs = RuleSet::finalize(&cfg).unwrap();

        let (peer, dst) = flow("10.0.1.9", "10.1.10.4");
        assert_eq!(
            rs.decide(Direction::In, Protocol::TCP, Some(5432), peer, dst),
            Decision::Allow
        );

        let (stranger, dst) = flow("192.168.0.9", "10.1.10.4");
        assert_eq!(
            rs.decide(Direction::In, Protocol::TCP, Some(5432), stranger, dst),
            Decision::NoMatch
        );
    }
}
