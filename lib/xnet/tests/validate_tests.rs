// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! End-to-end validation of complete plans.
//!
//! The base plan mirrors the two-environment deployment the model was
//! built for: an `azure` environment carrying the web workload and an
//! `aws` environment carrying the database, linked by a site-to-site
//! VPN between their gateway subnets.

use xnet::api::DiagKind;
use xnet::api::FirewallAction;
use xnet::api::PlanCfg;
use xnet::api::RuleSetCfg;
use xnet::api::SecurityRule;
use xnet::api::SubnetRole;
use xnet::tunnel;
use xnet::validate::validate;

fn rules(specs: &[&str]) -> Vec<SecurityRule> {
    specs.iter().map(|s| s.parse().unwrap()).collect()
}

fn base_plan() -> PlanCfg {
    let raw = r#"
        [[environments]]
        id = "azure"
        block = "10.0.0.0/16"

        [[environments.subnets]]
        name = "workload"
        block = "10.0.1.0/24"
        role = "private-workload"
        rule_set = "workload"

        [[environments.subnets]]
        name = "appgw"
        block = "10.0.2.0/24"
        role = "public"

        [[environments.subnets]]
        name = "gateway"
        block = "10.0.254.0/24"
        role = "gateway"
        rule_set = "vpn"

        [[environments]]
        id = "aws"
        block = "10.1.0.0/16"

        [[environments.subnets]]
        name = "public"
        block = "10.1.1.0/24"
        role = "gateway"
        rule_set = "vpn"

        [[environments.subnets]]
        name = "data-a"
        block = "10.1.10.0/24"
        role = "private-data"
        rule_set = "rds"

        [[environments.subnets]]
        name = "data-b"
        block = "10.1.11.0/24"
        role = "private-data"
        rule_set = "rds"

        [tunnel]
        shared_secret = "correct-horse-battery-staple"
        suite = "aes256-sha256"
        routing = "static"

        [[tunnel.sides]]
        env = "azure"
        advertised = ["10.1.0.0/16"]

        [[tunnel.sides]]
        env = "aws"
        advertised = ["10.0.0.0/16"]
    "#;

    // The rule sets are easier to read in rule grammar than in TOML.
    let mut cfg: PlanCfg = toml::from_str(raw).unwrap();
    cfg.rule_sets = vec![
        RuleSetCfg {
            name: "rds".to_string(),
            default_in: FirewallAction::Deny,
            default_out: FirewallAction::Allow,
            rules: rules(&[
                "name=pg-from-azure dir=in action=allow priority=100 \
                 protocol=tcp port=5432 src=subnet=10.0.0.0/16",
                "name=pg-from-vpc dir=in action=allow priority=110 \
                 protocol=tcp port=5432 src=subnet=10.1.0.0/16",
            ]),
        },
        RuleSetCfg {
            name: "vpn".to_string(),
            default_in: FirewallAction::Deny,
            default_out: FirewallAction::Allow,
            rules: rules(&[
                "name=ike dir=in action=allow priority=100 protocol=udp \
                 port=500",
                "name=nat-t dir=in action=allow priority=110 protocol=udp \
                 port=4500",
                "name=esp dir=in action=allow priority=120 protocol=esp",
            ]),
        },
        RuleSetCfg {
            name: "workload".to_string(),
            default_in: FirewallAction::Deny,
            default_out: FirewallAction::Allow,
            rules: rules(&[
                "name=http dir=in action=allow priority=100 protocol=tcp \
                 port=80 src=subnet=10.0.2.0/24",
                "name=https dir=in action=allow priority=110 protocol=tcp \
                 port=443",
                "name=ssh dir=in action=allow priority=120 protocol=tcp \
                 port=22 src=subnet=10.0.0.0/16",
                "name=pg-out dir=out action=allow priority=130 \
                 protocol=tcp port=5432 dst=subnet=10.1.0.0/16",
            ]),
        },
    ];

    cfg
}

#[test]
fn base_plan_is_valid() {
    let v = validate(&base_plan());
    assert!(v.is_valid(), "{:?}", v.diags());
}

#[test]
fn disjoint_env_blocks_required() {
    let mut cfg = base_plan();
    // 10.0.0.0/16 and 10.1.0.0/16 are disjoint; collapsing aws onto
    // azure's block must name both environments.
    cfg.environments[1].block = "10.0.0.0/16".parse().unwrap();

    let v = validate(&cfg);
    assert!(!v.is_valid());
    let conflict: Vec<_> = v
        .diags()
        .iter()
        .filter(|d| d.kind == DiagKind::Conflict)
        .collect();
    assert!(!conflict.is_empty());
    assert!(conflict[0].message.contains("environment `azure`"));
    assert!(conflict[0].message.contains("environment `aws`"));
}

#[test]
fn all_violations_reported_at_once() {
    let mut cfg = base_plan();
    // Introduce three independent problems; the validator must report
    // every one of them, not stop at the first.
    cfg.environments[1].block = "10.0.0.0/16".parse().unwrap();
    cfg.rule_sets[0].rules[1].priority = 100;
    cfg.tunnel.as_mut().unwrap().suite = "DES".to_string();

    let v = validate(&cfg);
    let kinds: Vec<DiagKind> = v.diags().iter().map(|d| d.kind).collect();
    assert!(kinds.contains(&DiagKind::Conflict));
    assert!(kinds.contains(&DiagKind::DuplicatePriority));
    assert!(kinds.contains(&DiagKind::UnsupportedCipherSuite));
}

#[test]
fn duplicate_priority_scenario() {
    let mut cfg = base_plan();
    cfg.rule_sets[0].rules[1].priority = 100;

    let v = validate(&cfg);
    let dup: Vec<_> = v
        .diags()
        .iter()
        .filter(|d| d.kind == DiagKind::DuplicatePriority)
        .collect();
    assert_eq!(dup.len(), 1);
    assert!(dup[0].message.contains("pg-from-azure"));
    assert!(dup[0].message.contains("pg-from-vpc"));
    assert!(dup[0].message.contains("100"));
}

#[test]
fn des_is_not_a_cipher_suite() {
    let mut cfg = base_plan();
    cfg.tunnel.as_mut().unwrap().suite = "DES".to_string();

    let v = validate(&cfg);
    assert_eq!(v.diags().len(), 1);
    assert_eq!(v.diags()[0].kind, DiagKind::UnsupportedCipherSuite);
}

#[test]
fn empty_shared_secret_rejected() {
    let mut cfg = base_plan();
    cfg.tunnel.as_mut().unwrap().shared_secret = String::new();

    let v = validate(&cfg);
    assert_eq!(v.diags().len(), 1);
    assert_eq!(v.diags()[0].kind, DiagKind::MissingSharedSecret);
}

#[test]
fn validation_is_idempotent() {
    let cfg = {
        let mut cfg = base_plan();
        // A thoroughly broken plan produces several diagnostics...
        cfg.environments[1].block = "10.0.0.0/16".parse().unwrap();
        cfg.rule_sets[0].rules[1].priority = 100;
        cfg.tunnel.as_mut().unwrap().suite = "3DES".to_string();
        cfg
    };

    // ...and produces the same list, in the same order, every time.
    let first = validate(&cfg);
    let second = validate(&cfg);
    assert!(!first.is_valid());
    assert_eq!(first.diags(), second.diags());
}

#[test]
fn tunnel_is_symmetric_under_side_exchange() {
    let mut cfg = base_plan();
    assert!(validate(&cfg).is_valid());

    let swapped = cfg.tunnel.as_ref().unwrap().swapped();
    cfg.tunnel = Some(swapped);
    let v = validate(&cfg);
    assert!(v.is_valid(), "{:?}", v.diags());
}

#[test]
fn missing_peer_advertisement_is_asymmetric() {
    let mut cfg = base_plan();
    // azure stops advertising aws's block: dead tunnel, no local
    // error on either provider. The validator must catch it.
    cfg.tunnel.as_mut().unwrap().sides[0].advertised.clear();

    let v = validate(&cfg);
    assert_eq!(v.diags().len(), 1);
    assert_eq!(v.diags()[0].kind, DiagKind::AsymmetricTunnel);
    assert!(v.diags()[0].message.contains("`azure`"));
    assert!(v.diags()[0].message.contains("10.1.0.0/16"));
}

#[test]
fn stale_advertisement_after_renumber_is_asymmetric() {
    let mut cfg = base_plan();
    // aws renumbers its VPC but azure's static route still points at
    // the old block.
    cfg.environments[1].block = "10.2.0.0/16".parse().unwrap();
    for sub in &mut cfg.environments[1].subnets {
        let old = sub.block.to_string().replace("10.1.", "10.2.");
        sub.block = old.parse().unwrap();
    }
    // aws's own rule sets and advertisements updated...
    cfg.tunnel.as_mut().unwrap().sides[1].advertised =
        vec!["10.0.0.0/16".parse().unwrap()];

    let v = validate(&cfg);
    assert!(!v.is_valid());
    let kinds: Vec<DiagKind> = v.diags().iter().map(|d| d.kind).collect();
    assert!(kinds.contains(&DiagKind::AsymmetricTunnel));
}

#[test]
fn covering_supernet_is_fine() {
    let mut cfg = base_plan();
    // Renumber azure out of 10/8 so a supernet advertisement toward
    // aws cannot touch azure's own space.
    cfg.environments[0].block = "192.168.0.0/16".parse().unwrap();
    for (sub, block) in cfg.environments[0].subnets.iter_mut().zip([
        "192.168.1.0/24",
        "192.168.2.0/24",
        "192.168.254.0/24",
    ]) {
        sub.block = block.parse().unwrap();
    }
    {
        let tun = cfg.tunnel.as_mut().unwrap();
        // Advertising a supernet of the peer block is explicitly
        // allowed, as long as it stays clear of the local gateway
        // subnet.
        tun.sides[0].advertised = vec!["10.0.0.0/8".parse().unwrap()];
        tun.sides[1].advertised = vec!["192.168.0.0/16".parse().unwrap()];
    }

    let v = validate(&cfg);
    assert!(v.is_valid(), "{:?}", v.diags());
}

#[test]
fn supernet_swallowing_own_gateway_rejected() {
    let mut cfg = base_plan();
    // 10.0.0.0/8 covers the peer, but also this side's own gateway
    // subnet 10.0.254.0/24 -- the tunnel endpoint would route into
    // the tunnel.
    cfg.tunnel.as_mut().unwrap().sides[0].advertised =
        vec!["10.0.0.0/8".parse().unwrap()];

    let v = validate(&cfg);
    assert!(!v.is_valid());
    assert!(v
        .diags()
        .iter()
        .any(|d| d.kind == DiagKind::AsymmetricTunnel
            && d.message.contains("gateway subnet")));
}

#[test]
fn gateway_role_must_be_unique() {
    let mut cfg = base_plan();
    cfg.environments[0].subnets[1].role = SubnetRole::Gateway;

    let v = validate(&cfg);
    let dup: Vec<_> = v
        .diags()
        .iter()
        .filter(|d| d.kind == DiagKind::DuplicateGatewayRole)
        .collect();
    assert_eq!(dup.len(), 1);
    assert!(dup[0].message.contains("`azure`"));
}

#[test]
fn tunnel_env_without_gateway() {
    let mut cfg = base_plan();
    cfg.environments[0].subnets[2].role = SubnetRole::PrivateWorkload;

    let v = validate(&cfg);
    assert!(!v.is_valid());
    let kinds: Vec<DiagKind> = v.diags().iter().map(|d| d.kind).collect();
    assert!(kinds.contains(&DiagKind::MissingGatewayRole));
}

#[test]
fn subnet_outside_parent_block() {
    let mut cfg = base_plan();
    cfg.environments[0].subnets[0].block = "192.168.1.0/24".parse().unwrap();

    let v = validate(&cfg);
    assert!(!v.is_valid());
    assert_eq!(v.diags()[0].kind, DiagKind::OutOfBounds);
    assert!(v.diags()[0].message.contains("azure/workload"));
}

#[test]
fn dangling_rule_set_reference() {
    let mut cfg = base_plan();
    cfg.environments[1].subnets[1].rule_set = Some("postgres".to_string());

    let v = validate(&cfg);
    assert_eq!(v.diags().len(), 1);
    assert_eq!(v.diags()[0].kind, DiagKind::UnresolvedReference);
    assert!(v.diags()[0].message.contains("`postgres`"));
}

#[test]
fn bgp_requires_parameters_on_both_sides() {
    let mut cfg = base_plan();
    {
        let tun = cfg.tunnel.as_mut().unwrap();
        tun.routing = "bgp".parse().unwrap();
        tun.sides[0].bgp = Some(xnet::api::BgpPeerCfg {
            asn: 65000,
            peering_addr: "10.0.254.4".parse().unwrap(),
        });
        // aws side forgot its BGP settings.
    }

    let v = validate(&cfg);
    assert!(!v.is_valid());
    assert!(v
        .diags()
        .iter()
        .any(|d| d.kind == DiagKind::InvalidBgpPeering
            && d.message.contains("`aws`")));
}

#[test]
fn bgp_asn_clash_rejected() {
    let mut cfg = base_plan();
    {
        let tun = cfg.tunnel.as_mut().unwrap();
        tun.routing = "bgp".parse().unwrap();
        tun.sides[0].bgp = Some(xnet::api::BgpPeerCfg {
            asn: 65000,
            peering_addr: "10.0.254.4".parse().unwrap(),
        });
        tun.sides[1].bgp = Some(xnet::api::BgpPeerCfg {
            asn: 65000,
            peering_addr: "10.1.1.4".parse().unwrap(),
        });
    }

    let v = validate(&cfg);
    assert!(!v.is_valid());
    assert!(v
        .diags()
        .iter()
        .any(|d| d.kind == DiagKind::InvalidBgpPeering
            && d.message.contains("65000")));
}

#[test]
fn bgp_peering_addr_outside_gateway_subnet() {
    let mut cfg = base_plan();
    {
        let tun = cfg.tunnel.as_mut().unwrap();
        tun.routing = "bgp".parse().unwrap();
        tun.sides[0].bgp = Some(xnet::api::BgpPeerCfg {
            asn: 65000,
            // Inside the workload subnet, not the gateway subnet.
            peering_addr: "10.0.1.4".parse().unwrap(),
        });
        tun.sides[1].bgp = Some(xnet::api::BgpPeerCfg {
            asn: 65001,
            peering_addr: "10.1.1.4".parse().unwrap(),
        });
    }

    let v = validate(&cfg);
    assert!(!v.is_valid());
    assert!(v
        .diags()
        .iter()
        .any(|d| d.kind == DiagKind::InvalidBgpPeering
            && d.message.contains("10.0.1.4")));
}

#[test]
fn valid_bgp_tunnel() {
    let mut cfg = base_plan();
    {
        let tun = cfg.tunnel.as_mut().unwrap();
        tun.routing = "bgp".parse().unwrap();
        tun.sides[0].advertised.clear();
        tun.sides[1].advertised.clear();
        tun.sides[0].bgp = Some(xnet::api::BgpPeerCfg {
            asn: 65000,
            peering_addr: "10.0.254.4".parse().unwrap(),
        });
        tun.sides[1].bgp = Some(xnet::api::BgpPeerCfg {
            asn: 65001,
            peering_addr: "10.1.1.4".parse().unwrap(),
        });
    }

    let v = validate(&cfg);
    assert!(v.is_valid(), "{:?}", v.diags());
}

#[test]
fn derive_sides_only_from_valid_plans() {
    let cfg = base_plan();
    let sides = tunnel::derive_sides(&cfg).unwrap();

    assert_eq!(sides[0].env, "azure");
    assert_eq!(sides[1].env, "aws");
    assert_eq!(sides[0].peer_env, "aws");
    assert_eq!(sides[1].peer_env, "azure");

    // Both ends agree on everything shared, by construction.
    assert_eq!(sides[0].shared_secret, sides[1].shared_secret);
    assert_eq!(sides[0].suite, sides[1].suite);
    assert_eq!(sides[0].ike, sides[1].ike);
    assert_eq!(sides[0].sa_lifetime_secs, sides[1].sa_lifetime_secs);

    // Each side sees the other's gateway subnet as its peer.
    assert_eq!(sides[0].peer_gateway_subnet, sides[1].gateway_subnet);
    assert_eq!(sides[1].peer_gateway_subnet, sides[0].gateway_subnet);

    let mut broken = cfg;
    broken.tunnel.as_mut().unwrap().shared_secret = String::new();
    let err = tunnel::derive_sides(&broken).unwrap_err();
    assert!(err.iter().any(|d| d.kind == DiagKind::MissingSharedSecret));
}
