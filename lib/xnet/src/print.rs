// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Print plans and diagnostics in a human-friendly manner.
//!
//! This is mostly just a place to hang printing routines so that they
//! can be used by both xnetadm and integration tests.

use crate::api::Diagnostic;
use crate::api::PlanCfg;
use crate::topology;
use crate::tunnel::TunnelSideConfig;
use std::io::Write;
use tabwriter::TabWriter;

/// Print a plan summary.
pub fn print_plan(cfg: &PlanCfg) -> std::io::Result<()> {
    print_plan_into(&mut std::io::stdout(), cfg)
}

/// Print a plan summary into a given writer.
pub fn print_plan_into(
    writer: &mut impl Write,
    cfg: &PlanCfg,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    let (topos, _) = topology::build_all(cfg);

    for topo in &topos {
        writeln!(t, "Environment {} ({})", topo.env, topo.block)?;
        write_hr(&mut t)?;
        writeln!(t, "ID\tNAME\tROLE\tBLOCK\tRULE SET")?;
        for sub in &topo.subnets {
            writeln!(
                t,
                "{}\t{}\t{}\t{}\t{}",
                sub.id,
                sub.name,
                sub.role,
                sub.block,
                sub.rule_set.as_deref().unwrap_or("-"),
            )?;
        }
        writeln!(t)?;
        t.flush()?;
    }

    for rs in &cfg.rule_sets {
        writeln!(
            t,
            "Rule Set {} (default in: {}, default out: {})",
            rs.name, rs.default_in, rs.default_out
        )?;
        write_hr(&mut t)?;
        writeln!(t, "PRIO\tNAME\tDIR\tACTION\tFILTERS")?;
        let mut rules = rs.rules.clone();
        rules.sort_by_key(|r| r.priority);
        for r in &rules {
            writeln!(
                t,
                "{}\t{}\t{}\t{}\t{}",
                r.priority, r.name, r.direction, r.action, r.filters
            )?;
        }
        writeln!(t)?;
        t.flush()?;
    }

    if let Some(tun) = &cfg.tunnel {
        writeln!(
            t,
            "Tunnel {} <=> {} (suite: {}, ike: {}, routing: {})",
            tun.sides[0].env,
            tun.sides[1].env,
            tun.suite,
            tun.ike,
            tun.routing,
        )?;
        write_hr(&mut t)?;
        for side in &tun.sides {
            let routes: Vec<String> =
                side.advertised.iter().map(|c| c.to_string()).collect();
            writeln!(
                t,
                "{}\tadvertises\t{}",
                side.env,
                if routes.is_empty() {
                    "-".to_string()
                } else {
                    routes.join(", ")
                },
            )?;
        }
        writeln!(t)?;
        t.flush()?;
    }

    Ok(())
}

/// Print a diagnostic list.
pub fn print_diags(diags: &[Diagnostic]) -> std::io::Result<()> {
    print_diags_into(&mut std::io::stdout(), diags)
}

/// Print a diagnostic list into a given writer.
pub fn print_diags_into(
    writer: &mut impl Write,
    diags: &[Diagnostic],
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "KIND\tMESSAGE")?;
    write_hr(&mut t)?;
    for diag in diags {
        writeln!(t, "{}\t{}", diag.kind, diag.message)?;
    }
    t.flush()
}

/// Print one side's derived tunnel configuration.
pub fn print_tunnel_side(side: &TunnelSideConfig) -> std::io::Result<()> {
    print_tunnel_side_into(&mut std::io::stdout(), side)
}

/// Print one side's derived tunnel configuration into a given writer.
pub fn print_tunnel_side_into(
    writer: &mut impl Write,
    side: &TunnelSideConfig,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "Tunnel side {} (peer: {})", side.env, side.peer_env)?;
    write_hr(&mut t)?;
    writeln!(t, "gateway subnet\t{}", side.gateway_subnet)?;
    writeln!(t, "peer gateway subnet\t{}", side.peer_gateway_subnet)?;
    writeln!(t, "encryption\t{}", side.suite.encryption())?;
    writeln!(t, "integrity\t{}", side.suite.integrity())?;
    writeln!(t, "dh group\t{}", side.suite.dh_group())?;
    writeln!(t, "ike\t{}", side.ike)?;
    writeln!(t, "sa lifetime\t{}s", side.sa_lifetime_secs)?;
    writeln!(t, "routing\t{}", side.routing)?;

    for adv in &side.advertised {
        writeln!(t, "route\t{adv}")?;
    }

    if let Some(bgp) = &side.bgp {
        writeln!(t, "bgp asn\t{}", bgp.asn)?;
        writeln!(t, "bgp peering addr\t{}", bgp.peering_addr)?;
    }
    if let Some(peer) = &side.peer_bgp {
        writeln!(t, "peer bgp asn\t{}", peer.asn)?;
        writeln!(t, "peer bgp peering addr\t{}", peer.peering_addr)?;
    }

    t.flush()
}

// Write a horizontal rule.
fn write_hr(w: &mut impl Write) -> std::io::Result<()> {
    writeln!(w, "{}", "-".repeat(70))
}
