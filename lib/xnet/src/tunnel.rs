// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Tunnel derivation and symmetry checking.
//!
//! Both ends of the site-to-site VPN are derived from the one shared
//! descriptor on every pass. The hard property is symmetry: a
//! pre-shared key or route advertisement that differs between the two
//! sides breaks connectivity with no local error anywhere, so the
//! checks here always look at both sides together and never validate
//! a side in isolation.

use crate::api::BgpPeerCfg;
use crate::api::CipherSuite;
use crate::api::DiagKind;
use crate::api::Diagnostic;
use crate::api::IkeVersion;
use crate::api::IpCidr;
use crate::api::PlanCfg;
use crate::api::RoutingMode;
use crate::plan;
use crate::plan::ResolvedTunnel;
use crate::topology;
use crate::topology::EnvTopology;
use crate::validate;
use alloc::string::String;
use alloc::vec::Vec;
use serde::Serialize;

/// One side's rendered tunnel configuration, derived from the shared
/// descriptor. Handing each environment's provisioning tool its
/// `TunnelSideConfig` is the only way tunnel parameters leave the
/// plan.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TunnelSideConfig {
    pub env: String,
    pub peer_env: String,

    /// This side's gateway subnet block.
    pub gateway_subnet: IpCidr,

    /// The peer's gateway subnet block.
    pub peer_gateway_subnet: IpCidr,

    /// Static route entries toward the peer.
    pub advertised: Vec<IpCidr>,

    pub shared_secret: String,
    pub suite: CipherSuite,
    pub ike: IkeVersion,
    pub sa_lifetime_secs: u32,
    pub routing: RoutingMode,

    pub bgp: Option<BgpPeerCfg>,
    pub peer_bgp: Option<BgpPeerCfg>,
}

/// Validate the tunnel and derive both side configurations.
///
/// Every violation found is reported; the sides are returned only when
/// derivation was possible at all (a usable suite and a gateway subnet
/// on each end), independent of whether other diagnostics fired.
pub fn validate_tunnel(
    tunnel: &ResolvedTunnel,
    topos: &[EnvTopology],
) -> (Option<[TunnelSideConfig; 2]>, Vec<Diagnostic>) {
    let cfg = tunnel.cfg;
    let mut diags = Vec::new();

    if cfg.shared_secret.is_empty() {
        diags.push(Diagnostic::new(
            DiagKind::MissingSharedSecret,
            format!(
                "tunnel between `{}` and `{}` has an empty pre-shared key",
                tunnel.envs[0].id, tunnel.envs[1].id
            ),
        ));
    }

    let suite = match cfg.suite.parse::<CipherSuite>() {
        Ok(suite) => Some(suite),
        Err(e) => {
            diags.push(Diagnostic::new(
                DiagKind::UnsupportedCipherSuite,
                e,
            ));
            None
        }
    };

    // Locate each side's gateway subnet. Topologies exist for every
    // resolved environment; a missing gateway is the plan's problem,
    // not ours.
    let mut gateways = [None, None];
    for (i, env) in tunnel.envs.iter().enumerate() {
        let topo = topos.iter().find(|t| t.env == env.id);
        gateways[i] = topo.and_then(|t| t.gateway()).map(|gw| gw.block);
        if gateways[i].is_none() {
            diags.push(Diagnostic::new(
                DiagKind::MissingGatewayRole,
                format!(
                    "environment `{}` is referenced by the tunnel but \
                     has no gateway subnet",
                    env.id
                ),
            ));
        }
    }

    // Symmetric routing checks, each side against the *peer's* current
    // block.
    for (i, side) in cfg.sides.iter().enumerate() {
        let peer = tunnel.envs[1 - i];
        let local = tunnel.envs[i];

        if cfg.routing == RoutingMode::Static {
            let covered =
                side.advertised.iter().any(|c| c.covers(&peer.block));
            if !covered {
                diags.push(Diagnostic::new(
                    DiagKind::AsymmetricTunnel,
                    format!(
                        "side `{}` does not advertise peer `{}` block \
                         ({})",
                        local.id, peer.id, peer.block
                    ),
                ));
            }
        }

        // An advertised range describes the peer's address space. A
        // careless covering supernet can swallow the local gateway
        // subnet and blackhole the tunnel's own endpoint.
        if let Some(gw) = gateways[i] {
            for adv in &side.advertised {
                if adv.overlaps(&gw) {
                    diags.push(Diagnostic::new(
                        DiagKind::AsymmetricTunnel,
                        format!(
                            "side `{}` advertised range {} overlaps its \
                             own gateway subnet {}",
                            local.id, adv, gw
                        ),
                    ));
                }
            }
        }
    }

    if cfg.routing == RoutingMode::Bgp {
        diags.extend(check_bgp(tunnel, &gateways));
    }

    let sides = match (suite, gateways) {
        (Some(suite), [Some(gw_a), Some(gw_b)]) => {
            let gws = [gw_a, gw_b];
            let mut sides = Vec::with_capacity(2);
            for (i, side) in cfg.sides.iter().enumerate() {
                sides.push(TunnelSideConfig {
                    env: tunnel.envs[i].id.clone(),
                    peer_env: tunnel.envs[1 - i].id.clone(),
                    gateway_subnet: gws[i],
                    peer_gateway_subnet: gws[1 - i],
                    advertised: side.advertised.clone(),
                    shared_secret: cfg.shared_secret.clone(),
                    suite,
                    ike: cfg.ike,
                    sa_lifetime_secs: cfg.sa_lifetime_secs,
                    routing: cfg.routing,
                    bgp: side.bgp,
                    peer_bgp: cfg.sides[1 - i].bgp,
                });
            }

            // Both sides came from one descriptor; they cannot
            // disagree on the shared parameters.
            Some([sides.remove(0), sides.remove(0)])
        }
        _ => None,
    };

    (sides, diags)
}

fn check_bgp(
    tunnel: &ResolvedTunnel,
    gateways: &[Option<IpCidr>; 2],
) -> Vec<Diagnostic> {
    let cfg = tunnel.cfg;
    let mut diags = Vec::new();

    for (i, side) in cfg.sides.iter().enumerate() {
        let env = tunnel.envs[i];
        let Some(bgp) = &side.bgp else {
            diags.push(Diagnostic::new(
                DiagKind::InvalidBgpPeering,
                format!(
                    "routing mode is bgp but side `{}` has no bgp \
                     parameters",
                    env.id
                ),
            ));
            continue;
        };

        if let Some(gw) = gateways[i] {
            if !gw.is_member(bgp.peering_addr) {
                diags.push(Diagnostic::new(
                    DiagKind::InvalidBgpPeering,
                    format!(
                        "side `{}` peering address {} is outside its \
                         gateway subnet {}",
                        env.id, bgp.peering_addr, gw
                    ),
                ));
            }
        }
    }

    if let [Some(a), Some(b)] = [&cfg.sides[0].bgp, &cfg.sides[1].bgp] {
        if a.asn == b.asn {
            diags.push(Diagnostic::new(
                DiagKind::InvalidBgpPeering,
                format!(
                    "sides `{}` and `{}` share ASN {}; the two gateways \
                     must peer as distinct autonomous systems",
                    tunnel.envs[0].id, tunnel.envs[1].id, a.asn
                ),
            ));
        }
    }

    diags
}

/// Validate a complete plan and derive both tunnel side
/// configurations.
///
/// Only a fully `Valid` plan yields side configurations; anything less
/// returns the full diagnostic list, so a provisioning tool cannot
/// render one side of a plan whose other side is broken.
pub fn derive_sides(
    cfg: &PlanCfg,
) -> Result<[TunnelSideConfig; 2], Vec<Diagnostic>> {
    let validation = validate::validate(cfg);
    if !validation.is_valid() {
        return Err(validation.into_diags());
    }

    let (resolved, _) = plan::resolve(cfg);
    let Some(tunnel) = resolved.tunnel else {
        return Err(vec![Diagnostic::new(
            DiagKind::UnresolvedReference,
            "plan has no tunnel to derive side configurations from",
        )]);
    };

    let (topos, _) = topology::build_all(cfg);
    let (sides, diags) = validate_tunnel(&tunnel, &topos);
    match sides {
        Some(sides) if diags.is_empty() => Ok(sides),
        _ => Err(diags),
    }
}
