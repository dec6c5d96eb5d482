// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The site-to-site tunnel descriptor.
//!
//! A single descriptor describes both ends of the cross-environment
//! VPN. Each side's rendered configuration is *derived* from the
//! descriptor, never stored separately: a pre-shared key or route
//! advertisement that drifts between the two sides breaks connectivity
//! with no local error, so there is deliberately nowhere for the two
//! sides to disagree.

use crate::ip::IpCidr;
use crate::serde_str;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Display;
use core::net::IpAddr;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;

/// IPsec security-association lifetime used when the plan does not
/// specify one.
pub const DEFAULT_SA_LIFETIME_SECS: u32 = 3600;

/// The combined encryption/integrity suites the tunnel supports.
///
/// The allow-list is closed: a plan naming any other suite is
/// rejected. Both IKE and ESP use the suite's algorithms.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CipherSuite {
    Aes256Sha256,
    Aes256Sha384,
    Aes128Sha256,
}

impl CipherSuite {
    pub const ALL: [CipherSuite; 3] =
        [Self::Aes256Sha256, Self::Aes256Sha384, Self::Aes128Sha256];

    pub fn encryption(&self) -> &'static str {
        match self {
            Self::Aes256Sha256 | Self::Aes256Sha384 => "AES256",
            Self::Aes128Sha256 => "AES128",
        }
    }

    pub fn integrity(&self) -> &'static str {
        match self {
            Self::Aes256Sha256 | Self::Aes128Sha256 => "SHA256",
            Self::Aes256Sha384 => "SHA384",
        }
    }

    pub fn dh_group(&self) -> &'static str {
        match self {
            Self::Aes256Sha256 | Self::Aes128Sha256 => "DHGroup14",
            Self::Aes256Sha384 => "DHGroup24",
        }
    }
}

impl FromStr for CipherSuite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aes256-sha256" => Ok(Self::Aes256Sha256),
            "aes256-sha384" => Ok(Self::Aes256Sha384),
            "aes128-sha256" => Ok(Self::Aes128Sha256),
            other => Err(format!(
                "unsupported cipher suite: {other} -- expected \
                 'aes256-sha256', 'aes256-sha384', or 'aes128-sha256'"
            )),
        }
    }
}

impl Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Aes256Sha256 => write!(f, "aes256-sha256"),
            Self::Aes256Sha384 => write!(f, "aes256-sha384"),
            Self::Aes128Sha256 => write!(f, "aes128-sha256"),
        }
    }
}

impl Serialize for CipherSuite {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CipherSuite {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_str::deserialize(d)
    }
}

/// The IKE protocol version used to establish the tunnel.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IkeVersion {
    V1,
    #[default]
    V2,
}

impl Display for IkeVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "IKEv1"),
            Self::V2 => write!(f, "IKEv2"),
        }
    }
}

/// How each side learns routes to the peer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Each side carries static route entries advertising the peer's
    /// address block.
    Static,

    /// Routes are exchanged over BGP between the two gateway
    /// appliances.
    Bgp,
}

impl FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "bgp" => Ok(Self::Bgp),
            lower => Err(format!(
                "unexpected routing mode {lower} -- expected 'static' or \
                 'bgp'"
            )),
        }
    }
}

impl Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Bgp => write!(f, "bgp"),
        }
    }
}

/// BGP parameters for one side of the tunnel.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BgpPeerCfg {
    /// The autonomous system number for this side's gateway.
    pub asn: u32,

    /// The peering address. Must lie inside this side's gateway
    /// subnet.
    pub peering_addr: IpAddr,
}

/// One end of the tunnel as written in configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TunnelSideCfg {
    /// The environment whose gateway subnet terminates this end.
    pub env: String,

    /// Static route entries: the ranges this side routes toward the
    /// peer. Must cover the peer's top-level block (a covering
    /// supernet is fine) and must not swallow this side's own gateway
    /// subnet. Ignored for reachability when routing is BGP.
    #[serde(default)]
    pub advertised: Vec<IpCidr>,

    /// BGP parameters; required when the routing mode is BGP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgp: Option<BgpPeerCfg>,
}

/// The cross-environment tunnel descriptor.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TunnelCfg {
    /// The two ends. Order carries no meaning: the descriptor is
    /// symmetric under exchanging the sides.
    pub sides: [TunnelSideCfg; 2],

    /// The IKE pre-shared key. Both ends use this one value.
    pub shared_secret: String,

    /// Name of the encryption/integrity suite. Validated against
    /// [`CipherSuite`]'s allow-list.
    pub suite: String,

    #[serde(default)]
    pub ike: IkeVersion,

    #[serde(default = "default_sa_lifetime")]
    pub sa_lifetime_secs: u32,

    pub routing: RoutingMode,
}

fn default_sa_lifetime() -> u32 {
    DEFAULT_SA_LIFETIME_SECS
}

impl TunnelCfg {
    /// Return the side whose environment is `env`, if any.
    pub fn side_for(&self, env: &str) -> Option<&TunnelSideCfg> {
        self.sides.iter().find(|s| s.env == env)
    }

    /// Return a descriptor with the two sides exchanged. Validation
    /// results are identical for both orderings.
    pub fn swapped(&self) -> Self {
        let mut swapped = self.clone();
        swapped.sides.swap(0, 1);
        swapped
    }
}
