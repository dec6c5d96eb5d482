// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Address blocks.
//!
//! A plan assigns every environment and every subnet a CIDR-style
//! address block. The invariant the rest of the model leans on: two
//! blocks either are disjoint or one wholly contains the other, which
//! is what [`Ipv4Cidr::covers`] and [`Ipv4Cidr::overlaps`] (and their
//! IPv6 and family-agnostic siblings) encode.

use crate::serde_str;
use alloc::string::String;
use alloc::string::ToString;
use core::fmt;
use core::fmt::Display;
use core::net::IpAddr;
use core::net::Ipv4Addr;
use core::net::Ipv6Addr;
use core::result;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;

/// An IP protocol value.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum Protocol {
    ICMP,
    IGMP,
    TCP,
    UDP,
    ESP,
    ICMPv6,
    Unknown(u8),
}

pub const PROTO_ICMP: u8 = 0x1;
pub const PROTO_IGMP: u8 = 0x2;
pub const PROTO_TCP: u8 = 0x6;
pub const PROTO_UDP: u8 = 0x11;
pub const PROTO_ESP: u8 = 0x32;
pub const PROTO_ICMPV6: u8 = 0x3A;

impl Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ICMP => write!(f, "ICMP"),
            Self::IGMP => write!(f, "IGMP"),
            Self::TCP => write!(f, "TCP"),
            Self::UDP => write!(f, "UDP"),
            Self::ESP => write!(f, "ESP"),
            Self::ICMPv6 => write!(f, "ICMPv6"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

impl From<u8> for Protocol {
    fn from(proto: u8) -> Self {
        match proto {
            PROTO_ICMP => Self::ICMP,
            PROTO_IGMP => Self::IGMP,
            PROTO_TCP => Self::TCP,
            PROTO_UDP => Self::UDP,
            PROTO_ESP => Self::ESP,
            PROTO_ICMPV6 => Self::ICMPv6,
            _ => Self::Unknown(proto),
        }
    }
}

impl From<Protocol> for u8 {
    fn from(proto: Protocol) -> u8 {
        match proto {
            Protocol::ICMP => PROTO_ICMP,
            Protocol::IGMP => PROTO_IGMP,
            Protocol::TCP => PROTO_TCP,
            Protocol::UDP => PROTO_UDP,
            Protocol::ESP => PROTO_ESP,
            Protocol::ICMPv6 => PROTO_ICMPV6,
            Protocol::Unknown(v) => v,
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    /// Accept either a protocol name or a raw protocol number, the way
    /// cloud security-group definitions write them (`"tcp"`, `"50"`).
    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "icmp" => Ok(Self::ICMP),
            "igmp" => Ok(Self::IGMP),
            "tcp" => Ok(Self::TCP),
            "udp" => Ok(Self::UDP),
            "esp" => Ok(Self::ESP),
            "icmp6" | "icmpv6" => Ok(Self::ICMPv6),
            num => match num.parse::<u8>() {
                Ok(v) => Ok(Self::from(v)),
                Err(_) => Err(format!("unknown protocol: {s}")),
            },
        }
    }
}

/// A valid IPv4 prefix length.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, Ord, PartialOrd,
)]
pub struct Ipv4PrefixLen(u8);

impl TryFrom<u8> for Ipv4PrefixLen {
    type Error = String;

    fn try_from(p: u8) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl Ipv4PrefixLen {
    pub const NETMASK_NONE: Self = Self(0);
    pub const NETMASK_ALL: Self = Self(32);

    pub fn new(prefix_len: u8) -> Result<Self, String> {
        if prefix_len > 32 {
            return Err(format!("bad IPv4 prefix length: {prefix_len}"));
        }

        Ok(Self(prefix_len))
    }

    pub fn val(&self) -> u8 {
        self.0
    }
}

/// A valid IPv6 prefix length.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, Ord, PartialOrd,
)]
pub struct Ipv6PrefixLen(u8);

impl TryFrom<u8> for Ipv6PrefixLen {
    type Error = String;

    fn try_from(p: u8) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl Ipv6PrefixLen {
    pub const NETMASK_NONE: Self = Self(0);
    pub const NETMASK_ALL: Self = Self(128);

    pub fn new(prefix_len: u8) -> result::Result<Self, String> {
        if prefix_len > 128 {
            return Err(format!("bad IPv6 prefix length: {prefix_len}"));
        }

        Ok(Self(prefix_len))
    }

    pub fn val(&self) -> u8 {
        self.0
    }
}

/// Return `ip` after applying a network mask of `prefix_len` bits.
fn ipv4_mask(ip: Ipv4Addr, prefix_len: u8) -> Ipv4Addr {
    if prefix_len == 0 {
        return Ipv4Addr::UNSPECIFIED;
    }

    let n = u32::from_be_bytes(ip.octets());

    let mut bits = i32::MIN;
    bits >>= prefix_len - 1;
    Ipv4Addr::from((n & bits as u32).to_be_bytes())
}

/// Return `ip` after applying a network mask of `prefix_len` bits.
fn ipv6_mask(ip: Ipv6Addr, prefix_len: u8) -> Ipv6Addr {
    if prefix_len == 0 {
        return Ipv6Addr::UNSPECIFIED;
    }

    let n = u128::from_be_bytes(ip.octets());

    let mut bits = i128::MIN;
    bits >>= prefix_len - 1;
    Ipv6Addr::from((n & bits as u128).to_be_bytes())
}

/// An IPv4 CIDR.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ipv4Cidr {
    ip: Ipv4Addr,
    prefix_len: Ipv4PrefixLen,
}

impl core::cmp::Ord for Ipv4Cidr {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        if self.ip != other.ip {
            self.ip.cmp(&other.ip)
        } else {
            self.prefix_len.cmp(&other.prefix_len)
        }
    }
}

impl core::cmp::PartialOrd for Ipv4Cidr {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    /// Convert a string like "10.1.0.0/16" into an `Ipv4Cidr`.
    fn from_str(val: &str) -> result::Result<Self, Self::Err> {
        let (ip_s, prefix_s) = match val.split_once('/') {
            Some(v) => v,
            None => return Err("no '/' found".to_string()),
        };

        let ip = match ip_s.parse() {
            Ok(v) => v,
            Err(e) => return Err(format!("bad IP: {e}")),
        };

        let raw = match prefix_s.parse::<u8>() {
            Ok(v) => v,
            Err(e) => {
                return Err(format!("bad prefix length: {e}"));
            }
        };

        let prefix_len = Ipv4PrefixLen::new(raw)?;
        Ok(Ipv4Cidr::new(ip, prefix_len))
    }
}

impl Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len.val())
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_str::deserialize(d)
    }
}

impl Ipv4Cidr {
    pub fn new(ip: Ipv4Addr, prefix_len: Ipv4PrefixLen) -> Self {
        let ip = ipv4_mask(ip, prefix_len.val());
        Ipv4Cidr { ip, prefix_len }
    }

    pub fn new_checked(ip: Ipv4Addr, prefix_len: u8) -> Result<Self, String> {
        let pl = Ipv4PrefixLen::new(prefix_len)?;
        Ok(Self::new(ip, pl))
    }

    pub fn parts(&self) -> (Ipv4Addr, Ipv4PrefixLen) {
        (self.ip, self.prefix_len)
    }

    /// Return the network address of this CIDR.
    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn prefix_len(self) -> u8 {
        self.prefix_len.val()
    }

    /// Does this CIDR represent the default route subnet?
    pub fn is_default(&self) -> bool {
        self.ip == Ipv4Addr::UNSPECIFIED && self.prefix_len.val() == 0
    }

    /// Is this `ip` a member of the CIDR?
    pub fn is_member(&self, ip: Ipv4Addr) -> bool {
        ipv4_mask(ip, self.prefix_len.val()) == self.ip
    }

    /// Return the last address covered by the CIDR, i.e. its broadcast
    /// address.
    pub fn last_address(&self) -> Ipv4Addr {
        let host_bits = 32 - self.prefix_len.val();
        if host_bits == 32 {
            return Ipv4Addr::BROADCAST;
        }

        let n = u32::from_be_bytes(self.ip.octets());
        Ipv4Addr::from((n | ((1u32 << host_bits) - 1)).to_be_bytes())
    }

    /// Does this CIDR wholly contain `other`?
    pub fn covers(&self, other: &Ipv4Cidr) -> bool {
        self.prefix_len <= other.prefix_len && self.is_member(other.ip)
    }

    /// Do this CIDR and `other` share any address?
    ///
    /// Because both are aligned prefixes, overlap implies that one
    /// wholly contains the other.
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.covers(other) || other.covers(self)
    }
}

#[cfg(feature = "ipnetwork")]
impl From<ipnetwork::Ipv4Network> for Ipv4Cidr {
    fn from(n: ipnetwork::Ipv4Network) -> Self {
        // A valid `Ipv4Network` necessarily has a valid prefix so fine to unwrap.
        let prefix = Ipv4PrefixLen::new(n.prefix()).unwrap();
        Ipv4Cidr::new(n.ip(), prefix)
    }
}

#[cfg(feature = "ipnetwork")]
impl From<Ipv4Cidr> for ipnetwork::Ipv4Network {
    fn from(c: Ipv4Cidr) -> Self {
        let (ip, prefix) = c.parts();
        // A valid `Ipv4Cidr` necessarily has a valid prefix so fine to unwrap.
        ipnetwork::Ipv4Network::new(ip, prefix.val()).unwrap()
    }
}

/// An IPv6 CIDR.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ipv6Cidr {
    ip: Ipv6Addr,
    prefix_len: Ipv6PrefixLen,
}

impl core::cmp::Ord for Ipv6Cidr {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        if self.ip != other.ip {
            self.ip.cmp(&other.ip)
        } else {
            self.prefix_len.cmp(&other.prefix_len)
        }
    }
}

impl core::cmp::PartialOrd for Ipv6Cidr {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Ipv6Cidr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len.val())
    }
}

impl FromStr for Ipv6Cidr {
    type Err = String;

    /// Convert a string like "fd00:dead:beef::/48" into an [`Ipv6Cidr`].
    fn from_str(val: &str) -> result::Result<Self, Self::Err> {
        let (ip_s, prefix_s) = match val.split_once('/') {
            Some(v) => v,
            None => return Err("no '/' found".to_string()),
        };

        let ip = match ip_s.parse::<Ipv6Addr>() {
            Ok(v) => v,
            Err(_) => {
                return Err(format!("Bad IP address component: '{ip_s}'"));
            }
        };

        let prefix_len = match prefix_s.parse::<u8>() {
            Ok(v) => v,
            Err(e) => {
                return Err(format!("bad prefix length: {e}"));
            }
        };

        Ipv6Cidr::new_checked(ip, prefix_len)
    }
}

impl Serialize for Ipv6Cidr {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv6Cidr {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_str::deserialize(d)
    }
}

impl Ipv6Cidr {
    pub fn new(ip: Ipv6Addr, prefix_len: Ipv6PrefixLen) -> Self {
        let ip = ipv6_mask(ip, prefix_len.val());
        Ipv6Cidr { ip, prefix_len }
    }

    pub fn new_checked(
        ip: Ipv6Addr,
        prefix_len: u8,
    ) -> result::Result<Self, String> {
        let pl = Ipv6PrefixLen::new(prefix_len)?;
        Ok(Self::new(ip, pl))
    }

    pub fn parts(&self) -> (Ipv6Addr, Ipv6PrefixLen) {
        (self.ip, self.prefix_len)
    }

    /// Return the network address of this CIDR.
    pub fn ip(&self) -> Ipv6Addr {
        self.ip
    }

    /// Return the prefix length (netmask).
    pub fn prefix_len(self) -> u8 {
        self.prefix_len.val()
    }

    /// Return `true` if this is the default route subnet.
    pub fn is_default(&self) -> bool {
        self.ip == Ipv6Addr::UNSPECIFIED && self.prefix_len.val() == 0
    }

    /// Is this `ip` a member of the CIDR?
    pub fn is_member(&self, ip: Ipv6Addr) -> bool {
        ipv6_mask(ip, self.prefix_len.val()) == self.ip
    }

    /// Return the last address covered by the CIDR.
    pub fn last_address(&self) -> Ipv6Addr {
        let host_bits = 128 - self.prefix_len.val();
        if host_bits == 128 {
            return Ipv6Addr::from(u128::MAX.to_be_bytes());
        }

        let n = u128::from_be_bytes(self.ip.octets());
        Ipv6Addr::from((n | ((1u128 << host_bits) - 1)).to_be_bytes())
    }

    /// Does this CIDR wholly contain `other`?
    pub fn covers(&self, other: &Ipv6Cidr) -> bool {
        self.prefix_len <= other.prefix_len && self.is_member(other.ip)
    }

    /// Do this CIDR and `other` share any address?
    pub fn overlaps(&self, other: &Ipv6Cidr) -> bool {
        self.covers(other) || other.covers(self)
    }
}

#[cfg(feature = "ipnetwork")]
impl From<ipnetwork::Ipv6Network> for Ipv6Cidr {
    fn from(n: ipnetwork::Ipv6Network) -> Self {
        // A valid `Ipv6Network` necessarily has a valid prefix so fine to unwrap.
        let prefix = Ipv6PrefixLen::new(n.prefix()).unwrap();
        Ipv6Cidr::new(n.ip(), prefix)
    }
}

#[cfg(feature = "ipnetwork")]
impl From<Ipv6Cidr> for ipnetwork::Ipv6Network {
    fn from(c: Ipv6Cidr) -> Self {
        let (ip, prefix) = c.parts();
        // A valid `Ipv6Cidr` necessarily has a valid prefix so fine to unwrap.
        ipnetwork::Ipv6Network::new(ip, prefix.val()).unwrap()
    }
}

/// An IPv4 or IPv6 CIDR.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IpCidr {
    Ip4(Ipv4Cidr),
    Ip6(Ipv6Cidr),
}

impl From<Ipv4Cidr> for IpCidr {
    fn from(cidr: Ipv4Cidr) -> Self {
        IpCidr::Ip4(cidr)
    }
}

impl From<Ipv6Cidr> for IpCidr {
    fn from(cidr: Ipv6Cidr) -> Self {
        IpCidr::Ip6(cidr)
    }
}

impl IpCidr {
    pub fn is_default(&self) -> bool {
        match self {
            Self::Ip4(ip4) => ip4.is_default(),
            Self::Ip6(ip6) => ip6.is_default(),
        }
    }

    pub fn ip(&self) -> IpAddr {
        match self {
            Self::Ip4(ip4) => IpAddr::V4(ip4.ip()),
            Self::Ip6(ip6) => IpAddr::V6(ip6.ip()),
        }
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            Self::Ip4(ip4) => ip4.prefix_len(),
            Self::Ip6(ip6) => ip6.prefix_len(),
        }
    }

    pub fn max_prefix_len(&self) -> u8 {
        match self {
            Self::Ip4(_) => Ipv4PrefixLen::NETMASK_ALL.val(),
            Self::Ip6(_) => Ipv6PrefixLen::NETMASK_ALL.val(),
        }
    }

    /// Is this `ip` a member of the CIDR?
    ///
    /// An address of the other family is never a member.
    pub fn is_member(&self, ip: IpAddr) -> bool {
        match (self, ip) {
            (Self::Ip4(cidr), IpAddr::V4(ip4)) => cidr.is_member(ip4),
            (Self::Ip6(cidr), IpAddr::V6(ip6)) => cidr.is_member(ip6),
            _ => false,
        }
    }

    /// Does this CIDR wholly contain `other`?
    ///
    /// Blocks of different families never contain one another.
    pub fn covers(&self, other: &IpCidr) -> bool {
        match (self, other) {
            (Self::Ip4(a), Self::Ip4(b)) => a.covers(b),
            (Self::Ip6(a), Self::Ip6(b)) => a.covers(b),
            _ => false,
        }
    }

    /// Do this CIDR and `other` share any address?
    ///
    /// Blocks of different families are always disjoint.
    pub fn overlaps(&self, other: &IpCidr) -> bool {
        match (self, other) {
            (Self::Ip4(a), Self::Ip4(b)) => a.overlaps(b),
            (Self::Ip6(a), Self::Ip6(b)) => a.overlaps(b),
            _ => false,
        }
    }
}

impl fmt::Display for IpCidr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ip4(ip4) => write!(f, "{ip4}"),
            Self::Ip6(ip6) => write!(f, "{ip6}"),
        }
    }
}

impl FromStr for IpCidr {
    type Err = String;

    /// Convert a string like "192.168.2.0/24" into an `IpCidr`.
    fn from_str(val: &str) -> result::Result<Self, Self::Err> {
        match val.parse::<Ipv4Cidr>() {
            Ok(ip4) => Ok(IpCidr::Ip4(ip4)),
            Err(_) => val
                .parse::<Ipv6Cidr>()
                .map(IpCidr::Ip6)
                .map_err(|_| String::from("Invalid IP CIDR")),
        }
    }
}

impl Serialize for IpCidr {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IpCidr {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_str::deserialize(d)
    }
}

#[cfg(feature = "ipnetwork")]
impl From<ipnetwork::IpNetwork> for IpCidr {
    fn from(ip: ipnetwork::IpNetwork) -> Self {
        match ip {
            ipnetwork::IpNetwork::V4(ip4) => Self::Ip4(ip4.into()),
            ipnetwork::IpNetwork::V6(ip6) => Self::Ip6(ip6.into()),
        }
    }
}

#[cfg(feature = "ipnetwork")]
impl From<IpCidr> for ipnetwork::IpNetwork {
    fn from(ip: IpCidr) -> Self {
        match ip {
            IpCidr::Ip4(ip4) => Self::V4(ip4.into()),
            IpCidr::Ip6(ip6) => Self::V6(ip6.into()),
        }
    }
}
