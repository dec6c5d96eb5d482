// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Security rules.
//!
//! A rule set is an ordered firewall policy attached to a subnet:
//! rules are evaluated in ascending priority order and the first match
//! wins. A rule set carries no implied default — what happens when no
//! rule matches is stated explicitly, per direction, in the rule set
//! itself.

use crate::Direction;
use crate::ip::IpCidr;
use crate::ip::Protocol;
use crate::serde_str;
use alloc::string::String;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Display;
use core::net::IpAddr;
use core::ops::RangeInclusive;
use core::result;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;

/// Port 0 is reserved and may not appear in a port filter.
pub const DYNAMIC_PORT: u16 = 0;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallAction {
    Allow,
    Deny,
}

impl FromStr for FirewallAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(FirewallAction::Allow),
            "deny" => Ok(FirewallAction::Deny),
            _ => Err(format!("invalid action: {s} ('allow' or 'deny')")),
        }
    }
}

impl Display for FirewallAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Deny => write!(f, "DENY"),
        }
    }
}

/// The outcome of evaluating a rule set against a single flow.
///
/// `NoMatch` is a real answer, not a failure: it means the rule set's
/// explicit default policy for the flow's direction applies.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Allow,
    Deny,
    NoMatch,
}

impl Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Deny => write!(f, "DENY"),
            Self::NoMatch => write!(f, "NO-MATCH"),
        }
    }
}

impl From<FirewallAction> for Decision {
    fn from(action: FirewallAction) -> Self {
        match action {
            FirewallAction::Allow => Decision::Allow,
            FirewallAction::Deny => Decision::Deny,
        }
    }
}

/// Filter traffic by address.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Address {
    /// Match traffic from any address.
    #[default]
    Any,

    /// Match traffic from the given subnet CIDR.
    Subnet(IpCidr),

    /// Match traffic from the given IP address.
    Ip(IpAddr),
}

impl Address {
    /// Does `ip` satisfy this selector?
    pub fn matches(&self, ip: IpAddr) -> bool {
        match self {
            Address::Any => true,
            Address::Ip(addr) => *addr == ip,
            Address::Subnet(cidr) => cidr.is_member(ip),
        }
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(Address::Any),

            addrstr => match addrstr.split_once('=') {
                None => {
                    Err(format!("malformed address specification: {addrstr}"))
                }
                Some(("ip", val)) => Ok(Address::Ip(
                    val.parse().map_err(|_| format!("bad IP: {val}"))?,
                )),
                Some(("subnet", val)) => Ok(Address::Subnet(val.parse()?)),
                Some((key, _)) => Err(format!("invalid address type: {key}")),
            },
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Any => write!(f, "any"),
            Address::Ip(val) => write!(f, "ip={val}"),
            Address::Subnet(val) => write!(f, "subnet={val}"),
        }
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_str::deserialize(d)
    }
}

/// Filter traffic by protocol.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ProtoFilter {
    #[default]
    Any,
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
    Esp,
    Other(Protocol),
}

impl ProtoFilter {
    /// Does `proto` satisfy this filter?
    pub fn matches(&self, proto: Protocol) -> bool {
        match self {
            ProtoFilter::Any => true,
            ProtoFilter::Tcp => proto == Protocol::TCP,
            ProtoFilter::Udp => proto == Protocol::UDP,
            ProtoFilter::Icmp => proto == Protocol::ICMP,
            ProtoFilter::Icmpv6 => proto == Protocol::ICMPv6,
            ProtoFilter::Esp => proto == Protocol::ESP,
            ProtoFilter::Other(p) => proto == *p,
        }
    }
}

impl FromStr for ProtoFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(ProtoFilter::Any),
            "tcp" => Ok(ProtoFilter::Tcp),
            "udp" => Ok(ProtoFilter::Udp),
            "icmp" => Ok(ProtoFilter::Icmp),
            "icmp6" | "icmpv6" => Ok(ProtoFilter::Icmpv6),
            "esp" => Ok(ProtoFilter::Esp),
            other => match other.parse::<Protocol>() {
                Ok(proto) => Ok(ProtoFilter::Other(proto)),
                Err(_) => Err(format!("unknown protocol: {other}")),
            },
        }
    }
}

impl Display for ProtoFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtoFilter::Any => write!(f, "any"),
            ProtoFilter::Tcp => write!(f, "tcp"),
            ProtoFilter::Udp => write!(f, "udp"),
            ProtoFilter::Icmp => write!(f, "icmp"),
            ProtoFilter::Icmpv6 => write!(f, "icmp6"),
            ProtoFilter::Esp => write!(f, "esp"),
            ProtoFilter::Other(proto) => write!(f, "{}", u8::from(*proto)),
        }
    }
}

impl Serialize for ProtoFilter {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProtoFilter {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_str::deserialize(d)
    }
}

/// Filter traffic by destination port.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Ports {
    #[default]
    Any,
    PortList(Vec<u16>),
    PortRange(RangeInclusive<u16>),
}

impl Ports {
    /// Does `port` satisfy this filter?
    ///
    /// A portless flow (ICMP, ESP) only satisfies `Any`.
    pub fn matches(&self, port: Option<u16>) -> bool {
        match self {
            Ports::Any => true,
            Ports::PortList(list) => match port {
                Some(p) => list.contains(&p),
                None => false,
            },
            Ports::PortRange(range) => match port {
                Some(p) => range.contains(&p),
                None => false,
            },
        }
    }
}

impl FromStr for Ports {
    type Err = String;

    /// Accept `any`, a comma-separated port list, or an inclusive
    /// range like `1024-2048`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(Ports::Any),

            _ if s.contains('-') => {
                let (lhs, rhs) = s.split_once('-').unwrap();
                let start =
                    lhs.parse::<u16>().map_err(|e| e.to_string())?;
                let end = rhs.parse::<u16>().map_err(|e| e.to_string())?;

                if start == DYNAMIC_PORT || start > end {
                    return Err(format!("malformed port range: {s}"));
                }
                Ok(Ports::PortRange(start..=end))
            }

            _ => {
                let ports: Vec<u16> = s
                    .split(',')
                    .map(|ps| ps.parse::<u16>().map_err(|e| e.to_string()))
                    .collect::<result::Result<Vec<u16>, _>>()?;

                if ports.is_empty() {
                    return Err(format!("malformed ports spec: {s}"));
                }

                for p in ports.iter() {
                    if *p == DYNAMIC_PORT {
                        return Err(format!("invalid port: {p}"));
                    }
                }
                Ok(Ports::PortList(ports))
            }
        }
    }
}

impl Display for Ports {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ports::Any => write!(f, "any"),
            Ports::PortList(plist) => {
                let mut first = true;
                for p in plist {
                    if !first {
                        write!(f, ",")?;
                    }
                    write!(f, "{p}")?;
                    first = false;
                }
                Ok(())
            }
            Ports::PortRange(range) => {
                write!(f, "{}-{}", range.start(), range.end())
            }
        }
    }
}

impl Serialize for Ports {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ports {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_str::deserialize(d)
    }
}

/// The filter half of a rule: which flows it applies to.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Filters {
    #[serde(default)]
    pub protocol: ProtoFilter,
    #[serde(default)]
    pub ports: Ports,
    #[serde(default, rename = "src")]
    pub source: Address,
    #[serde(default, rename = "dst")]
    pub destination: Address,
}

impl Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "proto={} ports={} src={} dst={}",
            self.protocol, self.ports, self.source, self.destination
        )
    }
}

impl Filters {
    pub fn new() -> Self {
        Filters {
            protocol: ProtoFilter::Any,
            ports: Ports::Any,
            source: Address::Any,
            destination: Address::Any,
        }
    }

    /// Does the given flow satisfy every filter?
    pub fn matches(
        &self,
        proto: Protocol,
        port: Option<u16>,
        src: IpAddr,
        dst: IpAddr,
    ) -> bool {
        self.protocol.matches(proto)
            && self.ports.matches(port)
            && self.source.matches(src)
            && self.destination.matches(dst)
    }

    pub fn set_protocol<P: Into<ProtoFilter>>(
        &mut self,
        proto: P,
    ) -> &mut Self {
        self.protocol = proto.into();
        self
    }

    pub fn set_ports<P: Into<Ports>>(&mut self, ports: P) -> &mut Self {
        self.ports = ports.into();
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.ports = Ports::PortList(vec![port]);
        self
    }

    pub fn set_source<A: Into<Address>>(&mut self, addr: A) -> &mut Self {
        self.source = addr.into();
        self
    }

    pub fn set_destination<A: Into<Address>>(&mut self, addr: A) -> &mut Self {
        self.destination = addr.into();
        self
    }
}

impl From<Protocol> for ProtoFilter {
    fn from(proto: Protocol) -> Self {
        match proto {
            Protocol::TCP => ProtoFilter::Tcp,
            Protocol::UDP => ProtoFilter::Udp,
            Protocol::ICMP => ProtoFilter::Icmp,
            Protocol::ICMPv6 => ProtoFilter::Icmpv6,
            Protocol::ESP => ProtoFilter::Esp,
            other => ProtoFilter::Other(other),
        }
    }
}

impl From<IpCidr> for Address {
    fn from(cidr: IpCidr) -> Self {
        Address::Subnet(cidr)
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Address::Ip(ip)
    }
}

impl From<Vec<u16>> for Ports {
    fn from(list: Vec<u16>) -> Self {
        Ports::PortList(list)
    }
}

/// A single security rule.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SecurityRule {
    pub name: String,
    pub direction: Direction,
    pub action: FirewallAction,
    pub priority: u16,
    #[serde(flatten)]
    pub filters: Filters,
}

impl FromStr for SecurityRule {
    type Err = String;

    /// Parse a rule from `key=val` tokens, e.g.:
    ///
    /// ```text
    /// name=pg-from-peer dir=in action=allow priority=100 \
    ///     protocol=tcp port=5432 src=subnet=10.0.0.0/16
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut name = None;
        let mut action = None;
        let mut direction = None;
        let mut priority = None;
        let mut filters = Filters::new();

        for token in s.to_ascii_lowercase().split(' ') {
            match token.split_once('=') {
                None => {
                    return Err(format!("bad token: {token}"));
                }

                Some(("name", val)) => {
                    name = Some(val.to_string());
                }

                Some(("dir", val)) => {
                    direction = Some(val.parse::<Direction>()?);
                }

                Some(("action", val)) => {
                    action = Some(val.parse::<FirewallAction>()?);
                }

                Some(("priority", val)) => {
                    priority =
                        Some(val.parse::<u16>().map_err(|e| {
                            format!("bad priority: '{val}' {e}")
                        })?);
                }

                // Parse the filters.
                Some(("protocol", val)) => {
                    filters.set_protocol(val.parse::<ProtoFilter>()?);
                }

                Some(("port", val)) => {
                    filters.set_ports(val.parse::<Ports>()?);
                }

                Some(("src", val)) => {
                    filters.set_source(val.parse::<Address>()?);
                }

                Some(("dst", val)) => {
                    filters.set_destination(val.parse::<Address>()?);
                }

                Some((_, _)) => {
                    return Err(format!("invalid key: {token}"));
                }
            }
        }

        let Some(name) = name else {
            return Err("missing 'name' key".to_string());
        };

        let Some(action) = action else {
            return Err("missing 'action' key".to_string());
        };

        let Some(direction) = direction else {
            return Err("missing direction ('dir') key".to_string());
        };

        let Some(priority) = priority else {
            return Err("missing 'priority' key".to_string());
        };

        Ok(SecurityRule { name, direction, action, priority, filters })
    }
}

impl Display for SecurityRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} prio={} {}",
            self.name, self.direction, self.action, self.priority, self.filters
        )
    }
}

/// A named, unordered collection of rules with an explicit default
/// policy per direction.
///
/// The defaults are mandatory in configuration: the model never
/// assumes deny-on-no-match or allow-on-no-match on the operator's
/// behalf.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RuleSetCfg {
    pub name: String,
    pub default_in: FirewallAction,
    pub default_out: FirewallAction,
    #[serde(default)]
    pub rules: Vec<SecurityRule>,
}
