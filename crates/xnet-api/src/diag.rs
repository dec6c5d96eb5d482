// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Validation diagnostics.
//!
//! Every check in the model reports failures as structured
//! diagnostics. Nothing here is an exception used for control flow:
//! the validator collects every violation it finds and the caller
//! decides whether to halt provisioning.

use alloc::string::String;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// The machine-readable class of a validation failure.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DiagKind {
    /// Two address blocks overlap.
    Conflict,

    /// A subnet block is not contained in its parent environment
    /// block.
    OutOfBounds,

    /// More than one subnet tagged `gateway` in one environment.
    DuplicateGatewayRole,

    /// An environment referenced by the tunnel has no gateway subnet.
    MissingGatewayRole,

    /// Two security rules share a priority within one rule set.
    DuplicatePriority,

    /// Tunnel encryption/integrity choice not in the allow-list.
    UnsupportedCipherSuite,

    /// A side's route advertisements do not match the peer's current
    /// address block.
    AsymmetricTunnel,

    /// The tunnel's pre-shared key is absent or empty.
    MissingSharedSecret,

    /// BGP parameters are missing, clash, or fall outside the gateway
    /// subnet.
    InvalidBgpPeering,

    /// A name in the plan does not resolve to a defined entity.
    UnresolvedReference,
}

impl Display for DiagKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Conflict => "conflict",
            Self::OutOfBounds => "out-of-bounds",
            Self::DuplicateGatewayRole => "duplicate-gateway-role",
            Self::MissingGatewayRole => "missing-gateway-role",
            Self::DuplicatePriority => "duplicate-priority",
            Self::UnsupportedCipherSuite => "unsupported-cipher-suite",
            Self::AsymmetricTunnel => "asymmetric-tunnel",
            Self::MissingSharedSecret => "missing-shared-secret",
            Self::InvalidBgpPeering => "invalid-bgp-peering",
            Self::UnresolvedReference => "unresolved-reference",
        };

        write!(f, "{s}")
    }
}

/// A single validation failure: the kind plus a message naming the
/// offending entities.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(kind: DiagKind, message: S) -> Self {
        Self { kind, message: message.into() }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
