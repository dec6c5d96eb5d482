// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

#![no_std]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
extern crate alloc;

use alloc::string::String;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

pub mod diag;
pub mod firewall;
pub mod ip;
pub mod subnet;
pub mod tunnel;

pub use diag::*;
pub use firewall::*;
pub use ip::*;
pub use subnet::*;
pub use tunnel::*;

/// The direction of traffic relative to a subnet: into the subnet or
/// out of it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In = 1,
    Out = 2,
}

impl core::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            _ => Err(format!("invalid direction: {}", s)),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dirstr = match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        };

        write!(f, "{}", dirstr)
    }
}

/// Deserialize a type through its `FromStr` form.
///
/// The plan types that have a canonical string form (CIDRs, address
/// selectors, port lists) serialize as that string so that plan files
/// stay human-readable.
pub(crate) mod serde_str {
    use alloc::string::String;
    use core::fmt;
    use core::marker::PhantomData;
    use core::str::FromStr;
    use serde::de;
    use serde::de::Deserializer;

    struct StrVisitor<T>(PhantomData<T>);

    impl<T> de::Visitor<'_> for StrVisitor<T>
    where
        T: FromStr<Err = String>,
    {
        type Value = T;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a string")
        }

        fn visit_str<E: de::Error>(self, s: &str) -> Result<T, E> {
            s.parse().map_err(E::custom)
        }
    }

    pub(crate) fn deserialize<'de, T, D>(de: D) -> Result<T, D::Error>
    where
        T: FromStr<Err = String>,
        D: Deserializer<'de>,
    {
        de.deserialize_str(StrVisitor(PhantomData))
    }
}
