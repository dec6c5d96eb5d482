// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The cross-cloud network topology engine.
//!
//! This crate turns a declarative [`PlanCfg`](api::PlanCfg) into
//! validated topology: it resolves the plan's internal references into
//! an explicit dependency graph, checks every invariant the model
//! demands (disjoint address blocks, contained subnets, unique rule
//! priorities, a symmetric tunnel), and reports every violation it
//! finds as a structured diagnostic.
//!
//! Validation is a pure function: no I/O, no shared state, the same
//! plan always yields the same diagnostics in the same order. Callers
//! may re-run it as often as they like before handing the plan to a
//! provisioning tool.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[macro_use]
extern crate alloc;

pub use xnet_api as api;

pub mod addr;
pub mod firewall;
pub mod plan;
#[cfg(any(feature = "std", test))]
pub mod print;
pub mod topology;
pub mod tunnel;
pub mod validate;
