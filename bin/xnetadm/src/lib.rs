// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Plan loading and logging for the xnet pre-flight tool.

use slog::Drain;
use slog::Logger;
use slog::o;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use xnet_api::PlanCfg;

/// Errors related to loading and checking a plan file.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read plan file {}: {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("failed to parse plan file {}: {err}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        err: Box<toml::de::Error>,
    },

    #[error("plan has no environment named `{0}`")]
    UnknownEnvironment(String),

    #[error("plan has no rule set named `{0}`")]
    UnknownRuleSet(String),

    #[error("plan has no tunnel")]
    NoTunnel,
}

/// Load a declarative plan from a TOML file.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<PlanCfg, Error> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|err| Error::Io { path: path.to_path_buf(), err })?;

    toml::from_str(&raw).map_err(|err| Error::Parse {
        path: path.to_path_buf(),
        err: Box::new(err),
    })
}

/// Build the tool's logger: terminal output, filtered through the
/// usual `RUST_LOG`-style environment variable.
pub fn build_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}
