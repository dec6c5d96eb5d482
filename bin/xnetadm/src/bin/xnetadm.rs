// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use anyhow::bail;
use clap::Parser;
use slog::info;
use std::net::IpAddr;
use std::path::PathBuf;
use xnet::api::Direction;
use xnet::api::Protocol;
use xnet::firewall::RuleSet;
use xnet::print::print_diags;
use xnet::print::print_plan;
use xnet::print::print_tunnel_side;
use xnet::tunnel;
use xnet::validate::validate;
use xnetadm::Error;

/// Administer cross-cloud network topology plans.
#[derive(Debug, Parser)]
#[command(version)]
enum Command {
    /// Run the pre-flight validator over a plan file.
    ///
    /// Exits non-zero if the plan has any violation; every violation
    /// is reported, not just the first.
    Validate {
        /// Path to the plan TOML file.
        plan: PathBuf,

        /// Emit diagnostics as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print a summary of the plan: environments, subnets with their
    /// stable identifiers, rule sets, and the tunnel.
    Show {
        /// Path to the plan TOML file.
        plan: PathBuf,
    },

    /// Derive one side's tunnel configuration from a valid plan.
    TunnelSide {
        /// Path to the plan TOML file.
        plan: PathBuf,

        /// The environment whose side to render.
        #[arg(short, long)]
        env: String,

        /// Emit the side configuration as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a rule set against a single flow.
    Decide {
        /// Path to the plan TOML file.
        plan: PathBuf,

        /// The rule set to evaluate.
        #[arg(short, long)]
        rule_set: String,

        /// Flow direction: 'in' or 'out'.
        #[arg(short, long)]
        dir: Direction,

        /// Protocol name or number, e.g. 'tcp' or '50'.
        #[arg(long)]
        protocol: Protocol,

        /// Destination port, for protocols that have one.
        #[arg(long)]
        port: Option<u16>,

        /// Source address.
        #[arg(long)]
        src: IpAddr,

        /// Destination address.
        #[arg(long)]
        dst: IpAddr,
    },
}

fn main() -> anyhow::Result<()> {
    let log = xnetadm::build_logger();

    match Command::parse() {
        Command::Validate { plan, json } => {
            let cfg = xnetadm::load_plan(&plan)?;
            let validation = validate(&cfg);
            info!(log, "validated plan";
                "path" => %plan.display(),
                "environments" => cfg.environments.len(),
                "diagnostics" => validation.diags().len(),
            );

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(validation.diags())?
                );
            } else if validation.is_valid() {
                println!("plan is valid");
            } else {
                print_diags(validation.diags())?;
            }

            if !validation.is_valid() {
                bail!(
                    "plan is not valid: {} diagnostic(s)",
                    validation.diags().len()
                );
            }
        }

        Command::Show { plan } => {
            let cfg = xnetadm::load_plan(&plan)?;
            print_plan(&cfg)?;
        }

        Command::TunnelSide { plan, env, json } => {
            let cfg = xnetadm::load_plan(&plan)?;
            if cfg.tunnel.is_none() {
                return Err(Error::NoTunnel.into());
            }

            let sides = match tunnel::derive_sides(&cfg) {
                Ok(sides) => sides,
                Err(diags) => {
                    print_diags(&diags)?;
                    bail!(
                        "cannot derive tunnel sides from an invalid plan: \
                         {} diagnostic(s)",
                        diags.len()
                    );
                }
            };

            let Some(side) = sides.iter().find(|s| s.env == env) else {
                return Err(Error::UnknownEnvironment(env).into());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(side)?);
            } else {
                print_tunnel_side(side)?;
            }
        }

        Command::Decide { plan, rule_set, dir, protocol, port, src, dst } => {
            let cfg = xnetadm::load_plan(&plan)?;
            let Some(rs_cfg) = cfg.rule_set(&rule_set) else {
                return Err(Error::UnknownRuleSet(rule_set).into());
            };

            let rs = match RuleSet::finalize(rs_cfg) {
                Ok(rs) => rs,
                Err(diags) => {
                    print_diags(&diags)?;
                    bail!("rule set `{rule_set}` is not valid");
                }
            };

            let decision = rs.decide(dir, protocol, port, src, dst);
            let action = rs.apply(dir, protocol, port, src, dst);
            println!(
                "{decision} (effective: {action}, default {}: {})",
                dir,
                rs.default_for(dir)
            );
        }
    }

    Ok(())
}
