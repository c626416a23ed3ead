// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

mod cli;
mod commands;
mod setup;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Command};
use perspectives::open_presentation;
use setup::setup_logging;

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.log_level.clone(), args.trace);

    let mut session = open_presentation(args.config.as_deref(), args.data_dir.clone())
        .context("Failed to load presentation config")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.command {
        Command::Render { out } => commands::render(&session, &out),
        Command::List => commands::list(&session, &mut out),
        Command::Show {
            tab,
            continent,
            mut controls,
        } => {
            if let Some(continent) = continent {
                controls.insert(0, ("continent".to_string(), continent));
            }
            commands::show(&mut session, &tab, controls, &mut out)
        }
        Command::Inspect { dataset, limit } => {
            commands::inspect(&session, &dataset, limit, &mut out)
        }
        Command::Export { example, out } => commands::export(&session, &example, &out),
    }
}
