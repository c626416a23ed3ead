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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "brewing-perspectives")]
#[command(about = "Good, bad and ugly data visualisation, drawn from coffee, milk and alcohol tables")]
#[command(version)]
pub struct Args {
    #[arg(long, global = true, help = "Presentation YAML; the shipped one is used when omitted")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "data", help = "Directory holding the CSV files")]
    pub data_dir: PathBuf,

    #[arg(long, global = true, help = "Enable trace-level logging for maximum verbosity")]
    pub trace: bool,

    #[arg(long, global = true, value_enum, help = "Set the logging level")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build every tab and write presentation.json and index.html.
    Render {
        #[arg(long, default_value = "site")]
        out: PathBuf,
    },
    /// List tabs and their examples.
    List,
    /// Print one tab, built, as JSON.
    Show {
        /// Tab number, id or title.
        tab: String,
        #[arg(long, help = "Continent to select before building")]
        continent: Option<String>,
        #[arg(long = "set", value_name = "CONTROL=VALUE", value_parser = parse_assignment)]
        controls: Vec<(String, String)>,
    },
    /// Print a dataset's schema and first rows.
    Inspect {
        dataset: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Write the table behind an example, after its transforms, to CSV.
    Export {
        example: String,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((control, value)) if !control.trim().is_empty() => {
            Ok((control.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected CONTROL=VALUE, got `{raw}`")),
    }
}
