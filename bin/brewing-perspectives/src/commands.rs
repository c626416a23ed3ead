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

use anyhow::{Context, Result};
use perspectives::{export_csv, write_bundle, PresentationReport, Session, SessionEvent};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

pub fn render(session: &Session, out: &Path) -> Result<()> {
    let report = PresentationReport::from_session(session);
    for example in report.tabs.iter().flat_map(|tab| tab.failures()) {
        warn!(example = %example.id, outcome = ?example.outcome, "Example failed to build");
    }
    let paths = write_bundle(&report, out)
        .with_context(|| format!("Failed to write presentation into {}", out.display()))?;
    println!(
        "Wrote {} and {} ({} charts, {} text-only, {} failed)",
        paths.json.display(),
        paths.html.display(),
        report.summary.charts,
        report.summary.text_only,
        report.summary.failed
    );
    Ok(())
}

pub fn list(session: &Session, out: &mut impl Write) -> Result<()> {
    let gallery = session.gallery();
    writeln!(out, "{}", gallery.title)?;
    for (index, tab) in gallery.tabs.iter().enumerate() {
        writeln!(out, "{index}. {} ({})", tab.title, tab.id)?;
        for control in &tab.controls {
            writeln!(out, "     control {}: {}", control.id, control.options.join(" | "))?;
        }
        for example in &tab.examples {
            let kind = example
                .chart
                .as_ref()
                .map_or_else(|| "text".to_string(), |chart| chart.kind.to_string());
            writeln!(
                out,
                "   [{}] {} - {} ({kind})",
                example.verdict, example.id, example.heading
            )?;
        }
    }
    Ok(())
}

pub fn show(
    session: &mut Session,
    tab: &str,
    controls: Vec<(String, String)>,
    out: &mut impl Write,
) -> Result<()> {
    let index = session.gallery().tab_index(tab)?;
    let mut view = session.dispatch(SessionEvent::SelectTab { index })?;
    for (control, value) in controls {
        view = session
            .dispatch(SessionEvent::SetControl {
                control: control.clone(),
                value,
            })
            .with_context(|| format!("Could not set control `{control}`"))?;
    }
    serde_json::to_writer_pretty(&mut *out, &view)?;
    writeln!(out)?;
    Ok(())
}

pub fn inspect(session: &Session, dataset: &str, limit: usize, out: &mut impl Write) -> Result<()> {
    let frame = session
        .dataset(dataset)
        .with_context(|| format!("Could not load dataset `{dataset}`"))?;
    writeln!(
        out,
        "{} ({} rows, loaded {})",
        frame.name(),
        frame.row_count(),
        frame.metadata.created_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    for column in frame.column_metadata() {
        writeln!(
            out,
            "  {:<48} {:<8} {} null",
            column.name, column.data_type, column.null_count
        )?;
    }
    writeln!(out)?;
    writeln!(out, "{}", frame.preview(limit))?;
    Ok(())
}

pub fn export(session: &Session, example: &str, out: &Path) -> Result<()> {
    let table = session.example_table(example)?;
    export_csv(&table, out).with_context(|| format!("Failed to export to {}", out.display()))?;
    info!(example, rows = table.row_count(), path = %out.display(), "Exported example table");
    Ok(())
}
