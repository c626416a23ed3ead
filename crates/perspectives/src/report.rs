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

use crate::error::{Result, SerialisationResult};
use crate::gallery::Gallery;
use crate::session::{ExampleOutcome, Session, TabView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
pub const REPORT_FILE: &str = "presentation.json";
pub const HTML_FILE: &str = "index.html";
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub tabs: usize,
    pub charts: usize,
    pub text_only: usize,
    pub failed: usize,
}
impl ReportSummary {
    fn from_tabs(tabs: &[TabView]) -> Self {
        let mut summary = ReportSummary {
            tabs: tabs.len(),
            ..ReportSummary::default()
        };
        for example in tabs.iter().flat_map(|tab| &tab.examples) {
            match example.outcome {
                ExampleOutcome::Chart { .. } => summary.charts += 1,
                ExampleOutcome::TextOnly => summary.text_only += 1,
                ExampleOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}
/// Every tab of a presentation, built and ready to serialise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationReport {
    pub title: String,
    pub tagline: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub tabs: Vec<TabView>,
}
impl PresentationReport {
    pub fn new(gallery: &Gallery, tabs: Vec<TabView>) -> Self {
        Self {
            title: gallery.title.clone(),
            tagline: gallery.tagline.clone(),
            generated_at: Utc::now(),
            summary: ReportSummary::from_tabs(&tabs),
            tabs,
        }
    }
    pub fn from_session(session: &Session) -> Self {
        Self::new(session.gallery(), session.build_all())
    }
    pub fn to_json(&self) -> SerialisationResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
/// A single unstyled page: the report JSON inline, figures drawn by
/// plotly.js, every text node set through `textContent`.
pub fn render_html(report: &PresentationReport) -> SerialisationResult<String> {
    let data = serde_json::to_string(report)?.replace("</", "<\\/");
    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Presentation</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body>
<main id="presentation"></main>
<script id="presentation-data" type="application/json">{data}</script>
<script>
const report = JSON.parse(document.getElementById("presentation-data").textContent);
const root = document.getElementById("presentation");
function add(parent, tag, text) {{
  const node = document.createElement(tag);
  if (text) node.textContent = text;
  parent.appendChild(node);
  return node;
}}
document.title = report.title;
add(root, "h1", report.title);
for (const line of report.tagline) add(root, "p", line);
for (const tab of report.tabs) {{
  const section = add(root, "section");
  section.id = tab.id;
  add(section, "h2", tab.heading);
  if (tab.intro) add(section, "pre", tab.intro);
  for (const control of tab.controls) add(section, "p", control.label + ": " + control.selected);
  for (const example of tab.examples) {{
    const article = add(section, "article");
    const verdict = example.verdict.charAt(0).toUpperCase() + example.verdict.slice(1);
    add(article, "h3", verdict + ": " + example.heading);
    if (example.description) add(article, "p", example.description);
    const outcome = example.outcome;
    if (outcome.status === "chart") {{
      const target = add(article, "div");
      Plotly.newPlot(target, outcome.spec.figure.data, outcome.spec.figure.layout);
    }} else if (outcome.status === "failed") {{
      add(article, "p", outcome.category + " error: " + outcome.message);
    }}
    if (example.note) add(article, "p", example.note);
    if (example.commentary) add(article, "pre", example.commentary);
    if (example.code) add(article, "pre", example.code);
  }}
}}
</script>
</body>
</html>
"#
    ))
}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    pub json: PathBuf,
    pub html: PathBuf,
}
/// Writes `presentation.json` and `index.html` into `out_dir`, creating it.
pub fn write_bundle(report: &PresentationReport, out_dir: &Path) -> Result<BundlePaths> {
    fs::create_dir_all(out_dir)?;
    let paths = BundlePaths {
        json: out_dir.join(REPORT_FILE),
        html: out_dir.join(HTML_FILE),
    };
    fs::write(&paths.json, report.to_json()?)?;
    fs::write(&paths.html, render_html(report)?)?;
    info!(
        out_dir = %out_dir.display(),
        charts = report.summary.charts,
        failed = report.summary.failed,
        "Wrote presentation bundle"
    );
    Ok(paths)
}
