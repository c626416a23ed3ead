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

use crate::chart::{ChartBuilder, RenderSpec};
use crate::data_handler::{
    ComparisonOperator, DataFrame, DatasetStore, FilterCondition, FilterValue,
    TransformationEngine,
};
use crate::error::{ConfigError, DataError, Result};
use crate::gallery::{ControlSpec, Example, Gallery, Tab, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SelectTab { index: usize },
    SetControl { control: String, value: String },
    /// Drops every cached table so the next build rereads the files.
    Reload,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExampleOutcome {
    Chart { spec: RenderSpec },
    TextOnly,
    Failed { category: String, message: String },
}
impl ExampleOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ExampleOutcome::Failed { .. })
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleView {
    pub id: String,
    pub verdict: Verdict,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub commentary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub outcome: ExampleOutcome,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlView {
    pub id: String,
    pub label: String,
    pub options: Vec<String>,
    pub selected: String,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabView {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub heading: String,
    pub intro: String,
    pub controls: Vec<ControlView>,
    pub examples: Vec<ExampleView>,
}
impl TabView {
    pub fn failures(&self) -> impl Iterator<Item = &ExampleView> {
        self.examples.iter().filter(|example| example.outcome.is_failed())
    }
}
/// Everything one viewer's presentation depends on: the config, where the
/// data lives, the loaded tables, the active tab and the control values.
#[derive(Debug)]
pub struct Session {
    gallery: Gallery,
    data_dir: PathBuf,
    store: DatasetStore,
    engine: TransformationEngine,
    builder: ChartBuilder,
    active_tab: usize,
    controls: BTreeMap<String, String>,
}
impl Session {
    pub fn new(gallery: Gallery, data_dir: impl Into<PathBuf>) -> Self {
        let controls = gallery
            .controls()
            .map(|control| (control.id.clone(), control.default.clone()))
            .collect();
        Self {
            gallery,
            data_dir: data_dir.into(),
            store: DatasetStore::new(),
            engine: TransformationEngine::new(),
            builder: ChartBuilder::new(),
            active_tab: 0,
            controls,
        }
    }
    pub fn with_chart_builder(mut self, builder: ChartBuilder) -> Self {
        self.builder = builder;
        self
    }
    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
    pub fn store(&self) -> &DatasetStore {
        &self.store
    }
    pub fn active_tab(&self) -> usize {
        self.active_tab
    }
    pub fn control_value(&self, control: &str) -> Option<&str> {
        self.controls.get(control).map(String::as_str)
    }
    /// Applies `event` and returns the active tab rebuilt. Only that tab is
    /// built; the others are untouched.
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<TabView> {
        debug!(?event, "Dispatching session event");
        match event {
            SessionEvent::SelectTab { index } => {
                self.gallery.tab(index)?;
                self.active_tab = index;
            }
            SessionEvent::SetControl { control, value } => self.set_control(&control, value)?,
            SessionEvent::Reload => {
                self.store.clear()?;
                info!("Cleared cached datasets");
            }
        }
        self.build_tab(self.active_tab)
    }
    pub fn set_control(&mut self, control: &str, value: String) -> Result<()> {
        let spec = self
            .gallery
            .control(control)
            .ok_or_else(|| ConfigError::UnknownControlValue {
                control: control.to_string(),
                value: value.clone(),
            })?;
        if spec.option_index(&value).is_none() {
            return Err(ConfigError::UnknownControlValue {
                control: control.to_string(),
                value,
            }
            .into());
        }
        self.controls.insert(control.to_string(), value);
        Ok(())
    }
    pub fn build_tab(&self, index: usize) -> Result<TabView> {
        let tab = self.gallery.tab(index)?;
        let examples = tab
            .examples
            .iter()
            .map(|example| self.build_example(tab, example))
            .collect();
        Ok(TabView {
            index,
            id: tab.id.clone(),
            title: tab.title.clone(),
            heading: tab.heading.clone().unwrap_or_else(|| tab.title.clone()),
            intro: tab.intro.clone(),
            controls: tab
                .controls
                .iter()
                .map(|control| ControlView {
                    id: control.id.clone(),
                    label: control.label.clone(),
                    options: control.options.clone(),
                    selected: self
                        .control_value(&control.id)
                        .unwrap_or(&control.default)
                        .to_string(),
                })
                .collect(),
            examples,
        })
    }
    pub fn build_all(&self) -> Vec<TabView> {
        (0..self.gallery.tabs.len())
            .filter_map(|index| self.build_tab(index).ok())
            .collect()
    }
    fn build_example(&self, tab: &Tab, example: &Example) -> ExampleView {
        let outcome = match &example.chart {
            None => ExampleOutcome::TextOnly,
            Some(chart) => match self
                .prepare_table(tab, example)
                .and_then(|table| Ok(self.builder.build(&table, chart)?))
            {
                Ok(spec) => ExampleOutcome::Chart { spec },
                Err(err) => {
                    warn!(example = %example.id, error = %err, "Example failed to build");
                    ExampleOutcome::Failed {
                        category: err.category().to_string(),
                        message: err.user_message(),
                    }
                }
            },
        };
        ExampleView {
            id: example.id.clone(),
            verdict: example.verdict,
            heading: example.heading.clone(),
            description: example.description.clone(),
            commentary: example.commentary.clone(),
            code: example.code.clone(),
            note: example.note.clone(),
            outcome,
        }
    }
    /// The table an example charts, after its transforms and control.
    pub fn example_table(&self, id: &str) -> Result<DataFrame> {
        let (tab_index, example) = self.gallery.example(id)?;
        let tab = self.gallery.tab(tab_index)?;
        self.prepare_table(tab, example)
    }
    fn prepare_table(&self, tab: &Tab, example: &Example) -> Result<DataFrame> {
        let source = match &example.dataset {
            Some(name) => self.dataset(name)?,
            None => Arc::new(example.inline_table()?),
        };
        for step in &example.transforms {
            if let Some(name) = step.referenced_dataset() {
                self.dataset(name)?;
            }
        }
        let mut table = self.engine.apply(&source, &example.transforms, &self.store)?;
        if let Some(control) = example.control.as_deref().and_then(|id| tab.control(id)) {
            let value = self.control_value(&control.id).unwrap_or(&control.default);
            table = apply_control(&table, control, value)?;
        }
        Ok(table)
    }
    /// Loads a declared dataset, rereading it only if the file changed.
    pub fn dataset(&self, name: &str) -> Result<Arc<DataFrame>> {
        let spec = self
            .gallery
            .dataset(name)
            .ok_or_else(|| DataError::UnknownDataset {
                name: name.to_string(),
            })?;
        let path = self.data_dir.join(&spec.file);
        Ok(self.store.load_file(name, &path, &spec.rename)?)
    }
}
/// Filters on the control's column when the table has it; otherwise a
/// seeded sample stands in for the selection.
fn apply_control(table: &DataFrame, control: &ControlSpec, value: &str) -> Result<DataFrame> {
    if value == control.all_option {
        return Ok(table.clone());
    }
    if table.has_column(&control.column) {
        let condition = FilterCondition::new(
            control.column.clone(),
            ComparisonOperator::Equal,
            FilterValue::String(value.to_string()),
        );
        return Ok(table.filter_by(&condition)?);
    }
    match control.fallback_sample {
        Some(n) => {
            let offset = control.option_index(value).unwrap_or_default() as u64;
            debug!(
                control = %control.id,
                column = %control.column,
                rows = n,
                "Column absent, sampling rows instead"
            );
            Ok(table.sample(n, control.seed.wrapping_add(offset))?)
        }
        None => {
            warn!(
                control = %control.id,
                column = %control.column,
                "Column absent and no fallback sample; control ignored"
            );
            Ok(table.clone())
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handler::ColumnData;
    use crate::error::PresentationError;
    use std::fs;
    use tempfile::TempDir;

    const GALLERY: &str = r#"
title: Session test
datasets:
  - name: gap
    file: gap.csv
  - name: missing
    file: missing.csv
tabs:
  - id: intro
    title: Introduction
  - id: interactivity
    title: Interactivity
    controls:
      - id: continent
        label: Filter by continent
        options: [All, Europe, Asia]
        default: All
        column: continent
        fallback_sample: 2
        seed: 7
    examples:
      - id: scatter
        verdict: good
        heading: Scatter
        dataset: gap
        control: continent
        chart:
          kind: scatter
          encoding: { x: income, y: alcohol, hover_name: country }
      - id: broken
        verdict: bad
        heading: Broken
        dataset: missing
        chart:
          kind: scatter
          encoding: { x: income, y: alcohol }
      - id: words
        verdict: ugly
        heading: Words
        note: nothing to draw
"#;

    fn session(csv: &str) -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("gap.csv"), csv).unwrap();
        let gallery = Gallery::from_yaml_str(GALLERY).unwrap();
        let session = Session::new(gallery, dir.path());
        (dir, session)
    }

    #[test]
    fn failed_example_does_not_abort_the_tab() {
        let (_dir, mut session) = session("country,income,alcohol\nA,1,2\nB,3,4\nC,5,6\n");
        let view = session.dispatch(SessionEvent::SelectTab { index: 1 }).unwrap();
        assert_eq!(view.examples.len(), 3);
        assert!(matches!(view.examples[0].outcome, ExampleOutcome::Chart { .. }));
        assert!(matches!(
            &view.examples[1].outcome,
            ExampleOutcome::Failed { category, message }
                if category == "Data" && message.contains("missing.csv")
        ));
        assert_eq!(view.examples[2].outcome, ExampleOutcome::TextOnly);
        assert_eq!(view.failures().count(), 1);
    }

    #[test]
    fn control_filters_on_column_when_present() {
        let (_dir, mut session) =
            session("country,continent,income,alcohol\nA,Europe,1,2\nB,Asia,3,4\nC,Europe,5,6\n");
        session
            .dispatch(SessionEvent::SetControl {
                control: "continent".to_string(),
                value: "Europe".to_string(),
            })
            .unwrap();
        let table = session.example_table("scatter").unwrap();
        assert_eq!(table.row_count(), 2);
        let column = table.column("continent").unwrap();
        assert!((0..2).all(|i| column.get_string(i).as_deref() == Some("Europe")));
    }

    #[test]
    fn control_samples_when_column_is_absent() {
        let (_dir, mut session) = session("country,income,alcohol\nA,1,2\nB,3,4\nC,5,6\n");
        assert_eq!(session.example_table("scatter").unwrap().row_count(), 3);
        session
            .set_control("continent", "Asia".to_string())
            .unwrap();
        let first = session.example_table("scatter").unwrap();
        let second = session.example_table("scatter").unwrap();
        assert_eq!(first.row_count(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_control_value_is_rejected() {
        let (_dir, mut session) = session("country,income,alcohol\nA,1,2\n");
        let err = session
            .dispatch(SessionEvent::SetControl {
                control: "continent".to_string(),
                value: "Antarctica".to_string(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            PresentationError::Config(ConfigError::UnknownControlValue { .. })
        ));
        assert_eq!(session.control_value("continent"), Some("All"));
    }

    #[test]
    fn selecting_missing_tab_keeps_current_tab() {
        let (_dir, mut session) = session("country,income,alcohol\nA,1,2\n");
        assert!(session.dispatch(SessionEvent::SelectTab { index: 9 }).is_err());
        assert_eq!(session.active_tab(), 0);
    }

    #[test]
    fn reload_rereads_tables() {
        let (dir, mut session) = session("country,income,alcohol\nA,1,2\n");
        let before = session.dataset("gap").unwrap();
        fs::write(dir.path().join("gap.csv"), "country,income,alcohol\nA,1,2\nB,3,4\n").unwrap();
        session.dispatch(SessionEvent::Reload).unwrap();
        let after = session.dataset("gap").unwrap();
        assert_eq!(before.row_count(), 1);
        assert_eq!(after.row_count(), 2);
    }

    #[test]
    fn events_round_trip_through_json() {
        let event: SessionEvent =
            serde_json::from_str(r#"{"event":"set_control","control":"continent","value":"Asia"}"#)
                .unwrap();
        assert_eq!(
            event,
            SessionEvent::SetControl {
                control: "continent".to_string(),
                value: "Asia".to_string(),
            }
        );
    }
}
