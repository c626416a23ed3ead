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

use crate::chart::ChartConfig;
use crate::data_handler::{ColumnBuilder, DataFrame, Transform};
use crate::error::{ConfigError, ConfigResult, DataResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;
/// The presentation shipped with the crate.
pub const DEFAULT_PRESENTATION: &str = include_str!("../config/presentation.yml");
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub file: String,
    /// Column renames applied right after loading.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rename: BTreeMap<String, String>,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Good,
    Bad,
    Ugly,
}
impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Verdict::Good => "Good",
            Verdict::Bad => "Bad",
            Verdict::Ugly => "Ugly",
        })
    }
}
/// A selector whose value narrows the rows of the examples bound to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub id: String,
    pub label: String,
    pub options: Vec<String>,
    pub default: String,
    /// Option that leaves the table untouched.
    #[serde(default = "default_all_option")]
    pub all_option: String,
    /// Column compared against the selected option.
    pub column: String,
    /// Rows sampled instead when the table has no such column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_sample: Option<usize>,
    #[serde(default)]
    pub seed: u64,
}
fn default_all_option() -> String {
    "All".to_string()
}
impl ControlSpec {
    pub fn option_index(&self, value: &str) -> Option<usize> {
        self.options.iter().position(|option| option == value)
    }
}
/// One column of a small table written straight into the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineColumn {
    pub name: String,
    pub values: Vec<serde_yaml::Value>,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    pub verdict: Verdict,
    pub heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub commentary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Text shown in place of a chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline: Vec<InlineColumn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartConfig>,
    /// Id of a control on the same tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<String>,
}
impl Example {
    pub fn has_data(&self) -> bool {
        self.dataset.is_some() || !self.inline.is_empty()
    }
    /// Builds the inline table, inferring column types as the CSV loader does.
    pub fn inline_table(&self) -> DataResult<DataFrame> {
        let mut frame = DataFrame::new(crate::data_handler::DatasetMetadata::named(&self.id));
        for column in &self.inline {
            let mut builder = ColumnBuilder::with_capacity(column.name.clone(), column.values.len());
            for value in &column.values {
                let cell = yaml_cell(value);
                builder.push(cell.as_deref());
            }
            frame.add_column(column.name.clone(), builder.build()?)?;
        }
        Ok(frame)
    }
}
fn yaml_cell(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => None,
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        other => serde_yaml::to_string(other).ok().map(|s| s.trim().to_string()),
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default)]
    pub intro: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<ControlSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
}
impl Tab {
    pub fn control(&self, id: &str) -> Option<&ControlSpec> {
        self.controls.iter().find(|control| control.id == id)
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    pub title: String,
    #[serde(default)]
    pub tagline: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<DatasetSpec>,
    pub tabs: Vec<Tab>,
}
impl Gallery {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
    pub fn from_yaml_str(yaml_content: &str) -> ConfigResult<Self> {
        let gallery: Gallery = serde_yaml::from_str(yaml_content)?;
        gallery
            .validate()
            .map_err(|reason| ConfigError::ValidationFailed { reason })?;
        debug!(
            tabs = gallery.tabs.len(),
            datasets = gallery.datasets.len(),
            "Loaded presentation config"
        );
        Ok(gallery)
    }
    pub fn default_presentation() -> ConfigResult<Self> {
        Self::from_yaml_str(DEFAULT_PRESENTATION)
    }
    pub fn validate(&self) -> Result<(), String> {
        if self.tabs.is_empty() {
            return Err("presentation has no tabs".to_string());
        }
        let mut dataset_names = HashSet::new();
        for dataset in &self.datasets {
            if !dataset_names.insert(dataset.name.as_str()) {
                return Err(format!("Duplicate dataset name: {}", dataset.name));
            }
            if dataset.file.is_empty() {
                return Err(format!("Dataset '{}' has no file", dataset.name));
            }
        }
        let mut tab_ids = HashSet::new();
        let mut tab_titles = HashSet::new();
        let mut example_ids = HashSet::new();
        let mut control_ids = HashSet::new();
        for tab in &self.tabs {
            if !tab_ids.insert(tab.id.as_str()) {
                return Err(format!("Duplicate tab id: {}", tab.id));
            }
            if !tab_titles.insert(tab.title.as_str()) {
                return Err(format!("Duplicate tab title: {}", tab.title));
            }
            for control in &tab.controls {
                if !control_ids.insert(control.id.as_str()) {
                    return Err(format!("Duplicate control id: {}", control.id));
                }
                if control.options.is_empty() {
                    return Err(format!("Control '{}' has no options", control.id));
                }
                if control.option_index(&control.default).is_none() {
                    return Err(format!(
                        "Control '{}' default '{}' is not one of its options",
                        control.id, control.default
                    ));
                }
            }
            for example in &tab.examples {
                if !example_ids.insert(example.id.as_str()) {
                    return Err(format!("Duplicate example id: {}", example.id));
                }
                Self::validate_example(tab, example, &dataset_names)?;
            }
        }
        Ok(())
    }
    fn validate_example(tab: &Tab, example: &Example, datasets: &HashSet<&str>) -> Result<(), String> {
        let id = &example.id;
        if example.dataset.is_some() && !example.inline.is_empty() {
            return Err(format!("Example '{id}' has both a dataset and an inline table"));
        }
        if let Some(dataset) = &example.dataset {
            if !datasets.contains(dataset.as_str()) {
                return Err(format!("Example '{id}' uses undeclared dataset '{dataset}'"));
            }
        }
        for step in &example.transforms {
            if let Some(dataset) = step.referenced_dataset() {
                if !datasets.contains(dataset) {
                    return Err(format!("Example '{id}' joins undeclared dataset '{dataset}'"));
                }
            }
        }
        if let Some(columns) = example.inline.first().map(|c| c.values.len()) {
            if example.inline.iter().any(|c| c.values.len() != columns) {
                return Err(format!("Example '{id}' has inline columns of different lengths"));
            }
        }
        if let Some(chart) = &example.chart {
            if !example.has_data() {
                return Err(format!("Example '{id}' has a chart but no data"));
            }
            chart
                .validate()
                .map_err(|reason| format!("Example '{id}': {reason}"))?;
        } else if !example.transforms.is_empty() && !example.has_data() {
            return Err(format!("Example '{id}' has transforms but no data"));
        }
        if let Some(control) = &example.control {
            if tab.control(control).is_none() {
                return Err(format!(
                    "Example '{id}' is bound to control '{control}' which tab '{}' does not declare",
                    tab.id
                ));
            }
        }
        Ok(())
    }
    pub fn dataset(&self, name: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|dataset| dataset.name == name)
    }
    pub fn tab(&self, index: usize) -> ConfigResult<&Tab> {
        self.tabs.get(index).ok_or_else(|| ConfigError::UnknownTab {
            tab: index.to_string(),
        })
    }
    /// Finds a tab by position, id or title (case-insensitive).
    pub fn tab_index(&self, key: &str) -> ConfigResult<usize> {
        if let Ok(index) = key.parse::<usize>() {
            if index < self.tabs.len() {
                return Ok(index);
            }
        }
        self.tabs
            .iter()
            .position(|tab| tab.id.eq_ignore_ascii_case(key) || tab.title.eq_ignore_ascii_case(key))
            .ok_or_else(|| ConfigError::UnknownTab {
                tab: key.to_string(),
            })
    }
    /// Returns the example with `id` and the index of its tab.
    pub fn example(&self, id: &str) -> ConfigResult<(usize, &Example)> {
        self.tabs
            .iter()
            .enumerate()
            .find_map(|(index, tab)| {
                tab.examples
                    .iter()
                    .find(|example| example.id == id)
                    .map(|example| (index, example))
            })
            .ok_or_else(|| ConfigError::UnknownExample { id: id.to_string() })
    }
    /// Looks a control up across every tab.
    pub fn control(&self, id: &str) -> Option<&ControlSpec> {
        self.tabs.iter().find_map(|tab| tab.control(id))
    }
    pub fn controls(&self) -> impl Iterator<Item = &ControlSpec> {
        self.tabs.iter().flat_map(|tab| tab.controls.iter())
    }
}
