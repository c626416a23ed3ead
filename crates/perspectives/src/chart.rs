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

use crate::data_handler::{Column, ColumnData, DataFrame};
use crate::error::{ChartError, ChartResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
pub const DEFAULT_SIZE_MAX: f64 = 20.0;
pub const DEFAULT_CONTINUOUS_SCALE: &str = "Plasma";
pub const DEFAULT_LOCATION_MODE: &str = "country names";
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Scatter,
    Scatter3d,
    Pie,
    Choropleth,
}
impl ChartKind {
    pub fn required_roles(self) -> &'static [&'static str] {
        match self {
            ChartKind::Bar | ChartKind::Scatter => &["x", "y"],
            ChartKind::Scatter3d => &["x", "y", "z"],
            ChartKind::Pie => &["names", "values"],
            ChartKind::Choropleth => &["locations", "color"],
        }
    }
    /// Every role the kind draws; anything else mapped is an error.
    pub fn supported_roles(self) -> &'static [&'static str] {
        match self {
            ChartKind::Bar => &["x", "y", "color", "hover_name"],
            ChartKind::Scatter => &["x", "y", "size", "color", "hover_name"],
            ChartKind::Scatter3d => &["x", "y", "z", "size", "color", "hover_name"],
            ChartKind::Pie => &["names", "values", "hover_name"],
            ChartKind::Choropleth => &["locations", "color", "hover_name"],
        }
    }
    fn has_axes(self) -> bool {
        matches!(self, ChartKind::Bar | ChartKind::Scatter | ChartKind::Scatter3d)
    }
    fn trace_type(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
            ChartKind::Scatter3d => "scatter3d",
            ChartKind::Pie => "pie",
            ChartKind::Choropleth => "choropleth",
        }
    }
}
impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.trace_type())
    }
}
/// Visual role → column name. Unset roles are simply not drawn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Encoding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_name: Option<String>,
}
impl Encoding {
    pub fn role(&self, role: &str) -> Option<&str> {
        let column = match role {
            "x" => &self.x,
            "y" => &self.y,
            "z" => &self.z,
            "size" => &self.size,
            "color" => &self.color,
            "names" => &self.names,
            "values" => &self.values,
            "locations" => &self.locations,
            "hover_name" => &self.hover_name,
            _ => &None,
        };
        column.as_deref()
    }
    pub fn mappings(&self) -> BTreeMap<String, String> {
        [
            "x",
            "y",
            "z",
            "size",
            "color",
            "names",
            "values",
            "locations",
            "hover_name",
        ]
        .into_iter()
        .filter_map(|role| self.role(role).map(|column| (role.to_string(), column.to_string())))
        .collect()
    }
}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    #[serde(rename = "v")]
    Vertical,
    #[serde(rename = "h")]
    Horizontal,
}
/// Extra bar trace drawn behind the main bars, e.g. an inflated "shadow".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Underlay {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_color: Option<String>,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub kind: ChartKind,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scale: Option<String>,
    #[serde(default)]
    pub log_x: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_max: Option<f64>,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub reverse_y: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_color: Option<String>,
    #[serde(default)]
    pub show_grid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_legend: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub underlays: Vec<Underlay>,
}
impl ChartConfig {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            encoding: Encoding::default(),
            title: None,
            x_title: None,
            y_title: None,
            z_title: None,
            color_scale: None,
            log_x: false,
            size_max: None,
            orientation: Orientation::default(),
            reverse_y: false,
            marker_color: None,
            show_grid: false,
            show_legend: None,
            hover_template: None,
            text_info: None,
            bar_width: None,
            location_mode: None,
            underlays: Vec::new(),
        }
    }
    /// Checks the parts of a config that do not depend on data.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(size_max) = self.size_max {
            if !(size_max.is_finite() && size_max > 0.0) {
                return Err(format!("size_max must be positive, got {size_max}"));
            }
        }
        if let Some(width) = self.bar_width {
            if !(width.is_finite() && width > 0.0) {
                return Err(format!("bar_width must be positive, got {width}"));
            }
        }
        if !self.underlays.is_empty() && self.kind != ChartKind::Bar {
            return Err(format!("underlays are only drawn on bar charts, not {}", self.kind));
        }
        if !self.kind.has_axes() && (self.log_x || self.reverse_y || self.show_grid) {
            return Err(format!("{} charts have no axes to log, reverse or grid", self.kind));
        }
        Ok(())
    }
}
/// A built chart: the Plotly figure plus what went into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSpec {
    pub kind: ChartKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub mappings: BTreeMap<String, String>,
    pub row_count: usize,
    pub figure: Value,
}
#[derive(Debug, Clone)]
pub struct ChartBuilder {
    default_size_max: f64,
    default_color_scale: String,
}
impl Default for ChartBuilder {
    fn default() -> Self {
        Self {
            default_size_max: DEFAULT_SIZE_MAX,
            default_color_scale: DEFAULT_CONTINUOUS_SCALE.to_string(),
        }
    }
}
impl ChartBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_default_size_max(mut self, size_max: f64) -> Self {
        self.default_size_max = size_max;
        self
    }
    pub fn with_default_color_scale(mut self, scale: impl Into<String>) -> Self {
        self.default_color_scale = scale.into();
        self
    }
    pub fn build(&self, frame: &DataFrame, config: &ChartConfig) -> ChartResult<RenderSpec> {
        config
            .validate()
            .map_err(|reason| ChartError::InvalidConfig { reason })?;
        for role in config.encoding.mappings().keys() {
            if !config.kind.supported_roles().contains(&role.as_str()) {
                return Err(ChartError::UnsupportedRole {
                    chart: config.kind.to_string(),
                    role: role.clone(),
                });
            }
        }
        for role in config.kind.required_roles() {
            if config.encoding.role(role).is_none() {
                return Err(ChartError::MissingRole {
                    chart: config.kind.to_string(),
                    role: role.to_string(),
                });
            }
        }
        let roles = ResolvedRoles::resolve(frame, config)?;
        let traces = match config.kind {
            ChartKind::Bar => self.bar_traces(frame, &roles, config)?,
            ChartKind::Scatter | ChartKind::Scatter3d => self.scatter_traces(frame, &roles, config),
            ChartKind::Pie => vec![pie_trace(&roles, config)],
            ChartKind::Choropleth => vec![self.choropleth_trace(&roles, config)],
        };
        let layout = self.layout(config);
        debug!(
            kind = %config.kind,
            rows = frame.row_count(),
            traces = traces.len(),
            "Built chart"
        );
        Ok(RenderSpec {
            kind: config.kind,
            title: config.title.clone(),
            mappings: config.encoding.mappings(),
            row_count: frame.row_count(),
            figure: json!({ "data": traces, "layout": layout }),
        })
    }
    fn bar_traces(
        &self,
        frame: &DataFrame,
        roles: &ResolvedRoles,
        config: &ChartConfig,
    ) -> ChartResult<Vec<Value>> {
        let horizontal = config.orientation == Orientation::Horizontal;
        let (x, y) = (required(roles.x, "x")?, required(roles.y, "y")?);
        let mut traces = Vec::with_capacity(roles.underlays.len() + 1);
        for (underlay, column) in config.underlays.iter().zip(&roles.underlays) {
            let (ux, uy) = if horizontal {
                (column_json(column), column_json(y))
            } else {
                (column_json(x), column_json(column))
            };
            let mut trace = bar_trace(ux, uy, config);
            trace["name"] = json!(underlay.column);
            if let Some(colour) = &underlay.marker_color {
                trace["marker"]["color"] = json!(colour);
            }
            traces.push(trace);
        }
        let all_rows: Vec<usize> = (0..frame.row_count()).collect();
        let main_trace = |rows: &[usize]| {
            let mut trace = bar_trace(values_at(x, rows), values_at(y, rows), config);
            if let Some(hover) = roles.hover_name {
                trace["hovertext"] = values_at(hover, rows);
            }
            if let Some(template) = &config.hover_template {
                trace["hovertemplate"] = json!(template);
            }
            trace
        };
        match roles.color {
            Some((column, ColourMode::Categorical)) => {
                for (key, rows) in group_rows(column, &all_rows) {
                    let mut trace = main_trace(&rows);
                    trace["name"] = json!(key);
                    trace["legendgroup"] = json!(key);
                    trace["showlegend"] = json!(true);
                    traces.push(trace);
                }
            }
            Some((column, ColourMode::Continuous)) => {
                let mut trace = main_trace(&all_rows);
                self.continuous_marker(&mut trace, column, &all_rows, config);
                traces.push(trace);
            }
            None => {
                let mut trace = main_trace(&all_rows);
                if let Some(colour) = &config.marker_color {
                    trace["marker"]["color"] = json!(colour);
                }
                traces.push(trace);
            }
        }
        Ok(traces)
    }
    fn continuous_marker(&self, trace: &mut Value, column: &Column, rows: &[usize], config: &ChartConfig) {
        trace["marker"]["color"] = values_at(column, rows);
        trace["marker"]["colorscale"] = json!(config
            .color_scale
            .as_deref()
            .unwrap_or(&self.default_color_scale));
        trace["marker"]["showscale"] = json!(true);
        if let Some(name) = &config.encoding.color {
            trace["marker"]["colorbar"] = json!({ "title": { "text": name } });
        }
    }
    fn scatter_traces(&self, frame: &DataFrame, roles: &ResolvedRoles, config: &ChartConfig) -> Vec<Value> {
        let all_rows: Vec<usize> = (0..frame.row_count()).collect();
        let sizeref = roles.size.map(|size| {
            let size_max = config.size_max.unwrap_or(self.default_size_max);
            let max = (0..size.len())
                .filter_map(|i| size.to_f64(i))
                .fold(f64::NAN, f64::max);
            if max.is_finite() && max > 0.0 {
                2.0 * max / (size_max * size_max)
            } else {
                1.0
            }
        });
        match roles.color {
            Some((column, ColourMode::Categorical)) => {
                group_rows(column, &all_rows)
                    .into_iter()
                    .map(|(key, rows)| {
                        let mut trace = self.scatter_trace(roles, config, &rows, sizeref);
                        trace["name"] = json!(key);
                        trace["legendgroup"] = json!(key);
                        trace["showlegend"] = json!(true);
                        trace
                    })
                    .collect()
            }
            Some((column, ColourMode::Continuous)) => {
                let mut trace = self.scatter_trace(roles, config, &all_rows, sizeref);
                self.continuous_marker(&mut trace, column, &all_rows, config);
                vec![trace]
            }
            None => {
                let mut trace = self.scatter_trace(roles, config, &all_rows, sizeref);
                if let Some(colour) = &config.marker_color {
                    trace["marker"]["color"] = json!(colour);
                }
                vec![trace]
            }
        }
    }
    fn scatter_trace(
        &self,
        roles: &ResolvedRoles,
        config: &ChartConfig,
        rows: &[usize],
        sizeref: Option<f64>,
    ) -> Value {
        let mut trace = Map::new();
        trace.insert("type".into(), json!(config.kind.trace_type()));
        trace.insert("mode".into(), json!("markers"));
        for (key, column) in [("x", roles.x), ("y", roles.y), ("z", roles.z)] {
            if let Some(column) = column {
                trace.insert(key.into(), values_at(column, rows));
            }
        }
        let mut marker = Map::new();
        if let (Some(size), Some(sizeref)) = (roles.size, sizeref) {
            marker.insert("size".into(), values_at(size, rows));
            marker.insert("sizemode".into(), json!("area"));
            marker.insert("sizeref".into(), json!(sizeref));
        }
        trace.insert("marker".into(), Value::Object(marker));
        if let Some(hover) = roles.hover_name {
            trace.insert("hovertext".into(), values_at(hover, rows));
        }
        if let Some(template) = &config.hover_template {
            trace.insert("hovertemplate".into(), json!(template));
        }
        Value::Object(trace)
    }
    fn choropleth_trace(&self, roles: &ResolvedRoles, config: &ChartConfig) -> Value {
        let mut trace = json!({
            "type": "choropleth",
            "locationmode": config.location_mode.as_deref().unwrap_or(DEFAULT_LOCATION_MODE),
            "colorscale": config.color_scale.as_deref().unwrap_or(&self.default_color_scale),
        });
        if let Some(locations) = roles.locations {
            trace["locations"] = column_json(locations);
        }
        if let Some((colour, _)) = roles.color {
            trace["z"] = column_json(colour);
        }
        if let Some(hover) = roles.hover_name {
            trace["hovertext"] = column_json(hover);
        }
        if let Some(name) = &config.encoding.color {
            trace["colorbar"] = json!({ "title": { "text": name } });
        }
        if let Some(template) = &config.hover_template {
            trace["hovertemplate"] = json!(template);
        }
        trace
    }
    fn layout(&self, config: &ChartConfig) -> Value {
        let mut layout = json!({
            "margin": { "l": 0, "r": 0, "t": 30, "b": 0 },
        });
        if let Some(title) = &config.title {
            layout["title"] = json!({ "text": title });
        }
        if let Some(show_legend) = config.show_legend {
            layout["showlegend"] = json!(show_legend);
        }
        match config.kind {
            ChartKind::Bar | ChartKind::Scatter => {
                let mut xaxis = axis(config.x_title.as_deref(), config.show_grid);
                let mut yaxis = axis(config.y_title.as_deref(), config.show_grid);
                if config.log_x {
                    xaxis["type"] = json!("log");
                }
                if config.reverse_y {
                    yaxis["autorange"] = json!("reversed");
                }
                layout["xaxis"] = xaxis;
                layout["yaxis"] = yaxis;
                if !config.underlays.is_empty() {
                    layout["barmode"] = json!("overlay");
                }
            }
            ChartKind::Scatter3d => {
                let mut xaxis = axis(config.x_title.as_deref(), config.show_grid);
                let mut yaxis = axis(config.y_title.as_deref(), config.show_grid);
                if config.log_x {
                    xaxis["type"] = json!("log");
                }
                if config.reverse_y {
                    yaxis["autorange"] = json!("reversed");
                }
                layout["scene"] = json!({
                    "xaxis": xaxis,
                    "yaxis": yaxis,
                    "zaxis": axis(config.z_title.as_deref(), config.show_grid),
                });
            }
            ChartKind::Pie | ChartKind::Choropleth => {}
        }
        layout
    }
}
/// Builds `config` against `frame` with the default builder settings.
pub fn build_chart(frame: &DataFrame, config: &ChartConfig) -> ChartResult<RenderSpec> {
    ChartBuilder::new().build(frame, config)
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColourMode {
    Continuous,
    Categorical,
}
#[derive(Debug, Default)]
struct ResolvedRoles<'a> {
    x: Option<&'a Column>,
    y: Option<&'a Column>,
    z: Option<&'a Column>,
    size: Option<&'a Column>,
    color: Option<(&'a Column, ColourMode)>,
    names: Option<&'a Column>,
    values: Option<&'a Column>,
    locations: Option<&'a Column>,
    hover_name: Option<&'a Column>,
    underlays: Vec<&'a Column>,
}
impl<'a> ResolvedRoles<'a> {
    fn resolve(frame: &'a DataFrame, config: &ChartConfig) -> ChartResult<Self> {
        let encoding = &config.encoding;
        let lookup = |role: &str| -> ChartResult<Option<&'a Column>> {
            encoding
                .role(role)
                .map(|name| column_for(frame, role, name))
                .transpose()
        };
        let numeric_roles = numeric_roles(config);
        let mut roles = ResolvedRoles {
            x: lookup("x")?,
            y: lookup("y")?,
            z: lookup("z")?,
            size: lookup("size")?,
            names: lookup("names")?,
            values: lookup("values")?,
            locations: lookup("locations")?,
            hover_name: lookup("hover_name")?,
            ..ResolvedRoles::default()
        };
        if let Some(column) = lookup("color")? {
            let mode = if column.data_type().is_numeric() {
                ColourMode::Continuous
            } else if config.kind == ChartKind::Choropleth {
                return Err(type_mismatch("color", encoding.color.as_deref(), column));
            } else {
                ColourMode::Categorical
            };
            roles.color = Some((column, mode));
        }
        for role in numeric_roles {
            let column = match role {
                "x" => roles.x,
                "y" => roles.y,
                "size" => roles.size,
                "values" => roles.values,
                _ => None,
            };
            if let Some(column) = column {
                if !column.data_type().is_numeric() {
                    return Err(type_mismatch(role, encoding.role(role), column));
                }
            }
        }
        for underlay in &config.underlays {
            let column = column_for(frame, "underlay", &underlay.column)?;
            if !column.data_type().is_numeric() {
                return Err(type_mismatch("underlay", Some(&underlay.column), column));
            }
            roles.underlays.push(column);
        }
        Ok(roles)
    }
}
/// Roles that must hold numbers for the chart to make sense.
fn numeric_roles(config: &ChartConfig) -> Vec<&'static str> {
    let mut roles = vec!["size", "values"];
    if config.kind == ChartKind::Bar {
        roles.push(match config.orientation {
            Orientation::Vertical => "y",
            Orientation::Horizontal => "x",
        });
    }
    if config.log_x {
        roles.push("x");
    }
    roles
}
fn column_for<'a>(frame: &'a DataFrame, role: &str, name: &str) -> ChartResult<&'a Column> {
    frame.get_column(name).ok_or_else(|| ChartError::MissingColumn {
        role: role.to_string(),
        column: name.to_string(),
    })
}
fn required<'a>(column: Option<&'a Column>, role: &str) -> ChartResult<&'a Column> {
    column.ok_or_else(|| ChartError::MissingRole {
        chart: ChartKind::Bar.to_string(),
        role: role.to_string(),
    })
}
fn type_mismatch(role: &str, name: Option<&str>, column: &Column) -> ChartError {
    ChartError::DataTypeMismatch {
        role: role.to_string(),
        column: name.unwrap_or_default().to_string(),
        found: column.data_type().to_string(),
    }
}
/// Row indices per distinct non-null value, in order of first appearance.
fn group_rows(column: &Column, rows: &[usize]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for &i in rows {
        let Some(key) = column.get_string(i) else {
            continue;
        };
        match groups.iter().position(|(existing, _)| *existing == key) {
            Some(position) => groups[position].1.push(i),
            None => groups.push((key, vec![i])),
        }
    }
    groups
}
fn column_json(column: &Column) -> Value {
    Value::Array((0..column.len()).map(|i| column.to_json(i)).collect())
}
fn values_at(column: &Column, rows: &[usize]) -> Value {
    Value::Array(rows.iter().map(|&i| column.to_json(i)).collect())
}
fn bar_trace(x: Value, y: Value, config: &ChartConfig) -> Value {
    let mut trace = json!({
        "type": "bar",
        "x": x,
        "y": y,
        "orientation": config.orientation,
        "marker": { "line": { "width": 0 } },
    });
    if let Some(width) = config.bar_width {
        trace["width"] = json!(width);
    }
    trace
}
fn pie_trace(roles: &ResolvedRoles, config: &ChartConfig) -> Value {
    let mut trace = json!({ "type": "pie" });
    if let Some(names) = roles.names {
        trace["labels"] = column_json(names);
    }
    if let Some(values) = roles.values {
        trace["values"] = column_json(values);
    }
    if let Some(hover) = roles.hover_name {
        trace["hovertext"] = column_json(hover);
    }
    if let Some(text_info) = &config.text_info {
        trace["textinfo"] = json!(text_info);
    }
    if let Some(template) = &config.hover_template {
        trace["hovertemplate"] = json!(template);
    }
    trace
}
fn axis(title: Option<&str>, show_grid: bool) -> Value {
    let mut axis = json!({});
    if let Some(title) = title {
        axis["title"] = json!({ "text": title });
    }
    if show_grid {
        axis["showgrid"] = json!(true);
        axis["griddash"] = json!("dash");
    }
    axis
}
#[cfg(test)]
mod tests {
    use super::*;

    fn coffee() -> DataFrame {
        DataFrame::from_columns(
            "coffee",
            [
                (
                    "country".to_string(),
                    Column::from_strs(&[Some("Finland"), Some("Norway")]),
                ),
                (
                    "kg".to_string(),
                    Column::from_f64s(vec![Some(12.0), Some(9.9)]),
                ),
                (
                    "region".to_string(),
                    Column::from_strs(&[Some("Nordic"), Some("Nordic")]),
                ),
            ],
        )
        .unwrap()
    }

    fn horizontal_bar() -> ChartConfig {
        let mut config = ChartConfig::new(ChartKind::Bar);
        config.encoding.x = Some("kg".to_string());
        config.encoding.y = Some("country".to_string());
        config.orientation = Orientation::Horizontal;
        config.reverse_y = true;
        config.marker_color = Some("white".to_string());
        config
    }

    #[test]
    fn horizontal_bar_maps_roles_and_reverses_y() {
        let spec = build_chart(&coffee(), &horizontal_bar()).unwrap();
        let trace = &spec.figure["data"][0];
        assert_eq!(trace["type"], "bar");
        assert_eq!(trace["orientation"], "h");
        assert_eq!(trace["x"], json!([12.0, 9.9]));
        assert_eq!(trace["y"], json!(["Finland", "Norway"]));
        assert_eq!(trace["marker"]["color"], "white");
        assert_eq!(spec.figure["layout"]["yaxis"]["autorange"], "reversed");
        assert_eq!(spec.mappings["x"], "kg");
        assert_eq!(spec.row_count, 2);
    }

    #[test]
    fn missing_column_fails_at_build_time() {
        let mut config = horizontal_bar();
        config.encoding.x = Some("tonnes".to_string());
        let err = build_chart(&coffee(), &config).unwrap_err();
        assert!(matches!(err, ChartError::MissingColumn { role, column } if role == "x" && column == "tonnes"));
    }

    #[test]
    fn unmapped_required_role_is_reported() {
        let mut config = ChartConfig::new(ChartKind::Pie);
        config.encoding.names = Some("country".to_string());
        let err = build_chart(&coffee(), &config).unwrap_err();
        assert!(matches!(err, ChartError::MissingRole { role, .. } if role == "values"));
    }

    #[test]
    fn text_in_value_axis_is_a_type_mismatch() {
        let mut config = horizontal_bar();
        config.encoding.x = Some("region".to_string());
        let err = build_chart(&coffee(), &config).unwrap_err();
        assert!(matches!(err, ChartError::DataTypeMismatch { role, .. } if role == "x"));
    }

    #[test]
    fn marker_area_follows_size_max() {
        let frame = DataFrame::from_columns(
            "symbols",
            [
                ("A".to_string(), Column::from_i64s(vec![Some(10)])),
                ("B".to_string(), Column::from_i64s(vec![Some(20)])),
            ],
        )
        .unwrap();
        let mut config = ChartConfig::new(ChartKind::Scatter);
        config.encoding.x = Some("A".to_string());
        config.encoding.y = Some("B".to_string());
        config.encoding.size = Some("B".to_string());
        config.size_max = Some(60.0);
        let spec = build_chart(&frame, &config).unwrap();
        let marker = &spec.figure["data"][0]["marker"];
        assert_eq!(marker["sizemode"], "area");
        let sizeref = marker["sizeref"].as_f64().unwrap();
        assert!((sizeref - 2.0 * 20.0 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn categorical_colour_splits_traces() {
        let frame = DataFrame::from_columns(
            "mixed",
            [
                (
                    "x".to_string(),
                    Column::from_f64s(vec![Some(1.0), Some(2.0), Some(3.0)]),
                ),
                (
                    "y".to_string(),
                    Column::from_f64s(vec![Some(1.0), Some(2.0), Some(3.0)]),
                ),
                (
                    "continent".to_string(),
                    Column::from_strs(&[Some("Asia"), Some("Europe"), Some("Asia")]),
                ),
            ],
        )
        .unwrap();
        let mut config = ChartConfig::new(ChartKind::Scatter);
        config.encoding.x = Some("x".to_string());
        config.encoding.y = Some("y".to_string());
        config.encoding.color = Some("continent".to_string());
        let spec = build_chart(&frame, &config).unwrap();
        let traces = spec.figure["data"].as_array().unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0]["name"], "Asia");
        assert_eq!(traces[0]["x"], json!([1.0, 3.0]));
        assert_eq!(traces[1]["name"], "Europe");
    }

    #[test]
    fn continuous_colour_uses_scale() {
        let mut config = ChartConfig::new(ChartKind::Choropleth);
        config.encoding.locations = Some("country".to_string());
        config.encoding.color = Some("kg".to_string());
        config.color_scale = Some("Viridis".to_string());
        let spec = build_chart(&coffee(), &config).unwrap();
        let trace = &spec.figure["data"][0];
        assert_eq!(trace["colorscale"], "Viridis");
        assert_eq!(trace["locationmode"], "country names");
        assert_eq!(trace["z"], json!([12.0, 9.9]));
    }

    #[test]
    fn underlays_draw_first_in_overlay_mode() {
        let frame = coffee().scale_column("kg", 1.1, Some("shadow")).unwrap();
        let mut config = horizontal_bar();
        config.marker_color = Some("darkgray".to_string());
        config.bar_width = Some(0.5);
        config.underlays.push(Underlay {
            column: "shadow".to_string(),
            marker_color: Some("lightgray".to_string()),
        });
        let spec = build_chart(&frame, &config).unwrap();
        let traces = spec.figure["data"].as_array().unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0]["marker"]["color"], "lightgray");
        assert_eq!(traces[1]["marker"]["color"], "darkgray");
        assert_eq!(traces[1]["width"], 0.5);
        assert_eq!(spec.figure["layout"]["barmode"], "overlay");
    }

    #[test]
    fn config_rejects_non_positive_size_max() {
        let mut config = ChartConfig::new(ChartKind::Scatter);
        config.size_max = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut config = ChartConfig::new(ChartKind::Scatter);
        config.encoding.x = Some("kg".to_string());
        config.encoding.y = Some("kg".to_string());
        config.encoding.size = Some("kg".to_string());
        config.size_max = Some(0.0);
        let err = build_chart(&coffee(), &config).unwrap_err();
        assert!(matches!(err, ChartError::InvalidConfig { .. }));
    }

    #[test]
    fn bar_draws_colour_and_hover_roles() {
        let mut config = ChartConfig::new(ChartKind::Bar);
        config.encoding.x = Some("country".to_string());
        config.encoding.y = Some("kg".to_string());
        config.encoding.color = Some("kg".to_string());
        config.encoding.hover_name = Some("region".to_string());
        config.color_scale = Some("Cividis".to_string());
        let spec = build_chart(&coffee(), &config).unwrap();
        let trace = &spec.figure["data"][0];
        assert_eq!(trace["marker"]["color"], json!([12.0, 9.9]));
        assert_eq!(trace["marker"]["colorscale"], "Cividis");
        assert_eq!(trace["hovertext"], json!(["Nordic", "Nordic"]));

        config.encoding.color = Some("country".to_string());
        let spec = build_chart(&coffee(), &config).unwrap();
        let traces = spec.figure["data"].as_array().unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0]["name"], "Finland");
        assert_eq!(traces[1]["y"], json!([9.9]));
    }

    #[test]
    fn roles_a_kind_cannot_draw_are_rejected() {
        let mut bar = horizontal_bar();
        bar.encoding.size = Some("kg".to_string());
        let err = build_chart(&coffee(), &bar).unwrap_err();
        assert!(matches!(err, ChartError::UnsupportedRole { role, .. } if role == "size"));

        let mut pie = ChartConfig::new(ChartKind::Pie);
        pie.encoding.names = Some("country".to_string());
        pie.encoding.values = Some("kg".to_string());
        pie.encoding.color = Some("region".to_string());
        let err = build_chart(&coffee(), &pie).unwrap_err();
        assert!(matches!(err, ChartError::UnsupportedRole { role, .. } if role == "color"));

        pie.encoding.color = None;
        pie.log_x = true;
        assert!(matches!(
            build_chart(&coffee(), &pie),
            Err(ChartError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn scatter3d_honours_log_x() {
        let mut config = ChartConfig::new(ChartKind::Scatter3d);
        config.encoding.x = Some("kg".to_string());
        config.encoding.y = Some("kg".to_string());
        config.encoding.z = Some("kg".to_string());
        config.log_x = true;
        let spec = build_chart(&coffee(), &config).unwrap();
        assert_eq!(spec.figure["layout"]["scene"]["xaxis"]["type"], "log");
    }
}
