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

pub mod chart;
pub mod data_handler;
pub mod error;
pub mod gallery;
pub mod report;
pub mod session;

pub use chart::{build_chart, ChartBuilder, ChartConfig, ChartKind, Encoding, Orientation, RenderSpec, Underlay};
pub use data_handler::{
    export_csv, load_csv, Column, ColumnData, DataFrame, DatasetStore, SortOrder, Transform,
    TransformationEngine,
};
pub use error::{ChartError, ConfigError, DataError, PresentationError, Result};
pub use gallery::{ControlSpec, DatasetSpec, Example, Gallery, Tab, Verdict};
pub use report::{render_html, write_bundle, PresentationReport};
pub use session::{ExampleOutcome, ExampleView, Session, SessionEvent, TabView};
use std::path::{Path, PathBuf};
use tracing::info;

/// Opens a session over `data_dir` using the YAML at `config`, or the
/// shipped presentation when no path is given.
pub fn open_presentation(config: Option<&Path>, data_dir: impl Into<PathBuf>) -> Result<Session> {
    let gallery = match config {
        Some(path) => Gallery::from_yaml_file(path)?,
        None => Gallery::default_presentation()?,
    };
    let data_dir = data_dir.into();
    info!(
        title = %gallery.title,
        tabs = gallery.tabs.len(),
        data_dir = %data_dir.display(),
        "Opened presentation"
    );
    Ok(Session::new(gallery, data_dir))
}
