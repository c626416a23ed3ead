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

use crate::data_handler::column::{Column, ColumnBuilder, ColumnData};
use crate::data_handler::common::{DatasetMetadata, Result};
use crate::data_handler::dataframe::DataFrame;
use crate::error::DataError;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;
#[derive(Debug, Clone)]
pub struct CsvReader {
    delimiter: u8,
    quote_char: u8,
}
impl CsvReader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            quote_char: b'"',
        }
    }
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
    pub fn with_quote_char(mut self, quote_char: u8) -> Self {
        self.quote_char = quote_char;
        self
    }
    pub fn read_file(&self, path: &Path, dataset_name: impl Into<String>) -> Result<DataFrame> {
        let shown = path.display().to_string();
        if !path.is_file() {
            return Err(DataError::FileNotFound { path: shown });
        }
        let file = File::open(path)?;
        let mut frame = self.read_from(file, &shown, dataset_name)?;
        frame.metadata.source_path = Some(path.to_path_buf());
        debug!(
            path = %shown,
            rows = frame.row_count(),
            columns = frame.column_count(),
            "Loaded CSV"
        );
        Ok(frame)
    }
    /// Reads CSV from any source. `origin` only labels parse errors.
    pub fn read_from<R: Read>(
        &self,
        source: R,
        origin: &str,
        dataset_name: impl Into<String>,
    ) -> Result<DataFrame> {
        let parse_error = |reason: String| DataError::Parse {
            path: origin.to_string(),
            reason,
        };
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote_char)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(source);
        let raw_headers = reader
            .headers()
            .map_err(|e| parse_error(e.to_string()))?
            .clone();
        if raw_headers.is_empty() || raw_headers.iter().all(str::is_empty) {
            return Err(parse_error("missing header row".to_string()));
        }
        let headers = dedupe_headers(&raw_headers);
        let mut builders: Vec<ColumnBuilder> = headers
            .iter()
            .map(|name| ColumnBuilder::new(name.clone()))
            .collect();
        let mut record = StringRecord::new();
        let mut line = 1usize;
        while reader
            .read_record(&mut record)
            .map_err(|e| parse_error(e.to_string()))?
        {
            line += 1;
            if record.len() > headers.len() {
                return Err(parse_error(format!(
                    "line {line} has {} fields, header has {}",
                    record.len(),
                    headers.len()
                )));
            }
            for (index, builder) in builders.iter_mut().enumerate() {
                builder.push(record.get(index));
            }
        }
        let mut frame = DataFrame::new(DatasetMetadata::named(dataset_name));
        for (name, builder) in headers.into_iter().zip(builders) {
            frame.add_column(name, builder.build()?)?;
        }
        Ok(frame)
    }
}
impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}
/// Repeated header names get `.1`, `.2`, ... suffixes; blank names become
/// `Unnamed: <index>`.
fn dedupe_headers(raw: &StringRecord) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    raw.iter()
        .enumerate()
        .map(|(index, name)| {
            let base = if name.is_empty() {
                format!("Unnamed: {index}")
            } else {
                name.to_string()
            };
            let mut candidate = base.clone();
            let mut counter = 1;
            while seen.contains(&candidate) {
                candidate = format!("{base}.{counter}");
                counter += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}
#[derive(Debug, Clone)]
pub struct CsvWriter {
    delimiter: u8,
    quote_all: bool,
}
impl CsvWriter {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            quote_all: false,
        }
    }
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
    pub fn with_quote_all(mut self, quote_all: bool) -> Self {
        self.quote_all = quote_all;
        self
    }
    pub fn write_file(&self, dataframe: &DataFrame, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(dataframe, file)?;
        debug!(path = %path.display(), rows = dataframe.row_count(), "Wrote CSV");
        Ok(())
    }
    /// Nulls are written as empty cells.
    pub fn write_to<W: std::io::Write>(&self, dataframe: &DataFrame, sink: W) -> Result<()> {
        let style = if self.quote_all {
            csv::QuoteStyle::Always
        } else {
            csv::QuoteStyle::Necessary
        };
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(style)
            .from_writer(sink);
        writer.write_record(dataframe.column_names())?;
        let columns: Vec<_> = dataframe
            .column_names()
            .iter()
            .map(|name| dataframe.column(name))
            .collect::<Result<_>>()?;
        for i in 0..dataframe.row_count() {
            let row: Vec<String> = columns
                .iter()
                .map(|column| csv_cell(column, i))
                .collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
/// Floats keep a decimal point so a reload infers `Float64` again.
fn csv_cell(column: &Column, index: usize) -> String {
    match column {
        Column::Float64(data) => data
            .get(index)
            .copied()
            .flatten()
            .map(|value| format!("{value:?}"))
            .unwrap_or_default(),
        other => other.get_string(index).unwrap_or_default(),
    }
}
impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
