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

use thiserror::Error;
#[derive(Error, Debug)]
pub enum PresentationError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
}
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data file '{path}' not found")]
    FileNotFound { path: String },
    #[error("Failed to parse '{path}': {reason}")]
    Parse { path: String, reason: String },
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },
    #[error("Type mismatch for column '{column}': {details}")]
    TypeMismatch { column: String, details: String },
    #[error("Column length mismatch: expected {expected}, got {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Dataset '{name}' is not declared")]
    UnknownDataset { name: String },
    #[error("Row index {0} out of bounds")]
    OutOfBounds(usize),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Thread safety error: {0}")]
    ThreadSafety(String),
    #[error("Column '{column}' already exists")]
    DuplicateColumn { column: String },
}
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Column '{column}' mapped to role '{role}' does not exist in dataset")]
    MissingColumn { role: String, column: String },
    #[error("Chart '{chart}' requires the '{role}' role to be mapped")]
    MissingRole { chart: String, role: String },
    #[error("Role '{role}' expects numeric data but column '{column}' holds {found}")]
    DataTypeMismatch {
        role: String,
        column: String,
        found: String,
    },
    #[error("Chart '{chart}' does not draw the '{role}' role")]
    UnsupportedRole { chart: String, role: String },
    #[error("Invalid chart configuration: {reason}")]
    InvalidConfig { reason: String },
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration YAML: {source}")]
    Parse {
        #[from]
        source: serde_yaml::Error,
    },
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
    #[error("Tab '{tab}' not found")]
    UnknownTab { tab: String },
    #[error("Example '{id}' not found")]
    UnknownExample { id: String },
    #[error("'{value}' is not an option of control '{control}'")]
    UnknownControlValue { control: String, value: String },
}
#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}
pub type Result<T> = std::result::Result<T, PresentationError>;
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type ChartResult<T> = std::result::Result<T, ChartError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type SerialisationResult<T> = std::result::Result<T, SerialisationError>;
impl From<serde_json::Error> for PresentationError {
    fn from(err: serde_json::Error) -> Self {
        PresentationError::Serialisation(SerialisationError::Json { source: err })
    }
}
impl PresentationError {
    /// Errors scoped to a single example; the rest of the presentation can still render.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PresentationError::Chart(_)
                | PresentationError::Data(DataError::ColumnNotFound { .. })
                | PresentationError::Data(DataError::TypeMismatch { .. })
                | PresentationError::Data(DataError::FileNotFound { .. })
                | PresentationError::Data(DataError::Parse { .. })
                | PresentationError::Data(DataError::DuplicateColumn { .. })
        )
    }
    pub fn category(&self) -> &'static str {
        match self {
            PresentationError::Data(_) => "Data",
            PresentationError::Chart(_) => "Chart",
            PresentationError::Config(_) => "Configuration",
            PresentationError::Io(_) => "I/O",
            PresentationError::Serialisation(_) => "Serialisation",
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            PresentationError::Data(DataError::FileNotFound { path }) => {
                format!("The data file '{path}' is missing, so this chart cannot be drawn.")
            }
            PresentationError::Data(DataError::ColumnNotFound { column })
            | PresentationError::Chart(ChartError::MissingColumn { column, .. }) => {
                format!("The column '{column}' is not in the data; check the dataset schema.")
            }
            PresentationError::Config(ConfigError::Read { .. }) => {
                "Unable to load the presentation configuration. Please check the file path."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}
