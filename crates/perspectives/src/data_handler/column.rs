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

use crate::data_handler::common::{is_null_marker, DataType, Result};
use crate::error::DataError;
use rayon::prelude::*;
use serde_json::Value;
use std::sync::Arc;
pub trait ColumnData: Send + Sync + std::fmt::Debug {
    fn len(&self) -> usize;
    fn data_type(&self) -> DataType;
    fn null_count(&self) -> usize;
    fn is_null(&self, index: usize) -> bool;
    fn get_string(&self, index: usize) -> Option<String>;
    fn to_f64(&self, index: usize) -> Option<f64>;
    /// JSON form of a cell; nulls and non-finite floats become `null`.
    fn to_json(&self, index: usize) -> Value;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Arc<[Option<i64>]>),
    Float64(Arc<[Option<f64>]>),
    String(Arc<[Option<Arc<str>>]>),
    Boolean(Arc<[Option<bool>]>),
}
impl ColumnData for Column {
    fn len(&self) -> usize {
        match self {
            Column::Int64(data) => data.len(),
            Column::Float64(data) => data.len(),
            Column::String(data) => data.len(),
            Column::Boolean(data) => data.len(),
        }
    }
    fn data_type(&self) -> DataType {
        match self {
            Column::Int64(_) => DataType::Int64,
            Column::Float64(_) => DataType::Float64,
            Column::String(_) => DataType::String,
            Column::Boolean(_) => DataType::Boolean,
        }
    }
    fn null_count(&self) -> usize {
        match self {
            Column::Int64(data) => data.par_iter().filter(|v| v.is_none()).count(),
            Column::Float64(data) => data.par_iter().filter(|v| v.is_none()).count(),
            Column::String(data) => data.par_iter().filter(|v| v.is_none()).count(),
            Column::Boolean(data) => data.par_iter().filter(|v| v.is_none()).count(),
        }
    }
    fn is_null(&self, index: usize) -> bool {
        match self {
            Column::Int64(data) => data.get(index).map_or(true, Option::is_none),
            Column::Float64(data) => data.get(index).map_or(true, Option::is_none),
            Column::String(data) => data.get(index).map_or(true, Option::is_none),
            Column::Boolean(data) => data.get(index).map_or(true, Option::is_none),
        }
    }
    fn get_string(&self, index: usize) -> Option<String> {
        match self {
            Column::Int64(data) => data.get(index)?.as_ref().map(|v| v.to_string()),
            Column::Float64(data) => data.get(index)?.as_ref().map(|v| v.to_string()),
            Column::String(data) => data.get(index)?.as_ref().map(|s| s.to_string()),
            Column::Boolean(data) => data.get(index)?.as_ref().map(|v| v.to_string()),
        }
    }
    fn to_f64(&self, index: usize) -> Option<f64> {
        match self {
            Column::Int64(data) => data.get(index).and_then(|opt| opt.map(|v| v as f64)),
            Column::Float64(data) => data.get(index).copied()?,
            Column::String(data) => data
                .get(index)
                .and_then(|opt| opt.as_ref().and_then(|s| s.parse::<f64>().ok())),
            Column::Boolean(data) => data
                .get(index)
                .and_then(|opt| opt.map(|v| if v { 1.0 } else { 0.0 })),
        }
    }
    fn to_json(&self, index: usize) -> Value {
        match self {
            Column::Int64(data) => data
                .get(index)
                .copied()
                .flatten()
                .map_or(Value::Null, Value::from),
            Column::Float64(data) => data
                .get(index)
                .copied()
                .flatten()
                .and_then(serde_json::Number::from_f64)
                .map_or(Value::Null, Value::Number),
            Column::String(data) => data
                .get(index)
                .cloned()
                .flatten()
                .map_or(Value::Null, |s| Value::String(s.to_string())),
            Column::Boolean(data) => data
                .get(index)
                .copied()
                .flatten()
                .map_or(Value::Null, Value::Bool),
        }
    }
}
impl Column {
    pub fn from_f64s(values: Vec<Option<f64>>) -> Self {
        Column::Float64(values.into())
    }
    pub fn from_i64s(values: Vec<Option<i64>>) -> Self {
        Column::Int64(values.into())
    }
    pub fn from_strs(values: &[Option<&str>]) -> Self {
        let data: Vec<Option<Arc<str>>> = values.iter().map(|v| v.map(Arc::from)).collect();
        Column::String(data.into())
    }
    pub fn from_strings(name: &str, values: &[Option<String>], data_type: DataType) -> Result<Self> {
        let mismatch = |value: &str| DataError::TypeMismatch {
            column: name.to_string(),
            details: format!("cannot read '{value}' as {data_type}"),
        };
        Ok(match data_type {
            DataType::Int64 => {
                let parsed: Result<Vec<Option<i64>>> = values
                    .par_iter()
                    .map(|opt| match opt {
                        None => Ok(None),
                        Some(s) => s.trim().parse::<i64>().map(Some).map_err(|_| mismatch(s.as_str())),
                    })
                    .collect();
                Column::Int64(parsed?.into())
            }
            DataType::Float64 => {
                let parsed: Result<Vec<Option<f64>>> = values
                    .par_iter()
                    .map(|opt| match opt {
                        None => Ok(None),
                        Some(s) => s.trim().parse::<f64>().map(Some).map_err(|_| mismatch(s.as_str())),
                    })
                    .collect();
                Column::Float64(parsed?.into())
            }
            DataType::Boolean => {
                let parsed: Result<Vec<Option<bool>>> = values
                    .par_iter()
                    .map(|opt| match opt {
                        None => Ok(None),
                        Some(s) => parse_bool(s).map(Some).ok_or_else(|| mismatch(s.as_str())),
                    })
                    .collect();
                Column::Boolean(parsed?.into())
            }
            DataType::String => {
                let strings: Vec<Option<Arc<str>>> = values
                    .iter()
                    .map(|opt| opt.as_deref().map(Arc::from))
                    .collect();
                Column::String(strings.into())
            }
        })
    }
    pub fn select_rows(&self, indices: &[usize]) -> Result<Column> {
        fn pick<T: Clone + Send + Sync>(data: &[Option<T>], indices: &[usize]) -> Result<Vec<Option<T>>> {
            indices
                .par_iter()
                .map(|&i| data.get(i).cloned().ok_or(DataError::OutOfBounds(i)))
                .collect()
        }
        Ok(match self {
            Column::Int64(data) => Column::Int64(pick(data, indices)?.into()),
            Column::Float64(data) => Column::Float64(pick(data, indices)?.into()),
            Column::String(data) => Column::String(pick(data, indices)?.into()),
            Column::Boolean(data) => Column::Boolean(pick(data, indices)?.into()),
        })
    }
    /// Multiplies every value by `factor`; the result is always `Float64`.
    pub fn scaled(&self, name: &str, factor: f64) -> Result<Column> {
        if !self.data_type().is_numeric() {
            return Err(DataError::TypeMismatch {
                column: name.to_string(),
                details: format!("cannot scale a {} column", self.data_type()),
            });
        }
        let values: Vec<Option<f64>> = (0..self.len())
            .map(|i| self.to_f64(i).map(|v| v * factor))
            .collect();
        Ok(Column::from_f64s(values))
    }
}
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
/// Accumulates raw cells for one column and infers its type from every
/// non-null cell once all rows are in.
#[derive(Debug)]
pub struct ColumnBuilder {
    name: String,
    values: Vec<Option<String>>,
}
impl ColumnBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            values: Vec::with_capacity(capacity),
        }
    }
    pub fn push(&mut self, value: Option<&str>) {
        let cell = value
            .filter(|s| !is_null_marker(s))
            .map(|s| s.trim().to_string());
        self.values.push(cell);
    }
    pub fn build(self) -> Result<Column> {
        let data_type = Self::infer_type(&self.values);
        Column::from_strings(&self.name, &self.values, data_type)
    }
    fn infer_type(values: &[Option<String>]) -> DataType {
        let mut seen = false;
        let mut all_int = true;
        let mut all_float = true;
        let mut all_bool = true;
        for value in values.iter().flatten() {
            seen = true;
            if all_int && value.parse::<i64>().is_err() {
                all_int = false;
            }
            if all_float && value.parse::<f64>().is_err() {
                all_float = false;
            }
            if all_bool && parse_bool(value).is_none() {
                all_bool = false;
            }
            if !all_int && !all_float && !all_bool {
                break;
            }
        }
        if !seen {
            DataType::String
        } else if all_int {
            DataType::Int64
        } else if all_float {
            DataType::Float64
        } else if all_bool {
            DataType::Boolean
        } else {
            DataType::String
        }
    }
}
