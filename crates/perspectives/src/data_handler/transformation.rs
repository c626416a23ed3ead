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

use crate::data_handler::column::{Column, ColumnData};
use crate::data_handler::common::{Result, SortOrder};
use crate::data_handler::dataframe::DataFrame;
use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}
impl FilterValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Int64(v) => Some(*v as f64),
            FilterValue::Float64(v) => Some(*v),
            FilterValue::Boolean(_) | FilterValue::String(_) => None,
        }
    }
}
impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FilterValue::Boolean(v) => write!(f, "{v}"),
            FilterValue::Int64(v) => write!(f, "{v}"),
            FilterValue::Float64(v) => write!(f, "{v}"),
            FilterValue::String(v) => f.write_str(v),
        }
    }
}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: ComparisonOperator,
    pub value: FilterValue,
}
impl FilterCondition {
    pub fn new(column: impl Into<String>, operator: ComparisonOperator, value: FilterValue) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }
    /// Null cells never match. Numeric literals compare numerically against
    /// numeric columns; every other pairing compares the text forms.
    pub fn matches(&self, column: &Column, index: usize) -> bool {
        if column.is_null(index) {
            return false;
        }
        if self.operator == ComparisonOperator::Contains {
            return column
                .get_string(index)
                .is_some_and(|cell| cell.contains(&self.value.to_string()));
        }
        let ordering = match (self.value.as_f64(), column.data_type().is_numeric()) {
            (Some(literal), true) => column
                .to_f64(index)
                .and_then(|cell| cell.partial_cmp(&literal)),
            _ => column
                .get_string(index)
                .map(|cell| cell.as_str().cmp(self.value.to_string().as_str())),
        };
        let Some(ordering) = ordering else {
            return false;
        };
        match self.operator {
            ComparisonOperator::Equal => ordering.is_eq(),
            ComparisonOperator::NotEqual => ordering.is_ne(),
            ComparisonOperator::GreaterThan => ordering.is_gt(),
            ComparisonOperator::GreaterThanOrEqual => ordering.is_ge(),
            ComparisonOperator::LessThan => ordering.is_lt(),
            ComparisonOperator::LessThanOrEqual => ordering.is_le(),
            ComparisonOperator::Contains => false,
        }
    }
}
impl DataFrame {
    pub fn filter_by(&self, condition: &FilterCondition) -> Result<DataFrame> {
        let column = self.column(&condition.column)?;
        self.filter(|i| condition.matches(column, i))
    }
}
/// One declarative step of an example's data preparation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Transform {
    SortBy {
        column: String,
        #[serde(default)]
        order: SortOrder,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    Head {
        n: usize,
    },
    DropNulls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        columns: Option<Vec<String>>,
    },
    InnerJoin {
        dataset: String,
        on: String,
    },
    Filter(FilterCondition),
    Sample {
        n: usize,
        seed: u64,
    },
    Scale {
        column: String,
        factor: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        into: Option<String>,
    },
    Rename {
        from: String,
        to: String,
    },
}
impl Transform {
    /// Datasets other than the input that this step reads.
    pub fn referenced_dataset(&self) -> Option<&str> {
        match self {
            Transform::InnerJoin { dataset, .. } => Some(dataset),
            _ => None,
        }
    }
    pub fn describe(&self) -> String {
        match self {
            Transform::SortBy { column, order, limit } => match limit {
                Some(n) => format!("top {n} by {column} ({order:?})"),
                None => format!("sort by {column} ({order:?})"),
            },
            Transform::Head { n } => format!("head {n}"),
            Transform::DropNulls { columns: Some(columns) } => {
                format!("drop nulls in {}", columns.join(", "))
            }
            Transform::DropNulls { columns: None } => "drop nulls in any column".to_string(),
            Transform::InnerJoin { dataset, on } => format!("inner join {dataset} on {on}"),
            Transform::Filter(condition) => format!(
                "filter {} {:?} {}",
                condition.column, condition.operator, condition.value
            ),
            Transform::Sample { n, seed } => format!("sample {n} rows (seed {seed})"),
            Transform::Scale { column, factor, .. } => format!("scale {column} by {factor}"),
            Transform::Rename { from, to } => format!("rename {from} to {to}"),
        }
    }
}
/// Resolves datasets named by join steps.
pub trait DatasetSource {
    fn dataset(&self, name: &str) -> Result<Arc<DataFrame>>;
}
impl DatasetSource for HashMap<String, Arc<DataFrame>> {
    fn dataset(&self, name: &str) -> Result<Arc<DataFrame>> {
        self.get(name).cloned().ok_or_else(|| DataError::UnknownDataset {
            name: name.to_string(),
        })
    }
}
#[derive(Debug, Default, Clone)]
pub struct TransformationEngine;
impl TransformationEngine {
    pub fn new() -> Self {
        Self
    }
    pub fn apply(
        &self,
        input: &DataFrame,
        steps: &[Transform],
        source: &dyn DatasetSource,
    ) -> Result<DataFrame> {
        let mut current = input.clone();
        for step in steps {
            current = self.apply_step(&current, step, source)?;
            debug!(
                dataset = %input.name(),
                step = %step.describe(),
                rows = current.row_count(),
                "Applied transform"
            );
        }
        Ok(current)
    }
    pub fn apply_step(
        &self,
        frame: &DataFrame,
        step: &Transform,
        source: &dyn DatasetSource,
    ) -> Result<DataFrame> {
        match step {
            Transform::SortBy { column, order, limit } => match limit {
                Some(n) => frame.top_n(column, *n, *order),
                None => frame.sort_by(column, *order),
            },
            Transform::Head { n } => frame.head(*n),
            Transform::DropNulls { columns } => frame.drop_nulls(columns.as_deref()),
            Transform::InnerJoin { dataset, on } => {
                let right = source.dataset(dataset)?;
                frame.inner_join(&right, on)
            }
            Transform::Filter(condition) => frame.filter_by(condition),
            Transform::Sample { n, seed } => frame.sample(*n, *seed),
            Transform::Scale { column, factor, into } => {
                frame.scale_column(column, *factor, into.as_deref())
            }
            Transform::Rename { from, to } => frame.rename_column(from, to),
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    fn gap() -> DataFrame {
        DataFrame::from_columns(
            "gap",
            [
                (
                    "country".to_string(),
                    Column::from_strs(&[Some("Albania"), Some("Algeria"), Some("Angola"), None]),
                ),
                (
                    "urbanrate".to_string(),
                    Column::from_f64s(vec![Some(46.7), Some(65.2), None, Some(10.0)]),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn transforms_deserialize_from_yaml() {
        let yaml = r#"
- op: sort_by
  column: kg
  order: descending
  limit: 10
- op: drop_nulls
  columns: [kg]
- op: filter
  column: continent
  operator: equal
  value: Europe
- op: scale
  column: kg
  factor: 1.1
  into: shadow
"#;
        let steps: Vec<Transform> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            steps[0],
            Transform::SortBy {
                column: "kg".to_string(),
                order: SortOrder::Descending,
                limit: Some(10),
            }
        );
        assert_eq!(
            steps[2],
            Transform::Filter(FilterCondition::new(
                "continent",
                ComparisonOperator::Equal,
                FilterValue::String("Europe".to_string()),
            ))
        );
        assert!(matches!(steps[3], Transform::Scale { ref into, .. } if into.as_deref() == Some("shadow")));
    }

    #[test]
    fn numeric_filter_skips_nulls() {
        let condition = FilterCondition::new(
            "urbanrate",
            ComparisonOperator::GreaterThan,
            FilterValue::Float64(40.0),
        );
        let filtered = gap().filter_by(&condition).unwrap();
        assert_eq!(filtered.row_count(), 2);
    }

    #[test]
    fn contains_matches_text() {
        let condition = FilterCondition::new(
            "country",
            ComparisonOperator::Contains,
            FilterValue::String("lg".to_string()),
        );
        let filtered = gap().filter_by(&condition).unwrap();
        assert_eq!(filtered.row_count(), 1);
        assert_eq!(
            filtered.column("country").unwrap().get_string(0).as_deref(),
            Some("Algeria")
        );
    }

    #[test]
    fn engine_resolves_join_datasets() {
        let mut datasets: HashMap<String, Arc<DataFrame>> = HashMap::new();
        let right = DataFrame::from_columns(
            "pop",
            [
                ("country".to_string(), Column::from_strs(&[Some("Angola")])),
                ("pop".to_string(), Column::from_i64s(vec![Some(30)])),
            ],
        )
        .unwrap();
        datasets.insert("pop".to_string(), Arc::new(right));
        let steps = vec![Transform::InnerJoin {
            dataset: "pop".to_string(),
            on: "country".to_string(),
        }];
        let joined = TransformationEngine::new()
            .apply(&gap(), &steps, &datasets)
            .unwrap();
        assert_eq!(joined.row_count(), 1);
        assert_eq!(joined.column_names(), ["country", "urbanrate", "pop"]);
    }

    #[test]
    fn engine_reports_unknown_join_dataset() {
        let datasets: HashMap<String, Arc<DataFrame>> = HashMap::new();
        let steps = vec![Transform::InnerJoin {
            dataset: "missing".to_string(),
            on: "country".to_string(),
        }];
        let err = TransformationEngine::new()
            .apply(&gap(), &steps, &datasets)
            .unwrap_err();
        assert!(matches!(err, DataError::UnknownDataset { name } if name == "missing"));
    }
}
