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
use crate::data_handler::common::{ColumnMetadata, DatasetMetadata, Result, SortOrder};
use crate::error::DataError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::sync::Arc;
use tracing::warn;
/// Columnar table with a fixed column order. Every operation returns a new
/// frame; the source is never mutated.
#[derive(Debug, Clone)]
pub struct DataFrame {
    pub columns: HashMap<String, Arc<Column>>,
    pub metadata: DatasetMetadata,
    column_order: Vec<String>,
}
impl PartialEq for DataFrame {
    fn eq(&self, other: &Self) -> bool {
        self.column_order == other.column_order
            && self
                .column_order
                .iter()
                .all(|name| self.columns[name] == other.columns[name])
    }
}
impl DataFrame {
    pub fn new(metadata: DatasetMetadata) -> Self {
        Self {
            columns: HashMap::new(),
            metadata,
            column_order: Vec::new(),
        }
    }
    pub fn from_columns(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (String, Column)>,
    ) -> Result<Self> {
        let mut frame = Self::new(DatasetMetadata::named(name));
        for (column_name, column) in columns {
            frame.add_column(column_name, column)?;
        }
        Ok(frame)
    }
    /// Adds a column, replacing any column of the same name in place.
    pub fn add_column(&mut self, name: String, column: Column) -> Result<()> {
        if let Some(first) = self.column_order.first() {
            let expected = self.columns[first].len();
            let replacing_only_column = self.column_order.len() == 1 && *first == name;
            if column.len() != expected && !replacing_only_column {
                return Err(DataError::LengthMismatch {
                    expected,
                    found: column.len(),
                });
            }
        }
        if !self.columns.contains_key(&name) {
            self.column_order.push(name.clone());
        }
        self.metadata.row_count = column.len();
        self.columns.insert(name, Arc::new(column));
        self.metadata.column_count = self.columns.len();
        Ok(())
    }
    /// Adds a column that must not already exist.
    pub fn insert_column(&mut self, name: String, column: Column) -> Result<()> {
        if self.columns.contains_key(&name) {
            return Err(DataError::DuplicateColumn { column: name });
        }
        self.add_column(name, column)
    }
    pub fn row_count(&self) -> usize {
        self.metadata.row_count
    }
    pub fn column_count(&self) -> usize {
        self.metadata.column_count
    }
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name).map(|arc| arc.as_ref())
    }
    /// Like [`DataFrame::get_column`] but a missing name is an error.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.get_column(name).ok_or_else(|| DataError::ColumnNotFound {
            column: name.to_string(),
        })
    }
    pub fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.column_order
            .par_iter()
            .map(|name| {
                let column = &self.columns[name];
                ColumnMetadata {
                    name: name.clone(),
                    data_type: column.data_type(),
                    null_count: column.null_count(),
                }
            })
            .collect()
    }
    fn derived(&self, suffix: &str) -> DataFrame {
        let mut metadata = DatasetMetadata::named(format!("{}_{suffix}", self.metadata.name));
        metadata.source_path = self.metadata.source_path.clone();
        DataFrame::new(metadata)
    }
    pub fn select(&self, column_names: &[String]) -> Result<DataFrame> {
        let mut new_df = self.derived("select");
        for name in column_names {
            let column = self.column(name)?;
            new_df.add_column(name.clone(), column.clone())?;
        }
        Ok(new_df)
    }
    pub fn select_rows(&self, indices: &[usize]) -> Result<DataFrame> {
        let mut new_df = self.derived("rows");
        for name in &self.column_order {
            let new_column = self.columns[name].select_rows(indices)?;
            new_df.add_column(name.clone(), new_column)?;
        }
        new_df.metadata.row_count = indices.len();
        Ok(new_df)
    }
    pub fn filter<P>(&self, predicate: P) -> Result<DataFrame>
    where
        P: Fn(usize) -> bool + Send + Sync,
    {
        let indices: Vec<usize> = (0..self.row_count())
            .into_par_iter()
            .filter(|&i| predicate(i))
            .collect();
        self.select_rows(&indices)
    }
    pub fn head(&self, n: usize) -> Result<DataFrame> {
        let end = n.min(self.row_count());
        let indices: Vec<usize> = (0..end).collect();
        self.select_rows(&indices)
    }
    /// Stable sort on one column; nulls go last in either direction.
    /// Numeric columns compare by value, everything else by its text form.
    pub fn sort_by(&self, column_name: &str, order: SortOrder) -> Result<DataFrame> {
        let column = self.column(column_name)?;
        let mut indices: Vec<usize> = (0..self.row_count()).collect();
        if column.data_type().is_numeric() {
            indices.par_sort_by(|&a, &b| {
                compare_nullable(column.to_f64(a), column.to_f64(b), order, f64::total_cmp)
            });
        } else {
            indices.par_sort_by(|&a, &b| {
                compare_nullable(column.get_string(a), column.get_string(b), order, Ord::cmp)
            });
        }
        self.select_rows(&indices)
    }
    pub fn top_n(&self, column_name: &str, n: usize, order: SortOrder) -> Result<DataFrame> {
        self.sort_by(column_name, order)?.head(n)
    }
    /// Drops every row holding a null in any of `subset`, or in any column
    /// when no subset is given.
    pub fn drop_nulls(&self, subset: Option<&[String]>) -> Result<DataFrame> {
        let names = subset.unwrap_or(self.column_order.as_slice());
        let columns: Vec<&Column> = names
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<_>>()?;
        self.filter(|i| columns.iter().all(|column| !column.is_null(i)))
    }
    /// Inner join on a single key column. Output rows follow left row order,
    /// then right row order for repeated keys. Shared non-key columns get
    /// `_x` and `_y` suffixes. Null keys never match.
    pub fn inner_join(&self, right: &DataFrame, on: &str) -> Result<DataFrame> {
        let left_key = self.column(on)?;
        let right_key = right.column(on)?;
        let mut right_index: HashMap<String, Vec<usize>> = HashMap::new();
        for j in 0..right.row_count() {
            if let Some(key) = right_key.get_string(j) {
                right_index.entry(key).or_default().push(j);
            }
        }
        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        for i in 0..self.row_count() {
            let Some(key) = left_key.get_string(i) else {
                continue;
            };
            if let Some(matches) = right_index.get(&key) {
                for &j in matches {
                    left_rows.push(i);
                    right_rows.push(j);
                }
            }
        }
        if left_rows.is_empty() {
            warn!(
                left = %self.metadata.name,
                right = %right.metadata.name,
                key = on,
                "Inner join produced no rows"
            );
        }
        let left_names: HashSet<&str> = self.column_order.iter().map(String::as_str).collect();
        let right_names: HashSet<&str> = right.column_order.iter().map(String::as_str).collect();
        let mut joined = DataFrame::new(DatasetMetadata::named(format!(
            "{}_{}",
            self.metadata.name, right.metadata.name
        )));
        for name in &self.column_order {
            let column = self.columns[name].select_rows(&left_rows)?;
            let output_name = if name != on && right_names.contains(name.as_str()) {
                format!("{name}_x")
            } else {
                name.clone()
            };
            joined.insert_column(output_name, column)?;
        }
        for name in right.column_order.iter().filter(|name| *name != on) {
            let column = right.columns[name].select_rows(&right_rows)?;
            let output_name = if left_names.contains(name.as_str()) {
                format!("{name}_y")
            } else {
                name.clone()
            };
            joined.insert_column(output_name, column)?;
        }
        joined.metadata.row_count = left_rows.len();
        Ok(joined)
    }
    /// Renames `from` to `to`; fails if another column is already called `to`.
    pub fn rename_column(&self, from: &str, to: &str) -> Result<DataFrame> {
        self.column(from)?;
        let mut renamed = self.derived("renamed");
        for name in &self.column_order {
            let output_name = if name == from { to.to_string() } else { name.clone() };
            renamed.insert_column(output_name, self.columns[name].as_ref().clone())?;
        }
        renamed.metadata.row_count = self.row_count();
        Ok(renamed)
    }
    /// Seeded random subset of `n` rows, kept in their original order.
    pub fn sample(&self, n: usize, seed: u64) -> Result<DataFrame> {
        if n >= self.row_count() {
            return Ok(self.clone());
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices = rand::seq::index::sample(&mut rng, self.row_count(), n).into_vec();
        indices.sort_unstable();
        self.select_rows(&indices)
    }
    /// Writes `column * factor` into `into`, or over `column` when `into` is `None`.
    pub fn scale_column(&self, column: &str, factor: f64, into: Option<&str>) -> Result<DataFrame> {
        let scaled = self.column(column)?.scaled(column, factor)?;
        let mut result = self.clone();
        result.add_column(into.unwrap_or(column).to_string(), scaled)?;
        Ok(result)
    }
    pub fn preview(&self, limit: usize) -> String {
        let sample_size = limit.min(self.row_count());
        let header = self.column_order.join(" | ");
        let mut out = String::new();
        let _ = writeln!(out, "{header}");
        let _ = writeln!(out, "{}", "-".repeat(header.len()));
        for i in 0..sample_size {
            let row: Vec<String> = self
                .column_order
                .iter()
                .map(|name| {
                    self.columns[name]
                        .get_string(i)
                        .unwrap_or_else(|| "NULL".to_string())
                })
                .collect();
            let _ = writeln!(out, "{}", row.join(" | "));
        }
        if self.row_count() > sample_size {
            let _ = writeln!(out, "... ({} more rows)", self.row_count() - sample_size);
        }
        out
    }
}
fn compare_nullable<T>(
    a: Option<T>,
    b: Option<T>,
    order: SortOrder,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Ascending => cmp(&a, &b),
            SortOrder::Descending => cmp(&a, &b).reverse(),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    fn consumption() -> DataFrame {
        DataFrame::from_columns(
            "consumption",
            [
                (
                    "country".to_string(),
                    Column::from_strs(&[Some("A"), Some("B"), Some("C")]),
                ),
                (
                    "kg".to_string(),
                    Column::from_f64s(vec![Some(5.0), Some(9.0), Some(2.0)]),
                ),
            ],
        )
        .unwrap()
    }

    fn countries(frame: &DataFrame) -> Vec<String> {
        let column = frame.column("country").unwrap();
        (0..frame.row_count())
            .map(|i| column.get_string(i).unwrap())
            .collect()
    }

    #[test]
    fn top_two_descending() {
        let top = consumption().top_n("kg", 2, SortOrder::Descending).unwrap();
        assert_eq!(countries(&top), vec!["B", "A"]);
        let kg = top.column("kg").unwrap();
        assert_eq!(kg.to_f64(0), Some(9.0));
        assert_eq!(kg.to_f64(1), Some(5.0));
    }

    #[test]
    fn head_larger_than_table_returns_everything() {
        let frame = consumption();
        assert_eq!(frame.head(10).unwrap().row_count(), 3);
    }

    #[test]
    fn sort_is_stable_and_puts_nulls_last() {
        let frame = DataFrame::from_columns(
            "ties",
            [
                (
                    "country".to_string(),
                    Column::from_strs(&[Some("A"), Some("B"), Some("C"), Some("D")]),
                ),
                (
                    "kg".to_string(),
                    Column::from_f64s(vec![Some(1.0), None, Some(1.0), Some(3.0)]),
                ),
            ],
        )
        .unwrap();
        let desc = frame.sort_by("kg", SortOrder::Descending).unwrap();
        assert_eq!(countries(&desc), vec!["D", "A", "C", "B"]);
        let asc = frame.sort_by("kg", SortOrder::Ascending).unwrap();
        assert_eq!(countries(&asc), vec!["A", "C", "D", "B"]);
    }

    #[test]
    fn sorting_on_missing_column_is_key_error() {
        let err = consumption().sort_by("tonnes", SortOrder::Ascending).unwrap_err();
        assert!(matches!(err, DataError::ColumnNotFound { column } if column == "tonnes"));
    }

    #[test]
    fn inner_join_keeps_shared_keys_only() {
        let left = DataFrame::from_columns(
            "consumption",
            [
                ("country".to_string(), Column::from_strs(&[Some("A")])),
                ("kg".to_string(), Column::from_f64s(vec![Some(5.0)])),
            ],
        )
        .unwrap();
        let right = DataFrame::from_columns(
            "production",
            [
                (
                    "country".to_string(),
                    Column::from_strs(&[Some("A"), Some("B")]),
                ),
                (
                    "tonnes".to_string(),
                    Column::from_i64s(vec![Some(100), Some(50)]),
                ),
            ],
        )
        .unwrap();
        let joined = left.inner_join(&right, "country").unwrap();
        assert_eq!(joined.row_count(), 1);
        assert_eq!(joined.column_names(), ["country", "kg", "tonnes"]);
        assert_eq!(joined.column("kg").unwrap().to_f64(0), Some(5.0));
        assert_eq!(joined.column("tonnes").unwrap().to_f64(0), Some(100.0));
    }

    #[test]
    fn inner_join_suffixes_shared_columns() {
        let left = consumption();
        let right = consumption();
        let joined = left.inner_join(&right, "country").unwrap();
        assert_eq!(joined.column_names(), ["country", "kg_x", "kg_y"]);
        assert_eq!(joined.row_count(), 3);
    }

    #[test]
    fn inner_join_without_matches_is_empty_with_schema() {
        let left = consumption();
        let right = DataFrame::from_columns(
            "other",
            [
                ("country".to_string(), Column::from_strs(&[Some("Z")])),
                ("tonnes".to_string(), Column::from_i64s(vec![Some(1)])),
            ],
        )
        .unwrap();
        let joined = left.inner_join(&right, "country").unwrap();
        assert!(joined.is_empty());
        assert_eq!(joined.column_names(), ["country", "kg", "tonnes"]);
    }

    #[test]
    fn drop_nulls_on_subset() {
        let frame = DataFrame::from_columns(
            "gap",
            [
                (
                    "country".to_string(),
                    Column::from_strs(&[Some("A"), Some("B"), None]),
                ),
                (
                    "income".to_string(),
                    Column::from_f64s(vec![Some(1.0), None, Some(3.0)]),
                ),
            ],
        )
        .unwrap();
        let subset = frame.drop_nulls(Some(&["income".to_string()])).unwrap();
        assert_eq!(subset.row_count(), 2);
        let all = frame.drop_nulls(None).unwrap();
        assert_eq!(all.row_count(), 1);
        assert!(frame.drop_nulls(Some(&["missing".to_string()])).is_err());
    }

    #[test]
    fn sample_is_seeded_and_ordered() {
        let values: Vec<Option<i64>> = (0..50).map(Some).collect();
        let frame =
            DataFrame::from_columns("n", [("n".to_string(), Column::from_i64s(values))]).unwrap();
        let first = frame.sample(10, 7).unwrap();
        let second = frame.sample(10, 7).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.row_count(), 10);
        let column = first.column("n").unwrap();
        let picked: Vec<f64> = (0..10).filter_map(|i| column.to_f64(i)).collect();
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(frame.sample(100, 7).unwrap().row_count(), 50);
    }

    #[test]
    fn scale_into_new_column_keeps_original() {
        let scaled = consumption().scale_column("kg", 2.0, Some("shadow")).unwrap();
        assert_eq!(scaled.column_names(), ["country", "kg", "shadow"]);
        assert_eq!(scaled.column("shadow").unwrap().to_f64(1), Some(18.0));
        assert_eq!(scaled.column("kg").unwrap().to_f64(1), Some(9.0));
    }

    #[test]
    fn rename_keeps_position() {
        let renamed = consumption().rename_column("country", "Country").unwrap();
        assert_eq!(renamed.column_names(), ["Country", "kg"]);
        assert!(consumption().rename_column("nope", "x").is_err());
    }

    #[test]
    fn rename_onto_existing_column_is_rejected() {
        let frame = DataFrame::from_columns(
            "population",
            [
                ("Country".to_string(), Column::from_strs(&[Some("Brazil")])),
                ("country".to_string(), Column::from_strs(&[Some("brazil-lower")])),
                ("pop".to_string(), Column::from_i64s(vec![Some(1)])),
            ],
        )
        .unwrap();
        let err = frame.rename_column("Country", "country").unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn { column } if column == "country"));
        let same = frame.rename_column("pop", "pop").unwrap();
        assert_eq!(same.column_names(), ["Country", "country", "pop"]);
    }

    #[test]
    fn join_suffix_colliding_with_left_column_is_rejected() {
        let left = DataFrame::from_columns(
            "left",
            [
                ("country".to_string(), Column::from_strs(&[Some("A")])),
                ("kg".to_string(), Column::from_i64s(vec![Some(1)])),
                ("kg_x".to_string(), Column::from_i64s(vec![Some(100)])),
            ],
        )
        .unwrap();
        let right = DataFrame::from_columns(
            "right",
            [
                ("country".to_string(), Column::from_strs(&[Some("A")])),
                ("kg".to_string(), Column::from_i64s(vec![Some(2)])),
            ],
        )
        .unwrap();
        let err = left.inner_join(&right, "country").unwrap_err();
        assert!(matches!(err, DataError::DuplicateColumn { column } if column == "kg_x"));
    }

    #[test]
    fn add_column_rejects_wrong_length() {
        let mut frame = consumption();
        let err = frame
            .add_column("extra".to_string(), Column::from_i64s(vec![Some(1)]))
            .unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { expected: 3, found: 1 }));
    }

    #[test]
    fn preview_reports_remaining_rows() {
        let text = consumption().preview(1);
        assert!(text.starts_with("country | kg"));
        assert!(text.contains("(2 more rows)"));
    }
}
