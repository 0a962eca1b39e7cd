//! `DataFrame` and Area Record schema.
//!
//! A minimal named-column table for the pipeline's tabular data (generated
//! datasets, batch inputs) plus the typed seven-feature record the models
//! consume.

mod record;

pub use record::{AreaRecord, Feature, FieldMap, RiskLevel, DEMAND_COLUMN, WASTE_RISK_COLUMN};

use crate::error::{Result, VaxError};
use crate::primitives::{Matrix, Vector};

/// A minimal `DataFrame` with named columns.
///
/// This is a thin wrapper around `Vec<(String, Vector<f64>)>` with
/// convenience methods for ML workflows.
///
/// # Examples
///
/// ```
/// use vaxflow::data::DataFrame;
/// use vaxflow::primitives::Vector;
///
/// let columns = vec![
///     ("x".to_string(), Vector::from_slice(&[1.0, 2.0, 3.0])),
///     ("y".to_string(), Vector::from_slice(&[4.0, 5.0, 6.0])),
/// ];
/// let df = DataFrame::new(columns).expect("DataFrame creation should succeed with valid columns");
/// assert_eq!(df.shape(), (3, 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    columns: Vec<(String, Vector<f64>)>,
    n_rows: usize,
}

impl DataFrame {
    /// Creates a new `DataFrame` from named columns.
    ///
    /// # Errors
    ///
    /// Returns a schema error if columns have different lengths, a name is
    /// empty or duplicated, or no columns are given.
    pub fn new(columns: Vec<(String, Vector<f64>)>) -> Result<Self> {
        if columns.is_empty() {
            return Err(VaxError::Schema {
                field: "<table>".to_string(),
                reason: "must have at least one column".to_string(),
            });
        }

        let n_rows = columns[0].1.len();

        for (name, col) in &columns {
            if name.is_empty() {
                return Err(VaxError::Schema {
                    field: "<unnamed>".to_string(),
                    reason: "column names cannot be empty".to_string(),
                });
            }
            if col.len() != n_rows {
                return Err(VaxError::Schema {
                    field: name.clone(),
                    reason: format!("has {} rows, expected {n_rows}", col.len()),
                });
            }
        }

        let mut names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        for pair in names.windows(2) {
            if pair[0] == pair[1] {
                return Err(VaxError::Schema {
                    field: pair[0].to_string(),
                    reason: "is duplicated".to_string(),
                });
            }
        }

        Ok(Self { columns, n_rows })
    }

    /// Builds a feature-only table from typed records, columns in canonical
    /// feature order.
    ///
    /// # Errors
    ///
    /// Returns an error if `records` is empty.
    pub fn from_records(records: &[AreaRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(VaxError::InsufficientData {
                context: "building a table from records".to_string(),
                required: 1,
                actual: 0,
            });
        }
        let columns = Feature::ALL
            .iter()
            .map(|&feature| {
                let values = records.iter().map(|r| r.get(feature)).collect();
                (feature.name().to_string(), Vector::from_vec(values))
            })
            .collect();
        Self::new(columns)
    }

    /// Returns the shape as (`n_rows`, `n_cols`).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns true if a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Returns a reference to a column by name.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the column doesn't exist.
    pub fn column(&self, name: &str) -> Result<&Vector<f64>> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| VaxError::missing_feature(name))
    }

    /// Selects multiple columns by name, returning a new `DataFrame`.
    ///
    /// # Errors
    ///
    /// Returns a schema error if any column doesn't exist.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let mut selected = Vec::with_capacity(names.len());
        for &name in names {
            let col = self.column(name)?;
            selected.push((name.to_string(), col.clone()));
        }
        Self::new(selected)
    }

    /// Returns a row as a Vector (column order).
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds.
    pub fn row(&self, idx: usize) -> Result<Vector<f64>> {
        self.check_row(idx)?;
        let data: Vec<f64> = self.columns.iter().map(|(_, col)| col[idx]).collect();
        Ok(Vector::from_vec(data))
    }

    /// Returns a row as a field-keyed mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds.
    pub fn row_mapping(&self, idx: usize) -> Result<FieldMap> {
        self.check_row(idx)?;
        Ok(self
            .columns
            .iter()
            .map(|(name, col)| (name.clone(), col[idx]))
            .collect())
    }

    fn check_row(&self, idx: usize) -> Result<()> {
        if idx >= self.n_rows {
            return Err(VaxError::InsufficientData {
                context: format!("row lookup at index {idx}"),
                required: idx + 1,
                actual: self.n_rows,
            });
        }
        Ok(())
    }

    /// Converts the `DataFrame` to a Matrix with shape (`n_rows`, `n_cols`).
    #[must_use]
    pub fn to_matrix(&self) -> Matrix<f64> {
        let mut data = Vec::with_capacity(self.n_rows * self.columns.len());

        for row_idx in 0..self.n_rows {
            for (_, col) in &self.columns {
                data.push(col[row_idx]);
            }
        }

        Matrix::from_vec(self.n_rows, self.columns.len(), data)
            .expect("Internal error: data size mismatch")
    }

    /// Returns an iterator over columns as (name, vector) pairs.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &Vector<f64>)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Adds a new column to the `DataFrame`.
    ///
    /// # Errors
    ///
    /// Returns an error if column length doesn't match or name already exists.
    pub fn add_column(&mut self, name: String, data: Vector<f64>) -> Result<()> {
        if name.is_empty() {
            return Err(VaxError::Schema {
                field: "<unnamed>".to_string(),
                reason: "column names cannot be empty".to_string(),
            });
        }
        if data.len() != self.n_rows {
            return Err(VaxError::Schema {
                field: name,
                reason: format!("has {} rows, expected {}", data.len(), self.n_rows),
            });
        }
        if self.has_column(&name) {
            return Err(VaxError::Schema {
                field: name,
                reason: "already exists".to_string(),
            });
        }

        self.columns.push((name, data));
        Ok(())
    }

    /// Returns a new `DataFrame` holding only the rows at `indices`.
    #[must_use]
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(n, v)| (n.clone(), v.select(indices)))
                .collect(),
            n_rows: indices.len(),
        }
    }

    /// Returns descriptive statistics for all columns.
    #[must_use]
    pub fn describe(&self) -> Vec<ColumnStats> {
        self.columns
            .iter()
            .map(|(name, col)| {
                let mut sorted: Vec<f64> = col.as_slice().to_vec();
                sorted.sort_by(f64::total_cmp);

                let min = sorted.first().copied().unwrap_or(0.0);
                let max = sorted.last().copied().unwrap_or(0.0);
                let median = if sorted.is_empty() {
                    0.0
                } else if sorted.len() % 2 == 0 {
                    (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
                } else {
                    sorted[sorted.len() / 2]
                };

                ColumnStats {
                    name: name.clone(),
                    count: col.len(),
                    mean: col.mean(),
                    std: col.variance().sqrt(),
                    min,
                    median,
                    max,
                }
            })
            .collect()
    }
}

/// Descriptive statistics for a column.
#[derive(Debug, Clone)]
pub struct ColumnStats {
    /// Column name.
    pub name: String,
    /// Number of elements.
    pub count: usize,
    /// Mean value.
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Minimum value.
    pub min: f64,
    /// Median value.
    pub median: f64,
    /// Maximum value.
    pub max: f64,
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
