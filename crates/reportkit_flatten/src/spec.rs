//! Flattening models and top-level error types.

use serde_json::{Map, Value};
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region SchemaModel

/// Role of one schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSchemaField {
    /// Scalar placeholder; value is shared by every output row.
    Fixed,
    /// Array of sample rows; names the repeating table section.
    Table,
}

impl EnumSchemaField {
    /// Classify one schema value. Only arrays denote a table.
    pub fn of(value: &Value) -> Self {
        if value.is_array() {
            Self::Table
        } else {
            Self::Fixed
        }
    }
}

/// Resolved schema shape: fixed fields plus the single table section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSchemaLayout {
    /// Key of the table section in both schema and data.
    pub table_name: String,
    /// Fixed field names in schema order.
    pub cols_fixed: Vec<String>,
    /// Table column names in first-sample key order.
    pub cols_table: Vec<String>,
}

impl SpecSchemaLayout {
    /// Final column order: fixed fields, then table columns not already fixed.
    pub fn columns(&self) -> Vec<String> {
        let mut l_columns = self.cols_fixed.clone();
        for c_name in &self.cols_table {
            if !self.cols_fixed.contains(c_name) {
                l_columns.push(c_name.clone());
            }
        }
        l_columns
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FlatTable

/// Flattening output: ordered columns plus one map per data row.
///
/// Every row holds exactly the keys of `columns`, in the same order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecFlatTable {
    /// Table section the rows were expanded from.
    pub table_name: String,
    /// Ordered header.
    pub columns: Vec<String>,
    /// Ordered rows.
    pub rows: Vec<Map<String, Value>>,
}

impl SpecFlatTable {
    /// Number of output rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of output columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Iterate row values aligned with `columns`.
    pub fn iter_row_values(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(|c_name| row.get(c_name).unwrap_or(&Value::Null))
                .collect()
        })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Schema/data shape failures. All are caller input errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlattenError {
    /// Schema root is not an object.
    #[error("schema must be a JSON object")]
    SchemaNotObject,

    /// No schema field holds an array.
    #[error("schema does not contain a table (array) field")]
    NoTableField,

    /// More than one schema field holds an array.
    #[error("schema contains more than one table (array) field: {}", .candidates.join(", "))]
    AmbiguousTableField { candidates: Vec<String> },

    /// Table sample array has no element to derive columns from.
    #[error("schema table field '{0}' has no sample row")]
    EmptyTableSample(String),

    /// First table sample element is not an object.
    #[error("schema table field '{0}' sample row must be a JSON object")]
    TableSampleNotObject(String),

    /// Data root is not an object.
    #[error("data must be a JSON object")]
    DataNotObject,

    /// Data lacks the table field.
    #[error("data does not contain table field '{0}'")]
    MissingTableData(String),

    /// Data table field is not an array.
    #[error("data table field '{0}' must be an array")]
    TableDataNotArray(String),

    /// One data table item is not an object.
    #[error("data table field '{table_name}' item #{index} must be a JSON object")]
    TableRowNotObject { table_name: String, index: usize },
}

/// Result type alias for [`FlattenError`].
pub type FlattenResult<T> = std::result::Result<T, FlattenError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
