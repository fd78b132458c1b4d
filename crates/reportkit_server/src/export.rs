//! Export pipeline: request decoding, flattening, workbook write, and
//! download path resolution.

use std::path::{Component, Path, PathBuf};

use reportkit_flatten::{SpecFlatTable, flatten};
use reportkit_io_xlsx::{
    EnumCellValue, SpecSheetTable, SpecXlsxSheetWriteOptions, SpecXlsxWriteOptions, XlsxWriter,
    derive_default_xlsx_formats,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::conf::{C_EXT_OUTPUT, C_SHEET_NAME};
use crate::error::{ExportError, ExportResult};

////////////////////////////////////////////////////////////////////////////////
// #region RequestDecoding

/// A `schema`/`data` field as sent by the client: either structured JSON or
/// a string holding encoded JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EnumJsonInput {
    /// JSON encoded inside a string.
    Encoded(String),
    /// Already structured JSON.
    Structured(Value),
}

impl EnumJsonInput {
    /// Decode to structured JSON; `field` names the input in error messages.
    pub fn resolve(self, field: &str) -> ExportResult<Value> {
        match self {
            EnumJsonInput::Structured(value) => Ok(value),
            EnumJsonInput::Encoded(text) => serde_json::from_str(&text).map_err(|err| {
                ExportError::MalformedInput(format!("'{field}' is not valid JSON: {err}"))
            }),
        }
    }
}

/// `POST /export` body.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecExportRequest {
    #[serde(default)]
    pub schema: Option<EnumJsonInput>,
    #[serde(default)]
    pub data: Option<EnumJsonInput>,
}

impl SpecExportRequest {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> ExportResult<Self> {
        serde_json::from_slice(body).map_err(|err| {
            ExportError::MalformedInput(format!("request body must be a JSON object: {err}"))
        })
    }

    /// Resolve both fields to structured `(schema, data)`.
    pub fn into_values(self) -> ExportResult<(Value, Value)> {
        let schema = self
            .schema
            .ok_or_else(|| ExportError::MalformedInput("missing field 'schema'".to_string()))?
            .resolve("schema")?;
        let data = self
            .data
            .ok_or_else(|| ExportError::MalformedInput("missing field 'data'".to_string()))?
            .resolve("data")?;
        Ok((schema, data))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Export

/// Outcome of one successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExportArtifact {
    /// File name inside the output directory.
    pub file_name: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// Body rows written.
    pub n_rows: usize,
    /// Columns written.
    pub n_columns: usize,
    /// Non-fatal writer warnings.
    pub warnings: Vec<String>,
}

/// Flatten `schema`/`data` and write the rows to a fresh `.xlsx` file in
/// `dir_output`.
///
/// Blocking; the file exists only once this returns `Ok`.
pub fn export_report(
    dir_output: &Path,
    schema: &Value,
    data: &Value,
) -> ExportResult<SpecExportArtifact> {
    let table_flat = flatten(schema, data)?;
    debug!(
        table = %table_flat.table_name,
        rows = table_flat.height(),
        columns = table_flat.width(),
        "flattened report"
    );

    let table_sheet = derive_sheet_table(&table_flat)?;
    let file_name = create_file_name();
    let path = dir_output.join(&file_name);

    let mut writer = XlsxWriter::new(
        path.clone(),
        derive_default_xlsx_formats(),
        SpecXlsxWriteOptions::default(),
    );
    writer
        .write_sheet(
            &table_sheet,
            C_SHEET_NAME,
            &SpecXlsxSheetWriteOptions::default(),
        )
        .map_err(ExportError::Serialization)?;
    writer.close().map_err(ExportError::Serialization)?;

    let warnings: Vec<String> = writer
        .report()
        .into_iter()
        .flat_map(|report| report.warnings)
        .collect();
    for c_warning in &warnings {
        warn!(file = %file_name, "{c_warning}");
    }

    Ok(SpecExportArtifact {
        file_name,
        path,
        n_rows: table_sheet.height(),
        n_columns: table_sheet.width(),
        warnings,
    })
}

/// Fresh `<32 hex>.xlsx` name.
pub fn create_file_name() -> String {
    format!("{}.{C_EXT_OUTPUT}", Uuid::new_v4().simple())
}

/// Convert flat rows into writer cells, aligned with the column order.
pub fn derive_sheet_table(table_flat: &SpecFlatTable) -> ExportResult<SpecSheetTable> {
    let l_rows = table_flat
        .iter_row_values()
        .map(|row| row.into_iter().map(convert_json_to_cell).collect())
        .collect();
    SpecSheetTable::new(table_flat.columns.clone(), l_rows).map_err(ExportError::Serialization)
}

/// Map one JSON value to a cell.
///
/// Numbers stay numeric, booleans stay boolean, `null` is blank, arrays and
/// objects render as compact JSON text.
pub fn convert_json_to_cell(value: &Value) -> EnumCellValue {
    match value {
        Value::Null => EnumCellValue::None,
        Value::Bool(val) => EnumCellValue::Bool(*val),
        Value::Number(val) => match val.as_f64() {
            Some(n) => EnumCellValue::Number(n),
            None => EnumCellValue::String(val.to_string()),
        },
        Value::String(val) => EnumCellValue::String(val.clone()),
        Value::Array(_) | Value::Object(_) => EnumCellValue::String(value.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Download

/// Resolve `name` to an existing regular file directly under `dir_output`.
///
/// Only a single plain, non-hidden path segment is accepted; hidden names
/// cover in-progress `.part` files. Quotes and control characters are
/// refused since the name is echoed into `Content-Disposition`.
pub fn resolve_download_path(dir_output: &Path, name: &str) -> ExportResult<PathBuf> {
    validate_file_name(name)?;

    let path = dir_output.join(name);
    if !path.is_file() {
        return Err(ExportError::FileNotFound(name.to_string()));
    }
    Ok(path)
}

fn validate_file_name(name: &str) -> ExportResult<()> {
    let if_plain_segment = {
        let mut components = Path::new(name).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    };

    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '"'])
        || name.chars().any(char::is_control)
        || !if_plain_segment
    {
        return Err(ExportError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
