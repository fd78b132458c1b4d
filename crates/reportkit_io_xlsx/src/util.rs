//! Stateless helper utilities used by the XLSX writer kernel.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::conf::{
    C_SUFFIX_FILE_PART, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::spec::{
    EnumCellValue, EnumColumnKind, SpecScientificPolicy, SpecSheetSlice, SpecSheetTable,
    SpecXlsxReport,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Normalize one cell for a column of `kind`.
///
/// Blank and non-finite cells become `missing_text` (or stay blank). Text
/// columns render numbers as text.
pub fn convert_cell_value(
    value: &EnumCellValue,
    kind: EnumColumnKind,
    missing_text: Option<&str>,
) -> EnumCellValue {
    let derive_missing = || match missing_text {
        Some(text) => EnumCellValue::String(text.to_string()),
        None => EnumCellValue::None,
    };

    match value {
        EnumCellValue::Number(n) if !n.is_finite() => derive_missing(),
        value if value.is_blank() => derive_missing(),
        EnumCellValue::Number(n) if kind.is_numeric() => EnumCellValue::Number(*n),
        EnumCellValue::Number(n) => EnumCellValue::String(n.to_string()),
        value => value.clone(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnInference

/// Infer one kind per column from cell values.
///
/// A column is numeric when it has at least one number and every other cell
/// is blank. Numeric columns are integer when all finite values are integral.
/// Scientific kind is then applied per `policy_scientific`.
pub fn derive_column_kinds(
    table: &SpecSheetTable,
    if_infer_numeric: bool,
    if_infer_integer: bool,
    policy_scientific: &SpecScientificPolicy,
) -> Vec<EnumColumnKind> {
    (0..table.width())
        .map(|n_idx_col| {
            if !if_infer_numeric {
                return EnumColumnKind::Text;
            }

            let mut if_has_number = false;
            let mut if_all_integral = true;
            for row in &table.rows {
                match &row[n_idx_col] {
                    EnumCellValue::Number(n) => {
                        if_has_number = true;
                        if n.is_finite() && n.fract() != 0.0 {
                            if_all_integral = false;
                        }
                    }
                    value if value.is_blank() => {}
                    _ => return EnumColumnKind::Text,
                }
            }
            if !if_has_number {
                return EnumColumnKind::Text;
            }

            let kind = if if_infer_integer && if_all_integral {
                EnumColumnKind::Integer
            } else {
                EnumColumnKind::Decimal
            };
            if should_use_scientific(table, n_idx_col, kind, policy_scientific) {
                EnumColumnKind::Scientific
            } else {
                kind
            }
        })
        .collect()
}

fn should_use_scientific(
    table: &SpecSheetTable,
    n_idx_col: usize,
    kind: EnumColumnKind,
    policy_scientific: &SpecScientificPolicy,
) -> bool {
    if kind != EnumColumnKind::Decimal {
        return false;
    }

    let n_rows_sample_max = policy_scientific
        .height_body_inferred_max
        .map_or(table.height(), |n_max| usize::min(table.height(), n_max));

    table.rows[..n_rows_sample_max]
        .iter()
        .filter_map(|row| match row[n_idx_col] {
            EnumCellValue::Number(n) if n.is_finite() => Some(n.abs()),
            _ => None,
        })
        .any(|n_abs| {
            n_abs >= policy_scientific.thr_max || (n_abs > 0.0 && n_abs < policy_scientific.thr_min)
        })
}

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} x{} at indices {l_pos:?}", l_pos.len()))
        .collect::<Vec<_>>()
        .join("; ");

    Err(format!("Duplicate column names detected: {c_msg}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Split a `height_body` x `width` grid into Excel-compliant sheet slices.
///
/// Column slices come first, then row slices; one header row is reserved per
/// sheet. An empty body still yields one sheet carrying the header.
pub fn plan_sheet_slices(
    height_body: usize,
    width: usize,
    sheet_name: &str,
    report: &mut SpecXlsxReport,
) -> Vec<SpecSheetSlice> {
    let n_rows_data_max = N_NROWS_EXCEL_MAX - 1;

    let l_col_slices = derive_bounded_ranges(width, N_NCOLS_EXCEL_MAX);
    let l_row_slices = derive_bounded_ranges(height_body, n_rows_data_max);
    let n_parts_total = l_col_slices.len() * l_row_slices.len();

    let mut l_sheet_parts = Vec::with_capacity(n_parts_total);
    for (col_start, col_end) in &l_col_slices {
        for (row_start, row_end) in &l_row_slices {
            let c_part_sheet_name = if n_parts_total == 1 {
                sheet_name.to_string()
            } else {
                create_sheet_identifier(sheet_name, l_sheet_parts.len() + 1)
            };

            l_sheet_parts.push(SpecSheetSlice {
                sheet_name: c_part_sheet_name,
                row_start_inclusive: *row_start,
                row_end_exclusive: *row_end,
                col_start_inclusive: *col_start,
                col_end_exclusive: *col_end,
            });
        }
    }

    if n_parts_total > 1 {
        report.warn(format!(
            "Excel limit overflow: split into {} sheets (columns-first, then rows).",
            l_sheet_parts.len()
        ));
    }

    l_sheet_parts
}

/// `[start, end)` ranges of at most `size_max` covering `0..n_total`; never empty.
fn derive_bounded_ranges(n_total: usize, size_max: usize) -> Vec<(usize, usize)> {
    let mut l_ranges = Vec::new();
    let mut n_start = 0;
    while n_start < n_total {
        let n_end = usize::min(n_total, n_start + size_max);
        l_ranges.push((n_start, n_end));
        n_start = n_end;
    }
    if l_ranges.is_empty() {
        l_ranges.push((0, 0));
    }
    l_ranges
}

/// Create suffixed sheet name (`base_1`, `base_2`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FilePaths

/// Hidden sibling path a workbook is saved to before the final rename.
pub fn derive_part_file_path(path_file_out: &Path) -> PathBuf {
    let c_name = path_file_out
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    path_file_out.with_file_name(format!(".{c_name}.{C_SUFFIX_FILE_PART}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
