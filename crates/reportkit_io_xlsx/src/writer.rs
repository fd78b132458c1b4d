//! XLSX writer kernel that turns cell grids into workbook output.

use std::fs;
use std::path::PathBuf;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::conf::N_WIDTH_EXCEL_COL_MAX;
use crate::spec::{
    EnumAlign, EnumCellValue, EnumColumnKind, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecSheetTable, SpecXlsxFormats, SpecXlsxReport, SpecXlsxSheetWriteOptions,
    SpecXlsxWriteOptions,
};
use crate::util::{
    convert_cell_value, derive_column_kinds, derive_part_file_path, plan_sheet_slices,
    sanitize_sheet_name, validate_unique_columns,
};

/// Stateful workbook writer.
///
/// Sheets are buffered in memory; nothing touches disk until [`Self::close`].
/// Sheet names must be unique per writer; a reused name fails at save.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    formats: SpecXlsxFormats,
    write_options: SpecXlsxWriteOptions,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and format/options presets.
    pub fn new(
        path_file_out: PathBuf,
        formats: SpecXlsxFormats,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            formats,
            write_options,
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Save the workbook. Idempotent.
    ///
    /// The file is written to a hidden `.part` sibling first and renamed into
    /// place, so `path_file_out` either holds a complete workbook or nothing.
    pub fn close(&mut self) -> Result<(), String> {
        if self.if_closed {
            return Ok(());
        }

        let path_file_part = derive_part_file_path(&self.path_file_out);
        if let Err(err) = self.workbook.save(&path_file_part) {
            let _ = fs::remove_file(&path_file_part);
            return Err(derive_xlsx_error_text(err));
        }
        if let Err(err) = fs::rename(&path_file_part, &self.path_file_out) {
            let _ = fs::remove_file(&path_file_part);
            return Err(format!(
                "Failed to move workbook into {}: {err}",
                self.path_file_out.display()
            ));
        }

        self.if_closed = true;
        Ok(())
    }

    /// Write one logical sheet; splits into several sheets past Excel limits.
    pub fn write_sheet(
        &mut self,
        table: &SpecSheetTable,
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<(), String> {
        if self.if_closed {
            return Err("Cannot write after close().".to_string());
        }
        validate_unique_columns(&table.columns)?;

        let missing_text = self.write_options.missing_text.clone();

        let l_kinds = derive_column_kinds(
            table,
            self.write_options.infer_numeric_cols,
            self.write_options.infer_integer_cols,
            &options.policy_scientific,
        );
        let l_fmt_body_by_col: Vec<Format> = l_kinds
            .iter()
            .map(|kind| {
                derive_rust_xlsx_format(
                    &self
                        .select_body_format(*kind)
                        .merge(&self.write_options.base_format_patch),
                )
            })
            .collect();
        let fmt_header = derive_rust_xlsx_format(&self.formats.header);

        let mut report = SpecXlsxReport::default();
        let l_sheet_parts = plan_sheet_slices(
            table.height(),
            table.width(),
            &sanitize_sheet_name(sheet_name, "_"),
            &mut report,
        );

        for sheet_slice in l_sheet_parts {
            let worksheet = self.workbook.add_worksheet();
            worksheet
                .set_name(&sheet_slice.sheet_name)
                .map_err(derive_xlsx_error_text)?;

            let n_cols_slice = sheet_slice.col_end_exclusive - sheet_slice.col_start_inclusive;
            let mut l_width_by_col_header = vec![0usize; n_cols_slice];
            let mut l_width_by_col_body = vec![0usize; n_cols_slice];

            for n_idx_col in 0..n_cols_slice {
                let c_header = &table.columns[sheet_slice.col_start_inclusive + n_idx_col];
                l_width_by_col_header[n_idx_col] = estimate_unicode_string_width(c_header);
                write_cell_with_format(
                    worksheet,
                    0,
                    n_idx_col,
                    &EnumCellValue::String(c_header.clone()),
                    &fmt_header,
                )?;
            }

            worksheet
                .set_freeze_panes(1, 0)
                .map_err(derive_xlsx_error_text)?;

            let n_rows_autofit_max = options
                .policy_autofit
                .height_body_inferred_max
                .unwrap_or(usize::MAX);

            for (n_row_local, row) in table.rows
                [sheet_slice.row_start_inclusive..sheet_slice.row_end_exclusive]
                .iter()
                .enumerate()
            {
                for n_idx_col in 0..n_cols_slice {
                    let n_idx_col_abs = sheet_slice.col_start_inclusive + n_idx_col;
                    let kind = l_kinds[n_idx_col_abs];
                    let value =
                        convert_cell_value(&row[n_idx_col_abs], kind, missing_text.as_deref());

                    if n_row_local < n_rows_autofit_max {
                        l_width_by_col_body[n_idx_col] = usize::max(
                            l_width_by_col_body[n_idx_col],
                            estimate_width_len(&value, kind),
                        );
                    }

                    write_cell_with_format(
                        worksheet,
                        1 + n_row_local,
                        n_idx_col,
                        &value,
                        &l_fmt_body_by_col[n_idx_col_abs],
                    )?;
                }
            }

            apply_autofit_widths(
                worksheet,
                &options.policy_autofit,
                &l_width_by_col_header,
                &l_width_by_col_body,
            )?;

            report.sheets.push(sheet_slice);
        }

        self.l_reports.push(report);
        Ok(())
    }

    fn select_body_format(&self, kind: EnumColumnKind) -> &SpecCellFormat {
        match kind {
            EnumColumnKind::Text => &self.formats.text,
            EnumColumnKind::Integer => &self.formats.integer,
            EnumColumnKind::Decimal => &self.formats.decimal,
            EnumColumnKind::Scientific => &self.formats.scientific,
        }
    }
}

/// Estimate displayed width units for one normalized cell value.
pub fn estimate_width_len(value: &EnumCellValue, kind: EnumColumnKind) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Bool(true) => "TRUE".len(),
        EnumCellValue::Bool(false) => "FALSE".len(),
        EnumCellValue::Number(n) => match kind {
            EnumColumnKind::Scientific => format!("{n:.2E}").len(),
            EnumColumnKind::Integer => format!("{n:.0}").len(),
            EnumColumnKind::Decimal => format!("{n:.2}").len(),
            EnumColumnKind::Text => n.to_string().len(),
        },
    }
}

/// Width units for text; wide (CJK) characters count as two.
fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + n_non_ascii * 2
}

fn apply_autofit_widths(
    worksheet: &mut Worksheet,
    policy_autofit: &SpecAutofitCellsPolicy,
    l_width_by_col_header: &[usize],
    l_width_by_col_body: &[usize],
) -> Result<(), String> {
    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(
        N_WIDTH_EXCEL_COL_MAX,
        usize::max(n_min, policy_autofit.width_cell_max),
    );

    for (n_idx_col, (n_header, n_body)) in l_width_by_col_header
        .iter()
        .zip(l_width_by_col_body)
        .enumerate()
    {
        let n_width_final = usize::min(
            n_max,
            usize::max(
                n_min,
                usize::max(*n_header, *n_body) + policy_autofit.width_cell_padding,
            ),
        );
        worksheet
            .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)
            .map_err(derive_xlsx_error_text)?;
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), String> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    let result = match value {
        EnumCellValue::None => worksheet.write_blank(n_row, n_col, format),
        EnumCellValue::String(val) if val.is_empty() => worksheet.write_blank(n_row, n_col, format),
        EnumCellValue::String(val) => worksheet.write_string_with_format(n_row, n_col, val, format),
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)
        }
        EnumCellValue::Bool(val) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)
        }
    };
    result.map_err(derive_xlsx_error_text)?;
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.as_str());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = spec.align {
        format = format.set_align(match val {
            EnumAlign::Left => FormatAlign::Left,
            EnumAlign::Center => FormatAlign::Center,
            EnumAlign::Right => FormatAlign::Right,
        });
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(if val {
            FormatBorder::Thin
        } else {
            FormatBorder::None
        });
    }

    format
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs::File;
    use std::io::Read;
    use std::path::Path;

    use quick_xml::Reader;
    use quick_xml::events::Event;
    use zip::ZipArchive;

    use super::*;
    use crate::conf::derive_default_xlsx_formats;

    /// Read the first worksheet back as a text grid (shared strings resolved,
    /// booleans as `TRUE`/`FALSE`).
    fn read_sheet_text_grid(path: &Path) -> Vec<Vec<String>> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();

        let l_shared = match archive.by_name("xl/sharedStrings.xml") {
            Ok(mut entry) => {
                let mut xml = String::new();
                entry.read_to_string(&mut xml).unwrap();
                read_shared_strings(&xml)
            }
            Err(_) => vec![],
        };

        let mut xml = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();

        let mut dict_cells: BTreeMap<(usize, usize), String> = BTreeMap::new();
        let mut reader = Reader::from_str(&xml);
        let mut cell_ref: Option<((usize, usize), String)> = None;
        let mut if_in_value = false;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"c" => {
                    let mut pos = (0, 0);
                    let mut c_type = String::new();
                    for attr in e.attributes() {
                        let attr = attr.unwrap();
                        match attr.key.as_ref() {
                            b"r" => pos = parse_cell_ref(&String::from_utf8_lossy(&attr.value)),
                            b"t" => c_type = String::from_utf8_lossy(&attr.value).to_string(),
                            _ => {}
                        }
                    }
                    cell_ref = Some((pos, c_type));
                }
                Event::Start(e) if e.name().as_ref() == b"v" => if_in_value = true,
                Event::Text(t) if if_in_value => {
                    let c_raw = String::from_utf8_lossy(&t).to_string();
                    if let Some((pos, c_type)) = &cell_ref {
                        let c_text = match (c_type.as_str(), c_raw.as_str()) {
                            ("s", _) => l_shared[c_raw.parse::<usize>().unwrap()].clone(),
                            ("b", "1") => "TRUE".to_string(),
                            ("b", _) => "FALSE".to_string(),
                            _ => c_raw,
                        };
                        dict_cells.insert(*pos, c_text);
                    }
                }
                Event::End(e) if e.name().as_ref() == b"v" => if_in_value = false,
                Event::End(e) if e.name().as_ref() == b"c" => cell_ref = None,
                Event::Eof => break,
                _ => {}
            }
        }

        let n_rows = dict_cells.keys().map(|(r, _)| r + 1).max().unwrap_or(0);
        let n_cols = dict_cells.keys().map(|(_, c)| c + 1).max().unwrap_or(0);
        let mut l_grid = vec![vec![String::new(); n_cols]; n_rows];
        for ((r, c), text) in dict_cells {
            l_grid[r][c] = text;
        }
        l_grid
    }

    fn read_shared_strings(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut l_strings = Vec::new();
        let mut if_in_text = false;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"si" => l_strings.push(String::new()),
                Event::Start(e) if e.name().as_ref() == b"t" => if_in_text = true,
                Event::Text(t) if if_in_text => {
                    if let Some(last) = l_strings.last_mut() {
                        last.push_str(&String::from_utf8_lossy(&t));
                    }
                }
                Event::End(e) if e.name().as_ref() == b"t" => if_in_text = false,
                Event::Eof => break,
                _ => {}
            }
        }
        l_strings
    }

    fn parse_cell_ref(cell_ref: &str) -> (usize, usize) {
        let n_split = cell_ref.find(|c: char| c.is_ascii_digit()).unwrap();
        let (c_letters, c_digits) = cell_ref.split_at(n_split);
        let n_col = c_letters
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
            - 1;
        (c_digits.parse::<usize>().unwrap() - 1, n_col)
    }

    fn sample_table() -> SpecSheetTable {
        SpecSheetTable::new(
            vec!["company".to_string(), "month".to_string(), "revenue".to_string()],
            vec![
                vec![
                    EnumCellValue::String("ACME".to_string()),
                    EnumCellValue::String("Jan".to_string()),
                    EnumCellValue::Number(100.0),
                ],
                vec![
                    EnumCellValue::String("ACME".to_string()),
                    EnumCellValue::String(String::new()),
                    EnumCellValue::Number(200.5),
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_write_sheet_round_trip_header_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        let mut writer = XlsxWriter::new(
            path.clone(),
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions::default(),
        );
        writer
            .write_sheet(&sample_table(), "Sheet1", &SpecXlsxSheetWriteOptions::default())
            .unwrap();
        assert!(!path.exists());
        writer.close().unwrap();

        assert!(path.is_file());
        assert!(!derive_part_file_path(&path).exists());

        let l_grid = read_sheet_text_grid(&path);
        assert_eq!(l_grid[0], vec!["company", "month", "revenue"]);
        assert_eq!(l_grid[1], vec!["ACME", "Jan", "100"]);
        assert_eq!(l_grid[2], vec!["ACME", "", "200.5"]);

        let l_reports = writer.report();
        assert_eq!(l_reports.len(), 1);
        assert_eq!(l_reports[0].sheets[0].sheet_name, "Sheet1");
        assert_eq!(l_reports[0].sheets[0].row_end_exclusive, 2);
    }

    #[test]
    fn test_write_sheet_with_cjk_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cjk.xlsx");
        let table = SpecSheetTable::new(
            vec!["公司".to_string(), "月份".to_string(), "營收".to_string()],
            vec![vec![
                EnumCellValue::String("A公司".to_string()),
                EnumCellValue::String("1月".to_string()),
                EnumCellValue::Number(100.0),
            ]],
        )
        .unwrap();

        let mut writer = XlsxWriter::new(
            path.clone(),
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions::default(),
        );
        writer
            .write_sheet(&table, "Sheet1", &SpecXlsxSheetWriteOptions::default())
            .unwrap();
        writer.close().unwrap();

        let l_grid = read_sheet_text_grid(&path);
        assert_eq!(l_grid[0], vec!["公司", "月份", "營收"]);
        assert_eq!(l_grid[1], vec!["A公司", "1月", "100"]);
    }

    #[test]
    fn test_write_sheet_header_only_when_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let table = SpecSheetTable::new(vec!["a".to_string(), "b".to_string()], vec![]).unwrap();

        let mut writer = XlsxWriter::new(
            path.clone(),
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions::default(),
        );
        writer
            .write_sheet(&table, "Sheet1", &SpecXlsxSheetWriteOptions::default())
            .unwrap();
        writer.close().unwrap();

        assert_eq!(read_sheet_text_grid(&path), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_write_sheet_fills_blanks_with_missing_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        let mut writer = XlsxWriter::new(
            path.clone(),
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions {
                missing_text: Some("NA".to_string()),
                ..Default::default()
            },
        );
        writer
            .write_sheet(&sample_table(), "Sheet1", &SpecXlsxSheetWriteOptions::default())
            .unwrap();
        writer.close().unwrap();

        assert_eq!(read_sheet_text_grid(&path)[2], vec!["ACME", "NA", "200.5"]);
    }

    #[test]
    fn test_write_sheet_bool_cells_are_native_booleans() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bool.xlsx");
        let table = SpecSheetTable::new(
            vec!["item".to_string(), "paid".to_string()],
            vec![
                vec![EnumCellValue::String("rent".to_string()), EnumCellValue::Bool(true)],
                vec![EnumCellValue::String("fee".to_string()), EnumCellValue::Bool(false)],
            ],
        )
        .unwrap();

        let mut writer = XlsxWriter::new(
            path.clone(),
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions::default(),
        );
        writer
            .write_sheet(&table, "Sheet1", &SpecXlsxSheetWriteOptions::default())
            .unwrap();
        writer.close().unwrap();

        let l_grid = read_sheet_text_grid(&path);
        assert_eq!(l_grid[1], vec!["rent", "TRUE"]);
        assert_eq!(l_grid[2], vec!["fee", "FALSE"]);
    }

    #[test]
    fn test_write_rejects_duplicate_columns_and_writes_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = XlsxWriter::new(
            dir.path().join("dup.xlsx"),
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions::default(),
        );
        let table_dup =
            SpecSheetTable::new(vec!["a".to_string(), "a".to_string()], vec![]).unwrap();
        assert!(
            writer
                .write_sheet(&table_dup, "Sheet1", &SpecXlsxSheetWriteOptions::default())
                .unwrap_err()
                .starts_with("Duplicate column names detected")
        );

        writer.close().unwrap();
        writer.close().unwrap();
        assert_eq!(
            writer
                .write_sheet(&sample_table(), "Sheet1", &SpecXlsxSheetWriteOptions::default())
                .unwrap_err(),
            "Cannot write after close()."
        );
    }

    #[test]
    fn test_close_into_missing_directory_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xlsx");
        let mut writer = XlsxWriter::new(
            path.clone(),
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions::default(),
        );
        writer
            .write_sheet(&sample_table(), "Sheet1", &SpecXlsxSheetWriteOptions::default())
            .unwrap();

        assert!(writer.close().is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_estimate_width_len_counts_wide_chars_double() {
        assert_eq!(
            estimate_width_len(&EnumCellValue::String("ab公司".to_string()), EnumColumnKind::Text),
            6
        );
        assert_eq!(
            estimate_width_len(&EnumCellValue::Number(1234.0), EnumColumnKind::Integer),
            4
        );
        assert_eq!(estimate_width_len(&EnumCellValue::None, EnumColumnKind::Text), 0);
        assert_eq!(estimate_width_len(&EnumCellValue::Bool(false), EnumColumnKind::Text), 5);
    }
}
