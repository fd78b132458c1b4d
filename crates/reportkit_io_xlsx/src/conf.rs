//! Excel limits and default format presets.

use crate::spec::{EnumAlign, SpecCellFormat, SpecXlsxFormats};

/// Rows per worksheet, header included.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Columns per worksheet.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters Excel rejects in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
pub const N_WIDTH_EXCEL_COL_MAX: usize = 255;
/// Suffix of the hidden sibling a workbook is saved to before rename.
pub const C_SUFFIX_FILE_PART: &str = "part";

/// Report presets: Calibri 11, bold centered header, right-aligned numbers.
pub fn derive_default_xlsx_formats() -> SpecXlsxFormats {
    let fmt_base = SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11.0),
        border: Some(true),
        align: Some(EnumAlign::Left),
        ..Default::default()
    };
    let fmt_number = |num_format: &str| {
        fmt_base.merge(&SpecCellFormat {
            num_format: Some(num_format.to_string()),
            align: Some(EnumAlign::Right),
            ..Default::default()
        })
    };

    SpecXlsxFormats {
        header: fmt_base.merge(&SpecCellFormat {
            bold: Some(true),
            align: Some(EnumAlign::Center),
            ..Default::default()
        }),
        integer: fmt_number("0"),
        decimal: fmt_number("0.00##"),
        scientific: fmt_number("0.00E+0"),
        text: fmt_base,
    }
}
