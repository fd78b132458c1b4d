//! `reportkit_io_xlsx` v1:
//! XLSX writer kernel for flat report tables.
//!
//! Modules:
//! - `conf`   : Excel limits and default format presets
//! - `spec`   : cell/format models, options and reports
//! - `util`   : pure helper functions
//! - `writer` : buffered workbook writer with atomic save
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
    derive_default_xlsx_formats,
};
pub use spec::{
    EnumAlign, EnumCellValue, EnumColumnKind, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecScientificPolicy, SpecSheetSlice, SpecSheetTable, SpecXlsxFormats, SpecXlsxReport,
    SpecXlsxSheetWriteOptions, SpecXlsxWriteOptions,
};
pub use util::{
    convert_cell_value, derive_column_kinds, derive_part_file_path, plan_sheet_slices,
    sanitize_sheet_name,
};
pub use writer::XlsxWriter;
