//! Cell, format and option models shared by the writer kernel.

////////////////////////////////////////////////////////////////////////////////
// #region CellFormat

/// Horizontal alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumAlign {
    Left,
    Center,
    Right,
}

/// Partial cell format; `None` means "inherit" when overlaid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCellFormat {
    pub font_name: Option<String>,
    /// Points.
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub align: Option<EnumAlign>,
    /// Thin border on all sides when `Some(true)`.
    pub border: Option<bool>,
    /// Excel number format code, e.g. `0.00`.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Overlay `patch` onto `self`; set fields of `patch` win.
    pub fn merge(&self, patch: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: patch.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: patch.font_size.or(self.font_size),
            bold: patch.bold.or(self.bold),
            align: patch.align.or(self.align),
            border: patch.border.or(self.border),
            num_format: patch.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }
}

/// Format per column kind, plus the header row format.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecXlsxFormats {
    pub text: SpecCellFormat,
    pub integer: SpecCellFormat,
    pub decimal: SpecCellFormat,
    pub scientific: SpecCellFormat,
    pub header: SpecCellFormat,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValues

/// One body cell before it is written.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    None,
    String(String),
    Number(f64),
    /// Written as a native boolean cell.
    Bool(bool),
}

impl EnumCellValue {
    /// Whether the cell renders blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.is_empty(),
            Self::Number(_) | Self::Bool(_) => false,
        }
    }
}

/// Inferred column kind; selects the body format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumColumnKind {
    #[default]
    Text,
    /// All numbers integral.
    Integer,
    Decimal,
    /// Magnitudes outside the scientific thresholds.
    Scientific,
}

impl EnumColumnKind {
    /// Whether cells of this kind are written as numbers.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Header plus row-major body of one logical sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetTable {
    pub columns: Vec<String>,
    /// Each row has `columns.len()` cells.
    pub rows: Vec<Vec<EnumCellValue>>,
}

impl SpecSheetTable {
    /// Build a grid, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<EnumCellValue>>) -> Result<Self, String> {
        if let Some((n_idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(format!(
                "Row {n_idx} has {} cells; expected {}.",
                row.len(),
                columns.len()
            ));
        }
        Ok(Self { columns, rows })
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// When a decimal column is written in scientific format.
///
/// The column switches when any sampled `|x|` is `>= thr_max`, or non-zero
/// and `< thr_min`. Integer columns never switch.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecScientificPolicy {
    pub thr_min: f64,
    pub thr_max: f64,
    /// Body rows sampled; `None` samples all.
    pub height_body_inferred_max: Option<usize>,
}

impl Default for SpecScientificPolicy {
    fn default() -> Self {
        Self {
            thr_min: 0.0001,
            thr_max: 1_000_000_000_000.0,
            height_body_inferred_max: Some(20_000),
        }
    }
}

/// Column widths: widest of header and measured body cells, plus padding,
/// clamped to `[width_cell_min, width_cell_max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Body rows measured; `None` measures all.
    pub height_body_inferred_max: Option<usize>,
    pub width_cell_min: usize,
    pub width_cell_max: usize,
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Writer-wide options.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecXlsxWriteOptions {
    /// Text written for blank and non-finite cells; `None` leaves them blank.
    pub missing_text: Option<String>,
    /// Infer numeric columns from cell values; otherwise every column is text.
    pub infer_numeric_cols: bool,
    /// Split numeric columns into integer and decimal.
    pub infer_integer_cols: bool,
    /// Overlaid onto every body format.
    pub base_format_patch: SpecCellFormat,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            missing_text: None,
            infer_numeric_cols: true,
            infer_integer_cols: true,
            base_format_patch: SpecCellFormat {
                border: Some(false),
                ..Default::default()
            },
        }
    }
}

/// Per-sheet options. The header row is always frozen.
#[derive(Default, Debug, Clone)]
pub struct SpecXlsxSheetWriteOptions {
    pub policy_autofit: SpecAutofitCellsPolicy,
    pub policy_scientific: SpecScientificPolicy,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Report

/// One worksheet actually written, as a window over the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetSlice {
    /// Unique name in the workbook.
    pub sheet_name: String,
    pub row_start_inclusive: usize,
    pub row_end_exclusive: usize,
    pub col_start_inclusive: usize,
    pub col_end_exclusive: usize,
}

/// Outcome of one `write_sheet` call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    pub sheets: Vec<SpecSheetSlice>,
    /// Non-fatal, e.g. Excel-limit splits.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
