//! I/O module
//!
//! Handles the on-disk spreadsheet.
//!
//! # Components
//!
//! - `csv_format` - Sheet row layout and row/transaction conversion
//! - `csv_sheet` - CSV-file implementation of `SpreadsheetStore`

pub mod csv_format;
pub mod csv_sheet;

pub use csv_format::{convert_sheet_row, SheetRow, SHEET_HEADER};
pub use csv_sheet::CsvSheet;
