//! # Export Writer
//!
//! Turns merged visit records into a localized table and writes it as a
//! single-sheet workbook (or CSV) with columns sized to their content.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use rust_xlsxwriter::{DocProperties, Format, Workbook};
#[cfg(unix)]
use tracing::warn;

use crate::config::ColumnLabels;
use crate::error::ExportError;
use crate::history::{VisitRecord, transition_label};
use crate::timestamp::format_datetime;

pub const SHEET_NAME: &str = "Sheet1";

/// Rows available below the header in one worksheet.
const MAX_DATA_ROWS: usize = 1_048_575;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Empty,
}

impl Cell {
    fn text(value: Option<&str>) -> Self {
        value.map_or(Cell::Empty, |s| Cell::Text(s.to_string()))
    }

    fn integer(value: Option<i64>) -> Self {
        value.map_or(Cell::Empty, Cell::Integer)
    }

    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Integer(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }

    /// Width in characters of the rendered value.
    pub fn width(&self) -> usize {
        match self {
            Cell::Text(s) => s.chars().count(),
            Cell::Integer(n) => n.to_string().len(),
            Cell::Empty => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Build the display table: timestamps formatted, headers localized.
pub fn build_table(
    records: &[VisitRecord],
    labels: &ColumnLabels,
    with_transition_labels: bool,
) -> ExportTable {
    let mut headers = vec![
        labels.url.clone(),
        labels.title.clone(),
        labels.last_visit_time.clone(),
        labels.visit_count.clone(),
        labels.visit_time.clone(),
        labels.from_visit.clone(),
        labels.transition.clone(),
    ];
    if with_transition_labels {
        headers.push(labels.transition_label.clone());
    }
    headers.push(labels.profile_id.clone());
    headers.push(labels.source_path.clone());

    let rows = records
        .iter()
        .map(|record| {
            let mut row = vec![
                Cell::Text(record.url.clone()),
                Cell::text(record.title.as_deref()),
                Cell::Text(format_datetime(record.last_visit_at)),
                Cell::Integer(record.visit_count),
                Cell::Text(format_datetime(record.visit_at)),
                Cell::integer(record.from_visit),
                Cell::integer(record.transition),
            ];
            if with_transition_labels {
                row.push(Cell::text(record.transition.map(transition_label)));
            }
            row.push(Cell::Text(record.profile_id.clone()));
            row.push(Cell::Text(record.source_path.to_string_lossy().into_owned()));
            row
        })
        .collect();

    ExportTable { headers, rows }
}

/// Per-column width: widest of content and header, plus padding, capped.
pub fn column_widths(table: &ExportTable, padding: usize, cap: usize) -> Vec<usize> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let content = table
                .rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(Cell::width)
                .max()
                .unwrap_or(0);
            (content.max(header.chars().count()) + padding).min(cap)
        })
        .collect()
}

pub fn output_file_name(prefix: &str, generated_at: NaiveDateTime, extension: &str) -> String {
    format!(
        "{prefix}_{}.{extension}",
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

/// Create the output directory if needed and make sure it is a directory.
pub fn ensure_output_dir(path: &Path) -> Result<(), ExportError> {
    if path.exists() {
        if !std::fs::metadata(path)?.is_dir() {
            return Err(ExportError::OutputNotDirectory(path.to_path_buf()));
        }
    } else {
        std::fs::create_dir_all(path)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode();
        if mode & 0o002 != 0 {
            warn!("output directory is world-writable: {}", path.display());
        }
    }
    Ok(())
}

pub fn write_xlsx(
    table: &ExportTable,
    widths: &[usize],
    comment: &str,
    path: &Path,
) -> Result<(), ExportError> {
    if table.rows.len() > MAX_DATA_ROWS {
        return Err(ExportError::TooManyRows(table.rows.len()));
    }

    let mut workbook = Workbook::new();
    let properties = DocProperties::new()
        .set_title("WeChat browser history")
        .set_comment(comment);
    workbook.set_properties(&properties);

    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }
    for (idx, row) in table.rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(s) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                Cell::Integer(n) => {
                    worksheet.write_number(row_num, col, *n as f64)?;
                }
                Cell::Empty => {}
            }
        }
    }
    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width as f64)?;
    }

    workbook.save(path)?;
    Ok(())
}

/// CSV with a UTF-8 byte order mark so spreadsheet tools pick the right
/// encoding for the localized headers.
pub fn write_csv(table: &ExportTable, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    file.write_all(b"\xEF\xBB\xBF")?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Cell::render))?;
    }
    writer.flush()?;
    Ok(())
}
