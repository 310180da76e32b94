//! Batch upload ingestion
//!
//! Turns an uploaded `.txt`, `.csv` or `.xlsx` file into an ordered list of
//! non-empty messages and reports which column supplied them.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use smsguard_core::{Error, Result};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Upload size cap (10 MiB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Column name reported for formats without columns
pub const PLAIN_TEXT_COLUMN: &str = "text";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    PlainText,
    Csv,
    Xlsx,
}

impl BatchFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "txt" => Ok(Self::PlainText),
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "" => Err(Error::UnsupportedFormat(filename.to_string())),
            other => Err(Error::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// Messages extracted from one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedBatch {
    pub messages: Vec<String>,

    /// Header of the column the messages came from, or [`PLAIN_TEXT_COLUMN`]
    pub column: String,
}

/// Validates and parses batch uploads
#[derive(Debug, Clone)]
pub struct BatchFileIngester {
    max_bytes: usize,
}

impl Default for BatchFileIngester {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchFileIngester {
    pub fn new() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Override the upload size cap
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Cheap checks run before any parsing
    pub fn validate(&self, filename: &str, content: &[u8]) -> Result<BatchFormat> {
        if filename.is_empty() {
            return Err(Error::invalid_input("missing upload file name"));
        }
        let format = BatchFormat::from_filename(filename)?;
        if content.is_empty() {
            return Err(Error::empty_input("uploaded file is empty"));
        }
        if content.len() > self.max_bytes {
            return Err(Error::PayloadTooLarge {
                size: content.len(),
                limit: self.max_bytes,
            });
        }
        Ok(format)
    }

    /// Validate, parse and extract the messages of one upload
    pub fn ingest(
        &self,
        filename: &str,
        content: &[u8],
        requested_column: Option<&str>,
    ) -> Result<IngestedBatch> {
        let format = self.validate(filename, content)?;
        let requested = requested_column.map(str::trim).filter(|c| !c.is_empty());

        let batch = match format {
            BatchFormat::PlainText => {
                let messages = plain_text_messages(content);
                if messages.is_empty() {
                    return Err(Error::NoValidRows);
                }
                IngestedBatch {
                    messages,
                    column: PLAIN_TEXT_COLUMN.to_string(),
                }
            }
            BatchFormat::Csv => Table::from_csv(content)?.extract(requested)?,
            BatchFormat::Xlsx => Table::from_xlsx(content)?.extract(requested)?,
        };

        debug!(
            "Ingested {} messages from '{}' (column '{}')",
            batch.messages.len(),
            filename,
            batch.column
        );
        Ok(batch)
    }
}

/// Ingest with the default size cap
pub fn ingest(
    filename: &str,
    content: &[u8],
    requested_column: Option<&str>,
) -> Result<IngestedBatch> {
    BatchFileIngester::new().ingest(filename, content, requested_column)
}

/// Line boundaries recognised in plain-text uploads
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\x0b'
            | '\x0c'
            | '\x1c'
            | '\x1d'
            | '\x1e'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

fn plain_text_messages(content: &[u8]) -> Vec<String> {
    let text = decode_utf8_lossless(strip_bom(content));
    text.split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_bom(content: &[u8]) -> &[u8] {
    content.strip_prefix(UTF8_BOM).unwrap_or(content)
}

/// Decode UTF-8, dropping invalid byte sequences instead of failing
fn decode_utf8_lossless(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    out.push_str(valid);
                }
                match e.error_len() {
                    Some(len) => rest = &after[len..],
                    None => break,
                }
            }
        }
    }

    out
}

/// One parsed cell; only `Text` cells make a column eligible for auto-selection
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    /// Numeric, boolean or date values, kept in display form
    Other(String),
}

impl Cell {
    fn from_csv_field(raw: String) -> Self {
        if raw.is_empty() {
            return Self::Empty;
        }
        let trimmed = raw.trim();
        let is_bool =
            trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false");
        if is_bool || trimmed.parse::<f64>().is_ok() {
            Self::Other(raw)
        } else {
            Self::Text(raw)
        }
    }

    fn from_xlsx(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Self::Empty,
            Data::String(s) => Self::Text(s.clone()),
            Data::DateTime(dt) if dt.is_datetime() => Self::Other(
                dt.as_datetime()
                    .map(|value| value.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| data.to_string()),
            ),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Other(s.clone()),
            other => Self::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Text(s) | Self::Other(s) => s,
        }
    }
}

/// Rectangular table with a header row
#[derive(Debug)]
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

fn header_name(raw: &str, index: usize) -> String {
    if raw.trim().is_empty() {
        format!("Unnamed: {}", index)
    } else {
        raw.to_string()
    }
}

impl Table {
    fn from_csv(content: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(strip_bom(content));

        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(|e| Error::invalid_input(format!("malformed CSV header: {}", e)))?
            .iter()
            .enumerate()
            .map(|(i, raw)| header_name(&decode_utf8_lossless(raw), i))
            .collect();

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record =
                record.map_err(|e| Error::invalid_input(format!("malformed CSV row: {}", e)))?;
            if record.iter().all(<[u8]>::is_empty) {
                continue;
            }

            let mut row: Vec<Cell> = record
                .iter()
                .take(headers.len())
                .map(|field| Cell::from_csv_field(decode_utf8_lossless(field)))
                .collect();
            row.resize(headers.len(), Cell::Empty);
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    fn from_xlsx(content: &[u8]) -> Result<Self> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(content))
            .map_err(|e| Error::invalid_input(format!("unreadable spreadsheet: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::empty_input("spreadsheet has no sheets"))?
            .map_err(|e| Error::invalid_input(format!("unreadable first sheet: {}", e)))?;

        let mut sheet_rows = range.rows();
        let headers: Vec<String> = match sheet_rows.next() {
            Some(header) => header
                .iter()
                .enumerate()
                .map(|(i, cell)| match cell {
                    Data::Empty => format!("Unnamed: {}", i),
                    other => header_name(&other.to_string(), i),
                })
                .collect(),
            None => Vec::new(),
        };

        let rows = sheet_rows
            .map(|row| row.iter().map(Cell::from_xlsx).collect::<Vec<Cell>>())
            .filter(|row| row.iter().any(|c| *c != Cell::Empty))
            .collect();

        Ok(Self { headers, rows })
    }

    /// Pick the text column: explicit request, then a `text` header, then the
    /// first column holding string values
    fn resolve_column(&self, requested: Option<&str>) -> Result<usize> {
        let lowered: Vec<String> = self.headers.iter().map(|h| h.to_lowercase()).collect();

        if let Some(requested) = requested {
            let key = requested.trim().to_lowercase();
            return lowered
                .iter()
                .position(|h| *h == key)
                .ok_or_else(|| Error::ColumnNotFound(requested.to_string()));
        }

        if let Some(idx) = lowered.iter().position(|h| h == PLAIN_TEXT_COLUMN) {
            return Ok(idx);
        }

        (0..self.headers.len())
            .find(|&idx| {
                self.rows
                    .iter()
                    .any(|row| matches!(row.get(idx), Some(Cell::Text(_))))
            })
            .ok_or(Error::ColumnUnresolved)
    }

    fn extract(self, requested: Option<&str>) -> Result<IngestedBatch> {
        if self.headers.is_empty() || self.rows.is_empty() {
            return Err(Error::empty_input("file has no data rows"));
        }

        let idx = self.resolve_column(requested)?;
        let messages: Vec<String> = self
            .rows
            .iter()
            .filter_map(|row| row.get(idx))
            .map(|cell| cell.as_str().trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect();

        if messages.is_empty() {
            return Err(Error::NoValidRows);
        }

        Ok(IngestedBatch {
            messages,
            column: self.headers[idx].clone(),
        })
    }
}
