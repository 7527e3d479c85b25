use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};

use calamine::{Reader, open_workbook_auto};
use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, Writer};

use crate::domain::{COL_LONG_CODE, Compatibility, LongCode, MatchRule};
use crate::error::MetagrateError;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// An in-memory metadata export: one header plus string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    label: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(label: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            label: label.into(),
            headers,
            rows,
        }
    }

    /// Reads a CSV export, or the first sheet of a spreadsheet export.
    pub fn load(path: &Utf8Path) -> Result<Self, MetagrateError> {
        let is_workbook = path
            .extension()
            .map(|ext| {
                WORKBOOK_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);
        if is_workbook {
            return Self::from_workbook(path);
        }
        let file = File::open(path.as_std_path()).map_err(|err| MetagrateError::InputRead {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        Self::from_reader(path.as_str(), file)
    }

    pub fn from_reader<R: Read>(label: &str, reader: R) -> Result<Self, MetagrateError> {
        let malformed = |err: csv::Error| MetagrateError::MalformedInput {
            path: label.to_string(),
            message: err.to_string(),
        };
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(malformed)?
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(malformed)?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(Self::new(label, headers, rows))
    }

    pub fn from_workbook(path: &Utf8Path) -> Result<Self, MetagrateError> {
        let malformed = |message: String| MetagrateError::MalformedInput {
            path: path.to_string(),
            message,
        };
        let mut workbook =
            open_workbook_auto(path.as_std_path()).map_err(|err| MetagrateError::InputRead {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| malformed("workbook has no sheets".to_string()))?
            .map_err(|err| malformed(err.to_string()))?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
        let headers = rows
            .next()
            .ok_or_else(|| malformed("first sheet is empty".to_string()))?;

        Ok(Self::new(path.as_str(), headers, rows.collect()))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, MetagrateError> {
        self.column(name).ok_or_else(|| MetagrateError::MissingColumn {
            path: self.label.clone(),
            column: name.to_string(),
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn value(&self, row: usize, column: usize) -> &str {
        &self.rows[row][column]
    }

    pub fn set(&mut self, row: usize, column: usize, value: impl Into<String>) {
        self.rows[row][column] = value.into();
    }

    /// Index of `name`, appending an empty column when it is not present yet.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column(name) {
            return index;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[column].as_str())
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), MetagrateError> {
        let csv_err = |err: csv::Error| MetagrateError::Filesystem(err.to_string());
        let mut wtr = Writer::from_writer(writer);
        wtr.write_record(&self.headers).map_err(csv_err)?;
        for row in &self.rows {
            wtr.write_record(row).map_err(csv_err)?;
        }
        wtr.flush()
            .map_err(|err| MetagrateError::Filesystem(err.to_string()))?;
        Ok(())
    }

    /// Writes the table next to `path` and renames it into place.
    pub fn write_atomic(&self, path: &Utf8Path) -> Result<(), MetagrateError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        std::fs::create_dir_all(parent.as_std_path())
            .map_err(|err| MetagrateError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("metagrate-output")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MetagrateError::Filesystem(err.to_string()))?;
        self.write_to(temp.as_file_mut())?;
        temp.persist(path.as_std_path())
            .map_err(|err| MetagrateError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Parsed long codes of a table, grouped by observation for lookup.
#[derive(Debug, Clone)]
pub struct LongCodeIndex {
    codes: Vec<LongCode>,
    by_observation: HashMap<String, Vec<usize>>,
}

impl LongCodeIndex {
    pub fn build(table: &Table) -> Result<Self, MetagrateError> {
        let column = table.require_column(COL_LONG_CODE)?;
        let mut codes = Vec::with_capacity(table.len());
        let mut by_observation: HashMap<String, Vec<usize>> = HashMap::new();
        for (row, value) in table.column_values(column).enumerate() {
            let code: LongCode = value.parse().map_err(|_| MetagrateError::MalformedInput {
                path: table.label().to_string(),
                // header is line 1
                message: format!("line {}: invalid long code {value:?}", row + 2),
            })?;
            by_observation
                .entry(code.observation().to_string())
                .or_default()
                .push(row);
            codes.push(code);
        }
        Ok(Self {
            codes,
            by_observation,
        })
    }

    pub fn code(&self, row: usize) -> &LongCode {
        &self.codes[row]
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Rows whose long code `rule` accepts as a partner of `code`.
    pub fn partners(&self, code: &LongCode, rule: MatchRule) -> Vec<usize> {
        self.by_observation
            .get(code.observation())
            .map(|rows| {
                rows.iter()
                    .copied()
                    .filter(|&row| rule.accepts(self.codes[row].compatibility(code)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Closest long code to `code` for diagnostics: an upgradeable code first,
    /// then anything sharing the observation.
    pub fn nearest(&self, code: &LongCode) -> Option<&LongCode> {
        let rows = self.by_observation.get(code.observation())?;
        rows.iter()
            .map(|&row| &self.codes[row])
            .find(|candidate| candidate.compatibility(code) == Compatibility::Upgraded)
            .or_else(|| rows.first().map(|&row| &self.codes[row]))
    }
}
