//! Reading of raw per-location CSV exports.
//!
//! Public-health exports mix header rows, comment rows and data rows. A row is
//! treated as data only when its key cell starts with an ASCII digit; any
//! other row is skipped. Fields are split by a quote-aware CSV reader, so
//! quoted cells (and embedded commas) are handled without manual stripping.

use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How columns of a source file are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Fixed column positions; the key is column 0 and the first skipped row
    /// is remembered as the header.
    Positional,
    /// The first row is a header and columns are looked up by name.
    Headed,
}

/// Where the key cell of each row lives.
#[derive(Debug, Clone, Copy)]
pub enum KeyColumn<'a> {
    Index(usize),
    Named(&'a str),
}

/// Row tallies reported after a full pass over a source file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub data_rows: usize,
    pub skipped_rows: usize,
}

/// A CSV export opened for a single streaming pass.
pub struct SourceFile {
    path: PathBuf,
    layout: Layout,
    reader: csv::Reader<File>,
}

impl SourceFile {
    /// Opens `path` for reading with the given column layout.
    pub fn open(path: impl AsRef<Path>, layout: Layout) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = ReaderBuilder::new()
            .has_headers(layout == Layout::Headed)
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("failed to open source file {}", path.display()))?;

        Ok(Self {
            path,
            layout,
            reader,
        })
    }

    /// Streams every data row through `visit`, skipping rows whose key cell
    /// does not begin with a digit.
    pub fn for_each_row<F>(mut self, key: KeyColumn<'_>, mut visit: F) -> Result<ScanSummary>
    where
        F: FnMut(&Row<'_>) -> Result<()>,
    {
        let mut header = match self.layout {
            Layout::Headed => Some(
                self.reader
                    .headers()
                    .with_context(|| format!("failed to read header of {}", self.path.display()))?
                    .clone(),
            ),
            Layout::Positional => None,
        };

        let key_index = match key {
            KeyColumn::Index(index) => index,
            KeyColumn::Named(name) => column_index(header.as_ref(), name, &self.path)?,
        };

        let mut summary = ScanSummary::default();
        let mut record = StringRecord::new();

        loop {
            let more = self
                .reader
                .read_record(&mut record)
                .with_context(|| format!("failed to read {}", self.path.display()))?;
            if !more {
                break;
            }

            let line = record.position().map_or(0, |p| p.line());

            if !starts_with_digit(record.get(key_index)) {
                debug!(path = %self.path.display(), line, "Skipping non-data row");
                summary.skipped_rows += 1;
                if header.is_none() {
                    header = Some(record.clone());
                }
                continue;
            }

            let row = Row {
                path: &self.path,
                line,
                record: &record,
                header: header.as_ref(),
            };
            visit(&row)?;
            summary.data_rows += 1;
        }

        Ok(summary)
    }
}

/// A single data row together with enough context to report errors.
pub struct Row<'a> {
    path: &'a Path,
    line: u64,
    record: &'a StringRecord,
    header: Option<&'a StringRecord>,
}

impl Row<'_> {
    /// 1-based line number of the row in its source file.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns the cell at `index`, or an error if the row is too short.
    pub fn get(&self, index: usize) -> Result<&str> {
        self.record.get(index).ok_or_else(|| {
            anyhow!(
                "{} line {}: missing column {index} (row has {} columns)",
                self.path.display(),
                self.line,
                self.record.len()
            )
        })
    }

    /// Returns the last cell of the row.
    pub fn last(&self) -> Result<&str> {
        let len = self.record.len();
        match len {
            0 => Err(anyhow!("{} line {}: empty row", self.path.display(), self.line)),
            _ => self.get(len - 1),
        }
    }

    /// Returns the cell under the header column called `name`.
    pub fn named(&self, name: &str) -> Result<&str> {
        let index = column_index(self.header, name, self.path)?;
        self.get(index)
    }

    /// Parses a cell that must hold an integer, failing with the row location.
    pub fn required_int<T>(&self, cell: &str, what: &str) -> Result<T>
    where
        T: std::str::FromStr,
    {
        cell.trim().parse().map_err(|_| {
            anyhow!(
                "{} line {}: {what} {cell:?} is not a number",
                self.path.display(),
                self.line
            )
        })
    }

    /// Parses a cell that must hold a float, failing with the row location.
    pub fn required_float(&self, cell: &str, what: &str) -> Result<f64> {
        cell.trim().parse().map_err(|_| {
            anyhow!(
                "{} line {}: {what} {cell:?} is not a number",
                self.path.display(),
                self.line
            )
        })
    }

    /// Context string identifying this row, for errors raised by callers.
    pub fn location(&self) -> String {
        format!("{} line {}", self.path.display(), self.line)
    }
}

/// Parses an optional count. Blank or non-numeric cells contribute nothing.
pub fn optional_count(cell: &str) -> Option<i64> {
    cell.trim().parse().ok()
}

fn starts_with_digit(cell: Option<&str>) -> bool {
    cell.and_then(|c| c.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

fn column_index(header: Option<&StringRecord>, name: &str, path: &Path) -> Result<usize> {
    let header = header.ok_or_else(|| {
        anyhow!(
            "{} has no header row to look up column {name:?}",
            path.display()
        )
    })?;

    header
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow!("column {name:?} not found in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_positional_skips_non_digit_rows() {
        let file = source("ZIP Code,Value\n60601,1\nUnknown,2\n60602,3\n");
        let mut seen = Vec::new();

        let summary = SourceFile::open(file.path(), Layout::Positional)
            .unwrap()
            .for_each_row(KeyColumn::Index(0), |row| {
                seen.push((row.get(0)?.to_string(), row.get(1)?.to_string()));
                Ok(())
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                ("60601".to_string(), "1".to_string()),
                ("60602".to_string(), "3".to_string())
            ]
        );
        assert_eq!(summary.data_rows, 2);
        assert_eq!(summary.skipped_rows, 2);
    }

    #[test]
    fn test_quoted_cells_are_unquoted() {
        let file = source("\"ZIP_4\",\"ADI\"\n\"606011234\",\"12,5\"\n");
        let mut cells = Vec::new();

        SourceFile::open(file.path(), Layout::Positional)
            .unwrap()
            .for_each_row(KeyColumn::Index(0), |row| {
                cells.push(row.get(0)?.to_string());
                cells.push(row.get(1)?.to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(cells, vec!["606011234", "12,5"]);
    }

    #[test]
    fn test_last_column_on_ragged_rows() {
        let file = source("1,a\n2,b,c\n");
        let mut last = Vec::new();

        SourceFile::open(file.path(), Layout::Positional)
            .unwrap()
            .for_each_row(KeyColumn::Index(0), |row| {
                last.push(row.last()?.to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(last, vec!["a", "c"]);
    }

    #[test]
    fn test_headed_named_lookup() {
        let file = source("name,GEOID,pop\nfoo,6085500100,10\ntotal,all,99\nbar,6085500200,20\n");
        let mut rows = Vec::new();

        let summary = SourceFile::open(file.path(), Layout::Headed)
            .unwrap()
            .for_each_row(KeyColumn::Named("GEOID"), |row| {
                let tract: u64 = row.required_int(row.named("GEOID")?, "tract")?;
                rows.push((tract, row.named("pop")?.to_string()));
                Ok(())
            })
            .unwrap();

        assert_eq!(
            rows,
            vec![(6085500100, "10".to_string()), (6085500200, "20".to_string())]
        );
        assert_eq!(summary.skipped_rows, 1);
    }

    #[test]
    fn test_missing_named_column() {
        let file = source("a,b\n1,2\n");
        let err = SourceFile::open(file.path(), Layout::Headed)
            .unwrap()
            .for_each_row(KeyColumn::Named("GEOID"), |_| Ok(()))
            .err()
            .unwrap();
        assert!(err.to_string().contains("GEOID"));
    }

    #[test]
    fn test_missing_column_reports_line() {
        let file = source("header\n60601,1\n");
        let err = SourceFile::open(file.path(), Layout::Positional)
            .unwrap()
            .for_each_row(KeyColumn::Index(0), |row| row.get(18).map(|_| ()))
            .err()
            .unwrap();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(SourceFile::open("/nonexistent/cases.csv", Layout::Positional).is_err());
    }

    #[test]
    fn test_optional_count() {
        assert_eq!(optional_count("150"), Some(150));
        assert_eq!(optional_count(" 7 "), Some(7));
        assert_eq!(optional_count(""), None);
        assert_eq!(optional_count("1.5"), None);
        assert_eq!(optional_count("n/a"), None);
    }
}
