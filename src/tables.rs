//! CSV loaders for the link length table and the DH parameter table.
//!
//! Both tables start with a header row, which is skipped. Cells are trimmed.
//!
//! ```text
//! name,length_mm          segment,offset,d,a,alpha
//! L1,500                  seg1,0,L1,L1*2,90
//! ```

use crate::error::{ChainError, Result};
use crate::expression::is_identifier;
use crate::symbols::SymbolScope;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Divisor that converts the millimeters in a length table to meters.
pub const MILLIMETERS_PER_METER: f64 = 1000.0;

/// Named link lengths in meters.
#[derive(Debug, Default)]
pub struct LengthTable {
    scope: SymbolScope,
}

impl LengthTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a length in meters. A repeated name replaces the earlier value.
    ///
    /// Names that a DH cell could never reference are refused.
    pub fn insert(&mut self, name: &str, meters: f64) -> Result<()> {
        if !is_identifier(name) {
            return Err(ChainError::Symbol(name.to_string()));
        }
        self.scope.bind(name, meters)
    }

    /// Reads a `(name, millimeters)` table and converts every entry to meters.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        Self::from_reader_scaled(reader, MILLIMETERS_PER_METER)
    }

    /// Reads a `(name, value)` table, dividing each value by `divisor`.
    pub fn from_reader_scaled<R: io::Read>(reader: R, divisor: f64) -> Result<Self> {
        let mut table = Self::new();
        let mut csv = csv_reader(reader);
        for record in csv.records() {
            let record = record?;
            let line = record_line(&record);
            let name = required(&record, 0, "name", "lengths", line)?;
            let raw = required(&record, 1, "millimeters", "lengths", line)?;
            if !is_identifier(name) {
                return Err(ChainError::InvalidEntry {
                    table: "lengths",
                    line,
                    value: name.to_string(),
                    reason: "name is not an identifier",
                });
            }
            let value: f64 = raw.parse().map_err(|source| ChainError::Parse {
                table: "lengths",
                line,
                value: raw.to_string(),
                source,
            })?;
            let meters = value / divisor;
            if !meters.is_finite() {
                return Err(ChainError::InvalidEntry {
                    table: "lengths",
                    line,
                    value: raw.to_string(),
                    reason: "length is not finite",
                });
            }
            debug!(length = name, raw, meters, "length");
            table.insert(name, meters)?;
        }
        info!(count = table.len(), lengths = ?table.scope, "loaded lengths");
        Ok(table)
    }

    /// Opens a millimeter length table on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_scaled(path, MILLIMETERS_PER_METER)
    }

    /// Opens a length table on disk and divides each value by `divisor`.
    pub fn from_path_scaled(path: impl AsRef<Path>, divisor: f64) -> Result<Self> {
        Self::from_reader_scaled(File::open(path)?, divisor)
    }

    /// Length in meters.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.scope.lookup(name)
    }

    /// The numeric text substituted for `name`, e.g. `"0.5"` for 500 mm.
    pub fn replacement(&self, name: &str) -> Option<String> {
        self.scope.replacement(name)
    }

    /// The bindings, for use as an expression scope.
    pub fn scope(&self) -> &SymbolScope {
        &self.scope
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.scope.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    /// Lengths in the order they were first read.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.scope.iter()
    }
}

/// One row of a DH table with its cells as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DhRow {
    pub segment: String,
    /// Joint angle offset expression (degrees).
    pub offset: String,
    /// Link offset expression (meters after length substitution).
    pub d: String,
    /// Link length expression (meters after length substitution).
    pub a: String,
    /// Link twist expression (degrees).
    pub alpha: String,
    /// Line in the source file, 0 when built in code.
    pub line: u64,
}

impl DhRow {
    pub fn new(
        segment: impl Into<String>,
        offset: impl Into<String>,
        d: impl Into<String>,
        a: impl Into<String>,
        alpha: impl Into<String>,
    ) -> Self {
        Self {
            segment: segment.into(),
            offset: offset.into(),
            d: d.into(),
            a: a.into(),
            alpha: alpha.into(),
            line: 0,
        }
    }
}

/// Reads `(segment, offset, d, a, alpha)` rows in file order.
pub fn read_dh_rows<R: io::Read>(reader: R) -> Result<Vec<DhRow>> {
    let mut rows = Vec::new();
    let mut csv = csv_reader(reader);
    for record in csv.records() {
        let record = record?;
        let line = record_line(&record);
        let cell = |idx: usize, column: &'static str| {
            required(&record, idx, column, "dh", line).map(str::to_string)
        };
        rows.push(DhRow {
            segment: cell(0, "segment")?,
            offset: cell(1, "offset")?,
            d: cell(2, "d")?,
            a: cell(3, "a")?,
            alpha: cell(4, "alpha")?,
            line,
        });
    }
    info!(count = rows.len(), "loaded dh rows");
    Ok(rows)
}

pub fn load_dh_rows(path: impl AsRef<Path>) -> Result<Vec<DhRow>> {
    read_dh_rows(File::open(path)?)
}

fn csv_reader<R: io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn required<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    column: &'static str,
    table: &'static str,
    line: u64,
) -> Result<&'r str> {
    record
        .get(idx)
        .ok_or(ChainError::MissingField {
            table,
            line,
            column,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_are_converted_to_meters() {
        let csv = "name,mm\nL1,500\nL2, 125.5 \n";
        let table = LengthTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("L1"), Some(0.5));
        assert_eq!(table.get("L2"), Some(125.5 / 1000.0));
        assert_eq!(table.replacement("L1").as_deref(), Some("0.5"));
    }

    #[test]
    fn duplicate_length_keeps_last_value() {
        let csv = "name,mm\nL1,500\nL1,700\n";
        let table = LengthTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("L1"), Some(0.7));
    }

    #[test]
    fn malformed_length_is_a_parse_error() {
        let csv = "name,mm\nL1,500\nL2,abc\n";
        let err = LengthTable::from_reader(csv.as_bytes()).unwrap_err();
        match err {
            ChainError::Parse { table, line, value, .. } => {
                assert_eq!(table, "lengths");
                assert_eq!(line, 3);
                assert_eq!(value, "abc");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn length_names_must_be_identifiers() {
        for csv in ["name,mm\nL 1,500\n", "name,mm\nL1,1\nL.2,3\n", "name,mm\n2L,3\n"] {
            let err = LengthTable::from_reader(csv.as_bytes()).unwrap_err();
            assert!(
                matches!(err, ChainError::InvalidEntry { table: "lengths", .. }),
                "{csv:?} gave {err:?}"
            );
        }

        let mut table = LengthTable::new();
        assert!(matches!(table.insert("L-1", 0.1), Err(ChainError::Symbol(_))));
        assert!(table.is_empty());
    }

    #[test]
    fn non_finite_lengths_are_rejected() {
        for raw in ["inf", "NaN", "1e400"] {
            let csv = format!("name,mm\nL1,500\nL2,{raw}\n");
            match LengthTable::from_reader(csv.as_bytes()).unwrap_err() {
                ChainError::InvalidEntry { line, value, .. } => {
                    assert_eq!(line, 3);
                    assert_eq!(value, raw);
                }
                other => panic!("expected invalid entry, got {other:?}"),
            }
        }
    }

    #[test]
    fn short_row_is_a_missing_field() {
        let csv = "name,mm\nL1\n";
        let err = LengthTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ChainError::MissingField {
                column: "millimeters",
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn dh_rows_keep_file_order_and_raw_cells() {
        let csv = "segment,offset,d,a,alpha\nseg1,0,L1,L1*2,90\nseg2,q2-90, 0 ,L2,-90\n";
        let rows = read_dh_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].segment, "seg1");
        assert_eq!(rows[0].a, "L1*2");
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].offset, "q2-90");
        assert_eq!(rows[1].d, "0");
        assert_eq!(rows[1].alpha, "-90");
    }

    #[test]
    fn dh_row_missing_alpha() {
        let csv = "segment,offset,d,a,alpha\nseg1,0,L1,L1\n";
        let err = read_dh_rows(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ChainError::MissingField {
                table: "dh",
                column: "alpha",
                ..
            }
        ));
    }
}
