use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use ordered_float::OrderedFloat;

use crate::error::{ClusterError, Result};

pub type Record = Vec<f64>;

/// Rows of a numeric table, all of the same width. Read once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub width: usize,
}

impl Dataset {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .from_reader(rdr);
        Self::from_csv(reader)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut records = Vec::new();
        let mut width = None;
        for row in reader.records() {
            let row = row?;
            // Whitespace-only lines trim down to a single empty field
            if row.iter().all(str::is_empty) {
                continue;
            }
            let line = row.position().map(|p| p.line()).unwrap_or(0);

            let mut record = Vec::with_capacity(row.len());
            for (col, field) in row.iter().enumerate() {
                let value: f64 = field.parse().map_err(|_| ClusterError::MalformedInput {
                    line,
                    reason: format!("field {} ({:?}) is not a number", col, field),
                })?;
                if !value.is_finite() {
                    return Err(ClusterError::MalformedInput {
                        line,
                        reason: format!("field {} is not finite", col),
                    });
                }
                record.push(value);
            }

            match width {
                None => width = Some(record.len()),
                Some(expected) if expected != record.len() => {
                    return Err(ClusterError::MalformedInput {
                        line,
                        reason: format!("expected {} fields, found {}", expected, record.len()),
                    });
                }
                _ => {}
            }
            records.push(record);
        }

        let width = width.ok_or(ClusterError::EmptyDataset)?;
        debug!("loaded {} records of {} fields", records.len(), width);
        Ok(Dataset { records, width })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn check_column(&self, column: usize) -> Result<()> {
        if column >= self.width {
            return Err(ClusterError::ColumnOutOfRange {
                column,
                width: self.width,
            });
        }
        Ok(())
    }

    /// Values of one field across every record, in record order
    pub fn column(&self, column: usize) -> Result<Vec<f64>> {
        self.check_column(column)?;
        Ok(self.records.iter().map(|r| r[column]).collect())
    }
}

/// Distinct values in ascending order
pub fn distinct_sorted(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| OrderedFloat(v))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|v| v.into_inner())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_fixed_width_records() {
        let data = b"1,1,1,1,1,10\n2, 2,2,2,2,10\n\n# comment\n2,2,2,2,2,12.5\n";
        let ds = Dataset::from_reader(&data[..]).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.width, 6);
        assert_eq!(ds.column(5).unwrap(), vec![10.0, 10.0, 12.5]);
        assert_eq!(ds.records[1][1], 2.0);
    }

    #[test]
    fn whitespace_only_lines_are_skipped() {
        let data = b"1,2\n   \n\t\n3,4\n  ";
        let ds = Dataset::from_reader(&data[..]).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column(1).unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn blank_field_in_a_record_is_still_malformed() {
        let data = b"1,2\n3,\n";
        assert!(matches!(
            Dataset::from_reader(&data[..]),
            Err(ClusterError::MalformedInput { line: 2, .. })
        ));
    }

    #[test]
    fn ragged_row_is_malformed() {
        let data = b"1,2,3\n4,5\n";
        match Dataset::from_reader(&data[..]) {
            Err(ClusterError::MalformedInput { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn non_numeric_field_is_malformed() {
        let data = b"1,2,3\n4,five,6\n";
        match Dataset::from_reader(&data[..]) {
            Err(ClusterError::MalformedInput { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("five"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nan_is_malformed() {
        let data = b"1,NaN\n";
        assert!(matches!(
            Dataset::from_reader(&data[..]),
            Err(ClusterError::MalformedInput { .. })
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            Dataset::from_reader(&b"\n# nothing\n"[..]),
            Err(ClusterError::EmptyDataset)
        ));
    }

    #[test]
    fn column_out_of_range() {
        let ds = Dataset::from_reader(&b"1,2\n"[..]).unwrap();
        assert!(matches!(
            ds.column(5),
            Err(ClusterError::ColumnOutOfRange { column: 5, width: 2 })
        ));
    }

    #[test]
    fn distinct_values_are_sorted() {
        let ds = Dataset::from_reader(&b"0,3\n0,-1\n0,3\n0,2\n"[..]).unwrap();
        assert_eq!(distinct_sorted(&ds.column(1).unwrap()), vec![-1.0, 2.0, 3.0]);
    }
}
