//! Destinations for the result table.

use std::fs::File;
use std::io;
use std::path::Path;

use crate::models::traits::ResultSink;
use crate::models::types::{ColumnNames, Result, ResultRow};

/// Keeps the table in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTable {
    pub columns: Option<ColumnNames>,
    pub rows: Vec<ResultRow>,
}

impl InMemoryTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for InMemoryTable {
    fn write_header(&mut self, columns: &ColumnNames) -> Result<()> {
        self.columns = Some(columns.clone());
        Ok(())
    }

    fn write_row(&mut self, row: &ResultRow) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }
}

/// Delimited text output. Nulls are written as empty fields and distances
/// with a fixed number of decimals.
pub struct DelimitedFile<W: io::Write> {
    writer: csv::Writer<W>,
    decimals: usize,
}

impl DelimitedFile<File> {
    pub fn create(path: impl AsRef<Path>, delimiter: u8, decimals: u32) -> Result<Self> {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path)?;
        Ok(Self {
            writer,
            decimals: decimals as usize,
        })
    }
}

impl<W: io::Write> DelimitedFile<W> {
    pub fn from_writer(inner: W, delimiter: u8, decimals: u32) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(inner),
            decimals: decimals as usize,
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }

    fn number(&self, value: Option<f64>) -> String {
        value.map_or_else(String::new, |v| format!("{:.*}", self.decimals, v))
    }
}

impl<W: io::Write> ResultSink for DelimitedFile<W> {
    fn write_header(&mut self, columns: &ColumnNames) -> Result<()> {
        self.writer.write_record(columns.as_array())?;
        Ok(())
    }

    fn write_row(&mut self, row: &ResultRow) -> Result<()> {
        let id1 = row.id1.as_ref().map(|id| id.to_string()).unwrap_or_default();
        let id2 = row.id2.as_ref().map(|id| id.to_string()).unwrap_or_default();
        let straight = self.number(row.straight_distance);
        let along = self.number(row.along_axis_distance);

        self.writer.write_record([id1, id2, straight, along])?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::FeatureId;

    fn rows() -> Vec<ResultRow> {
        vec![
            ResultRow {
                id1: Some(FeatureId::text("p1")),
                id2: Some(FeatureId::text("p1")),
                straight_distance: Some(5.0),
                along_axis_distance: Some(0.0),
            },
            ResultRow {
                id1: Some(FeatureId::Integer(2)),
                id2: None,
                straight_distance: None,
                along_axis_distance: None,
            },
            ResultRow {
                id1: None,
                id2: Some(FeatureId::text("p3")),
                straight_distance: None,
                along_axis_distance: None,
            },
        ]
    }

    #[test]
    fn test_delimited_output() {
        let mut sink = DelimitedFile::from_writer(Vec::new(), b',', 2);
        sink.write_header(&ColumnNames::default()).unwrap();
        for row in rows() {
            sink.write_row(&row).unwrap();
        }
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(
            text,
            "ID1,ID2,straight_dist,river_dist\np1,p1,5.00,0.00\n2,,,\n,p3,,\n"
        );
    }

    #[test]
    fn test_delimiter_is_configurable() {
        let mut sink = DelimitedFile::from_writer(Vec::new(), b';', 1);
        sink.write_header(&ColumnNames::default()).unwrap();
        sink.write_row(&rows()[0]).unwrap();

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(text, "ID1;ID2;straight_dist;river_dist\np1;p1;5.0;0.0\n");
    }

    #[test]
    fn test_delimited_file_on_disk() {
        let path = std::env::temp_dir().join(format!("river-distance-{}.csv", std::process::id()));
        {
            let mut sink = DelimitedFile::create(&path, b',', 2).unwrap();
            sink.write_header(&ColumnNames::default()).unwrap();
            sink.write_row(&rows()[0]).unwrap();
            sink.finish().unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(text.ends_with("p1,p1,5.00,0.00\n"));
    }

    #[test]
    fn test_in_memory_table() {
        let mut table = InMemoryTable::new();
        table.write_header(&ColumnNames::default()).unwrap();
        for row in rows() {
            table.write_row(&row).unwrap();
        }
        table.finish().unwrap();

        assert_eq!(table.columns, Some(ColumnNames::default()));
        assert_eq!(table.rows, rows());
    }
}
