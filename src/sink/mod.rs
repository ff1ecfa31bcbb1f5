// src/sink/mod.rs

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::PipelineError;
use crate::transform::Record;

pub mod s3;

/// Serialize `records` as CSV at `path`: header row first, one row per
/// record, comma-delimited, default quoting, no index column. Overwrites any
/// existing file, so re-running a slice is idempotent.
pub fn write_csv(headers: &[&str], records: &[Record], path: &Path) -> Result<(), PipelineError> {
    let io_err = |source: csv::Error| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(e.into()))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(io_err)?;
    writer.write_record(headers).map_err(io_err)?;
    for record in records {
        writer.write_record(&record.values).map_err(io_err)?;
    }
    writer.flush().map_err(|e| io_err(e.into()))?;

    info!(path = %path.display(), rows = records.len(), "wrote csv");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_records() -> Vec<Record> {
        vec![
            Record {
                values: vec!["2020-01-01".into(), "CA".into(), "1.5".into()],
            },
            Record {
                values: vec!["2020-04-01".into(), "NY".into(), "1.6".into()],
            },
        ]
    }

    #[test]
    fn round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let headers = ["Record Date", "State", "Interest Rate Percent"];

        write_csv(&headers, &sample_records(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap(),
            &csv::StringRecord::from(headers.as_slice())
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0], &csv::StringRecord::from(vec!["2020-01-01", "CA", "1.5"]));
        assert_eq!(&rows[1], &csv::StringRecord::from(vec!["2020-04-01", "NY", "1.6"]));
    }

    #[test]
    fn rerun_overwrites_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let headers = ["Record Date", "State", "Interest Rate Percent"];

        write_csv(&headers, &sample_records(), &path).unwrap();
        let first = fs::read(&path).unwrap();
        write_csv(&headers, &sample_records(), &path).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.csv");

        write_csv(&["A"], &[Record { values: vec!["1".into()] }], &path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // the parent "file.csv" is a file, so the nested path cannot be created
        let blocker = dir.path().join("file.csv");
        fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("out.csv");

        let err = write_csv(&["A"], &[], &path).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
