//! Frame trace output.
//!
//! One JSON object per line, one line per FTM frame measurement.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{NodeId, SimTime};

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Failed to create trace file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write trace: {0}")]
    Write(#[from] std::io::Error),
    #[error("Failed to serialize trace record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub time_ps: u64,
    pub station: NodeId,
    pub burst: u64,
    pub frame: u32,
    pub rtt_ps: f64,
    pub rssi_dbm: f64,
}

impl FrameRecord {
    pub fn new(time: SimTime, station: NodeId, burst: u64, frame: u32, rtt_ps: f64, rssi_dbm: f64) -> Self {
        Self {
            time_ps: time.as_picos(),
            station,
            burst,
            frame,
            rtt_ps,
            rssi_dbm,
        }
    }
}

pub struct TraceWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl TraceWriter {
    /// Creates `<prefix>.jsonl`, truncating any previous trace
    pub fn create(prefix: impl AsRef<Path>) -> Result<Self, TraceError> {
        let mut path = prefix.as_ref().as_os_str().to_owned();
        path.push(".jsonl");
        let path = PathBuf::from(path);
        let file = File::create(&path).map_err(|source| TraceError::Create {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Writing frame trace to {}", path.display());
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn write(&mut self, record: &FrameRecord) -> Result<(), TraceError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), TraceError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_one_line_per_frame() {
        let dir = std::env::temp_dir().join(format!("ftm-trace-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let prefix = dir.join("ftm");

        let mut writer = TraceWriter::create(&prefix).unwrap();
        writer.write(&FrameRecord::new(SimTime::from_micros(200), NodeId(1), 0, 0, 33_000.0, -40.5)).unwrap();
        writer.write(&FrameRecord::new(SimTime::from_millis(64), NodeId(1), 0, 1, 34_000.0, -41.0)).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.records(), 2);
        assert_eq!(writer.path(), dir.join("ftm.jsonl"));

        let content = std::fs::read_to_string(dir.join("ftm.jsonl")).unwrap();
        let records: Vec<FrameRecord> = content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].time_ps, 200_000_000);
        assert_eq!(records[1].frame, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unwritable_path_is_reported() {
        let prefix = std::env::temp_dir().join("ftm-trace-missing-dir").join("nested").join("ftm");
        assert!(matches!(TraceWriter::create(prefix), Err(TraceError::Create { .. })));
    }
}
