//! Sensor snapshot file reader.
//!
//! The sensor process rewrites `sens_data.txt` once a minute with a
//! `temperature,cpu_temperature,humidity` record. A read can race the
//! rewrite, so one retry after a fixed delay is built in; if the record is
//! still unreadable the corrupt file is copied aside for inspection and the
//! error is surfaced (the caller keeps showing the last good reading).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::errors::{PanelError, Result};

/// One sensor record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub temperature: f64,
    pub cpu_temperature: f64,
    pub humidity: f64,
}

/// Reads and parses the snapshot file with the single-retry policy.
#[derive(Debug, Clone)]
pub struct SensorReader {
    path: PathBuf,
    aside_path: PathBuf,
    retry_delay: Duration,
}

impl SensorReader {
    /// Reader for `path`, copying corrupt snapshots to `aside_path`.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        aside_path: impl Into<PathBuf>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            aside_path: aside_path.into(),
            retry_delay,
        }
    }

    /// Snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current record, retrying once after the fixed delay.
    pub fn read(&self) -> Result<SensorSnapshot> {
        match self.read_once() {
            Ok(snapshot) => Ok(snapshot),
            Err(first) => {
                eprintln!("[RMP-SENSOR] read failed, retrying: {first}");
                std::thread::sleep(self.retry_delay);
                match self.read_once() {
                    Ok(snapshot) => Ok(snapshot),
                    Err(second) => {
                        // Keep the evidence; the copy is best-effort.
                        if let Err(copy_err) = fs::copy(&self.path, &self.aside_path) {
                            eprintln!(
                                "[RMP-SENSOR] could not copy corrupt snapshot aside: {copy_err}"
                            );
                        }
                        Err(second)
                    }
                }
            }
        }
    }

    fn read_once(&self) -> Result<SensorSnapshot> {
        let raw = fs::read_to_string(&self.path).map_err(|source| PanelError::SensorRead {
            path: self.path.clone(),
            details: source.to_string(),
        })?;
        parse_record(&raw).map_err(|details| PanelError::SensorRead {
            path: self.path.clone(),
            details,
        })
    }
}

/// Parse a `temperature,cpu_temperature,humidity` record.
fn parse_record(raw: &str) -> std::result::Result<SensorSnapshot, String> {
    let fields: Vec<&str> = raw.trim().split(',').collect();
    let [temperature, cpu_temperature, humidity] = fields.as_slice() else {
        return Err(format!("expected 3 fields, got {}", fields.len()));
    };
    let parse = |name: &str, field: &str| {
        field
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("bad {name} value {field:?}"))
    };
    Ok(SensorSnapshot {
        temperature: parse("temperature", temperature)?,
        cpu_temperature: parse("cpu_temperature", cpu_temperature)?,
        humidity: parse("humidity", humidity)?,
    })
}
