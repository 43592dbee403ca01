//! Append-only sample store
//!
//! Persistent log of [`Reading`]s backing the recent-history query. One CSV
//! record per sample:
//!
//! | Column | Format |
//! |--------|--------|
//! | timestamp | `YYYY-MM-DD HH:MM:SS`, UTC |
//! | voltage | decimal volts |
//! | current | decimal amps |
//! | power | decimal watts |
//! | source | `live` or `simulated` |
//!
//! Writes are flushed and fsynced before `append` acknowledges, so an
//! acknowledged sample survives process death. Appends must keep
//! monotonic-or-equal timestamp order; the store never updates or deletes.
//!
//! Logs written by deployments that predate the provenance column carry
//! four fields per record (and possibly no header); they load as all-`Live`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord, Writer, WriterBuilder};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::reading::{Reading, Source, TIMESTAMP_FORMAT};

const HEADER: [&str; 5] = ["timestamp", "voltage", "current", "power", "source"];

/// Append-only persistent log of readings, queryable by recency.
///
/// Single-writer: opened once at process start, closed at shutdown. The
/// file handle is owned for the process lifetime; each `append` is durable
/// before it returns.
pub struct SampleStore {
    path: PathBuf,
    writer: Writer<File>,
    sync_handle: File,
    readings: Vec<Reading>,
}

impl SampleStore {
    /// Open or create the store at `path`, loading existing history.
    ///
    /// A header row is written when the file is created. Existing rows are
    /// parsed strictly; an unparseable row fails the open with
    /// [`StoreError::Corrupt`] rather than silently dropping history.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let readings = if path.exists() {
            Self::load_existing(&path)?
        } else {
            Vec::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let sync_handle = file.try_clone()?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(HEADER)?;
            writer.flush()?;
            sync_handle.sync_all()?;
        }

        info!(
            path = %path.display(),
            rows = readings.len(),
            "sample store opened"
        );

        Ok(Self {
            path,
            writer,
            sync_handle,
            readings,
        })
    }

    /// Append one reading durably.
    ///
    /// Returns only after the record is flushed and fsynced. Fails with
    /// [`StoreError::OutOfOrder`] if the reading's timestamp precedes the
    /// last persisted one; equal timestamps are accepted (consecutive
    /// cycles can share a second).
    pub fn append(&mut self, reading: &Reading) -> StoreResult<()> {
        if let Some(last) = self.readings.last() {
            if reading.timestamp < last.timestamp {
                return Err(StoreError::OutOfOrder {
                    last: last.timestamp,
                    offered: reading.timestamp,
                });
            }
        }

        self.writer.write_record([
            reading.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            reading.voltage.to_string(),
            reading.current.to_string(),
            reading.power.to_string(),
            reading.source.to_string(),
        ])?;
        self.writer.flush()?;
        // Durable before acknowledging: a sample lost after `Ok` would be
        // an unobservable telemetry gap.
        self.sync_handle.sync_all()?;

        self.readings.push(reading.clone());
        debug!(
            timestamp = %reading.timestamp,
            source = %reading.source,
            "sample persisted"
        );
        Ok(())
    }

    /// Up to `n` most recent readings, most-recent-first.
    ///
    /// Returns fewer than `n` when the store holds fewer; an empty store
    /// yields an empty vector, never an error. Callers charting
    /// ascending-by-time reverse the slice.
    pub fn recent(&self, n: usize) -> Vec<Reading> {
        self.readings.iter().rev().take(n).cloned().collect()
    }

    /// Number of readings held
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True when no readings are held
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final flush and fsync; consumes the store.
    pub fn close(mut self) -> StoreResult<()> {
        self.writer.flush()?;
        self.sync_handle.sync_all()?;
        info!(path = %self.path.display(), "sample store closed");
        Ok(())
    }

    fn load_existing(path: &Path) -> StoreResult<Vec<Reading>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut readings = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            if record.get(0) == Some(HEADER[0]) {
                continue;
            }
            readings.push(parse_record(&record, line)?);
        }
        Ok(readings)
    }
}

fn parse_record(record: &StringRecord, line: u64) -> StoreResult<Reading> {
    if record.len() < 4 {
        return Err(StoreError::Corrupt {
            line,
            reason: format!("expected at least 4 fields, got {}", record.len()),
        });
    }

    let raw_timestamp = field(record, 0, line)?;
    let naive = NaiveDateTime::parse_from_str(raw_timestamp, TIMESTAMP_FORMAT).map_err(|e| {
        StoreError::Corrupt {
            line,
            reason: format!("bad timestamp {raw_timestamp:?}: {e}"),
        }
    })?;
    let timestamp = Utc.from_utc_datetime(&naive);

    let voltage = numeric_field(record, 1, line)?;
    let current = numeric_field(record, 2, line)?;
    let power = numeric_field(record, 3, line)?;

    // Rows from before the provenance column are all device readings
    let source = match record.get(4) {
        None | Some("") => Source::Live,
        Some(raw) => raw
            .parse()
            .map_err(|reason| StoreError::Corrupt { line, reason })?,
    };

    Ok(Reading {
        timestamp,
        voltage,
        current,
        power,
        source,
    })
}

fn field<'r>(record: &'r StringRecord, index: usize, line: u64) -> StoreResult<&'r str> {
    record.get(index).ok_or_else(|| StoreError::Corrupt {
        line,
        reason: format!("missing field {index}"),
    })
}

fn numeric_field(record: &StringRecord, index: usize, line: u64) -> StoreResult<f64> {
    let raw = field(record, index, line)?;
    raw.trim().parse().map_err(|e| StoreError::Corrupt {
        line,
        reason: format!("bad numeric field {index} ({raw:?}): {e}"),
    })
}
