//! Offline reader for activity logs left behind by a terminated process.
//!
//! Run it after detecting an unexpected exit, before the replacement process
//! reopens the log. It maps the file read-only and never writes to it. Reading
//! a file that a live process is still updating is allowed but may miss
//! entries that are being inserted or cleared at that moment; it never
//! reports a partially written description.

#![allow(unsafe_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, Ordering};

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::core::RecoveryError;
use crate::infra::activity_log::layout::{
    self, LogHeader, SlotState, HEADER_SIZE, LEN_OFFSET, RECORD_HEADER_SIZE, STARTED_AT_OFFSET,
    STATE_OFFSET,
};

/// One entry found in a log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredEntry {
    /// Slot the entry occupies.
    pub slot: usize,
    /// Operation description as written by the owning process.
    pub description: String,
    /// Wall-clock insertion time, milliseconds since the Unix epoch.
    pub started_at_ms: u64,
}

/// Read-only view of an activity log file.
#[derive(Debug)]
pub struct RecoveryReader {
    path: PathBuf,
    header: LogHeader,
    map: Mmap,
}

impl RecoveryReader {
    /// Map the log at `path` read-only and validate its header.
    ///
    /// # Errors
    ///
    /// [`RecoveryError::NotFound`] when the file does not exist,
    /// [`RecoveryError::Format`] when it is not a recognizable activity log or
    /// its length does not match the geometry it declares.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecoveryError> {
        let path = path.as_ref().to_path_buf();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RecoveryError::NotFound(path));
            }
            Err(e) => return Err(RecoveryError::Io(e)),
        };
        let len = file.metadata()?.len();
        if len < HEADER_SIZE as u64 {
            return Err(RecoveryError::Format(format!(
                "{}: {len} bytes is shorter than the header",
                path.display()
            )));
        }

        // SAFETY: read-only shared mapping. The owning process may still write
        // to the file; slot contents are only trusted after the state word
        // checks in `read_slot`.
        let map = unsafe { Mmap::map(&file)? };
        let header = LogHeader::from_bytes(&map[..HEADER_SIZE])
            .map_err(|e| RecoveryError::Format(format!("{}: {e}", path.display())))?;
        if map.len() != header.file_len() {
            return Err(RecoveryError::Format(format!(
                "{}: length {} does not match declared capacity {} x record size {}",
                path.display(),
                map.len(),
                header.capacity,
                header.record_size
            )));
        }

        Ok(Self { path, header, map })
    }

    /// Path of the file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of slots declared by the file.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.header.capacity
    }

    /// Record size declared by the file.
    #[must_use]
    pub const fn record_size(&self) -> usize {
        self.header.record_size
    }

    /// Occupied entries in ascending slot order.
    pub fn entries(&self) -> impl Iterator<Item = RecoveredEntry> + '_ {
        (0..self.header.capacity).filter_map(move |slot| self.read_slot(slot))
    }

    fn read_slot(&self, slot: usize) -> Option<RecoveredEntry> {
        let offset = layout::record_offset(slot, self.header.record_size);
        let record = &self.map[offset..offset + self.header.record_size];

        let before = self.load_state(offset);
        if SlotState::of(before) != SlotState::Occupied {
            return None;
        }
        fence(Ordering::Acquire);

        let len = read_ne_u32(&record[LEN_OFFSET..LEN_OFFSET + 4]) as usize;
        if len > record.len() - RECORD_HEADER_SIZE {
            return None;
        }
        let started_at_ms = read_ne_u64(&record[STARTED_AT_OFFSET..STARTED_AT_OFFSET + 8]);
        let bytes = record[RECORD_HEADER_SIZE..RECORD_HEADER_SIZE + len].to_vec();

        fence(Ordering::Acquire);
        if self.load_state(offset) != before {
            tracing::debug!(slot, "slot changed while reading, skipped");
            return None;
        }

        Some(RecoveredEntry {
            slot,
            description: String::from_utf8_lossy(&bytes).into_owned(),
            started_at_ms,
        })
    }

    fn load_state(&self, record_offset: usize) -> u32 {
        let offset = record_offset + STATE_OFFSET;
        debug_assert!(offset + 4 <= self.map.len());
        // SAFETY: in bounds (checked against the declared geometry in `open`)
        // and 4-byte aligned on a page-aligned mapping. Volatile so the second
        // read in `read_slot` is not folded into the first.
        unsafe { std::ptr::read_volatile(self.map.as_ptr().add(offset).cast::<u32>()) }
    }
}

fn read_ne_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_ne_bytes(buf)
}

fn read_ne_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_ne_bytes(buf)
}

/// Report every entry left in the log at `path` as a warning.
///
/// Intended for process start, before the log is reopened and reset. A
/// missing file is not an error: there was nothing in flight. Returns the
/// entries that were reported.
///
/// # Errors
///
/// Propagates [`RecoveryError::Format`] and io errors from
/// [`RecoveryReader::open`].
pub fn log_unfinished(path: impl AsRef<Path>) -> Result<Vec<RecoveredEntry>, RecoveryError> {
    let reader = match RecoveryReader::open(path) {
        Ok(reader) => reader,
        Err(RecoveryError::NotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let entries: Vec<RecoveredEntry> = reader.entries().collect();
    for entry in &entries {
        tracing::warn!(
            path = %reader.path().display(),
            slot = entry.slot,
            started_at_ms = entry.started_at_ms,
            description = %entry.description,
            "operation was still running when the previous process stopped"
        );
    }
    if !entries.is_empty() {
        tracing::warn!(
            count = entries.len(),
            "found unfinished operations from a previous run"
        );
    }
    Ok(entries)
}
