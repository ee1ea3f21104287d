//! File-backed activity log.
//!
//! The table lives in a shared, writable memory mapping of a fixed-size file.
//! Every write lands in the page cache as soon as it is made, so the kernel
//! keeps the contents after the process dies however abruptly; nothing here
//! depends on a shutdown hook running.
//!
//! Slots are claimed with a CAS on their state word, filled, then published
//! with a release store. Clearing is a single CAS back to free. There is no
//! table-wide lock and neither operation allocates.

#![allow(unsafe_code)]

use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use memmap2::{MmapMut, MmapOptions};

use crate::core::ConfigurationError;
use crate::infra::activity_log::layout::{
    self, LogHeader, SlotState, DEFAULT_RECORD_SIZE, HEADER_SIZE, LEN_OFFSET, RECORD_HEADER_SIZE,
    STARTED_AT_OFFSET, STATE_OFFSET,
};
use crate::infra::activity_log::ActivityLog;
use crate::util::clock::now_ms;

/// Activity log backed by a memory-mapped file.
pub struct MappedActivityLog {
    path: PathBuf,
    capacity: usize,
    record_size: usize,
    /// Start of the mapping. Valid for as long as `map` is alive.
    base: *mut u8,
    /// Last slot handed out; the next search starts just after it.
    cursor: AtomicUsize,
    map: MmapMut,
    _file: File,
}

// SAFETY: `base` points into `map`, which is owned by this struct and never
// remapped. All concurrent access to the mapped bytes goes through the
// per-slot atomic state word: a slot's payload is only written by the thread
// that won the CAS to `Writing`, so no two threads write the same bytes.
unsafe impl Send for MappedActivityLog {}
// SAFETY: see `Send` above; shared access is coordinated by atomics.
unsafe impl Sync for MappedActivityLog {}

impl fmt::Debug for MappedActivityLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedActivityLog")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .field("record_size", &self.record_size)
            .finish_non_exhaustive()
    }
}

impl MappedActivityLog {
    /// Open or create a log at `path` with `capacity` records of the default
    /// size.
    ///
    /// # Errors
    ///
    /// See [`open_with_record_size`](Self::open_with_record_size).
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, ConfigurationError> {
        Self::open_with_record_size(path, capacity, DEFAULT_RECORD_SIZE)
    }

    /// Open or create a log at `path`.
    ///
    /// An existing file is reused only if its header declares exactly this
    /// capacity and record size; every slot is then reset to free. Entries
    /// left by a previous process should be read with
    /// [`RecoveryReader`](crate::infra::activity_log::RecoveryReader) before
    /// calling this.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError`] when the geometry is out of range, the
    /// file cannot be created, sized or mapped, or an existing file has an
    /// unrecognized header or a different geometry.
    pub fn open_with_record_size(
        path: impl AsRef<Path>,
        capacity: usize,
        record_size: usize,
    ) -> Result<Self, ConfigurationError> {
        let path = path.as_ref().to_path_buf();
        if !layout::is_valid_capacity(capacity) {
            return Err(ConfigurationError::InvalidCapacity(capacity));
        }
        if !layout::is_valid_record_size(record_size) {
            return Err(ConfigurationError::InvalidRecordSize(record_size));
        }
        let io_err = |source| ConfigurationError::Io {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;
        let expected_len = layout::file_len(capacity, record_size);
        let existing_len = file.metadata().map_err(io_err)?.len();

        let reused = existing_len > 0;
        if reused {
            check_existing(&mut file, existing_len, capacity, record_size, &path)
                .map_err(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "refusing to reuse activity log");
                    e
                })?;
        } else {
            file.set_len(expected_len as u64).map_err(io_err)?;
        }

        // SAFETY: the file is open read/write and has exactly `expected_len`
        // bytes. Other processes may map it too; every access goes through raw
        // pointers and atomics, never through references that assume the bytes
        // are unaliased.
        let mut map = unsafe { MmapOptions::new().len(expected_len).map_mut(&file) }
            .map_err(io_err)?;
        let base = map.as_mut_ptr();

        let log = Self {
            path,
            capacity,
            record_size,
            base,
            cursor: AtomicUsize::new(capacity - 1),
            map,
            _file: file,
        };

        if reused {
            log.reset_slots();
        } else {
            log.write_header();
        }
        log.map.flush().map_err(|source| ConfigurationError::Io {
            path: log.path.clone(),
            source,
        })?;

        tracing::info!(
            path = %log.path.display(),
            capacity,
            record_size,
            reused,
            "activity log opened"
        );
        Ok(log)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of one record, metadata included.
    #[must_use]
    pub const fn record_size(&self) -> usize {
        self.record_size
    }

    /// Longest description a record can hold, in bytes.
    #[must_use]
    pub const fn max_description_len(&self) -> usize {
        self.record_size - RECORD_HEADER_SIZE
    }

    /// Number of slots currently holding a published entry.
    #[must_use]
    pub fn occupied(&self) -> usize {
        (0..self.capacity)
            .filter(|&slot| SlotState::of(self.state(slot).load(Ordering::Acquire)) == SlotState::Occupied)
            .count()
    }

    /// Ask the kernel to write dirty pages back to the file without waiting.
    ///
    /// Not needed for crash survival of the process itself; it narrows the
    /// window lost to a host failure.
    ///
    /// # Errors
    ///
    /// Returns the underlying io error if the request fails.
    pub fn flush(&self) -> Result<(), ConfigurationError> {
        self.map.flush_async().map_err(|source| ConfigurationError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Flush and unmap the log. The file stays on disk.
    ///
    /// # Errors
    ///
    /// Returns the underlying io error if the final flush fails; the mapping
    /// is released either way.
    pub fn close(self) -> Result<(), ConfigurationError> {
        let result = self.map.flush().map_err(|source| ConfigurationError::Io {
            path: self.path.clone(),
            source,
        });
        tracing::info!(path = %self.path.display(), "activity log closed");
        result
    }

    fn record_ptr(&self, slot: usize) -> *mut u8 {
        debug_assert!(slot < self.capacity);
        // SAFETY: slot < capacity, so the record lies inside the mapping.
        unsafe { self.base.add(layout::record_offset(slot, self.record_size)) }
    }

    fn state(&self, slot: usize) -> &AtomicU32 {
        // SAFETY: records start at 64 + slot * record_size with record_size a
        // multiple of 8 on a page-aligned mapping, so the word is aligned and
        // in bounds, and lives as long as `self`.
        unsafe { AtomicU32::from_ptr(self.record_ptr(slot).add(STATE_OFFSET).cast()) }
    }

    fn len_word(&self, slot: usize) -> &AtomicU32 {
        // SAFETY: as for `state`.
        unsafe { AtomicU32::from_ptr(self.record_ptr(slot).add(LEN_OFFSET).cast()) }
    }

    fn started_at_word(&self, slot: usize) -> &AtomicU64 {
        // SAFETY: as for `state`; offset 8 keeps 8-byte alignment.
        unsafe { AtomicU64::from_ptr(self.record_ptr(slot).add(STARTED_AT_OFFSET).cast()) }
    }

    fn write_header(&self) {
        let header = LogHeader::new(self.capacity, self.record_size).to_bytes();
        // SAFETY: the mapping is at least HEADER_SIZE bytes and no other
        // thread can reach the log before `open` returns.
        unsafe { std::ptr::copy_nonoverlapping(header.as_ptr(), self.base, HEADER_SIZE) };
    }

    fn reset_slots(&self) {
        for slot in 0..self.capacity {
            self.state(slot)
                .store(layout::state_word(0, SlotState::Free), Ordering::Relaxed);
            self.len_word(slot).store(0, Ordering::Relaxed);
        }
    }

    /// Write `description` into the payload of a slot this thread has claimed.
    fn fill(&self, slot: usize, description: &dyn fmt::Display) -> usize {
        // SAFETY: the caller holds the slot in `Writing` state, which gives
        // this thread exclusive write access to its payload bytes.
        let payload = unsafe {
            std::slice::from_raw_parts_mut(
                self.record_ptr(slot).add(RECORD_HEADER_SIZE),
                self.max_description_len(),
            )
        };
        let mut writer = SlotWriter { buf: payload, len: 0 };
        // Truncation is reported as Ok; a Display impl error just ends early.
        let _ = write!(writer, "{description}");
        writer.len
    }
}

fn check_existing(
    file: &mut File,
    existing_len: u64,
    capacity: usize,
    record_size: usize,
    path: &Path,
) -> Result<(), ConfigurationError> {
    let mut block = [0u8; HEADER_SIZE];
    file.read_exact(&mut block).map_err(|_| {
        ConfigurationError::BadHeader(format!("{}: file shorter than header", path.display()))
    })?;
    let header = LogHeader::from_bytes(&block)
        .map_err(|e| ConfigurationError::BadHeader(format!("{}: {e}", path.display())))?;
    if header.capacity != capacity {
        return Err(ConfigurationError::Mismatch {
            field: "capacity",
            expected: capacity,
            found: header.capacity,
        });
    }
    if header.record_size != record_size {
        return Err(ConfigurationError::Mismatch {
            field: "record size",
            expected: record_size,
            found: header.record_size,
        });
    }
    if existing_len != header.file_len() as u64 {
        return Err(ConfigurationError::BadHeader(format!(
            "{}: length {existing_len} does not match declared geometry",
            path.display()
        )));
    }
    Ok(())
}

impl ActivityLog for MappedActivityLog {
    fn insert(&self, description: &dyn fmt::Display) -> Option<usize> {
        let start = self.cursor.load(Ordering::Relaxed);
        for step in 1..=self.capacity {
            let slot = (start + step) % self.capacity;
            let state = self.state(slot);
            let current = state.load(Ordering::Relaxed);
            if SlotState::of(current) != SlotState::Free {
                continue;
            }
            let generation = layout::next_generation(current);
            if state
                .compare_exchange(
                    current,
                    layout::state_word(generation, SlotState::Writing),
                    Ordering::Acquire,
                    Ordering::Relaxed,
                )
                .is_err()
            {
                continue;
            }

            let claim = ClaimGuard { state, generation };
            let len = self.fill(slot, description);
            self.started_at_word(slot).store(now_ms(), Ordering::Relaxed);
            self.len_word(slot)
                .store(u32::try_from(len).unwrap_or(0), Ordering::Relaxed);
            claim.publish();
            self.cursor.store(slot, Ordering::Relaxed);
            return Some(slot);
        }
        tracing::debug!(capacity = self.capacity, "activity log full, entry not recorded");
        None
    }

    fn clear(&self, slot: usize) {
        if slot >= self.capacity {
            tracing::trace!(slot, capacity = self.capacity, "clear of out-of-range slot ignored");
            return;
        }
        let state = self.state(slot);
        let current = state.load(Ordering::Acquire);
        if SlotState::of(current) != SlotState::Occupied {
            tracing::trace!(slot, "clear of unoccupied slot ignored");
            return;
        }
        // A failed CAS means another clear got there first.
        let _ = state.compare_exchange(
            current,
            layout::state_word(layout::generation(current), SlotState::Free),
            Ordering::Release,
            Ordering::Relaxed,
        );
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A slot held in `Writing` state. Dropped without [`publish`](Self::publish),
/// as when a `Display` impl panics mid-write, it hands the slot back as free.
struct ClaimGuard<'a> {
    state: &'a AtomicU32,
    generation: u32,
}

impl ClaimGuard<'_> {
    fn publish(self) {
        self.state.store(
            layout::state_word(self.generation, SlotState::Occupied),
            Ordering::Release,
        );
        std::mem::forget(self);
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.state.store(
            layout::state_word(self.generation, SlotState::Free),
            Ordering::Release,
        );
    }
}

/// `fmt::Write` over a fixed buffer that silently truncates at a character
/// boundary.
struct SlotWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl fmt::Write for SlotWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        let chunk = layout::truncate_at_char_boundary(s, room);
        self.buf[self.len..self.len + chunk.len()].copy_from_slice(chunk.as_bytes());
        self.len += chunk.len();
        Ok(())
    }
}
