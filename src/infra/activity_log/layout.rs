//! On-disk layout shared by the live log and the offline reader.
//!
//! ```text
//! header (64 bytes, little-endian):
//!   0..8    magic
//!   8..12   format version
//!   12..16  capacity
//!   16..20  record size
//!   20..64  reserved, zero
//! record i at HEADER_SIZE + i * record_size (native-endian, 8-byte aligned):
//!   0..4    state word
//!   4..8    description length
//!   8..16   started_at_ms
//!   16..    description bytes
//! ```
//!
//! The state word packs a slot state in its low two bits and a generation
//! counter in the remaining bits. The generation changes on every claim so a
//! reader can tell a stable entry from one that was cleared and reused while
//! it was being copied.

/// Magic bytes identifying an activity log file.
pub const MAGIC: [u8; 8] = *b"QTRACK\0\x01";
/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;
/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 64;
/// Bytes of per-record metadata preceding the description.
pub const RECORD_HEADER_SIZE: usize = 16;
/// Default size of one record, metadata included.
pub const DEFAULT_RECORD_SIZE: usize = 1024;
/// Smallest accepted record size.
pub const MIN_RECORD_SIZE: usize = 64;
/// Largest accepted record size.
pub const MAX_RECORD_SIZE: usize = 64 * 1024;
/// Largest accepted capacity.
pub const MAX_CAPACITY: usize = 1 << 20;

pub(crate) const STATE_OFFSET: usize = 0;
pub(crate) const LEN_OFFSET: usize = 4;
pub(crate) const STARTED_AT_OFFSET: usize = 8;

const STATE_MASK: u32 = 0b11;
const GENERATION_SHIFT: u32 = 2;

/// Lifecycle of one slot as stored in its state word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Slot holds no entry.
    Free,
    /// Slot was claimed and its description is being written.
    Writing,
    /// Slot holds a published entry.
    Occupied,
}

impl SlotState {
    const fn bits(self) -> u32 {
        match self {
            Self::Free => 0,
            Self::Writing => 1,
            Self::Occupied => 2,
        }
    }

    /// Decode the state part of a state word. Unknown bit patterns read as
    /// `Writing` so they are never reported as entries.
    #[must_use]
    pub const fn of(word: u32) -> Self {
        match word & STATE_MASK {
            0 => Self::Free,
            2 => Self::Occupied,
            _ => Self::Writing,
        }
    }
}

/// Generation part of a state word.
#[must_use]
pub const fn generation(word: u32) -> u32 {
    word >> GENERATION_SHIFT
}

/// Compose a state word.
#[must_use]
pub const fn state_word(generation: u32, state: SlotState) -> u32 {
    (generation << GENERATION_SHIFT) | state.bits()
}

/// Generation used by the next claim of a slot currently at `word`.
#[must_use]
pub const fn next_generation(word: u32) -> u32 {
    generation(word).wrapping_add(1) & (u32::MAX >> GENERATION_SHIFT)
}

/// Validate a record size for use in a new or reopened log.
#[must_use]
pub const fn is_valid_record_size(record_size: usize) -> bool {
    record_size >= MIN_RECORD_SIZE && record_size <= MAX_RECORD_SIZE && record_size % 8 == 0
}

/// Validate a capacity for use in a new or reopened log.
#[must_use]
pub const fn is_valid_capacity(capacity: usize) -> bool {
    capacity >= 1 && capacity <= MAX_CAPACITY
}

/// Total file length for the given geometry.
#[must_use]
pub const fn file_len(capacity: usize, record_size: usize) -> usize {
    HEADER_SIZE + capacity * record_size
}

/// Byte offset of a record within the file.
#[must_use]
pub const fn record_offset(slot: usize, record_size: usize) -> usize {
    HEADER_SIZE + slot * record_size
}

/// Decoded file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    /// Format version found in the file.
    pub format_version: u32,
    /// Number of records.
    pub capacity: usize,
    /// Size of every record in bytes.
    pub record_size: usize,
}

impl LogHeader {
    /// Header for a new file with the current format version.
    #[must_use]
    pub const fn new(capacity: usize, record_size: usize) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            capacity,
            record_size,
        }
    }

    /// Encode into the fixed-size header block.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..8].copy_from_slice(&MAGIC);
        out[8..12].copy_from_slice(&self.format_version.to_le_bytes());
        out[12..16].copy_from_slice(&to_u32(self.capacity).to_le_bytes());
        out[16..20].copy_from_slice(&to_u32(self.record_size).to_le_bytes());
        out
    }

    /// Decode and sanity-check a header block.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the block is short, carries
    /// the wrong magic or version, or declares an unsupported geometry.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < HEADER_SIZE {
            return Err(format!("header too short: {} bytes", bytes.len()));
        }
        if bytes[0..8] != MAGIC {
            return Err("bad magic".into());
        }
        let format_version = read_u32_le(&bytes[8..12]);
        if format_version != FORMAT_VERSION {
            return Err(format!("unsupported format version {format_version}"));
        }
        let capacity = read_u32_le(&bytes[12..16]) as usize;
        let record_size = read_u32_le(&bytes[16..20]) as usize;
        if !is_valid_capacity(capacity) {
            return Err(format!("declared capacity {capacity} out of range"));
        }
        if !is_valid_record_size(record_size) {
            return Err(format!("declared record size {record_size} invalid"));
        }
        Ok(Self {
            format_version,
            capacity,
            record_size,
        })
    }

    /// Expected file length for this header.
    #[must_use]
    pub const fn file_len(&self) -> usize {
        file_len(self.capacity, self.record_size)
    }
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

// Geometry is validated against MAX_CAPACITY / MAX_RECORD_SIZE before encoding.
fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a
/// character.
#[must_use]
pub fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
