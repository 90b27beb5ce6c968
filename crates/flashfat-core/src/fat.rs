//! File allocation table codec
//!
//! The table occupies sector 0 of the chip. On-chip layout:
//!
//! | offset | field | size |
//! |---|---|---|
//! | 0 | identity marker (`"FLASH\0"`) | 6 |
//! | 6 | file count | 1 |
//! | 7 | last-open-file marker | 1 |
//! | 8 + 5i | start address, high/mid bytes | 2 |
//! | 10 + 5i | end address, high/mid bytes | 2 |
//! | 12 + 5i | end address, low byte | 1 |
//!
//! Start addresses are sector-aligned, so two bytes at 256-byte resolution
//! encode them exactly. End addresses carry a genuine 0-255 sub-page offset
//! in the record's fifth byte. Addresses are limited to 24 bits (16 MiB).

use crate::device::{wait_ready, FlashDevice, ERASE_POLL_US, ERASE_TIMEOUT_US, PAGE_SIZE};
use crate::error::{Error, Result};

/// Identity marker at address 0, terminator included
pub const IDENT: &[u8] = b"FLASH\0";

/// Maximum number of files the table can hold
pub const MAX_FILES: usize = 32;

/// Encoded size of one file record
pub const RECORD_SIZE: usize = 5;

/// Header length: identity marker plus count and last-open-file bytes
pub const HEADER_SIZE: usize = IDENT.len() + 2;

/// Largest possible encoded table (168 bytes; fits well inside sector 0)
pub const ENCODED_MAX: usize = HEADER_SIZE + MAX_FILES * RECORD_SIZE;

/// A single file's extent on the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord {
    /// First byte of the file; always a multiple of the sector size
    pub start_addr: u32,
    /// One past the last byte written; `end_addr >= start_addr`
    pub end_addr: u32,
}

impl FileRecord {
    /// Length of the file in bytes
    pub fn len(&self) -> u32 {
        self.end_addr - self.start_addr
    }

    /// Whether the file holds no data
    pub fn is_empty(&self) -> bool {
        self.end_addr == self.start_addr
    }
}

/// In-memory copy of the allocation table
///
/// This is the single source of truth for where every file begins and ends.
/// The persisted copy in sector 0 is rewritten whole on every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTable {
    files: heapless::Vec<FileRecord, MAX_FILES>,
    /// File index that was open when the table was last persisted (0 = none).
    /// Read back for diagnostics; the core does not otherwise consume it.
    pub last_open_file: u8,
}

impl FileTable {
    /// Number of files in the table
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// All file records in creation order
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Look up a record by 1-based file index
    pub fn get(&self, index: usize) -> Option<&FileRecord> {
        index.checked_sub(1).and_then(|i| self.files.get(i))
    }

    /// The most recently created file, if any
    pub fn last(&self) -> Option<&FileRecord> {
        self.files.last()
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut FileRecord> {
        index.checked_sub(1).and_then(|i| self.files.get_mut(i))
    }

    pub(crate) fn push(&mut self, record: FileRecord) -> Result<()> {
        self.files.push(record).map_err(|_| Error::NoSpace)
    }

    pub(crate) fn pop(&mut self) -> Option<FileRecord> {
        self.files.pop()
    }

    pub(crate) fn clear(&mut self) {
        self.files.clear();
        self.last_open_file = 0;
    }
}

/// Serialize the table into its on-chip form
pub fn encode(table: &FileTable) -> heapless::Vec<u8, ENCODED_MAX> {
    let mut buf = heapless::Vec::new();
    // Capacity is ENCODED_MAX by construction, pushes cannot fail.
    let _ = buf.extend_from_slice(IDENT);
    let _ = buf.push(table.file_count() as u8);
    let _ = buf.push(table.last_open_file);
    for record in table.files() {
        let _ = buf.push((record.start_addr >> 16) as u8);
        let _ = buf.push((record.start_addr >> 8) as u8);
        let _ = buf.push((record.end_addr >> 16) as u8);
        let _ = buf.push((record.end_addr >> 8) as u8);
        let _ = buf.push(record.end_addr as u8);
    }
    buf
}

/// Parse a raw copy of sector 0 into a table
///
/// Returns [`Error::TableNotFound`] if the identity marker is absent or the
/// stored record count is not representable (a blank or corrupt sector).
pub fn parse(raw: &[u8]) -> Result<FileTable> {
    if raw.len() < HEADER_SIZE || &raw[..IDENT.len()] != IDENT {
        return Err(Error::TableNotFound);
    }

    let count = raw[IDENT.len()] as usize;
    let last_open_file = raw[IDENT.len() + 1];
    if count > MAX_FILES || raw.len() < HEADER_SIZE + count * RECORD_SIZE {
        return Err(Error::TableNotFound);
    }

    let mut table = FileTable {
        last_open_file,
        ..FileTable::default()
    };
    for i in 0..count {
        let rec = &raw[HEADER_SIZE + i * RECORD_SIZE..HEADER_SIZE + (i + 1) * RECORD_SIZE];
        let start_addr = u32::from(rec[0]) << 16 | u32::from(rec[1]) << 8;
        let end_addr = (u32::from(rec[2]) << 16 | u32::from(rec[3]) << 8) + u32::from(rec[4]);
        table.push(FileRecord {
            start_addr,
            end_addr,
        })?;
    }
    Ok(table)
}

/// Read and parse the table from sector 0
pub fn decode<D: FlashDevice + ?Sized>(device: &mut D) -> Result<FileTable> {
    let mut raw = [0u8; ENCODED_MAX];
    device.read_data(0, &mut raw)?;
    let table = parse(&raw)?;
    log::debug!("decoded table with {} file(s)", table.file_count());
    if table.last_open_file != 0 {
        log::warn!(
            "file {} was still open when the table was last written",
            table.last_open_file
        );
    }
    Ok(table)
}

/// Erase sector 0 and program the encoded table from address 0
///
/// Returns [`Error::Busy`] if the device is mid-operation at entry. Once the
/// erase has been issued this blocks on busy-polling until every chunk is
/// programmed; callers must not treat it as cancellable.
pub fn persist<D: FlashDevice + ?Sized>(device: &mut D, table: &FileTable) -> Result<()> {
    if device.busy() {
        return Err(Error::Busy);
    }
    device.write_enable();
    device.sector_erase(0);

    let encoded = encode(table);
    let mut offset = 0usize;
    while offset < encoded.len() {
        let addr = offset as u32;
        let page_remaining = (PAGE_SIZE - addr % PAGE_SIZE) as usize;
        let len = core::cmp::min(page_remaining, encoded.len() - offset);
        wait_ready(device, ERASE_POLL_US, ERASE_TIMEOUT_US)?;
        device.write_enable();
        device.page_program(addr, &encoded[offset..offset + len])?;
        offset += len;
    }
    log::trace!("persisted table, {} bytes", encoded.len());
    Ok(())
}
