//! The file store: session state machine and lifecycle operations
//!
//! Exactly one session (read or write) is open at a time. Opening a file
//! while another session is active implicitly closes the previous one.
//! Writes flow through the accumulation buffer in [`write`](FlashStore::write)
//! and the lookahead erase scheduler in `erase.rs`; close finalizes the end
//! address into the table and rewrites sector 0.

mod erase;
mod write;

use crate::device::{
    wait_ready, FlashDevice, ERASE_POLL_US, ERASE_TIMEOUT_US, PROGRAM_POLL_US, PROGRAM_TIMEOUT_US,
    SECTOR_SIZE,
};
use crate::error::{Error, Result};
use crate::fat::{self, FileRecord, FileTable, MAX_FILES};

/// Capacity of the write accumulation buffer in bytes
pub const FIFO_SIZE: usize = 1024;

/// Distance from the erased frontier at which the next sector erase is
/// issued ahead of the write cursor
pub const LOOKAHEAD_SIZE: u32 = 1024;

/// Session mode of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No file is open
    #[default]
    None,
    /// A file is open for reading
    Reading,
    /// A file is open for writing
    Writing,
}

/// Sequential file store over a [`FlashDevice`]
///
/// The store exclusively owns the device, the in-memory table, and the
/// write buffer; there is no interior concurrency.
pub struct FlashStore<D: FlashDevice> {
    device: D,
    table: FileTable,
    mode: Mode,
    /// 1-based index of the open file; 0 when no session is active
    opened_file: usize,
    /// Next address to program or read
    cursor: u32,
    /// Exclusive upper bound of flash known erased for the open write
    /// session; a multiple of the sector size while writing
    erased_frontier: u32,
    lookahead: u32,
    fifo: [u8; FIFO_SIZE],
    fill: usize,
}

impl<D: FlashDevice> FlashStore<D> {
    /// Wrap a flash device in a store with an empty in-memory table
    ///
    /// Call [`init`](Self::init) before anything else to bring the chip up
    /// and load the persisted table.
    pub fn new(device: D) -> Self {
        Self {
            device,
            table: FileTable::default(),
            mode: Mode::None,
            opened_file: 0,
            cursor: 0,
            erased_frontier: 0,
            lookahead: LOOKAHEAD_SIZE,
            fifo: [0; FIFO_SIZE],
            fill: 0,
        }
    }

    /// Initialize the device and load the allocation table from sector 0
    ///
    /// Returns [`Error::TableNotFound`] on a blank chip; the in-memory table
    /// stays empty and the caller may recover with
    /// [`initialize_fat`](Self::initialize_fat).
    pub fn init(&mut self, select_line: u8) -> Result<()> {
        self.device.init(select_line)?;
        match fat::decode(&mut self.device) {
            Ok(table) => {
                log::info!("found allocation table with {} file(s)", table.file_count());
                self.table = table;
                Ok(())
            }
            Err(e) => {
                self.table = FileTable::default();
                Err(e)
            }
        }
    }

    /// Write a blank allocation table to the chip
    ///
    /// Removes any reference to existing data. Blocking.
    pub fn initialize_fat(&mut self) -> Result<()> {
        wait_ready(&mut self.device, ERASE_POLL_US, ERASE_TIMEOUT_US)?;
        self.table.clear();
        self.persist_table()
    }

    /// A copy of the in-memory allocation table
    pub fn fat(&self) -> FileTable {
        self.table.clone()
    }

    /// Current session mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Borrow the underlying device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutably borrow the underlying device
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consume the store and return the device
    pub fn into_device(self) -> D {
        self.device
    }

    /// Create a new file and open it for writing
    ///
    /// Allocation is sequential: the new file starts at the sector following
    /// the previous file's highest touched sector (sector 1 for the first
    /// file; sector 0 holds the table). The first sector is erased and the
    /// updated table is persisted immediately, so a crash mid-write still
    /// reflects the file's existence.
    pub fn create_file(&mut self) -> Result<()> {
        self.close()?;
        if self.table.file_count() + 1 >= MAX_FILES {
            return Err(Error::NoSpace);
        }

        let start = match self.table.last() {
            None => SECTOR_SIZE,
            Some(prev) => ((prev.end_addr >> 12) + 1) << 12,
        };
        self.table.push(FileRecord {
            start_addr: start,
            end_addr: start,
        })?;
        self.opened_file = self.table.file_count();
        self.mode = Mode::Writing;
        log::debug!("created file {} at 0x{:06X}", self.opened_file, start);

        wait_ready(&mut self.device, ERASE_POLL_US, ERASE_TIMEOUT_US)?;
        self.device.write_enable();
        self.device.sector_erase(start);
        self.cursor = start;
        self.erased_frontier = start + SECTOR_SIZE;

        wait_ready(&mut self.device, ERASE_POLL_US, ERASE_TIMEOUT_US)?;
        self.persist_table()
    }

    /// Open an existing file for reading by its 1-based index
    pub fn open_file(&mut self, index: usize) -> Result<()> {
        self.close()?;
        let record = *self.table.get(index).ok_or(Error::InvalidFile)?;
        self.opened_file = index;
        self.cursor = record.start_addr;
        self.mode = Mode::Reading;
        log::debug!(
            "opened file {} for reading, {} byte(s)",
            index,
            record.len()
        );
        wait_ready(&mut self.device, ERASE_POLL_US, ERASE_TIMEOUT_US)
    }

    /// Close the current session
    ///
    /// A no-op when no session is active. Closing a write session flushes
    /// the buffer, records the file's end address, and persists the table;
    /// closing a read session only clears the session state.
    pub fn close(&mut self) -> Result<()> {
        match self.mode {
            Mode::None => Ok(()),
            Mode::Writing => {
                self.flush_fifo()?;
                if let Some(record) = self.table.get_mut(self.opened_file) {
                    record.end_addr = self.cursor;
                }
                self.clear_session();
                wait_ready(&mut self.device, PROGRAM_POLL_US, PROGRAM_TIMEOUT_US)?;
                self.persist_table()
            }
            Mode::Reading => {
                self.clear_session();
                Ok(())
            }
        }
    }

    /// Read from the open file into `buf`
    ///
    /// Valid only in reading mode, otherwise 0 bytes. The request is clamped
    /// to the file's remaining length. On a device error 0 bytes are
    /// returned and the cursor is left unchanged.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if self.mode != Mode::Reading {
            return 0;
        }
        let end_addr = match self.table.get(self.opened_file) {
            Some(record) => record.end_addr,
            None => return 0,
        };
        let remaining = end_addr.saturating_sub(self.cursor);
        let len = core::cmp::min(buf.len() as u32, remaining) as usize;
        if len == 0 {
            return 0;
        }
        match self.device.fast_read(self.cursor, &mut buf[..len]) {
            Ok(()) => {
                self.cursor += len as u32;
                len
            }
            Err(e) => {
                log::warn!("read failed at 0x{:06X}: {}", self.cursor, e);
                0
            }
        }
    }

    /// Remaining unread bytes in the open file, 0 outside reading mode
    pub fn peek(&self) -> u32 {
        if self.mode != Mode::Reading {
            return 0;
        }
        match self.table.get(self.opened_file) {
            Some(record) => record.end_addr.saturating_sub(self.cursor),
            None => 0,
        }
    }

    /// Remove the most recently created file from the table
    ///
    /// Only the table entry is dropped; the sectors are reused once a later
    /// [`create_file`](Self::create_file) overwrites them.
    pub fn delete_last_file(&mut self) -> Result<()> {
        if self.mode != Mode::None {
            return Err(Error::WrongMode);
        }
        self.table.pop();
        wait_ready(&mut self.device, ERASE_POLL_US, ERASE_TIMEOUT_US)?;
        self.persist_table()
    }

    /// Remove every file from the table
    pub fn delete_all_files(&mut self) -> Result<()> {
        if self.mode != Mode::None {
            return Err(Error::WrongMode);
        }
        self.table.clear();
        wait_ready(&mut self.device, ERASE_POLL_US, ERASE_TIMEOUT_US)?;
        self.persist_table()
    }

    fn clear_session(&mut self) {
        self.opened_file = 0;
        self.cursor = 0;
        self.erased_frontier = 0;
        self.mode = Mode::None;
    }

    fn persist_table(&mut self) -> Result<()> {
        self.table.last_open_file = self.opened_file as u8;
        fat::persist(&mut self.device, &self.table)
    }
}
