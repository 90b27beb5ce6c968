//! flashfat-dummy - In-memory NOR flash emulator for testing
//!
//! This crate provides a [`DummyFlash`] that emulates a NOR flash chip in
//! memory and implements the [`FlashDevice`] contract. It enforces the
//! physical rules the store must respect: programming only clears bits,
//! programs may not cross a page boundary, erase works on whole sectors,
//! and every erase or program requires a preceding write-enable.
//!
//! Every device operation is appended to an operation journal so tests can
//! assert scheduling properties (for example, that each sector is erased
//! exactly once per write session).

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use flashfat_core::device::FlashDevice;
use flashfat_core::error::{Error, Result};

/// Configuration for the emulated chip
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Flash size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Sector size for the smallest erase
    pub sector_size: usize,
    /// How many busy polls a sector erase stays pending (0 = instant)
    pub erase_busy_polls: u32,
    /// How many busy polls a page program stays pending (0 = instant)
    pub program_busy_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            size: 8 * 1024 * 1024, // W25Q64 geometry
            page_size: 256,
            sector_size: 4096,
            erase_busy_polls: 0,
            program_busy_polls: 0,
        }
    }
}

/// One entry in the operation journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `write_enable` was issued
    WriteEnable,
    /// A sector erase was issued at the (aligned-down) address
    SectorErase(u32),
    /// A page program was issued
    PageProgram {
        /// Program start address
        addr: u32,
        /// Number of bytes programmed
        len: usize,
    },
}

/// Emulated NOR flash chip
///
/// Backing storage starts out fully erased (0xFF). Programming ANDs data
/// into the array; erasing restores 0xFF.
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    write_enabled: bool,
    /// Remaining busy polls before the pending operation completes
    busy_polls: u32,
    ops: Vec<Op>,
}

impl DummyFlash {
    /// Create a blank chip with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            write_enabled: false,
            busy_polls: 0,
            ops: Vec::new(),
        }
    }

    /// Create a blank chip with default (W25Q64) geometry
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a chip pre-filled with `initial_data` from address 0
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Raw flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw flash contents (for corrupting test fixtures)
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The configuration in use
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// The operation journal since construction or the last clear
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Drop all journal entries
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Addresses of all sector erases issued, in order
    pub fn erases(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::SectorErase(addr) => Some(*addr),
                _ => None,
            })
            .collect()
    }

    fn in_bounds(&self, addr: u32, len: usize) -> bool {
        (addr as usize).checked_add(len).is_some_and(|end| end <= self.data.len())
    }
}

impl FlashDevice for DummyFlash {
    fn init(&mut self, select_line: u8) -> Result<()> {
        log::debug!("dummy flash up on select line {}", select_line);
        Ok(())
    }

    fn busy(&mut self) -> bool {
        if self.busy_polls > 0 {
            self.busy_polls -= 1;
            true
        } else {
            false
        }
    }

    fn write_enable(&mut self) {
        self.write_enabled = true;
        self.ops.push(Op::WriteEnable);
    }

    fn sector_erase(&mut self, addr: u32) {
        // A real chip silently ignores erase without the WEL set; that is
        // always a caller bug here, so make it loud in logs.
        if !self.write_enabled {
            log::error!("sector erase at 0x{:06X} without write enable", addr);
            return;
        }
        self.write_enabled = false;

        let aligned = addr as usize & !(self.config.sector_size - 1);
        if aligned + self.config.sector_size > self.data.len() {
            log::error!("sector erase at 0x{:06X} out of bounds", addr);
            return;
        }

        for byte in &mut self.data[aligned..aligned + self.config.sector_size] {
            *byte = 0xFF;
        }
        self.busy_polls = self.config.erase_busy_polls;
        self.ops.push(Op::SectorErase(aligned as u32));
    }

    fn page_program(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if self.busy_polls > 0 {
            return Err(Error::Busy);
        }
        if !self.write_enabled {
            log::error!("page program at 0x{:06X} without write enable", addr);
            return Err(Error::DeviceFailure);
        }
        self.write_enabled = false;

        if data.len() > self.config.page_size
            || addr as usize % self.config.page_size + data.len() > self.config.page_size
        {
            log::error!(
                "illegal page program at 0x{:06X}, {} byte(s)",
                addr,
                data.len()
            );
            return Err(Error::DeviceFailure);
        }
        if !self.in_bounds(addr, data.len()) {
            return Err(Error::DeviceFailure);
        }

        // Programming can only clear bits (1 -> 0)
        for (i, &byte) in data.iter().enumerate() {
            self.data[addr as usize + i] &= byte;
        }
        self.busy_polls = self.config.program_busy_polls;
        self.ops.push(Op::PageProgram {
            addr,
            len: data.len(),
        });
        Ok(())
    }

    fn read_data(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        if self.busy_polls > 0 {
            return Err(Error::Busy);
        }
        if !self.in_bounds(addr, buf.len()) {
            return Err(Error::DeviceFailure);
        }
        buf.copy_from_slice(&self.data[addr as usize..addr as usize + buf.len()]);
        Ok(())
    }

    fn fast_read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.read_data(addr, buf)
    }

    fn delay_us(&mut self, _us: u32) {}
}

#[cfg(feature = "std")]
impl DummyFlash {
    /// Load a chip image from a file, padding with 0xFF up to the
    /// configured size. A missing file yields a blank chip.
    pub fn load(path: &std::path::Path, config: DummyConfig) -> std::io::Result<Self> {
        match std::fs::read(path) {
            Ok(contents) => Ok(Self::with_data(config, &contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new(config)),
            Err(e) => Err(e),
        }
    }

    /// Write the full chip image back to a file
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        std::fs::write(path, &self.data)
    }
}
