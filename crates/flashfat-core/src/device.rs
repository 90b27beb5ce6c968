//! Flash device trait definition
//!
//! The store drives the chip exclusively through [`FlashDevice`]. The
//! contract mirrors the command set of small SPI NOR parts (W25Q64 class):
//! program and erase are fire-and-forget relative to the chip's internal
//! timing, and the caller must poll [`FlashDevice::busy`] before issuing a
//! dependent operation.

use crate::error::{Error, Result};

/// Size of an erase sector in bytes
pub const SECTOR_SIZE: u32 = 4096;

/// Size of a program page in bytes
///
/// A single program operation may not cross a page boundary.
pub const PAGE_SIZE: u32 = 256;

/// Poll cadence while waiting out a page program (typical 0.7-5ms)
pub const PROGRAM_POLL_US: u32 = 10;
/// Page program deadline
pub const PROGRAM_TIMEOUT_US: u32 = 10_000;

/// Poll cadence while waiting out a 4KB sector erase (typical 45-400ms)
pub const ERASE_POLL_US: u32 = 1_000;
/// Sector erase deadline
pub const ERASE_TIMEOUT_US: u32 = 1_000_000;

/// Abstract NOR flash transport
///
/// All addresses are absolute byte offsets in the flash's linear address
/// space. Implementations enforce the physical programming rules:
/// `page_program` data must be at most [`PAGE_SIZE`] bytes and must not
/// straddle a page boundary, and programming can only clear bits.
pub trait FlashDevice {
    /// Initialize the transport (chip select line, wake the chip)
    fn init(&mut self, select_line: u8) -> Result<()>;

    /// Whether the chip is mid-erase or mid-program
    fn busy(&mut self) -> bool;

    /// Set the write enable latch; required before each erase or program
    fn write_enable(&mut self);

    /// Start erasing the sector containing `addr` (fire-and-forget)
    fn sector_erase(&mut self, addr: u32);

    /// Program `data` at `addr` (fire-and-forget once accepted)
    fn page_program(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Read into `buf` starting at `addr`
    fn read_data(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Read into `buf` starting at `addr` using the fast-read command
    fn fast_read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

/// Wait for the device to leave the busy state
///
/// Polls `busy()` every `poll_delay_us` microseconds and gives up after
/// `timeout_us`, surfacing [`Error::Timeout`] instead of spinning forever.
pub fn wait_ready<D: FlashDevice + ?Sized>(
    device: &mut D,
    poll_delay_us: u32,
    timeout_us: u32,
) -> Result<()> {
    let max_polls = if poll_delay_us > 0 {
        timeout_us / poll_delay_us
    } else {
        timeout_us // Fall back to polling once per microsecond
    };

    for _ in 0..=max_polls {
        if !device.busy() {
            return Ok(());
        }
        if poll_delay_us > 0 {
            device.delay_us(poll_delay_us);
        }
    }

    Err(Error::Timeout)
}

impl<D: FlashDevice + ?Sized> FlashDevice for &mut D {
    fn init(&mut self, select_line: u8) -> Result<()> {
        (**self).init(select_line)
    }

    fn busy(&mut self) -> bool {
        (**self).busy()
    }

    fn write_enable(&mut self) {
        (**self).write_enable()
    }

    fn sector_erase(&mut self, addr: u32) {
        (**self).sector_erase(addr)
    }

    fn page_program(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        (**self).page_program(addr, data)
    }

    fn read_data(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read_data(addr, buf)
    }

    fn fast_read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        (**self).fast_read(addr, buf)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
