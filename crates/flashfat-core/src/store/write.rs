//! Write pipeline: buffer accumulation and page-aligned flushing
//!
//! Arbitrary-length writes accumulate in the FIFO buffer and are turned
//! into legal program operations on flush: chunks of at most one page that
//! never cross a 256-byte page boundary.

use super::{FlashStore, Mode, FIFO_SIZE};
use crate::device::{
    wait_ready, FlashDevice, ERASE_POLL_US, ERASE_TIMEOUT_US, PAGE_SIZE, SECTOR_SIZE,
};
use crate::error::{Error, Result};

impl<D: FlashDevice> FlashStore<D> {
    /// Append `data` to the open file
    ///
    /// Valid only in writing mode. Data lands in the accumulation buffer;
    /// whenever the buffer fills it is flushed to the chip. After buffering,
    /// the erase scheduler runs if the cursor has entered the lookahead
    /// zone; a [`Error::Busy`] from that proactive erase surfaces unchanged
    /// even though the data itself has been accepted - the erase is retried
    /// on a later write, and the flush path erases synchronously as a
    /// backstop.
    pub fn write(&mut self, mut data: &[u8]) -> Result<()> {
        if self.mode != Mode::Writing {
            return Err(Error::WrongMode);
        }

        loop {
            let space = FIFO_SIZE - self.fill;
            if data.len() < space {
                self.fifo[self.fill..self.fill + data.len()].copy_from_slice(data);
                self.fill += data.len();
                break;
            }
            self.fifo[self.fill..].copy_from_slice(&data[..space]);
            self.fill = FIFO_SIZE;
            data = &data[space..];
            self.flush_fifo()?;
        }

        // Within a lookahead distance of the frontier (inclusive): the
        // cursor advances in whole buffer flushes, so the boundary case is
        // exactly where the next erase must already be in flight.
        if self.cursor + self.lookahead >= self.erased_frontier {
            self.erase_next_sector()?;
        }
        Ok(())
    }

    /// Program the buffered bytes to the chip starting at the cursor
    ///
    /// If the buffer would reach past the erased frontier, the sector at the
    /// frontier is erased synchronously first. The buffer never spans more
    /// than one sector past the frontier (its capacity is well below the
    /// sector size), so a single erase always suffices.
    pub(super) fn flush_fifo(&mut self) -> Result<()> {
        if self.fill == 0 {
            return Ok(());
        }

        if self.cursor + self.fill as u32 >= self.erased_frontier {
            wait_ready(&mut self.device, ERASE_POLL_US, ERASE_TIMEOUT_US)?;
            self.device.write_enable();
            self.device.sector_erase(self.erased_frontier);
            self.erased_frontier += SECTOR_SIZE;
            log::trace!("blocking erase, frontier now 0x{:06X}", self.erased_frontier);
        }

        let mut offset = 0usize;
        while offset < self.fill {
            let page_remaining = (PAGE_SIZE - self.cursor % PAGE_SIZE) as usize;
            let len = core::cmp::min(page_remaining, self.fill - offset);
            wait_ready(&mut self.device, ERASE_POLL_US, ERASE_TIMEOUT_US)?;
            self.device.write_enable();
            self.device
                .page_program(self.cursor, &self.fifo[offset..offset + len])?;
            self.cursor += len as u32;
            offset += len;
        }
        self.fill = 0;
        Ok(())
    }
}
