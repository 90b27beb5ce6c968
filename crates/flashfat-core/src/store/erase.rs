//! Erase scheduler: keeps a frontier of pre-erased flash ahead of the
//! write cursor
//!
//! Sector erases are slow (tens to hundreds of milliseconds). Issuing the
//! next erase while the caller is still filling the accumulation buffer
//! hides that latency, so an ordinary write never blocks on an erase.
//! Invariant: every address in `[cursor, erased_frontier)` is erased, and
//! the cursor never reaches the frontier.

use super::FlashStore;
use crate::device::{FlashDevice, SECTOR_SIZE};
use crate::error::{Error, Result};

impl<D: FlashDevice> FlashStore<D> {
    /// Erase the sector at the frontier and advance it
    ///
    /// Never blocks: returns [`Error::Busy`] if the chip is mid-operation,
    /// which is non-fatal - the lookahead check fires again on the next
    /// write.
    pub(super) fn erase_next_sector(&mut self) -> Result<()> {
        if self.device.busy() {
            return Err(Error::Busy);
        }
        self.device.write_enable();
        self.device.sector_erase(self.erased_frontier);
        self.erased_frontier += SECTOR_SIZE;
        log::trace!(
            "lookahead erase, frontier now 0x{:06X}",
            self.erased_frontier
        );
        Ok(())
    }
}
