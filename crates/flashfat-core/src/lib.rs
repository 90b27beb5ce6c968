//! flashfat-core - Sequential file store for SPI NOR flash
//!
//! This crate implements an append-only, FAT-like file store directly on a
//! raw NOR flash chip. Files are created sequentially, written once, and
//! later read back by their 1-based index. The allocation table lives in
//! sector 0; file data starts at sector 1.
//!
//! The store respects the physical constraints of NOR flash:
//!
//! - Programming only clears bits (1 -> 0); restoring bits requires erasing
//!   a whole 4096-byte sector.
//! - Programs are issued in chunks of at most 256 bytes and never cross a
//!   256-byte page boundary.
//! - Erase and program operations are fire-and-forget; the chip must be
//!   polled for readiness before a dependent operation is issued.
//!
//! The physical transport is abstracted behind the [`device::FlashDevice`]
//! trait, so the store runs identically against real hardware or an
//! in-memory emulation.
//!
//! # Example
//!
//! ```ignore
//! use flashfat_core::{store::FlashStore, Error};
//!
//! fn log_run<D: flashfat_core::device::FlashDevice>(dev: D) -> flashfat_core::Result<()> {
//!     let mut store = FlashStore::new(dev);
//!     match store.init(0) {
//!         Err(Error::TableNotFound) => store.initialize_fat()?,
//!         other => other?,
//!     }
//!     store.create_file()?;
//!     store.write(b"hello")?;
//!     store.close()
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod device;
pub mod error;
pub mod fat;
pub mod store;

pub use error::{Error, Result};
