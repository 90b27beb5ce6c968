//! Store command: create a new file on the chip from a host file

use super::CommandError;
use flashfat_core::device::FlashDevice;
use flashfat_core::store::FlashStore;
use flashfat_core::Error;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Transfer chunk size; independent of the store's own buffering
const CHUNK_SIZE: usize = 4096;

pub fn run<D: FlashDevice>(store: &mut FlashStore<D>, input: &Path) -> Result<(), CommandError> {
    let mut file = File::open(input)?;
    let total = file.metadata()?.len();

    store.create_file()?;
    let index = store.fat().file_count();

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) Storing",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut buf = [0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        match store.write(&buf[..n]) {
            Ok(()) => {}
            // The data is buffered; the lookahead erase retries on the
            // next write and the flush path erases synchronously anyway.
            Err(Error::Busy) => log::debug!("lookahead erase deferred, chip busy"),
            Err(e) => return Err(e.into()),
        }
        written += n as u64;
        pb.set_position(written);
    }
    store.close()?;
    pb.finish_and_clear();

    println!("Stored {} byte(s) as file {}", written, index);
    Ok(())
}
