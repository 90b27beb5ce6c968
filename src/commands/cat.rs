//! Cat command: copy a stored file out to the host

use super::CommandError;
use flashfat_core::device::FlashDevice;
use flashfat_core::store::FlashStore;
use flashfat_core::Error;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const CHUNK_SIZE: usize = 4096;

pub fn run<D: FlashDevice>(
    store: &mut FlashStore<D>,
    index: usize,
    output: &Path,
) -> Result<(), CommandError> {
    store.open_file(index)?;
    let total = store.peek();
    let mut file = File::create(output)?;

    let pb = ProgressBar::new(u64::from(total));
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) Reading",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut buf = [0u8; CHUNK_SIZE];
    let mut read = 0u64;
    while store.peek() > 0 {
        let n = store.read(&mut buf);
        if n == 0 {
            // Device error mid-file; the store leaves the cursor in place
            store.close()?;
            return Err(CommandError::Store(Error::DeviceFailure));
        }
        file.write_all(&buf[..n])?;
        read += n as u64;
        pb.set_position(read);
    }
    store.close()?;
    pb.finish_and_clear();

    println!("Read {} byte(s) from file {}", read, index);
    Ok(())
}
