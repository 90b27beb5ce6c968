//! List command: print the allocation table

use super::CommandError;
use flashfat_core::device::FlashDevice;
use flashfat_core::store::FlashStore;

pub fn run<D: FlashDevice>(store: &FlashStore<D>) -> Result<(), CommandError> {
    let fat = store.fat();
    if fat.file_count() == 0 {
        println!("no files");
        return Ok(());
    }

    println!("{:>4}  {:>10}  {:>10}  {:>10}", "file", "start", "end", "length");
    for (i, record) in fat.files().iter().enumerate() {
        println!(
            "{:>4}  0x{:08X}  0x{:08X}  {:>10}",
            i + 1,
            record.start_addr,
            record.end_addr,
            record.len()
        );
    }
    Ok(())
}
