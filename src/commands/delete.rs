//! Delete commands: drop table entries (flash content is not erased)

use super::CommandError;
use flashfat_core::device::FlashDevice;
use flashfat_core::store::FlashStore;

pub fn run_last<D: FlashDevice>(store: &mut FlashStore<D>) -> Result<(), CommandError> {
    let before = store.fat().file_count();
    store.delete_last_file()?;
    if before == 0 {
        println!("table already empty");
    } else {
        println!("Removed file {}", before);
    }
    Ok(())
}

pub fn run_all<D: FlashDevice>(store: &mut FlashStore<D>) -> Result<(), CommandError> {
    let before = store.fat().file_count();
    store.delete_all_files()?;
    println!("Removed {} file(s)", before);
    Ok(())
}
