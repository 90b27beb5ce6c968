//! Format command: write a blank allocation table

use super::CommandError;
use flashfat_core::device::FlashDevice;
use flashfat_core::store::FlashStore;

pub fn run<D: FlashDevice>(store: &mut FlashStore<D>) -> Result<(), CommandError> {
    store.initialize_fat()?;
    println!("Initialized blank allocation table");
    Ok(())
}
