//! Full-store tests against the emulated chip

use flashfat_core::device::SECTOR_SIZE;
use flashfat_core::fat::{self, FileRecord, MAX_FILES};
use flashfat_core::store::{FlashStore, Mode};
use flashfat_core::Error;
use flashfat_dummy::{DummyConfig, DummyFlash, Op};

/// A fresh store over a blank chip with the table already initialized
fn fresh_store() -> FlashStore<DummyFlash> {
    let mut store = FlashStore::new(DummyFlash::new_default());
    assert_eq!(store.init(0), Err(Error::TableNotFound));
    store.initialize_fat().unwrap();
    store
}

/// Deterministic but non-repeating test pattern
fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

#[test]
fn blank_chip_scenario() {
    let mut store = FlashStore::new(DummyFlash::new_default());
    assert_eq!(store.init(0), Err(Error::TableNotFound));
    store.initialize_fat().unwrap();
    assert_eq!(store.fat().file_count(), 0);
    store.create_file().unwrap();
    assert_eq!(store.fat().file_count(), 1);
    store.close().unwrap();
}

#[test]
fn create_file_allocates_sequential_sectors() {
    let mut store = fresh_store();
    let lengths = [10usize, 4096, 5000, 0, 300];
    for &len in &lengths {
        store.create_file().unwrap();
        store.write(&pattern(len)).unwrap();
        store.close().unwrap();
    }

    let fat = store.fat();
    assert_eq!(fat.file_count(), lengths.len());
    let mut prev: Option<FileRecord> = None;
    for (record, &len) in fat.files().iter().zip(&lengths) {
        assert_eq!(record.start_addr % SECTOR_SIZE, 0);
        assert_eq!(record.len(), len as u32);
        if let Some(prev) = prev {
            let rounded_up = (prev.end_addr + SECTOR_SIZE) & !(SECTOR_SIZE - 1);
            assert!(record.start_addr >= rounded_up);
            assert!(record.start_addr > prev.end_addr);
        } else {
            // Sector 0 is reserved for the table
            assert_eq!(record.start_addr, SECTOR_SIZE);
        }
        prev = Some(*record);
    }
}

#[test]
fn close_is_idempotent() {
    let mut store = fresh_store();
    store.create_file().unwrap();
    store.write(b"some data").unwrap();
    store.close().unwrap();
    let fat = store.fat();
    assert_eq!(store.mode(), Mode::None);

    store.close().unwrap();
    assert_eq!(store.mode(), Mode::None);
    assert_eq!(store.fat(), fat);
}

#[test]
fn write_read_round_trip_across_pages_and_sectors() {
    let mut store = fresh_store();
    // Spans many pages and a sector boundary (file data starts at 0x1000)
    let data = pattern(5000);

    store.create_file().unwrap();
    // Odd chunk sizes exercise the buffering paths
    for chunk in data.chunks(933) {
        store.write(chunk).unwrap();
    }
    store.close().unwrap();

    store.open_file(1).unwrap();
    assert_eq!(store.peek(), data.len() as u32);
    let mut back = vec![0u8; data.len()];
    let mut got = 0;
    while got < back.len() {
        let n = store.read(&mut back[got..(got + 777).min(data.len())]);
        assert!(n > 0);
        got += n;
    }
    assert_eq!(back, data);
    assert_eq!(store.peek(), 0);
    store.close().unwrap();
}

#[test]
fn large_single_write_spans_multiple_buffers() {
    let mut store = fresh_store();
    let data = pattern(10_000);
    store.create_file().unwrap();
    store.write(&data).unwrap();
    store.close().unwrap();

    store.open_file(1).unwrap();
    let mut back = vec![0u8; data.len()];
    assert_eq!(store.read(&mut back), data.len());
    assert_eq!(back, data);
}

#[test]
fn erase_lookahead_covers_each_data_sector_exactly_once() {
    let mut store = fresh_store();
    store.device_mut().clear_ops();

    store.create_file().unwrap();
    store.write(&pattern(10_000)).unwrap();
    store.close().unwrap();

    let end = store.fat().get(1).unwrap().end_addr;
    assert_eq!(end, SECTOR_SIZE + 10_000);

    // Every data sector the file touched was erased exactly once
    let data_erases: Vec<u32> = store
        .device()
        .erases()
        .into_iter()
        .filter(|&a| a != 0)
        .collect();
    let mut sector = SECTOR_SIZE;
    while sector < end {
        let n = data_erases.iter().filter(|&&a| a == sector).count();
        assert_eq!(n, 1, "sector 0x{:06X} erased {} times", sector, n);
        sector += SECTOR_SIZE;
    }

    // And every program landed in a sector already erased at that point
    let mut erased = std::collections::HashSet::new();
    for op in store.device().ops() {
        match *op {
            Op::SectorErase(addr) => {
                erased.insert(addr);
            }
            Op::PageProgram { addr, .. } => {
                assert!(
                    erased.contains(&(addr & !(SECTOR_SIZE - 1))),
                    "program at 0x{:06X} before erase",
                    addr
                );
            }
            Op::WriteEnable => {}
        }
    }
}

#[test]
fn read_is_clamped_at_end_of_file() {
    let mut store = fresh_store();
    store.create_file().unwrap();
    store.write(&pattern(100)).unwrap();
    store.close().unwrap();

    store.open_file(1).unwrap();
    let mut buf = [0u8; 500];
    assert_eq!(store.read(&mut buf), 100);
    assert_eq!(store.peek(), 0);
    assert_eq!(store.read(&mut buf), 0);
}

#[test]
fn mode_preconditions() {
    let mut store = fresh_store();
    assert_eq!(store.write(b"x"), Err(Error::WrongMode));
    assert_eq!(store.peek(), 0);

    store.create_file().unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(store.read(&mut buf), 0); // reads need reading mode
    assert_eq!(store.delete_last_file(), Err(Error::WrongMode));
    assert_eq!(store.delete_all_files(), Err(Error::WrongMode));
    store.close().unwrap();
}

#[test]
fn open_file_index_validation() {
    let mut store = fresh_store();
    store.create_file().unwrap();
    store.close().unwrap();

    assert_eq!(store.open_file(0), Err(Error::InvalidFile));
    assert_eq!(store.open_file(2), Err(Error::InvalidFile));
    store.open_file(1).unwrap();
    store.close().unwrap();
}

#[test]
fn opening_while_writing_closes_the_previous_session() {
    let mut store = fresh_store();
    store.create_file().unwrap();
    store.write(&pattern(10)).unwrap();
    // Implicit close finalizes file 1 before file 2 opens
    store.create_file().unwrap();
    store.close().unwrap();

    let fat = store.fat();
    assert_eq!(fat.file_count(), 2);
    assert_eq!(fat.get(1).unwrap().len(), 10);
}

#[test]
fn delete_last_and_reuse_space() {
    let mut store = fresh_store();
    store.create_file().unwrap();
    store.write(&pattern(2000)).unwrap();
    store.close().unwrap();
    let first_start = store.fat().get(1).unwrap().start_addr;

    store.delete_last_file().unwrap();
    assert_eq!(store.fat().file_count(), 0);

    // The next file lands back on the freed sectors
    store.create_file().unwrap();
    store.close().unwrap();
    assert_eq!(store.fat().get(1).unwrap().start_addr, first_start);
}

#[test]
fn delete_all_files_empties_the_table() {
    let mut store = fresh_store();
    for _ in 0..3 {
        store.create_file().unwrap();
        store.close().unwrap();
    }
    store.delete_all_files().unwrap();
    assert_eq!(store.fat().file_count(), 0);
}

#[test]
fn table_survives_reinit() {
    let mut store = fresh_store();
    let data = pattern(600);
    store.create_file().unwrap();
    store.write(&data).unwrap();
    store.close().unwrap();
    let fat = store.fat();

    // Same chip, new store instance: the persisted table comes back
    let mut store = FlashStore::new(store.into_device());
    store.init(0).unwrap();
    assert_eq!(store.fat(), fat);

    store.open_file(1).unwrap();
    let mut back = vec![0u8; data.len()];
    assert_eq!(store.read(&mut back), data.len());
    assert_eq!(back, data);
}

#[test]
fn table_capacity_is_bounded() {
    let mut store = fresh_store();
    for _ in 0..MAX_FILES - 1 {
        store.create_file().unwrap();
        store.close().unwrap();
    }
    assert_eq!(store.create_file(), Err(Error::NoSpace));
    assert_eq!(store.fat().file_count(), MAX_FILES - 1);
}

#[test]
fn busy_chip_is_polled_not_spun() {
    // Operations finish after a handful of polls; everything succeeds.
    let mut store = FlashStore::new(DummyFlash::new(DummyConfig {
        erase_busy_polls: 5,
        program_busy_polls: 2,
        ..DummyConfig::default()
    }));
    assert_eq!(store.init(0), Err(Error::TableNotFound));
    store.initialize_fat().unwrap();
    let data = pattern(3000);
    store.create_file().unwrap();
    store.write(&data).unwrap();
    store.close().unwrap();

    store.open_file(1).unwrap();
    let mut back = vec![0u8; data.len()];
    assert_eq!(store.read(&mut back), data.len());
    assert_eq!(back, data);
}

#[test]
fn stuck_chip_surfaces_timeout() {
    // An erase that outlives the polling deadline must not hang the store.
    let mut store = FlashStore::new(DummyFlash::new(DummyConfig {
        erase_busy_polls: u32::MAX,
        ..DummyConfig::default()
    }));
    assert_eq!(store.init(0), Err(Error::TableNotFound));
    // The table rewrite issues the sector 0 erase and then gives up waiting
    assert_eq!(store.initialize_fat(), Err(Error::Timeout));
}

#[test]
fn persist_reports_busy_at_entry() {
    let mut flash = DummyFlash::new(DummyConfig {
        erase_busy_polls: 3,
        ..DummyConfig::default()
    });
    use flashfat_core::device::FlashDevice;
    flash.write_enable();
    flash.sector_erase(0); // chip now mid-erase

    let table = fat::FileTable::default();
    assert_eq!(fat::persist(&mut flash, &table), Err(Error::Busy));
}

#[test]
fn codec_round_trip_through_the_chip() {
    let mut store = fresh_store();
    for len in [0usize, 257, 4096] {
        store.create_file().unwrap();
        store.write(&pattern(len)).unwrap();
        store.close().unwrap();
    }
    let encoded = fat::encode(&store.fat());
    let decoded = fat::decode(store.device_mut()).unwrap();
    assert_eq!(fat::encode(&decoded), encoded);
}

#[test]
fn image_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("chip.bin");
    let data = pattern(1234);

    // Missing image file starts out as a blank chip
    let device = DummyFlash::load(&image, DummyConfig::default()).unwrap();
    let mut store = FlashStore::new(device);
    assert_eq!(store.init(0), Err(Error::TableNotFound));
    store.initialize_fat().unwrap();
    store.create_file().unwrap();
    store.write(&data).unwrap();
    store.close().unwrap();
    store.into_device().save(&image).unwrap();

    // A second "power cycle" through the saved image sees the same file
    let device = DummyFlash::load(&image, DummyConfig::default()).unwrap();
    let mut store = FlashStore::new(device);
    store.init(0).unwrap();
    assert_eq!(store.fat().file_count(), 1);
    store.open_file(1).unwrap();
    let mut back = vec![0u8; data.len()];
    assert_eq!(store.read(&mut back), data.len());
    assert_eq!(back, data);
}
