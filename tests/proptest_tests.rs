//! Property-based tests for increment application.

use std::collections::BTreeMap;
use std::fs;

use pagerestore::{ArchiveEntry, RestoreOptions, UnwrapResult};
use proptest::prelude::*;
use tempfile::TempDir;

mod common;
use common::{catalog_with_increments, encode_increment, interpreter};

const PAGE: usize = 512;
const NAME: &str = "base/1/16000";

/// Logical size in pages plus a map of changed block to fill byte.
fn increment_strategy() -> impl Strategy<Value = (usize, BTreeMap<u32, u8>)> {
    (1usize..12).prop_flat_map(|pages| {
        (
            Just(pages),
            prop::collection::btree_map(0..pages as u32, 1u8..=255, 0..=pages),
        )
    })
}

fn pages_of(changed: &BTreeMap<u32, u8>) -> Vec<(u32, Vec<u8>)> {
    // Reverse order: the reader must not assume sorted blocks
    changed
        .iter()
        .rev()
        .map(|(&block, &fill)| (block, vec![fill; PAGE]))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn merge_touches_only_listed_pages(
        (pages, changed) in increment_strategy(),
        original in prop::collection::vec(any::<u8>(), 1..=12 * PAGE / 64),
    ) {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join(NAME);
        fs::create_dir_all(target.parent().unwrap()).unwrap();

        let before: Vec<u8> = original.iter().cycle().take(pages * PAGE).copied().collect();
        fs::write(&target, &before).unwrap();

        let interp = interpreter(
            dir.path(),
            catalog_with_increments(&[NAME]),
            RestoreOptions::new().page_size(PAGE),
        );
        let payload = encode_increment((pages * PAGE) as u64, &pages_of(&changed));
        interp.interpret(&ArchiveEntry::file(NAME, payload)).unwrap();

        let after = fs::read(&target).unwrap();
        prop_assert_eq!(after.len(), before.len());
        for block in 0..pages {
            let range = block * PAGE..(block + 1) * PAGE;
            match changed.get(&(block as u32)) {
                Some(&fill) => {
                    prop_assert!(after[range].iter().all(|&b| b == fill));
                }
                None => {
                    prop_assert_eq!(&after[range.clone()], &before[range]);
                }
            }
        }
        prop_assert_eq!(
            interp.into_summary().outcome(NAME),
            UnwrapResult::WroteIncrementBlocks { blocks: changed.len() }
        );
    }

    #[test]
    fn create_zero_fills_absent_pages(
        (pages, changed) in increment_strategy(),
        tail in 0usize..PAGE,
    ) {
        // A partial last page is still addressable
        let file_size = if tail == 0 { pages * PAGE } else { (pages - 1) * PAGE + tail };
        let changed: BTreeMap<u32, u8> = changed
            .into_iter()
            .filter(|&(block, _)| (block as usize) < file_size.div_ceil(PAGE))
            .collect();

        let dir = TempDir::new().unwrap();
        let interp = interpreter(
            dir.path(),
            catalog_with_increments(&[NAME]),
            RestoreOptions::new().page_size(PAGE),
        );
        let payload = encode_increment(file_size as u64, &pages_of(&changed));
        interp.interpret(&ArchiveEntry::file(NAME, payload)).unwrap();

        let after = fs::read(dir.path().join(NAME)).unwrap();
        prop_assert_eq!(after.len(), file_size);
        for (i, &b) in after.iter().enumerate() {
            let expected = changed.get(&((i / PAGE) as u32)).copied().unwrap_or(0);
            prop_assert_eq!(b, expected);
        }
        prop_assert_eq!(
            interp.into_summary().outcome(NAME),
            UnwrapResult::CreatedFromIncrement { blocks: changed.len() }
        );
    }
}
