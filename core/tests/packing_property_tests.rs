//! Property-based tests for chunk packing, filtering and sorting.

use ctxpack_core::metrics::FileMetrics;
use ctxpack_core::{
    Block, BlockKind, FileEntry, FilterCriteria, MetricsState, Package, SeverityThresholds,
    Session, SortDirection, SortField, filter, pack,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

fn block_strategy() -> impl Strategy<Value = Block> {
    (
        prop::collection::vec("[a-z ]{0,12}", 0..30),
        prop_oneof![Just("\n"), Just("\r\n"), Just("\r")],
    )
        .prop_map(|(lines, terminator)| {
            let text: String = lines.iter().map(|l| format!("{}{}", l, terminator)).collect();
            Block::new(BlockKind::File, text)
        })
}

fn package_strategy() -> impl Strategy<Value = Package> {
    prop::collection::vec(block_strategy(), 0..25).prop_map(|blocks| Package {
        blocks,
        ..Package::default()
    })
}

fn entry_strategy() -> impl Strategy<Value = Vec<FileEntry>> {
    prop::collection::btree_set("[a-z]{1,6}(/[a-z]{1,6}){0,2}\\.(cs|razor|txt)", 0..20).prop_map(
        |paths: BTreeSet<String>| {
            paths
                .into_iter()
                .map(|rel| FileEntry::new(Path::new("/repo"), PathBuf::from("/repo").join(rel), 0))
                .collect()
        },
    )
}

/// Property: concatenating chunk bodies in order reproduces the package text.
#[test]
fn prop_chunks_concatenate_to_package() {
    proptest!(|(package in package_strategy(), target in 1usize..60)| {
        let chunks = pack(&package, target).unwrap();
        let joined: String = chunks.iter().map(|c| c.body()).collect();
        prop_assert_eq!(joined, package.text());
    });
}

/// Property: no chunk exceeds the target unless it holds one oversized block.
#[test]
fn prop_chunks_respect_target() {
    proptest!(|(package in package_strategy(), target in 1usize..60)| {
        let chunks = pack(&package, target).unwrap();
        for chunk in &chunks {
            prop_assert!(
                chunk.line_count() <= target || chunk.is_oversized(target),
                "chunk {} has {} lines for target {}",
                chunk.chunk_info.current_part,
                chunk.line_count(),
                target
            );
            prop_assert_eq!(chunk.chunk_info.total_parts, chunks.len());
        }
        let total: usize = chunks.iter().map(|c| c.line_count()).sum();
        prop_assert_eq!(total, package.line_count());
    });
}

/// Property: packing is deterministic.
#[test]
fn prop_packing_is_deterministic() {
    proptest!(|(package in package_strategy(), target in 1usize..60)| {
        prop_assert_eq!(pack(&package, target).unwrap(), pack(&package, target).unwrap());
    });
}

/// Property: empty criteria leave the entry list untouched.
#[test]
fn prop_empty_filter_is_identity() {
    proptest!(|(entries in entry_strategy())| {
        let out = filter::apply(&entries, &FilterCriteria::default());
        prop_assert_eq!(out, entries);
    });
}

/// Property: filtering keeps input order and only drops entries.
#[test]
fn prop_filter_preserves_order() {
    proptest!(|(entries in entry_strategy(), ext in prop_oneof![Just("cs"), Just("razor"), Just("txt")])| {
        let out = filter::apply(&entries, &FilterCriteria::new(&[ext], &[], &[], ""));
        let expected: Vec<_> = entries
            .iter()
            .filter(|e| e.extension == format!(".{}", ext))
            .cloned()
            .collect();
        prop_assert_eq!(out, expected);
    });
}

/// Property: with distinct line counts, descending order is the exact
/// reverse of ascending order.
#[test]
fn prop_descending_reverses_ascending() {
    proptest!(|(counts in prop::collection::btree_set(0usize..5000, 1..30))| {
        let entries: Vec<FileEntry> = counts
            .iter()
            .enumerate()
            .map(|(i, &lines)| {
                let mut e = FileEntry::new(
                    Path::new("/repo"),
                    PathBuf::from(format!("/repo/f{}.cs", i)),
                    0,
                );
                e.metrics = MetricsState::Computed(FileMetrics {
                    line_count: lines,
                    char_count: lines,
                    binary: false,
                });
                e
            })
            .collect();
        let mut session = Session::new(PathBuf::from("/repo"), entries, SeverityThresholds::default());

        session.set_sort_order(SortField::LineCount, SortDirection::Ascending);
        let ascending: Vec<_> = session.current_view().iter().map(|e| e.full_path.clone()).collect();
        session.set_sort_order(SortField::LineCount, SortDirection::Descending);
        let mut descending: Vec<_> = session.current_view().iter().map(|e| e.full_path.clone()).collect();
        descending.reverse();
        prop_assert_eq!(ascending, descending);
    });
}
