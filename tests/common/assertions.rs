//! Custom assertions for integration tests

use helios_client::{Collection, OutcomeSet};

/// `n` values of the `properties.n` field, in collection order
pub fn item_numbers(collection: &Collection) -> Vec<u64> {
    collection
        .items
        .iter()
        .map(|item| item["properties"]["n"].as_u64().expect("generated item"))
        .collect()
}

/// Assert the collection holds exactly items `start..end`, in order
pub fn assert_contiguous(collection: &Collection, start: u64, end: u64) {
    let expected: Vec<u64> = (start..end).collect();
    assert_eq!(
        item_numbers(collection),
        expected,
        "collection must hold items {start}..{end} in ascending-skip order"
    );
}

/// Assert the partitions of `set` add up and keep relative order
pub fn assert_partitions_consistent<I: PartialEq + std::fmt::Debug, T>(set: &OutcomeSet<I, T>) {
    let succeeded = set.succeeded();
    let failed = set.failed();
    assert_eq!(succeeded.len() + failed.len(), set.len());

    let inputs = set.inputs();
    let position = |input: &I| inputs.iter().position(|i| *i == input).expect("known input");
    let ordered = |records: &[&helios_client::OutcomeRecord<I, T>]| {
        records
            .windows(2)
            .all(|w| position(w[0].input()) < position(w[1].input()))
    };
    assert!(ordered(&succeeded), "succeeded() must keep input order");
    assert!(ordered(&failed), "failed() must keep input order");
}
