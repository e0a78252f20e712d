//! Merges per-platform record sets into one deduplicated, ordered set.

use std::collections::BTreeMap;

use vidstats_core::{TripleKey, VideoStatRecord};

/// Merges records from all platforms into a single set with one record per
/// `(platform, video_id, date)` triple.
///
/// When two records carry the same triple, the one with the later
/// `fetched_at` wins; a tie keeps the record seen later in the input. The
/// result is ordered by date, then platform, then video id, so downstream
/// writes and CSV output are deterministic regardless of which platform
/// finished fetching first.
#[must_use]
pub fn reconcile(records: Vec<VideoStatRecord>) -> Vec<VideoStatRecord> {
    let input_len = records.len();
    let mut by_key: BTreeMap<TripleKey, VideoStatRecord> = BTreeMap::new();

    for record in records {
        match by_key.entry(record.key()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                if record.fetched_at >= slot.get().fetched_at {
                    slot.insert(record);
                }
            }
        }
    }

    let mut merged: Vec<VideoStatRecord> = by_key.into_values().collect();
    merged.sort_by(|a, b| {
        (a.date, a.platform, &a.video_id).cmp(&(b.date, b.platform, &b.video_id))
    });

    if merged.len() < input_len {
        tracing::debug!(
            input = input_len,
            deduplicated = input_len - merged.len(),
            "reconciliation dropped duplicate triples"
        );
    }

    merged
}
