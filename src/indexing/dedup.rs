use crate::models::Track;
use dashmap::DashSet;
use std::collections::HashSet;

/// Drop tracks already in `indexed`, and repeats within `tracks`, keeping catalog order
pub fn filter_unindexed(tracks: Vec<Track>, indexed: &DashSet<String>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|track| !indexed.contains(&track.id))
        .filter(|track| seen.insert(track.id.clone()))
        .collect()
}
