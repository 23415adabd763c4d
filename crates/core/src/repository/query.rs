//! Uncached filter and sort pipeline.

use std::cmp::Ordering;

use super::index::Snapshot;
use crate::cache::hash::normalize_query;
use crate::model::{BuildFilters, BuildRecord, SortField, SortOrder};

/// Case-insensitive substring scan over name and description.
///
/// An empty (or all-whitespace) query matches every record.
pub fn search(records: &[BuildRecord], query: &str) -> Vec<BuildRecord> {
    let needle = normalize_query(query);
    records.iter().filter(|b| b.matches_text(&needle)).cloned().collect()
}

/// Type, then difficulty, then text, then sort.
pub fn filter(snapshot: &Snapshot, filters: &BuildFilters) -> Vec<BuildRecord> {
    let mut builds = match filters.build_type {
        Some(build_type) => snapshot.by_type(build_type),
        None => snapshot.records.clone(),
    };

    if let Some(difficulty) = filters.difficulty {
        builds.retain(|b| b.difficulty == difficulty);
    }

    if let Some(query) = filters.search.as_deref() {
        let needle = normalize_query(query);
        builds.retain(|b| b.matches_text(&needle));
    }

    sort(&mut builds, filters.sort_by, filters.sort_order);
    builds
}

/// Stable sort. Enum fields order by their wire names; a missing age time
/// sorts as 0.
pub fn sort(builds: &mut [BuildRecord], field: SortField, order: SortOrder) {
    match order {
        SortOrder::Asc => builds.sort_by(|a, b| compare(a, b, field)),
        SortOrder::Desc => builds.sort_by(|a, b| compare(b, a, field)),
    }
}

fn compare(a: &BuildRecord, b: &BuildRecord, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::Difficulty => a.difficulty.as_str().cmp(b.difficulty.as_str()),
        SortField::BuildType => a.build_type.as_str().cmp(b.build_type.as_str()),
        SortField::FeudalAgeTime => a.feudal_age_time.unwrap_or(0).cmp(&b.feudal_age_time.unwrap_or(0)),
        SortField::CastleAgeTime => a.castle_age_time.unwrap_or(0).cmp(&b.castle_age_time.unwrap_or(0)),
    }
}
