//! Ranking of grouped counts.
//!
//! Groups are ordered by count, highest first. Groups with equal counts
//! are ordered by ascending key (numeric for temporal features, lexical
//! for labels) so that top-N answers never depend on storage order.

use std::cmp::Ordering;

use crime_insights_analytics_models::GroupCount;

/// Orders two groups: higher count first, then lower key.
#[must_use]
pub fn by_rank(a: &GroupCount, b: &GroupCount) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key))
}

/// Sorts groups by rank and keeps at most `limit` of them.
///
/// An empty input yields an empty output.
#[must_use]
pub fn rank(mut groups: Vec<GroupCount>, limit: Option<usize>) -> Vec<GroupCount> {
    groups.sort_by(by_rank);
    if let Some(limit) = limit {
        groups.truncate(limit);
    }
    groups
}

/// Returns the highest-ranked group, if any.
#[must_use]
pub fn top(groups: Vec<GroupCount>) -> Option<GroupCount> {
    groups.into_iter().min_by(by_rank)
}
