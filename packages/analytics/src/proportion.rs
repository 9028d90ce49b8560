//! Conversion of group counts into percentages of the total.

use crime_insights_analytics_models::{GroupCount, GroupShare};

/// Returns `count / total` as a percentage rounded to two decimal places,
/// halves away from zero.
///
/// Rounding is done on integer hundredths of a percent so exact halves
/// such as 31.875 are never lost to binary representation.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let count = u128::from(count);
    let total = u128::from(total);
    let hundredths = (count * 20_000 + total) / (2 * total);
    hundredths as f64 / 100.0
}

/// Computes each group's share of the summed counts.
///
/// `groups` must be the full grouping, not a top-N slice, or the
/// percentages will not add up to 100. Order is preserved. A zero total
/// yields zero percentages.
#[must_use]
pub fn proportions(groups: &[GroupCount]) -> Vec<GroupShare> {
    let total: u64 = groups.iter().map(|g| g.count).sum();

    groups
        .iter()
        .map(|g| GroupShare {
            key: g.key.clone(),
            count: g.count,
            percent: percent_of(g.count, total),
        })
        .collect()
}
