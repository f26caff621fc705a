//! Aggregate statistics over normalized organizations.

use std::cmp::Ordering;

use crate::date_range::{filter_by_range, DateRange};
use crate::models::{DistributionMap, OrganizationStats, OrganizationView, RankedEntry};

/// Categorical field a distribution can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    SubscriptionTier,
    SubscriptionStatus,
}

impl CategoryField {
    fn value<'a>(&self, view: &'a OrganizationView) -> &'a str {
        match self {
            CategoryField::SubscriptionTier => &view.subscription_tier,
            CategoryField::SubscriptionStatus => &view.subscription_status,
        }
    }
}

/// Numeric field organizations can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    TotalConversations,
    TotalUsers,
    RecentConversations,
}

impl MetricField {
    pub fn value(&self, view: &OrganizationView) -> u64 {
        match self {
            MetricField::TotalConversations => view.total_conversations,
            MetricField::TotalUsers => view.total_users,
            MetricField::RecentConversations => view.recent_conversations,
        }
    }
}

/// Counts records per observed value of `field`.
///
/// Every view lands in exactly one bucket, so the counts sum to `views.len()`.
pub fn distribution(views: &[OrganizationView], field: CategoryField) -> DistributionMap {
    let mut buckets = DistributionMap::new();
    for view in views {
        *buckets.entry(field.value(view).to_string()).or_insert(0) += 1;
    }
    buckets
}

/// Metric descending, then name ascending, then id ascending.
fn ranking_order(metric: MetricField, a: &OrganizationView, b: &OrganizationView) -> Ordering {
    metric
        .value(b)
        .cmp(&metric.value(a))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// The `n` highest-ranked organizations by `metric`, with contiguous 1-based ranks.
///
/// Ties on the metric are broken by name (byte-wise, case-sensitive) and then by id,
/// so the order is total. `n == 0` yields nothing; `n` larger than the input yields
/// every view.
pub fn top_n(views: &[OrganizationView], metric: MetricField, n: usize) -> Vec<RankedEntry> {
    if n == 0 {
        return Vec::new();
    }

    let mut ordered: Vec<&OrganizationView> = views.iter().collect();
    ordered.sort_by(|a, b| ranking_order(metric, a, b));

    ordered
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(position, view)| RankedEntry {
            rank: position + 1,
            metric: metric.value(view),
            view: view.clone(),
        })
        .collect()
}

/// Tier and status distributions plus the top organizations by conversations, over the
/// organizations created inside `range`.
pub fn organization_stats(
    views: &[OrganizationView],
    range: Option<&DateRange>,
    top: usize,
) -> OrganizationStats {
    let in_range = filter_by_range(views, range);

    tracing::debug!(
        "Computing organization stats over {} of {} organization(s)",
        in_range.len(),
        views.len()
    );

    OrganizationStats {
        total_organizations: in_range.len(),
        tier_distribution: distribution(&in_range, CategoryField::SubscriptionTier),
        status_distribution: distribution(&in_range, CategoryField::SubscriptionStatus),
        top_organizations: top_n(&in_range, MetricField::TotalConversations, top),
    }
}
