use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::date_range::Timestamped;
use crate::timestamps::{format_iso, parse_timestamp};

/// An untrusted backend record of unknown shape.
pub type RawRecord = Value;

/// Category label → number of records in that category.
pub type DistributionMap = BTreeMap<String, usize>;

// ============ Canonical View Models ============

/// Canonical organization row, safe to render verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationView {
    /// Backend identifier, or the record's position when it has none.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Subscription tier (e.g. "Free", "Pro").
    pub subscription_tier: String,
    /// Subscription status (e.g. "active", "trialing").
    pub subscription_status: String,
    /// Number of users in the organization.
    pub total_users: u64,
    /// Lifetime conversation count.
    pub total_conversations: u64,
    /// Conversations in the backend's recent-activity window.
    pub recent_conversations: u64,
    /// RFC 3339 creation instant, or "N/A".
    pub created_at: String,
}

impl OrganizationView {
    /// Rebuilds a backend-shaped record that normalizes back to this view.
    pub fn to_raw(&self) -> RawRecord {
        json!({
            "id": self.id,
            "name": self.name,
            "subscription_tier": self.subscription_tier,
            "subscription_status": self.subscription_status,
            "total_users": self.total_users,
            "total_conversations": self.total_conversations,
            "recent_conversations": self.recent_conversations,
            "created_at": self.created_at,
        })
    }
}

impl Timestamped for OrganizationView {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

/// Canonical lead row, safe to render verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadView {
    /// `lead_id`, or `"{email}-{index}"` when the backend sent none.
    pub id: String,
    pub name: String,
    pub email: String,
    /// Phone number, or "—".
    pub phone: String,
    pub inquiry: String,
    pub source: String,
    pub status: String,
    /// Localized display timestamp, or "N/A".
    pub timestamp: String,
    /// Instant behind `timestamp`, kept for filtering.
    #[serde(skip)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl LeadView {
    /// Rebuilds a backend-shaped record that normalizes back to this view.
    pub fn to_raw(&self) -> RawRecord {
        json!({
            "lead_id": self.id,
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
            "inquiry": self.inquiry,
            "source": self.source,
            "status": self.status,
            "timestamp": self.recorded_at.as_ref().map(format_iso),
        })
    }
}

impl Timestamped for LeadView {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.recorded_at
    }
}

// ============ Aggregates ============

/// One row of a top-N ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    /// 1-based position.
    pub rank: usize,
    pub view: OrganizationView,
    /// Value of the ranking metric for this organization.
    pub metric: u64,
}

/// Everything the organization statistics page shows, computed in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationStats {
    /// Organizations inside the requested date range.
    pub total_organizations: usize,
    pub tier_distribution: DistributionMap,
    pub status_distribution: DistributionMap,
    pub top_organizations: Vec<RankedEntry>,
}

// ============ API Request Models ============

/// A batch of raw records: a bare JSON array or `{ "records": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecordBatch {
    Records(Vec<RawRecord>),
    Wrapped { records: Vec<RawRecord> },
}

impl RecordBatch {
    /// Convert to a vec of records for uniform processing
    pub fn into_records(self) -> Vec<RawRecord> {
        match self {
            RecordBatch::Records(records) => records,
            RecordBatch::Wrapped { records } => records,
        }
    }
}

/// Usage-analytics payload: `{ "top_organizations": [...] }` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UsageAnalytics {
    Records(Vec<RawRecord>),
    Summary {
        /// Anything but an array is treated as "no data".
        #[serde(default)]
        top_organizations: Value,
    },
}

impl UsageAnalytics {
    pub fn into_records(self) -> Vec<RawRecord> {
        match self {
            UsageAnalytics::Records(records) => records,
            UsageAnalytics::Summary { top_organizations } => match top_organizations {
                Value::Array(records) => records,
                _ => Vec::new(),
            },
        }
    }
}

/// Query parameters accepted by the aggregate endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQueryParams {
    /// Lower bound, `YYYY-MM-DD` or RFC 3339.
    pub from: Option<String>,
    /// Upper bound, `YYYY-MM-DD` (whole day) or RFC 3339.
    pub to: Option<String>,
    /// Maximum ranked entries; negative values mean none.
    pub limit: Option<i64>,
}
