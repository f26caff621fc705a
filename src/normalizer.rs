//! Record normalization
//!
//! Turns untrusted backend records into canonical view models by evaluating an
//! [`EntitySchema`] rule table against each record. Normalization is total: any input,
//! including `null`, arrays and bare scalars, yields a fully populated view. Fields that
//! fall back to their default are reported to a [`NormalizationObserver`], which can log
//! them but cannot change the result.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::field_guard::{self, FallbackReason, Lookup};
use crate::models::{LeadView, OrganizationView, RawRecord};
use crate::schema::{
    fields, EntitySchema, FieldDefault, FieldRule, LEAD_SCHEMA, NOT_AVAILABLE,
    ORGANIZATION_SCHEMA,
};
use crate::timestamps::{format_iso, format_localized, timestamp_value, DisplayOptions};

/// A field that was resolved to its default instead of a backend value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackEvent {
    /// Schema the record was normalized with.
    pub schema: &'static str,
    /// Position of the record in its batch.
    pub index: usize,
    /// Canonical field that fell back.
    pub field: &'static str,
    /// Backend names that were tried.
    pub candidates: &'static [&'static str],
    pub expected: &'static str,
    pub reason: FallbackReason,
}

/// Receives fallback notifications during normalization.
pub trait NormalizationObserver: Send + Sync {
    fn on_fallback(&self, event: &FallbackEvent);
}

/// Logs fallbacks through `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl NormalizationObserver for TracingObserver {
    fn on_fallback(&self, event: &FallbackEvent) {
        match &event.reason {
            FallbackReason::NotAnObject { found } => tracing::debug!(
                "{} #{}: record is a {}, using default for {}",
                event.schema,
                event.index,
                found,
                event.field
            ),
            FallbackReason::Missing => tracing::debug!(
                "{} #{}: {} missing (tried {:?}), using default",
                event.schema,
                event.index,
                event.field,
                event.candidates
            ),
            FallbackReason::TypeMismatch { field, found } => tracing::debug!(
                "{} #{}: {} expected {} but '{}' is {}, using default",
                event.schema,
                event.index,
                event.field,
                event.expected,
                field,
                found
            ),
        }
    }
}

/// Ignores fallbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl NormalizationObserver for SilentObserver {
    fn on_fallback(&self, _event: &FallbackEvent) {}
}

/// Value of one canonical field after applying its rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    Text(String),
    Count(u64),
    Identifier(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
}

/// All canonical fields of one record, keyed by canonical name.
#[derive(Debug, Default)]
struct ResolvedRecord {
    values: HashMap<&'static str, Resolved>,
}

impl ResolvedRecord {
    fn text(&mut self, field: &str) -> String {
        match self.values.remove(field) {
            Some(Resolved::Text(value)) => value,
            _ => String::new(),
        }
    }

    fn count(&self, field: &str) -> u64 {
        match self.values.get(field) {
            Some(Resolved::Count(value)) => *value,
            _ => 0,
        }
    }

    fn identifier(&mut self, field: &str) -> Option<String> {
        match self.values.remove(field) {
            Some(Resolved::Identifier(value)) => value,
            _ => None,
        }
    }

    fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        match self.values.get(field) {
            Some(Resolved::Timestamp(value)) => *value,
            _ => None,
        }
    }
}

/// Converts raw records into canonical view models.
#[derive(Clone)]
pub struct RecordNormalizer {
    observer: Arc<dyn NormalizationObserver>,
    display: DisplayOptions,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(DisplayOptions::default())
    }
}

impl std::fmt::Debug for RecordNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordNormalizer")
            .field("display", &self.display)
            .finish_non_exhaustive()
    }
}

impl RecordNormalizer {
    /// Normalizer that logs fallbacks through `tracing`.
    pub fn new(display: DisplayOptions) -> Self {
        Self {
            observer: Arc::new(TracingObserver),
            display,
        }
    }

    /// Replaces the fallback observer.
    pub fn with_observer(mut self, observer: Arc<dyn NormalizationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Normalizes one organization record with the directory rules.
    pub fn normalize_organization(&self, record: &RawRecord, index: usize) -> OrganizationView {
        self.normalize_organization_with(&ORGANIZATION_SCHEMA, record, index)
    }

    /// Normalizes one organization record with an explicit rule table.
    pub fn normalize_organization_with(
        &self,
        schema: &EntitySchema,
        record: &RawRecord,
        index: usize,
    ) -> OrganizationView {
        self.build_organization(schema, record, index).1
    }

    /// Normalizes one lead record.
    pub fn normalize_lead(&self, record: &RawRecord, index: usize) -> LeadView {
        self.build_lead(record, index).1
    }

    pub fn normalize_organizations(&self, records: &[RawRecord]) -> Vec<OrganizationView> {
        self.normalize_organizations_with(&ORGANIZATION_SCHEMA, records)
    }

    /// Normalizes a batch in input order. Ids are unique within the returned batch.
    pub fn normalize_organizations_with(
        &self,
        schema: &EntitySchema,
        records: &[RawRecord],
    ) -> Vec<OrganizationView> {
        let (sources, mut views): (Vec<_>, Vec<_>) = records
            .iter()
            .enumerate()
            .map(|(index, record)| self.build_organization(schema, record, index))
            .unzip();
        disambiguate_ids(schema.name, &sources, views.iter_mut().map(|view| &mut view.id));
        tracing::debug!("Normalized {} {} record(s)", views.len(), schema.name);
        views
    }

    /// Normalizes a batch of leads in input order. Ids are unique within the returned
    /// batch.
    pub fn normalize_leads(&self, records: &[RawRecord]) -> Vec<LeadView> {
        let (sources, mut views): (Vec<_>, Vec<_>) = records
            .iter()
            .enumerate()
            .map(|(index, record)| self.build_lead(record, index))
            .unzip();
        disambiguate_ids(LEAD_SCHEMA.name, &sources, views.iter_mut().map(|view| &mut view.id));
        tracing::debug!("Normalized {} lead record(s)", views.len());
        views
    }

    /// Builds the view and returns the backend id alongside it, `None` when the view's
    /// id is the positional fallback.
    fn build_organization(
        &self,
        schema: &EntitySchema,
        record: &RawRecord,
        index: usize,
    ) -> (Option<String>, OrganizationView) {
        let mut resolved = self.resolve(schema, record, index);
        let source_id = resolved.identifier(fields::ID);

        let view = OrganizationView {
            id: source_id.clone().unwrap_or_else(|| index.to_string()),
            name: resolved.text(fields::NAME),
            subscription_tier: resolved.text(fields::SUBSCRIPTION_TIER),
            subscription_status: resolved.text(fields::SUBSCRIPTION_STATUS),
            total_users: resolved.count(fields::TOTAL_USERS),
            total_conversations: resolved.count(fields::TOTAL_CONVERSATIONS),
            recent_conversations: resolved.count(fields::RECENT_CONVERSATIONS),
            created_at: resolved
                .timestamp(fields::CREATED_AT)
                .map(|instant| format_iso(&instant))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        };
        (source_id, view)
    }

    fn build_lead(&self, record: &RawRecord, index: usize) -> (Option<String>, LeadView) {
        let mut resolved = self.resolve(&LEAD_SCHEMA, record, index);

        let source_id = resolved.identifier(fields::ID);
        let email = resolved.text(fields::EMAIL);
        let recorded_at = resolved.timestamp(fields::TIMESTAMP);

        let view = LeadView {
            id: source_id
                .clone()
                .unwrap_or_else(|| format!("{}-{}", email, index)),
            name: resolved.text(fields::NAME),
            email,
            phone: resolved.text(fields::PHONE),
            inquiry: resolved.text(fields::INQUIRY),
            source: resolved.text(fields::SOURCE),
            status: resolved.text(fields::STATUS),
            timestamp: recorded_at
                .map(|instant| format_localized(&instant, &self.display))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            recorded_at,
        };
        (source_id, view)
    }

    /// Applies every rule of `schema` to `record`.
    fn resolve(&self, schema: &EntitySchema, record: &Value, index: usize) -> ResolvedRecord {
        let mut resolved = ResolvedRecord::default();

        for rule in schema.rules {
            let value = match rule.default {
                FieldDefault::Text(default) => {
                    let lookup = field_guard::probe::<String>(record, rule.candidates);
                    let lookup = match (lookup, record, schema.bare_string_field) {
                        (Lookup::Fallback { .. }, Value::String(bare), Some(field))
                            if field == rule.field =>
                        {
                            Lookup::Found {
                                field: String::new(),
                                value: bare.clone(),
                            }
                        }
                        (lookup, _, _) => lookup,
                    };
                    Resolved::Text(self.settle(schema, rule, index, lookup, default.to_string()))
                }
                FieldDefault::Count(default) => {
                    let lookup = field_guard::probe::<u64>(record, rule.candidates);
                    Resolved::Count(self.settle(schema, rule, index, lookup, default))
                }
                FieldDefault::Identifier => {
                    let lookup = field_guard::probe_by(record, rule.candidates, |value| {
                        field_guard::identifier(value).map(Some)
                    });
                    Resolved::Identifier(self.settle(schema, rule, index, lookup, None))
                }
                FieldDefault::Timestamp => {
                    let lookup = field_guard::probe_by(record, rule.candidates, |value| {
                        timestamp_value(value).map(Some)
                    });
                    Resolved::Timestamp(self.settle(schema, rule, index, lookup, None))
                }
            };
            resolved.values.insert(rule.field, value);
        }

        resolved
    }

    /// Unwraps a lookup, reporting the fallback when the default is used.
    fn settle<T>(
        &self,
        schema: &EntitySchema,
        rule: &FieldRule,
        index: usize,
        lookup: Lookup<T>,
        default: T,
    ) -> T {
        match lookup {
            Lookup::Found { value, .. } => value,
            Lookup::Fallback { reason } => {
                self.observer.on_fallback(&FallbackEvent {
                    schema: schema.name,
                    index,
                    field: rule.field,
                    candidates: rule.candidates,
                    expected: rule.default.expected_type(),
                    reason,
                });
                default
            }
        }
    }
}

/// Rewrites ids in place so that no two views of a batch share one.
///
/// Backend ids win: the first record carrying a backend id keeps it, and a positional
/// fallback never takes an id some record in the batch was sent with. A clashing id gets
/// `#{index}` appended until it is free.
fn disambiguate_ids<'a>(
    schema: &str,
    sources: &[Option<String>],
    ids: impl Iterator<Item = &'a mut String>,
) {
    let reserved: HashSet<&str> = sources.iter().flatten().map(String::as_str).collect();
    let mut used: HashSet<String> = HashSet::with_capacity(sources.len());

    for (index, (source, id)) in sources.iter().zip(ids).enumerate() {
        let clashes =
            used.contains(id.as_str()) || (source.is_none() && reserved.contains(id.as_str()));
        if clashes {
            let mut candidate = format!("{}#{}", id, index);
            while used.contains(&candidate) || reserved.contains(candidate.as_str()) {
                candidate = format!("{}#{}", candidate, index);
            }
            tracing::debug!(
                "{} #{}: id '{}' already taken in this batch, using '{}'",
                schema,
                index,
                id,
                candidate
            );
            *id = candidate;
        }
        used.insert(id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<FallbackEvent>>,
    }

    impl NormalizationObserver for Recorder {
        fn on_fallback(&self, event: &FallbackEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn silent() -> RecordNormalizer {
        RecordNormalizer::default().with_observer(Arc::new(SilentObserver))
    }

    #[test]
    fn test_empty_record_uses_defaults() {
        let view = silent().normalize_organization(&json!({}), 4);
        assert_eq!(view.id, "4");
        assert_eq!(view.name, "Unknown");
        assert_eq!(view.subscription_tier, "Free");
        assert_eq!(view.subscription_status, "Unknown");
        assert_eq!(view.total_users, 0);
        assert_eq!(view.total_conversations, 0);
        assert_eq!(view.recent_conversations, 0);
        assert_eq!(view.created_at, "N/A");
    }

    #[test]
    fn test_wrong_typed_field_does_not_affect_siblings() {
        let view = silent().normalize_organization(
            &json!({
                "name": {"first": "Acme"},
                "subscription_tier": "Pro",
                "total_users": "12",
                "total_conversations": 30,
            }),
            0,
        );
        assert_eq!(view.name, "Unknown");
        assert_eq!(view.subscription_tier, "Pro");
        assert_eq!(view.total_users, 0);
        assert_eq!(view.total_conversations, 30);
    }

    #[test]
    fn test_identifier_fallbacks() {
        let normalizer = silent();
        assert_eq!(normalizer.normalize_organization(&json!({"id": "a"}), 0).id, "a");
        assert_eq!(normalizer.normalize_organization(&json!({"_id": "b"}), 0).id, "b");
        assert_eq!(normalizer.normalize_organization(&json!({"id": 12}), 0).id, "12");
        assert_eq!(
            normalizer
                .normalize_organization(&json!({"id": "", "_id": "c"}), 0)
                .id,
            "c"
        );
        assert_eq!(normalizer.normalize_organization(&json!({"id": ""}), 9).id, "9");
    }

    #[test]
    fn test_created_at_is_canonicalized() {
        let normalizer = silent();
        let view = normalizer.normalize_organization(
            &json!({"created_at": "2024-02-01T10:00:00+02:00"}),
            0,
        );
        assert_eq!(view.created_at, "2024-02-01T08:00:00Z");

        let garbage = normalizer.normalize_organization(&json!({"created_at": "soon"}), 0);
        assert_eq!(garbage.created_at, "N/A");
    }

    #[test]
    fn test_usage_summary_schema_priorities() {
        use crate::schema::USAGE_SUMMARY_SCHEMA;

        let record = json!({
            "id": "primary",
            "_id": "mongo",
            "total_conversations": 5,
            "conversation_count": 8,
        });
        let normalizer = silent();

        let directory = normalizer.normalize_organization(&record, 0);
        assert_eq!(directory.id, "primary");
        assert_eq!(directory.total_conversations, 5);

        let usage = normalizer.normalize_organization_with(&USAGE_SUMMARY_SCHEMA, &record, 0);
        assert_eq!(usage.id, "mongo");
        assert_eq!(usage.total_conversations, 8);
    }

    #[test]
    fn test_bare_string_only_names_usage_records() {
        use crate::schema::USAGE_SUMMARY_SCHEMA;

        let normalizer = silent();
        let usage = normalizer.normalize_organization_with(&USAGE_SUMMARY_SCHEMA, &json!("Acme"), 2);
        assert_eq!(usage.name, "Acme");
        assert_eq!(usage.id, "2");
        assert_eq!(usage.subscription_tier, "Free");

        let directory = normalizer.normalize_organization(&json!("Acme"), 2);
        assert_eq!(directory.name, "Unknown");
    }

    #[test]
    fn test_lead_defaults_and_composite_id() {
        let normalizer = silent();

        let empty = normalizer.normalize_lead(&json!({}), 3);
        assert_eq!(empty.id, "N/A-3");
        assert_eq!(empty.name, "N/A");
        assert_eq!(empty.phone, "—");
        assert_eq!(empty.source, "chatbot");
        assert_eq!(empty.status, "new");
        assert_eq!(empty.timestamp, "N/A");
        assert_eq!(empty.recorded_at, None);

        let with_email = normalizer.normalize_lead(&json!({"email": "ana@example.com"}), 1);
        assert_eq!(with_email.id, "ana@example.com-1");

        let with_id = normalizer.normalize_lead(
            &json!({"lead_id": "L-9", "email": "ana@example.com", "phone": "+5511987654321"}),
            1,
        );
        assert_eq!(with_id.id, "L-9");
        assert_eq!(with_id.phone, "+5511987654321");
    }

    #[test]
    fn test_lead_timestamp_uses_display_offset() {
        let display = DisplayOptions::from_offset_minutes(-180).unwrap();
        let normalizer = RecordNormalizer::new(display).with_observer(Arc::new(SilentObserver));

        let lead = normalizer.normalize_lead(&json!({"timestamp": "2024-03-01T12:00:00Z"}), 0);
        assert_eq!(lead.timestamp, "3/1/2024, 9:00:00 AM");
        assert!(lead.recorded_at.is_some());
    }

    #[test]
    fn test_observer_receives_fallbacks_without_changing_output() {
        let recorder = Arc::new(Recorder::default());
        let observed = RecordNormalizer::default().with_observer(recorder.clone());

        let record = json!({"name": "Acme", "total_users": "ten"});
        let view = observed.normalize_organization(&record, 0);
        assert_eq!(view, silent().normalize_organization(&record, 0));

        let events = recorder.events.lock().unwrap();
        let users = events
            .iter()
            .find(|e| e.field == fields::TOTAL_USERS)
            .expect("total_users fallback reported");
        assert_eq!(
            users.reason,
            FallbackReason::TypeMismatch {
                field: "total_users".to_string(),
                found: "string"
            }
        );
        assert!(events.iter().all(|e| e.field != fields::NAME));
    }

    #[test]
    fn test_non_object_reports_every_field() {
        let recorder = Arc::new(Recorder::default());
        let observed = RecordNormalizer::default().with_observer(recorder.clone());

        observed.normalize_lead(&json!(null), 0);

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), LEAD_SCHEMA.rules.len());
        assert!(events
            .iter()
            .all(|e| e.reason == FallbackReason::NotAnObject { found: "null" }));
    }
}
