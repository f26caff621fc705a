/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use rust_admin_dashboard::aggregate::{distribution, top_n, CategoryField, MetricField};
use rust_admin_dashboard::field_guard::extract;
use rust_admin_dashboard::models::OrganizationView;
use rust_admin_dashboard::normalizer::{RecordNormalizer, SilentObserver};
use rust_admin_dashboard::timestamps::{parse_timestamp, DisplayOptions};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

fn normalizer() -> RecordNormalizer {
    RecordNormalizer::new(DisplayOptions::default()).with_observer(Arc::new(SilentObserver))
}

/// Arbitrary JSON, a few levels deep.
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>().prop_map(|f| json!(f)),
        "\\PC{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((arb_key(), inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Keys biased towards the field names backends actually send.
fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("id".to_string()),
        Just("_id".to_string()),
        Just("name".to_string()),
        Just("organization_name".to_string()),
        Just("subscription_tier".to_string()),
        Just("subscription_status".to_string()),
        Just("total_users".to_string()),
        Just("total_conversations".to_string()),
        Just("conversation_count".to_string()),
        Just("created_at".to_string()),
        Just("lead_id".to_string()),
        Just("email".to_string()),
        Just("timestamp".to_string()),
        "[a-z_]{1,8}",
    ]
}

/// Records whose ids collide with each other and with positional fallbacks.
fn arb_id_record() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({})),
        "[0-3]".prop_map(|id| json!({"id": id, "lead_id": id})),
        "[0-3]#[0-3]".prop_map(|id| json!({"id": id, "lead_id": id})),
        (0u64..4).prop_map(|id| json!({"_id": id})),
        "N/A-[0-3]".prop_map(|id| json!({"lead_id": id})),
    ]
}

fn arb_organization() -> impl Strategy<Value = OrganizationView> {
    (
        "[a-f0-9]{1,6}",
        "[A-Za-z]{0,6}",
        prop_oneof![Just("Free"), Just("Pro"), Just("Enterprise")],
        prop_oneof![Just("active"), Just("trialing"), Just("canceled")],
        0u64..50,
    )
        .prop_map(|(id, name, tier, status, conversations)| OrganizationView {
            id,
            name,
            subscription_tier: tier.to_string(),
            subscription_status: status.to_string(),
            total_users: 0,
            total_conversations: conversations,
            recent_conversations: 0,
            created_at: "N/A".to_string(),
        })
}

// Property: normalization is total and always produces an id
proptest! {
    #[test]
    fn organization_normalization_never_panics(record in arb_json(), index in 0usize..1000) {
        let view = normalizer().normalize_organization(&record, index);
        prop_assert!(!view.id.is_empty());
        prop_assert!(!view.created_at.is_empty());
    }

    #[test]
    fn lead_normalization_never_panics(record in arb_json(), index in 0usize..1000) {
        let lead = normalizer().normalize_lead(&record, index);
        prop_assert!(!lead.id.is_empty());
        prop_assert!(!lead.timestamp.is_empty());
    }

    #[test]
    fn renormalizing_a_view_is_a_no_op(record in arb_json(), index in 0usize..1000) {
        let view = normalizer().normalize_organization(&record, index);
        let again = normalizer().normalize_organization(&view.to_raw(), index);
        prop_assert_eq!(again, view);
    }

    #[test]
    fn batch_ids_are_unique(records in prop::collection::vec(arb_id_record(), 0..12)) {
        let views = normalizer().normalize_organizations(&records);
        let ids: HashSet<_> = views.iter().map(|v| v.id.as_str()).collect();
        prop_assert_eq!(ids.len(), records.len());

        let leads = normalizer().normalize_leads(&records);
        let ids: HashSet<_> = leads.iter().map(|l| l.id.as_str()).collect();
        prop_assert_eq!(ids.len(), records.len());
    }

    #[test]
    fn extract_returns_default_for_non_objects(value in arb_json()) {
        if !value.is_object() {
            prop_assert_eq!(extract::<u64>(&value, &["total_users"], 7), 7);
            prop_assert_eq!(extract(&value, &["name"], "fallback".to_string()), "fallback");
        }
    }

    #[test]
    fn timestamp_parsing_never_panics(raw in "\\PC*") {
        let _ = parse_timestamp(&raw);
    }
}

// Property: aggregation invariants
proptest! {
    #[test]
    fn distribution_counts_sum_to_input_len(
        views in prop::collection::vec(arb_organization(), 0..40)
    ) {
        for field in [CategoryField::SubscriptionTier, CategoryField::SubscriptionStatus] {
            let dist = distribution(&views, field);
            prop_assert_eq!(dist.values().sum::<usize>(), views.len());
            prop_assert!(dist.values().all(|count| *count > 0));
        }
    }

    #[test]
    fn top_n_is_ordered_and_contiguous(
        views in prop::collection::vec(arb_organization(), 0..40),
        n in 0usize..50
    ) {
        let ranked = top_n(&views, MetricField::TotalConversations, n);
        prop_assert_eq!(ranked.len(), n.min(views.len()));

        for (position, entry) in ranked.iter().enumerate() {
            prop_assert_eq!(entry.rank, position + 1);
            prop_assert_eq!(entry.metric, entry.view.total_conversations);
        }
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.metric >= b.metric);
            if a.metric == b.metric {
                prop_assert!((&a.view.name, &a.view.id) <= (&b.view.name, &b.view.id));
            }
        }
    }

    #[test]
    fn top_n_ignores_input_order(
        views in prop::collection::vec(arb_organization(), 0..20),
        n in 1usize..25
    ) {
        // Distinct ids make the ranking order total
        let views: Vec<_> = views
            .into_iter()
            .enumerate()
            .map(|(i, view)| OrganizationView { id: format!("org-{}", i), ..view })
            .collect();
        let mut reversed = views.clone();
        reversed.reverse();
        prop_assert_eq!(
            top_n(&views, MetricField::TotalConversations, n),
            top_n(&reversed, MetricField::TotalConversations, n)
        );
    }
}
