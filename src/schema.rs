//! Field rule tables for each entity kind.
//!
//! A table maps every canonical view-model field to the backend field names that may
//! carry it (in priority order) and the default used when none of them does. The
//! normalizer is driven entirely by these tables.

/// Sentinel for unavailable text and timestamps.
pub const NOT_AVAILABLE: &str = "N/A";
/// Sentinel for a lead without a phone number.
pub const NO_PHONE: &str = "—";

/// Canonical field names, as serialized on the view models.
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const SUBSCRIPTION_TIER: &str = "subscriptionTier";
    pub const SUBSCRIPTION_STATUS: &str = "subscriptionStatus";
    pub const TOTAL_USERS: &str = "totalUsers";
    pub const TOTAL_CONVERSATIONS: &str = "totalConversations";
    pub const RECENT_CONVERSATIONS: &str = "recentConversations";
    pub const CREATED_AT: &str = "createdAt";

    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const INQUIRY: &str = "inquiry";
    pub const SOURCE: &str = "source";
    pub const STATUS: &str = "status";
    pub const TIMESTAMP: &str = "timestamp";
}

/// Default for a field; the variant also fixes the JSON type the field must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// String field with a literal fallback.
    Text(&'static str),
    /// Non-negative number with a literal fallback.
    Count(u64),
    /// Non-empty string or integral number; the fallback is positional and computed by
    /// the normalizer.
    Identifier,
    /// Timestamp string or epoch milliseconds; no fallback instant.
    Timestamp,
}

impl FieldDefault {
    /// Expected JSON type, for diagnostics.
    pub fn expected_type(&self) -> &'static str {
        match self {
            FieldDefault::Text(_) => "string",
            FieldDefault::Count(_) => "number",
            FieldDefault::Identifier => "string|number",
            FieldDefault::Timestamp => "timestamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Canonical field name on the view model.
    pub field: &'static str,
    /// Backend field names, highest priority first.
    pub candidates: &'static [&'static str],
    pub default: FieldDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Label used in diagnostics.
    pub name: &'static str,
    pub rules: &'static [FieldRule],
    /// Some payloads list bare strings instead of objects; when set, such a record
    /// populates this text field.
    pub bare_string_field: Option<&'static str>,
}

impl EntitySchema {
    pub fn rule(&self, field: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|rule| rule.field == field)
    }
}

const fn rule(
    field: &'static str,
    candidates: &'static [&'static str],
    default: FieldDefault,
) -> FieldRule {
    FieldRule {
        field,
        candidates,
        default,
    }
}

const ORGANIZATION_RULES: &[FieldRule] = &[
    rule(fields::ID, &["id", "_id"], FieldDefault::Identifier),
    rule(
        fields::NAME,
        &["name", "organization_name"],
        FieldDefault::Text("Unknown"),
    ),
    rule(
        fields::SUBSCRIPTION_TIER,
        &["subscription_tier"],
        FieldDefault::Text("Free"),
    ),
    rule(
        fields::SUBSCRIPTION_STATUS,
        &["subscription_status"],
        FieldDefault::Text("Unknown"),
    ),
    rule(fields::TOTAL_USERS, &["total_users"], FieldDefault::Count(0)),
    rule(
        fields::TOTAL_CONVERSATIONS,
        &["total_conversations", "conversation_count"],
        FieldDefault::Count(0),
    ),
    rule(
        fields::RECENT_CONVERSATIONS,
        &["recent_conversations"],
        FieldDefault::Count(0),
    ),
    rule(fields::CREATED_AT, &["created_at"], FieldDefault::Timestamp),
];

/// Organizations as listed by the directory and stats endpoints.
pub const ORGANIZATION_SCHEMA: EntitySchema = EntitySchema {
    name: "organization",
    rules: ORGANIZATION_RULES,
    bare_string_field: None,
};

const USAGE_SUMMARY_RULES: &[FieldRule] = &[
    rule(fields::ID, &["_id", "id"], FieldDefault::Identifier),
    rule(
        fields::NAME,
        &["name", "organization_name"],
        FieldDefault::Text("Unknown"),
    ),
    rule(
        fields::SUBSCRIPTION_TIER,
        &["subscription_tier"],
        FieldDefault::Text("Free"),
    ),
    rule(
        fields::SUBSCRIPTION_STATUS,
        &["subscription_status"],
        FieldDefault::Text("Unknown"),
    ),
    rule(fields::TOTAL_USERS, &["total_users"], FieldDefault::Count(0)),
    rule(
        fields::TOTAL_CONVERSATIONS,
        &["conversation_count", "total_conversations"],
        FieldDefault::Count(0),
    ),
    rule(
        fields::RECENT_CONVERSATIONS,
        &["recent_conversations"],
        FieldDefault::Count(0),
    ),
    rule(fields::CREATED_AT, &["created_at"], FieldDefault::Timestamp),
];

/// Organizations embedded in a usage-analytics summary. That payload is produced by a
/// different backend query which names its primary key `_id` and its counter
/// `conversation_count`, and may list organizations by bare name.
pub const USAGE_SUMMARY_SCHEMA: EntitySchema = EntitySchema {
    name: "usage_summary_organization",
    rules: USAGE_SUMMARY_RULES,
    bare_string_field: Some(fields::NAME),
};

const LEAD_RULES: &[FieldRule] = &[
    rule(fields::ID, &["lead_id"], FieldDefault::Identifier),
    rule(fields::NAME, &["name"], FieldDefault::Text(NOT_AVAILABLE)),
    rule(fields::EMAIL, &["email"], FieldDefault::Text(NOT_AVAILABLE)),
    rule(fields::PHONE, &["phone"], FieldDefault::Text(NO_PHONE)),
    rule(fields::INQUIRY, &["inquiry"], FieldDefault::Text(NOT_AVAILABLE)),
    rule(fields::SOURCE, &["source"], FieldDefault::Text("chatbot")),
    rule(fields::STATUS, &["status"], FieldDefault::Text("new")),
    rule(fields::TIMESTAMP, &["timestamp"], FieldDefault::Timestamp),
];

pub const LEAD_SCHEMA: EntitySchema = EntitySchema {
    name: "lead",
    rules: LEAD_RULES,
    bare_string_field: None,
};
