use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Record ids come back as UUID strings or integers depending on the table
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub bioguide_id: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
}

/// Reply of the member-conversation lookup; `id` is null when none exists yet
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationRef {
    #[serde(default, deserialize_with = "optional_id_string")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchNote {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub bioguide_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

/// Partial update shared by notes and tracked bills; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedBill {
    pub bill_id: String,
    pub bill_type: String,
    pub bill_number: String,
    pub congress: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl TrackedBill {
    pub fn new(congress: u32, bill_type: &str, bill_number: &str, title: &str) -> Self {
        let bill_type = super::intel::normalize_bill_type(bill_type);
        let bill_number = bill_number.trim().to_string();
        Self {
            bill_id: super::intel::bill_id(&congress.to_string(), &bill_type, &bill_number),
            bill_type,
            bill_number,
            congress,
            title: title.trim().to_string(),
            position: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Conversation,
    Bill,
}

/// One entry of the sidebar ordering, keyed by conversation id or bill id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryOrderItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RegistryKind,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub legislation: String,
    #[serde(rename = "legislationUrl", default)]
    pub legislation_url: Option<String>,
    #[serde(rename = "legislationTitle")]
    pub legislation_title: String,
    #[serde(default)]
    pub congress: Option<Value>,
    #[serde(rename = "type", default)]
    pub bill_type: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    pub vote: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDashboard {
    pub details: Value,
    #[serde(default)]
    pub bills: Value,
    #[serde(default)]
    pub votes: Vec<VoteRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDashboard {
    pub details: Value,
    #[serde(default)]
    pub actions: Value,
    #[serde(default)]
    pub cosponsors: Value,
    #[serde(default)]
    pub text: Value,
    #[serde(default)]
    pub ai_summary: Option<String>,
}
