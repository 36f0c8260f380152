use serde::{Deserialize, Serialize};

/// A note extracted from assistant output and offered for saving to the notebook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelPacket {
    pub title: String,
    pub content: String,
}

impl IntelPacket {
    pub fn new<S: Into<String>, T: Into<String>>(title: S, content: T) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A proposed navigation to a member or bill page, awaiting user confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionTrigger {
    Member {
        name: String,
        id: String,
    },
    Bill {
        name: String,
        id: String,
        congress: String,
        #[serde(rename = "billType")]
        bill_type: String,
        #[serde(rename = "billNumber")]
        bill_number: String,
    },
}

impl ActionTrigger {
    pub fn member<S: Into<String>, T: Into<String>>(name: S, id: T) -> Self {
        ActionTrigger::Member {
            name: name.into(),
            id: id.into(),
        }
    }

    /// Build a bill trigger from the raw directive fields, normalising the bill type
    pub fn bill(congress: &str, raw_type: &str, bill_number: &str) -> Self {
        let bill_type = normalize_bill_type(raw_type);
        let bill_number = bill_number.trim().to_string();
        ActionTrigger::Bill {
            name: format!("{} {}", raw_type.trim().to_uppercase(), bill_number),
            id: bill_id(congress, &bill_type, &bill_number),
            congress: congress.to_string(),
            bill_type,
            bill_number,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ActionTrigger::Member { name, .. } | ActionTrigger::Bill { name, .. } => name,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ActionTrigger::Member { id, .. } | ActionTrigger::Bill { id, .. } => id,
        }
    }

    /// Backend path of the dashboard this trigger navigates to
    pub fn dashboard_path(&self) -> String {
        match self {
            ActionTrigger::Member { id, .. } => format!("/member/{}", id),
            ActionTrigger::Bill {
                congress,
                bill_type,
                bill_number,
                ..
            } => format!("/bill/{}/{}/{}", congress, bill_type, bill_number),
        }
    }
}

/// A `[TRACK_BILL: ...]` directive. The backend records the bill when the
/// stream finishes; the client only needs to know the tracked list changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedBillDirective {
    pub congress: u32,
    pub bill_type: String,
    pub bill_number: String,
    pub title: String,
}

impl TrackedBillDirective {
    pub fn bill_id(&self) -> String {
        bill_id(&self.congress.to_string(), &self.bill_type, &self.bill_number)
    }
}

/// Strip everything but letters and lower-case, so `H.R.` becomes `hr`
pub fn normalize_bill_type(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_lowercase()
}

/// Identifier the backend uses for tracked bills, e.g. `118-hr-1234`
pub fn bill_id(congress: &str, bill_type: &str, bill_number: &str) -> String {
    format!(
        "{}-{}-{}",
        congress.trim(),
        bill_type.trim(),
        bill_number.trim()
    )
    .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_bill_type() {
        assert_eq!(normalize_bill_type("H.R."), "hr");
        assert_eq!(normalize_bill_type(" S "), "s");
        assert_eq!(normalize_bill_type("HJRES"), "hjres");
    }

    #[test]
    fn test_bill_trigger_fields() {
        let trigger = ActionTrigger::bill("118", "HR", "1234");
        assert_eq!(
            trigger,
            ActionTrigger::Bill {
                name: "HR 1234".to_string(),
                id: "118-hr-1234".to_string(),
                congress: "118".to_string(),
                bill_type: "hr".to_string(),
                bill_number: "1234".to_string(),
            }
        );
        assert_eq!(trigger.dashboard_path(), "/bill/118/hr/1234");
    }

    #[test]
    fn test_trigger_serialization() {
        let trigger = ActionTrigger::member("Sherrod Brown", "B000944");
        assert_eq!(
            serde_json::to_value(&trigger).unwrap(),
            json!({"kind": "member", "name": "Sherrod Brown", "id": "B000944"})
        );

        let bill = serde_json::to_value(ActionTrigger::bill("117", "S", "25")).unwrap();
        assert_eq!(bill["billType"], json!("s"));
        assert_eq!(bill["billNumber"], json!("25"));
    }

    #[test]
    fn test_tracked_bill_id() {
        let directive = TrackedBillDirective {
            congress: 118,
            bill_type: "HR".to_string(),
            bill_number: "815".to_string(),
            title: "National Security Act".to_string(),
        };
        assert_eq!(directive.bill_id(), "118-hr-815");
    }
}
