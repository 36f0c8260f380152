use anyhow::{Context, Result};
use cosint::client::ApiClient;
use cosint::models::intel::ActionTrigger;
use cosint::models::records::{BillDashboard, MemberDashboard};
use serde_json::Value;

use crate::prompt::cliclack::print_markdown;

const RECENT_ACTIONS: usize = 5;

pub async fn handle_member(client: &ApiClient, bioguide_id: &str) -> Result<()> {
    let dashboard = client.member_dashboard(bioguide_id).await?;
    print_markdown(&member_markdown(bioguide_id, &dashboard), "zenburn");
    Ok(())
}

pub async fn handle_bill(
    client: &ApiClient,
    congress: u32,
    bill_type: &str,
    bill_number: &str,
) -> Result<()> {
    let dashboard = client
        .bill_dashboard(congress, bill_type, bill_number)
        .await?;
    print_markdown(&bill_markdown(&dashboard), "zenburn");
    Ok(())
}

/// Fetch the dashboard a navigation trigger points at, rendered as markdown
pub async fn render_trigger(client: &ApiClient, trigger: &ActionTrigger) -> Result<String> {
    match trigger {
        ActionTrigger::Member { id, .. } => {
            let dashboard = client.member_dashboard(id).await?;
            Ok(member_markdown(id, &dashboard))
        }
        ActionTrigger::Bill {
            congress,
            bill_type,
            bill_number,
            ..
        } => {
            let congress: u32 = congress
                .parse()
                .with_context(|| format!("invalid congress number {}", congress))?;
            let dashboard = client
                .bill_dashboard(congress, bill_type, bill_number)
                .await?;
            Ok(bill_markdown(&dashboard))
        }
    }
}

fn text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn entries(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}

pub fn member_markdown(bioguide_id: &str, dashboard: &MemberDashboard) -> String {
    let details = &dashboard.details;
    let name = text(details, "directOrderName")
        .or_else(|| text(details, "name"))
        .unwrap_or(bioguide_id);

    let mut out = format!("# {}\n\n", name);
    let party = details
        .get("partyHistory")
        .and_then(|history| entries(history).last())
        .and_then(|latest| text(latest, "partyName"));
    let mut facts = Vec::new();
    if let Some(party) = party {
        facts.push(party.to_string());
    }
    if let Some(state) = text(details, "state") {
        facts.push(state.to_string());
    }
    if let Some(district) = details.get("district").and_then(Value::as_i64) {
        facts.push(format!("District {}", district));
    }
    if !facts.is_empty() {
        out.push_str(&format!("{}\n\n", facts.join(" | ")));
    }

    let bills = entries(&dashboard.bills);
    if !bills.is_empty() {
        out.push_str("## Sponsored legislation\n\n");
        for bill in bills {
            let number = match (text(bill, "type"), text(bill, "number")) {
                (Some(kind), Some(number)) => format!("{} {}", kind, number),
                _ => "Amendment".to_string(),
            };
            let title = text(bill, "title").unwrap_or("Untitled");
            out.push_str(&format!("- **{}** {}\n", number, title));
        }
        out.push('\n');
    }

    if !dashboard.votes.is_empty() {
        out.push_str("## Recent votes\n\n");
        for vote in &dashboard.votes {
            let bill = match (&vote.bill_type, &vote.number) {
                (Some(kind), Some(number)) => format!("{} {}", kind, number),
                _ => vote.legislation.clone(),
            };
            out.push_str(&format!(
                "- **{}** on {}: {}",
                vote.vote, bill, vote.legislation_title
            ));
            if let Some(result) = &vote.result {
                out.push_str(&format!(" ({})", result));
            }
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

pub fn bill_markdown(dashboard: &BillDashboard) -> String {
    let details = &dashboard.details;
    let heading = match (text(details, "type"), text(details, "number")) {
        (Some(kind), Some(number)) => format!("{} {}", kind, number),
        _ => "Bill".to_string(),
    };
    let mut out = format!("# {}\n\n", heading);
    if let Some(title) = text(details, "title") {
        out.push_str(&format!("**{}**\n\n", title));
    }
    if let Some(sponsor) = details
        .get("sponsors")
        .and_then(|sponsors| entries(sponsors).first())
        .and_then(|sponsor| text(sponsor, "fullName"))
    {
        out.push_str(&format!("Sponsor: {}\n\n", sponsor));
    }
    if let Some(latest) = details.get("latestAction") {
        if let (Some(date), Some(action)) = (text(latest, "actionDate"), text(latest, "text")) {
            out.push_str(&format!("Latest action ({}): {}\n\n", date, action));
        }
    }

    if let Some(summary) = &dashboard.ai_summary {
        out.push_str("## Analysis\n\n");
        out.push_str(summary.trim());
        out.push_str("\n\n");
    }

    let actions = entries(&dashboard.actions);
    if !actions.is_empty() {
        out.push_str("## Actions\n\n");
        for action in actions.iter().take(RECENT_ACTIONS) {
            out.push_str(&format!(
                "- {} {}\n",
                text(action, "actionDate").unwrap_or("----------"),
                text(action, "text").unwrap_or_default()
            ));
        }
        out.push('\n');
    }

    let cosponsors = entries(&dashboard.cosponsors).len();
    if cosponsors > 0 {
        out.push_str(&format!("{} cosponsors\n", cosponsors));
    }
    out.trim_end().to_string()
}
