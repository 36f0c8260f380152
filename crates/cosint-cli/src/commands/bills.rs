use anyhow::{anyhow, bail, Result};
use console::style;
use cosint::client::ApiClient;
use cosint::models::records::{RegistryKind, RegistryOrderItem, TrackedBill};

pub async fn handle_list(client: &ApiClient) -> Result<()> {
    let bills = client.list_tracked_bills().await?;
    if bills.is_empty() {
        println!("No tracked bills.");
    }
    for bill in bills {
        println!("{}  {}", style(&bill.bill_id).dim(), bill.title);
    }
    Ok(())
}

pub async fn handle_track(
    client: &ApiClient,
    congress: u32,
    bill_type: &str,
    bill_number: &str,
    title: &str,
) -> Result<()> {
    let bill = client
        .track_bill(&TrackedBill::new(congress, bill_type, bill_number, title))
        .await?;
    println!("Tracking {} ({})", bill.bill_id, bill.title);
    Ok(())
}

pub async fn handle_rename(client: &ApiClient, bill_id: &str, title: &str) -> Result<()> {
    let bill = client.rename_tracked_bill(bill_id, title).await?;
    println!("Renamed {} to {}", bill.bill_id, bill.title);
    Ok(())
}

pub async fn handle_untrack(client: &ApiClient, bill_id: &str) -> Result<()> {
    client.untrack_bill(bill_id).await?;
    println!("Stopped tracking {}", bill_id);
    Ok(())
}

pub async fn handle_reorder(client: &ApiClient, entries: &[String]) -> Result<()> {
    let items = parse_order(entries)?;
    client.update_order(&items).await?;
    println!("Saved order of {} items", items.len());
    Ok(())
}

/// Parse `conversation:<id>` and `bill:<id>` entries; position follows argument order
pub fn parse_order(entries: &[String]) -> Result<Vec<RegistryOrderItem>> {
    if entries.is_empty() {
        bail!("Nothing to order");
    }
    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let (kind, id) = entry
                .split_once(':')
                .ok_or_else(|| anyhow!("Expected <kind>:<id>, got {}", entry))?;
            let kind = match kind {
                "conversation" | "c" => RegistryKind::Conversation,
                "bill" | "b" => RegistryKind::Bill,
                other => bail!("Unknown entry kind {}", other),
            };
            if id.trim().is_empty() {
                bail!("Missing id in {}", entry);
            }
            Ok(RegistryOrderItem {
                id: id.trim().to_string(),
                kind,
                position: position as i64,
            })
        })
        .collect()
}
