use anyhow::{bail, Result};
use console::style;
use cosint::client::ApiClient;
use cosint::models::records::{NoteDraft, RecordUpdate};

use crate::prompt::cliclack::print_markdown;

pub async fn handle_list(client: &ApiClient, bioguide_id: &str) -> Result<()> {
    let notes = client.list_member_notes(bioguide_id).await?;
    if notes.is_empty() {
        println!("No notes for {}.", bioguide_id);
        return Ok(());
    }
    for note in notes {
        println!("{}  {}", style(&note.id).dim(), style(&note.title).bold());
        print_markdown(&note.content, "zenburn");
        println!();
    }
    Ok(())
}

pub async fn handle_add(
    client: &ApiClient,
    bioguide_id: &str,
    title: Option<String>,
    content: Option<String>,
) -> Result<()> {
    let title = match title {
        Some(title) => title,
        None => cliclack::input("Title").interact()?,
    };
    let content = match content {
        Some(content) => content,
        None => cliclack::input("Content").multiline().interact()?,
    };
    let note = client
        .create_member_note(bioguide_id, &NoteDraft { title, content })
        .await?;
    println!("Saved note {}", note.id);
    Ok(())
}

pub async fn handle_edit(
    client: &ApiClient,
    note_id: &str,
    title: Option<String>,
    content: Option<String>,
) -> Result<()> {
    if title.is_none() && content.is_none() {
        bail!("Give --title, --content or both");
    }
    let note = client
        .update_note(note_id, &RecordUpdate { title, content })
        .await?;
    println!("Updated note {} ({})", note.id, note.title);
    Ok(())
}

pub async fn handle_delete(client: &ApiClient, note_id: &str) -> Result<()> {
    client.delete_note(note_id).await?;
    println!("Deleted note {}", note_id);
    Ok(())
}
