use anyhow::Result;
use console::style;
use cosint::client::ApiClient;
use cosint::stream::clean_display;

use crate::prompt::cliclack::print_markdown;

pub async fn handle_list(client: &ApiClient) -> Result<()> {
    let conversations = client.list_conversations().await?;
    if conversations.is_empty() {
        println!("No conversations yet.");
    }
    for conversation in conversations {
        let member = conversation
            .bioguide_id
            .map(|id| format!(" [{}]", id))
            .unwrap_or_default();
        println!(
            "{}  {}{}",
            style(&conversation.id).dim(),
            conversation.title,
            member
        );
    }
    Ok(())
}

pub async fn handle_show(client: &ApiClient, conversation_id: &str) -> Result<()> {
    for message in client.conversation_messages(conversation_id).await? {
        if message.is_assistant() {
            print_markdown(&clean_display(&message.content), "zenburn");
            println!();
        } else {
            println!("{} {}", style(">").cyan(), message.content);
        }
    }
    Ok(())
}

pub async fn handle_new(client: &ApiClient) -> Result<()> {
    let conversation = client.create_conversation().await?;
    println!("Created {} ({})", conversation.id, conversation.title);
    Ok(())
}

pub async fn handle_rename(client: &ApiClient, conversation_id: &str, title: &str) -> Result<()> {
    let conversation = client.rename_conversation(conversation_id, title).await?;
    println!("Renamed {} to {}", conversation.id, conversation.title);
    Ok(())
}

pub async fn handle_delete(client: &ApiClient, conversation_id: &str, yes: bool) -> Result<()> {
    if !yes
        && !cliclack::confirm(format!("Delete conversation {}?", conversation_id))
            .initial_value(false)
            .interact()?
    {
        return Ok(());
    }
    client.delete_conversation(conversation_id).await?;
    println!("Deleted {}", conversation_id);
    Ok(())
}
