use anyhow::Result;
use console::style;
use cosint::auth::{KeyRetrievalStrategy, KeyringCredentials, ACCESS_TOKEN_KEY};
use cosint::client::ApiClient;

pub fn handle_login(strategy: KeyRetrievalStrategy, token: Option<String>) -> Result<()> {
    cliclack::intro(style(" cosint auth ").on_cyan().black())?;
    let credentials = KeyringCredentials::system(strategy)?;

    if credentials.resolve()?.is_some()
        && !cliclack::confirm("A token is already available. Would you like to replace it?")
            .interact()?
    {
        cliclack::outro("Keeping the existing token")?;
        return Ok(());
    }

    let token = match token {
        Some(token) => token,
        None => cliclack::password("Paste your access token")
            .mask('▪')
            .interact()?,
    };
    if token.trim().is_empty() {
        cliclack::outro_cancel("No token given")?;
        return Ok(());
    }

    credentials.save(&token)?;
    cliclack::outro("Token saved to the system keyring")?;
    Ok(())
}

pub fn handle_logout(strategy: KeyRetrievalStrategy) -> Result<()> {
    KeyringCredentials::system(strategy)?.clear()?;
    println!("Signed out. {} is not touched if set.", ACCESS_TOKEN_KEY);
    Ok(())
}

pub async fn handle_status(client: &ApiClient) -> Result<()> {
    if client.has_session().await? {
        println!("{} {}", style("Signed in").green(), client.host());
    } else {
        println!(
            "{} Run `cosint auth login` or set {}",
            style("No session.").yellow(),
            ACCESS_TOKEN_KEY
        );
    }
    Ok(())
}
