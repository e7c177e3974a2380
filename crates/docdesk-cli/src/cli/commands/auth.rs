//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use docdesk_core::api::ApiClient;
use docdesk_core::auth;
use docdesk_core::session::mask_token;

fn read_password() -> Result<String> {
    if io::stdin().is_terminal() {
        print!("Password: ");
        io::stdout().flush()?;
    }
    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("read password from stdin")?;
    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }
    Ok(password)
}

pub async fn login(client: &ApiClient, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };

    let user = auth::login(client, email, &password).await?;
    let role = client.session().role().unwrap_or_default();
    println!("Logged in as {} <{}> ({role})", user.full_name(), user.email);
    if let Some(token) = client.session().token() {
        println!("  Token: {}", mask_token(&token));
    }
    Ok(())
}

pub async fn logout(client: &ApiClient) -> Result<()> {
    if client.session().token().is_none() {
        println!("Not logged in.");
        return Ok(());
    }
    auth::logout(client).await?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(client: &ApiClient, remote: bool) -> Result<()> {
    if remote {
        let user = auth::current_user(client).await?;
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    let state = client.session().auth_state();
    let Some(user) = state.user.filter(|_| state.token.is_some()) else {
        println!("Not logged in.");
        return Ok(());
    };

    println!("{} <{}>", user.full_name(), user.email);
    if let Some(role) = state.role {
        println!("  Role: {role}");
    }
    if let Some(account) = state.account {
        println!("  Account: {}", account.id);
    }
    if let Some(department) = user.department_name() {
        println!("  Department: {department}");
    }
    Ok(())
}
