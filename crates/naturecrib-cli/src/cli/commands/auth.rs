//! Auth command handlers.
//!
//! The CLI is the presentation collaborator of the login flow: it triggers
//! submissions, renders the reported status, and transitions on success.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use naturecrib_core::auth::client::AuthClient;
use naturecrib_core::auth::credentials::Credentials;
use naturecrib_core::auth::flow::{LoginFlow, SuccessPolicy};
use naturecrib_core::auth::google::GoogleProvider;
use naturecrib_core::config::{Config, paths};
use naturecrib_core::session::{Session, SessionStore};

pub async fn login_password(email: Option<String>, password: Option<String>) -> Result<()> {
    let mut flow = open_flow().context("open login flow")?;

    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let credentials = Credentials::new(email, password);
    let session = flow.submit_password(&credentials).await;

    report(&flow, session.as_ref())
}

pub async fn login_google() -> Result<()> {
    let config = Config::load().context("load config")?;
    let provider_config = config.provider_config();
    let mut flow = flow_from(&config).context("open login flow")?;

    // The provider prints the authorization URL and paste instructions.
    let provider = GoogleProvider::new();
    let session = flow.submit_with_provider(&provider, &provider_config).await;

    report(&flow, session.as_ref())
}

pub fn logout() -> Result<()> {
    let mut store = SessionStore::open().context("open session store")?;
    let had_session = store.clear()?;

    if had_session {
        println!("✓ Logged out");
        println!("  Session removed from: {}", paths::session_path().display());
    } else {
        println!("Not logged in (no session found).");
    }

    Ok(())
}

pub fn whoami() -> Result<()> {
    let store = SessionStore::open().context("open session store")?;

    let Some(session) = store.current() else {
        println!("Not logged in.");
        return Ok(());
    };

    println!("Logged in.");
    for (key, value) in session.fields() {
        match value.as_str() {
            Some(text) => println!("  {key}: {text}"),
            None => println!("  {key}: {value}"),
        }
    }

    Ok(())
}

fn open_flow() -> Result<LoginFlow> {
    let config = Config::load().context("load config")?;
    flow_from(&config)
}

fn flow_from(config: &Config) -> Result<LoginFlow> {
    let client = AuthClient::new(config.signin_url.clone());
    let store = SessionStore::open()?;
    Ok(LoginFlow::new(client, store, SuccessPolicy::Persist))
}

/// Prints the settled status; failures become the process exit status.
fn report(flow: &LoginFlow, session: Option<&Session>) -> Result<()> {
    let status_text = flow
        .status()
        .current()
        .map(|status| status.text.clone())
        .unwrap_or_default();

    match session {
        Some(session) => {
            println!("✓ {status_text}");
            if let Some(email) = session.get("email").and_then(|v| v.as_str()) {
                println!("  Signed in as: {email}");
            }
            println!("  Session saved to: {}", paths::session_path().display());
            Ok(())
        }
        None => anyhow::bail!("{status_text}"),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
