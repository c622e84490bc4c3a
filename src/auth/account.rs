//! `login`, `logout` and `status` commands

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use super::login::{build_http_client, login as open_session};
use super::source::{HttpTokenSource, TokenSource};
use crate::config::{parse_server_url, Config};

/// Verify the login key against the server and store it.
///
/// The key is checked end to end: the session login must succeed and the
/// token endpoint must issue a token for it.
pub async fn login(server: Option<&str>, key: Option<String>, force: bool) -> Result<()> {
    let mut config = Config::load()?;

    if !force && server.is_none() && key.is_none() && config.login_key.is_some() {
        println!("Already logged in. Use --force to replace the stored key.");
        return Ok(());
    }

    let base = match server {
        Some(raw) => parse_server_url(raw)?,
        None => config.server(None)?,
    };
    let key = match key {
        Some(key) => key,
        None => prompt_key()?,
    };

    let http = build_http_client()?;
    open_session(&http, &base, &key)
        .await
        .with_context(|| format!("Login to {} failed", base))?;

    let grant = HttpTokenSource::new(http, &base)?
        .fetch()
        .await
        .context("Logged in, but the server did not issue an API token")?;
    tracing::debug!("Token issued, expires in {}s", grant.expires_in);

    config.server_url = Some(base.to_string());
    config.login_key = Some(key);
    config.save()?;

    println!("Logged in to {}", base);
    Ok(())
}

fn prompt_key() -> Result<String> {
    print!("Login key: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read login key")?;
    let key = line.trim().to_string();
    anyhow::ensure!(!key.is_empty(), "Login key is empty");
    Ok(key)
}

/// Forget the stored login key
pub async fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.clear_credentials();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Display stored login state (no network)
pub async fn status() -> Result<()> {
    let config = Config::load()?;

    match config.server_url.as_deref() {
        Some(url) => println!("Server:    {}", url),
        None => println!("Server:    none"),
    }
    match config.login_key {
        Some(_) => println!("Login key: stored"),
        None => println!("Login key: none"),
    }

    let session = &config.session;
    println!("Keep-alive:       {}s", session.keepalive_secs);
    println!("Expiry margin:    {}s", session.expiry_margin_secs);
    println!("Refresh on fetch: {}", session.refresh_on_dispatch);

    Ok(())
}
