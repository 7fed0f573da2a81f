//! Google sign-in provider.
//!
//! Desktop rendition of the delegated flow: PKCE authorization-code exchange
//! against Google's OAuth endpoints, collecting the code on a localhost
//! callback with a manual-paste fallback, then fetching the userinfo
//! profile. Tokens are used once to read the profile and are not stored.

use std::io::{self, BufRead, Read, Write};
use std::net::TcpListener;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::provider::{IdentityProvider, ProviderConfig, ProviderSignIn, ProviderUser};

/// Google OAuth URLs
const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Path of the localhost callback.
const CALLBACK_PATH: &str = "/oauth2callback";

/// How long to wait for the user to finish the browser flow before the
/// attempt settles as cancelled.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// PKCE code verifier and challenge
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

/// Generate PKCE code verifier and challenge
pub fn generate_pkce() -> Pkce {
    // Use two UUIDs (16 bytes each) to get 32 random bytes
    let uuid1 = uuid::Uuid::new_v4();
    let uuid2 = uuid::Uuid::new_v4();
    let mut verifier_bytes = [0u8; 32];
    verifier_bytes[..16].copy_from_slice(uuid1.as_bytes());
    verifier_bytes[16..].copy_from_slice(uuid2.as_bytes());
    let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

    Pkce {
        verifier,
        challenge,
    }
}

/// Binds the callback listener on an ephemeral port and returns it with the
/// assigned port, so the redirect URI can never collide with a busy port.
fn bind_callback_listener() -> Result<(TcpListener, u16)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .context("Failed to bind the OAuth callback listener")?;
    let port = listener
        .local_addr()
        .context("Failed to read the OAuth callback address")?
        .port();
    let _ = listener.set_nonblocking(true);
    Ok((listener, port))
}

/// Builds the redirect URI for a given localhost port.
pub fn build_redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}{CALLBACK_PATH}")
}

/// Build the authorization URL for Google OAuth
pub fn build_auth_url(
    config: &ProviderConfig,
    client_id: &str,
    pkce: &Pkce,
    state: &str,
    redirect_uri: &str,
) -> String {
    let scope = config.scope_param();
    let params = [
        ("response_type", "code"),
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("scope", &scope),
        ("code_challenge", &pkce.challenge),
        ("code_challenge_method", "S256"),
        ("state", state),
    ];

    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    format!("{AUTHORIZE_URL}?{query}")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

/// Exchanges the authorization code for an access token (PKCE installed-app
/// flow, no client secret).
async fn exchange_code(
    client_id: &str,
    auth_code: &str,
    pkce: &Pkce,
    redirect_uri: &str,
) -> Result<String> {
    let client = reqwest::Client::new();
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "authorization_code")
        .append_pair("client_id", client_id)
        .append_pair("code", auth_code)
        .append_pair("code_verifier", &pkce.verifier)
        .append_pair("redirect_uri", redirect_uri)
        .finish();

    let response = client
        .post(TOKEN_URL)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
        .context("Failed to send token exchange request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Token exchange failed (HTTP {status}): {body}");
    }

    let token_data: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    Ok(token_data.access_token)
}

/// Fetches the minimal profile subset for the signed-in user.
async fn fetch_user(access_token: &str) -> Result<ProviderUser> {
    let client = reqwest::Client::new();
    let response = client
        .get(USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .await
        .context("Failed to send userinfo request")?;

    if !response.status().is_success() {
        anyhow::bail!("Userinfo request failed (HTTP {})", response.status());
    }

    let info: UserInfo = response
        .json()
        .await
        .context("Failed to parse userinfo response")?;

    Ok(ProviderUser {
        email: info.email,
        name: info.name,
        photo_url: info.picture,
    })
}

/// Waits for the browser redirect on the localhost callback and extracts
/// the authorization code, verifying the state nonce. `None` means the
/// redirect never arrived (timeout or abandoned browser flow).
fn wait_for_code(listener: TcpListener, state: &str) -> Option<String> {
    let (tx, rx) = std::sync::mpsc::channel::<Option<String>>();
    let state = state.to_string();

    std::thread::spawn(move || {
        let start = std::time::Instant::now();
        loop {
            match listener.accept() {
                Ok((mut stream, _)) => {
                    let mut buffer = [0u8; 2048];
                    let _ = stream.read(&mut buffer);
                    let request = String::from_utf8_lossy(&buffer);
                    let code = extract_code_from_request(&request, &state);
                    let response = match code.is_some() {
                        true => callback_success_response(),
                        false => callback_error_response(),
                    };
                    let _ = stream.write_all(response.as_bytes());
                    let _ = tx.send(code);
                    break;
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > CALLBACK_TIMEOUT {
                        let _ = tx.send(None);
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(_) => {
                    let _ = tx.send(None);
                    break;
                }
            }
        }
    });

    rx.recv_timeout(CALLBACK_TIMEOUT).ok().flatten()
}

fn extract_code_from_request(request: &str, expected_state: &str) -> Option<String> {
    let mut lines = request.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    let path = parts.next()?;

    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())?;
    if state != expected_state {
        return None;
    }
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
}

/// Parses manually pasted authorization input: a full redirect URL, a
/// `code#state` pair, a raw query string, or a bare code.
pub fn parse_authorization_input(input: &str) -> (Option<String>, Option<String>) {
    let value = input.trim();
    if value.is_empty() {
        return (None, None);
    }

    if let Ok(url) = url::Url::parse(value) {
        let code = url.query_pairs().find(|(k, _)| k == "code").map(|(_, v)| v);
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v);
        return (code.map(|v| v.to_string()), state.map(|v| v.to_string()));
    }

    if let Some((code, state)) = value.split_once('#') {
        return (Some(code.to_string()), Some(state.to_string()));
    }

    if value.contains("code=") {
        let params = url::form_urlencoded::parse(value.as_bytes()).collect::<Vec<_>>();
        let code = params.iter().find(|(k, _)| k == "code").map(|(_, v)| v);
        let state = params.iter().find(|(k, _)| k == "state").map(|(_, v)| v);
        return (
            code.map(std::string::ToString::to_string),
            state.map(std::string::ToString::to_string),
        );
    }

    (Some(value.to_string()), None)
}

/// Prompts for manually pasted authorization input when the localhost
/// redirect never arrived. Empty input means the user gave up.
fn prompt_for_code(expected_state: &str) -> Result<Option<String>> {
    print!("Paste authorization code (or full redirect URL): ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;

    let (code, provided_state) = parse_authorization_input(&input);
    if let Some(provided) = provided_state
        && provided != expected_state
    {
        anyhow::bail!("State mismatch");
    }
    Ok(code)
}

fn callback_success_response() -> String {
    let body = "<!doctype html><html><head><meta charset=\"utf-8\" /><title>Sign-in successful</title></head><body><p>Sign-in successful. Return to your terminal to continue.</p></body></html>";
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

fn callback_error_response() -> String {
    let body = "Invalid OAuth callback";
    format!(
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

/// The real Google provider: prints the authorization URL, opens the
/// browser, and drives the PKCE flow, falling back to a pasted code when
/// the localhost redirect never arrives.
#[derive(Debug, Default)]
pub struct GoogleProvider;

impl GoogleProvider {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityProvider for GoogleProvider {
    async fn log_in(&self, config: &ProviderConfig) -> Result<ProviderSignIn> {
        let client_id = config
            .client_id()
            .context("No Google client id configured")?
            .to_string();

        let pkce = generate_pkce();
        let state = uuid::Uuid::new_v4().to_string();
        let (listener, port) = bind_callback_listener()?;
        let redirect_uri = build_redirect_uri(port);
        let auth_url = build_auth_url(config, &client_id, &pkce, &state, &redirect_uri);

        println!("To sign in with Google:");
        println!();
        println!("  1. A browser window will open (or visit the URL below)");
        println!("  2. Log in with your Google account and authorize access");
        println!("  3. If redirected to localhost, return here to continue");
        println!("  4. Otherwise, paste the authorization code or URL");
        println!();
        println!("Authorization URL:");
        println!("  {auth_url}");
        println!();

        if std::env::var("NATURECRIB_NO_BROWSER").is_err() {
            let _ = open::that(&auth_url);
        }
        tracing::info!(url = %auth_url, "waiting for Google sign-in callback");

        let code = match wait_for_code(listener, &state) {
            Some(code) => code,
            None => match prompt_for_code(&state)? {
                Some(code) => code,
                None => return Ok(ProviderSignIn::Cancelled),
            },
        };

        let access_token = exchange_code(&client_id, &code, &pkce, &redirect_uri).await?;
        let user = fetch_user(&access_token).await?;

        Ok(ProviderSignIn::Success { user })
    }
}
