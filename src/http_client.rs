//! Builds the single [`reqwest::blocking::Client`] shared by every task.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::cli::Cli;
use crate::config::{PART_CONNECT_TIMEOUT, PART_READ_TIMEOUT};

/// Assembles the one client every worker thread will clone and reuse.
///
/// `reqwest::blocking::Client` is already `Arc`-backed internally, so cloning
/// it is cheap and shares the connection pool across threads.
pub fn build(cli: &Cli) -> Result<Client> {
    let user_agent = cli
        .user_agent
        .clone()
        .unwrap_or_else(|| concat!("cliant/", env!("CARGO_PKG_VERSION")).to_string());

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .connect_timeout(PART_CONNECT_TIMEOUT)
        .timeout(PART_READ_TIMEOUT)
        .redirect(Policy::limited(cli.max_redirect));

    if let (Some(user), Some(password)) = (&cli.user, &cli.password) {
        builder = builder.default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            let credentials = format!("{user}:{password}");
            let encoded = format!("Basic {}", basic_auth_encode(&credentials));
            let mut value = reqwest::header::HeaderValue::from_str(&encoded)
                .context("invalid characters in --user/--password")?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
            headers
        });
    }

    builder.build().context("failed to build HTTP client")
}

fn basic_auth_encode(credentials: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_matches_known_vector() {
        assert_eq!(basic_auth_encode("Aladdin:open sesame"), "QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }
}
