use std::time::Duration;

use clap::Parser;

use crate::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};

/// Local HTTP relay that forwards chat prompts to Gemini.
#[derive(Debug, Parser)]
#[command(name = "atchat-relay", version)]
pub struct RelayArgs {
    /// Interface to bind
    #[arg(long, env = "ATCHAT_RELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Route that accepts `{"prompt": ...}`
    #[arg(long, default_value = "/gemini")]
    pub path: String,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Seconds to wait for the upstream reply
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl RelayArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The key, if one was given and is not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Load `.env` from the current directory if there is one.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment variables from: {}", path.display()),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to load .env file: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RelayArgs {
        RelayArgs::try_parse_from(std::iter::once("atchat-relay").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn explicit_flags() {
        let args = parse(&["--port", "4000", "--path", "/chat", "--api-key", "k"]);
        assert_eq!(args.port, 4000);
        assert_eq!(args.path, "/chat");
        assert_eq!(args.api_key(), Some("k"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let args = parse(&["--api-key", "  "]);
        assert_eq!(args.api_key(), None);
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let args = parse(&["--host", "0.0.0.0", "--port", "8080"]);
        assert_eq!(args.bind_addr(), "0.0.0.0:8080");
    }
}
