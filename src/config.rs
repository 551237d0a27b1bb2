use anyhow::Context;

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_DATABASE_URL: &str = "sqlite://chat.db?mode=rwc";
const DEFAULT_MAX_TOKENS: u64 = 500;
const DEFAULT_PORT: u16 = 8080;

/// Runtime settings, read once at startup from the environment
/// (a `.env` file is loaded first if present).
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_model: String,
    pub database_url: String,
    pub max_tokens: u64,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable is not set")?;

        let openai_model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let max_tokens = std::env::var("MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self { openai_api_key, openai_model, database_url, max_tokens, port })
    }
}
