use std::env;

use crate::payments::StripeConfig;
use crate::video::MuxConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Public base URL for checkout success/cancel redirects.
    pub base_url: String,
    pub stripe: StripeConfig,
    pub mux: Option<MuxConfig>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("ONECOURSE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        // Secrets are optional at startup. A missing secret fails the request
        // that needs it with a ConfigurationError, not the whole server.
        let stripe = StripeConfig {
            secret_key: env::var("STRIPE_SECRET_KEY").ok(),
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),
        };

        let mux = match (env::var("MUX_TOKEN_ID"), env::var("MUX_TOKEN_SECRET")) {
            (Ok(token_id), Ok(token_secret)) => Some(MuxConfig {
                token_id,
                token_secret,
            }),
            _ => None,
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "onecourse.db".to_string()),
            base_url,
            stripe,
            mux,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
