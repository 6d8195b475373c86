//! Environment-driven configuration, one struct per subsystem, each with an
//! `from_env()` constructor, following `caliber-api/src/auth.rs`'s `AuthConfig`
//! pattern (type-safe secret wrapper, `validate_for_production` gate).

use secrecy::{ExposeSecret, SecretString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEnv {
    Development,
    Production,
    Test,
}

impl NodeEnv {
    fn from_env() -> Self {
        match std::env::var("NODE_ENV").ok().as_deref() {
            Some("production") => NodeEnv::Production,
            Some("test") => NodeEnv::Test,
            _ => NodeEnv::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == NodeEnv::Production
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub node_env: NodeEnv,
    pub port: u16,
    pub cors_origin: String,
    pub log_level: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            node_env: NodeEnv::from_env(),
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3000),
            cors_origin: std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

/// Wraps the upstream API key so it never prints via `{:?}`.
#[derive(Clone)]
pub struct UpstreamApiKey(SecretString);

impl UpstreamApiKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for UpstreamApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UpstreamApiKey([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_key: UpstreamApiKey,
    pub default_model: String,
    pub max_tokens: i32,
    pub base_url: String,
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: UpstreamApiKey(SecretString::new(
                std::env::var("UPSTREAM_API_KEY").unwrap_or_default(),
            )),
            default_model: std::env::var("UPSTREAM_DEFAULT_MODEL")
                .unwrap_or_else(|_| dynamo_core::catalog::MODEL_SONNET.to_string()),
            max_tokens: std::env::var("UPSTREAM_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4096),
            base_url: std::env::var("UPSTREAM_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetEnforcement {
    None,
    Soft,
    Hard,
}

impl BudgetEnforcement {
    fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "hard" => BudgetEnforcement::Hard,
            "none" => BudgetEnforcement::None,
            _ => BudgetEnforcement::Soft,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetConfig {
    pub enforcement: BudgetEnforcement,
}

impl BudgetConfig {
    pub fn from_env() -> Self {
        Self {
            enforcement: std::env::var("TOKEN_BUDGET_ENFORCEMENT")
                .map(|v| BudgetEnforcement::from_str(&v))
                .unwrap_or(BudgetEnforcement::Soft),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub topic_arn: Option<String>,
}

impl AlertConfig {
    pub fn from_env() -> Self {
        Self { topic_arn: std::env::var("ALERT_TOPIC_ARN").ok() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Mock,
    Token,
}

/// JWT secret, redacted on `Debug`.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

const INSECURE_DEFAULT: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

impl JwtSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub jwt_secret: JwtSecret,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let mode = match std::env::var("AUTH_MODE").ok().as_deref() {
            Some("mock") => AuthMode::Mock,
            _ => AuthMode::Token,
        };
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| INSECURE_DEFAULT.to_string());
        Self { mode, jwt_secret: JwtSecret(SecretString::new(secret)) }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub database_url: Option<String>,
    pub budget: BudgetConfig,
    pub alert: AlertConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            upstream: UpstreamConfig::from_env(),
            database_url: std::env::var("DATABASE_URL").ok(),
            budget: BudgetConfig::from_env(),
            alert: AlertConfig::from_env(),
            auth: AuthConfig::from_env(),
        }
    }

    /// Refuses to start in production with an insecure default JWT secret, a
    /// missing upstream API key, or mock auth mode. In non-production these
    /// conditions only log a warning.
    pub fn validate_for_production(&self) -> Result<(), String> {
        let is_production = self.server.node_env.is_production();

        if self.auth.jwt_secret.is_insecure_default() {
            if is_production {
                return Err("refusing to start in production with the default JWT_SECRET".to_string());
            }
            tracing::warn!("using insecure default JWT_SECRET - do not deploy like this");
        } else if self.auth.jwt_secret.len() < 32 {
            if is_production {
                return Err(format!(
                    "JWT_SECRET is too short for production ({} chars, need >= 32)",
                    self.auth.jwt_secret.len()
                ));
            }
            tracing::warn!(len = self.auth.jwt_secret.len(), "JWT_SECRET is shorter than recommended");
        }

        if self.upstream.api_key.is_empty() {
            if is_production {
                return Err("UPSTREAM_API_KEY is required in production".to_string());
            }
            tracing::warn!("UPSTREAM_API_KEY is unset - upstream calls will fail");
        }

        if self.auth.mode == AuthMode::Mock && is_production {
            return Err("refusing to start in production with AUTH_MODE=mock".to_string());
        }

        Ok(())
    }
}
