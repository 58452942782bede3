//! Configuration management for BCT Core

use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Keycloak admin API configuration
    pub keycloak: KeycloakConfig,
    /// Bearer token verification
    pub jwt: JwtConfig,
    /// Role names used for authorization decisions
    pub authorization: AuthorizationConfig,
    /// Browser origins allowed to call the API
    pub cors: CorsConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// How the service authenticates against the Keycloak admin API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeycloakAdminAuth {
    /// Service account of a confidential client in the managed realm
    ClientCredentials { client_secret: String },
    /// Admin user in the `master` realm (password grant)
    Password { username: String, password: String },
}

#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    /// Internal URL for server-to-server communication (e.g., http://keycloak:8080)
    pub url: String,
    /// Public URL as seen in token `iss` claims
    pub public_url: String,
    pub realm: String,
    pub admin_client_id: String,
    pub admin_auth: KeycloakAdminAuth,
    pub timeout_secs: u64,
}

impl KeycloakConfig {
    /// Realm used to obtain admin tokens
    pub fn token_realm(&self) -> &str {
        match self.admin_auth {
            KeycloakAdminAuth::ClientCredentials { .. } => &self.realm,
            KeycloakAdminAuth::Password { .. } => "master",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    /// Expected `aud`; audience is not checked when absent
    pub audience: Option<String>,
    pub jwks_url: String,
    /// Static RSA public key, used instead of the JWKS endpoint when set
    pub public_key_pem: Option<String>,
    pub leeway_secs: u64,
    /// Minimum delay between two JWKS refetches triggered by unknown key ids
    pub jwks_min_refresh_secs: u64,
    pub jwks_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AuthorizationConfig {
    /// Role required on every `/api/admin` route
    pub admin_role: String,
    /// Only realm roles carrying this prefix are application roles
    pub role_prefix: String,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            admin_role: "ROLE_ADMIN".to_string(),
            role_prefix: "ROLE_".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:4200".to_string()],
            max_age_secs: 3600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" for structured logs, anything else for human-readable output
    pub log_format: String,
    pub metrics_enabled: bool,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            service_name: "bct-core".to_string(),
        }
    }
}

/// Resolve the admin credential from the three optional inputs.
///
/// A client secret wins over a username; with neither the configuration is rejected.
pub fn resolve_admin_auth(
    client_secret: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<KeycloakAdminAuth> {
    if let Some(client_secret) = client_secret.filter(|s| !s.is_empty()) {
        return Ok(KeycloakAdminAuth::ClientCredentials { client_secret });
    }

    if let Some(username) = username.filter(|s| !s.is_empty()) {
        return Ok(KeycloakAdminAuth::Password {
            username,
            password: password.unwrap_or_default(),
        });
    }

    bail!(
        "Keycloak admin credentials missing: set KEYCLOAK_ADMIN_CLIENT_SECRET \
         or KEYCLOAK_ADMIN_USERNAME/KEYCLOAK_ADMIN_PASSWORD"
    )
}

/// Parse a numeric setting, using `default` when the variable is unset
fn parse_number<T>(name: &str, raw: Option<String>, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.as_deref()
        .unwrap_or(default)
        .trim()
        .parse()
        .with_context(|| format!("Invalid {}", name))
}

fn env_number<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_number(name, env::var(name).ok(), default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let keycloak = {
            let url =
                env::var("KEYCLOAK_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
            let public_url = env::var("KEYCLOAK_PUBLIC_URL").unwrap_or_else(|_| url.clone());

            KeycloakConfig {
                url,
                public_url,
                realm: env::var("KEYCLOAK_REALM").unwrap_or_else(|_| "bct".to_string()),
                admin_client_id: env::var("KEYCLOAK_ADMIN_CLIENT_ID")
                    .unwrap_or_else(|_| "admin-cli".to_string()),
                admin_auth: resolve_admin_auth(
                    env::var("KEYCLOAK_ADMIN_CLIENT_SECRET").ok(),
                    env::var("KEYCLOAK_ADMIN_USERNAME").ok(),
                    env::var("KEYCLOAK_ADMIN_PASSWORD").ok(),
                )?,
                timeout_secs: env_number("KEYCLOAK_TIMEOUT_SECS", "30")?,
            }
        };

        let jwt = JwtConfig {
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| {
                format!("{}/realms/{}", keycloak.public_url, keycloak.realm)
            }),
            audience: env::var("JWT_AUDIENCE").ok().filter(|s| !s.is_empty()),
            jwks_url: env::var("JWT_JWKS_URL").unwrap_or_else(|_| {
                format!(
                    "{}/realms/{}/protocol/openid-connect/certs",
                    keycloak.url, keycloak.realm
                )
            }),
            public_key_pem: env::var("JWT_PUBLIC_KEY")
                .ok()
                .map(|value| value.replace("\\n", "\n")),
            leeway_secs: env_number("JWT_LEEWAY_SECS", "30")?,
            jwks_min_refresh_secs: env_number("JWT_JWKS_MIN_REFRESH_SECS", "30")?,
            jwks_timeout_secs: keycloak.timeout_secs,
        };

        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env_number("HTTP_PORT", "8082")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env_number("DATABASE_MAX_CONNECTIONS", "10")?,
                min_connections: env_number("DATABASE_MIN_CONNECTIONS", "2")?,
            },
            keycloak,
            jwt,
            authorization: AuthorizationConfig {
                admin_role: env::var("ADMIN_ROLE").unwrap_or_else(|_| "ROLE_ADMIN".to_string()),
                role_prefix: env::var("ROLE_PREFIX").unwrap_or_else(|_| "ROLE_".to_string()),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .map(|s| parse_origins(&s))
                    .unwrap_or_else(|_| CorsConfig::default().allowed_origins),
                max_age_secs: env_number("CORS_MAX_AGE_SECS", "3600")?,
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
                service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "bct-core".to_string()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
