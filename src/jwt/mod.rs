//! Bearer token verification for tokens issued by the Keycloak realm

mod jwks;

pub use jwks::JwksFetcher;

use crate::config::JwtConfig;
use crate::error::{AppError, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// `realm_access` claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims read from a Keycloak access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeycloakClaims {
    /// Subject (Keycloak user ID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm_access: Option<RealmAccess>,
    pub iss: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl KeycloakClaims {
    /// Principal name: `preferred_username`, falling back to `sub`
    pub fn principal_name(&self) -> &str {
        self.preferred_username.as_deref().unwrap_or(&self.sub)
    }

    /// Granted authorities, taken verbatim from `realm_access.roles`
    pub fn authorities(&self) -> Vec<String> {
        self.realm_access
            .as_ref()
            .map(|access| access.roles.clone())
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct KeySet {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
}

/// Verifies RS256 access tokens against the realm's published keys
#[derive(Clone)]
pub struct JwtVerifier {
    config: JwtConfig,
    static_key: Option<DecodingKey>,
    jwks: JwksFetcher,
    keys: Arc<RwLock<KeySet>>,
}

impl JwtVerifier {
    pub fn new(config: JwtConfig) -> Result<Self> {
        let static_key = match config.public_key_pem.as_ref() {
            Some(pem) => Some(DecodingKey::from_rsa_pem(pem.as_bytes())?),
            None => None,
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.jwks_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create JWKS client: {}", e)))?;
        let jwks = JwksFetcher::new(client, config.jwks_url.clone());

        Ok(Self {
            config,
            static_key,
            jwks,
            keys: Arc::new(RwLock::new(KeySet::default())),
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.config.leeway_secs;
        validation.set_issuer(&[&self.config.issuer]);
        match &self.config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }

    /// Verify a token and return its claims
    pub async fn verify(&self, token: &str) -> Result<KeycloakClaims> {
        let key = match &self.static_key {
            Some(key) => key.clone(),
            None => {
                let header = decode_header(token)?;
                let kid = header
                    .kid
                    .ok_or_else(|| AppError::Unauthorized("Token has no key id".to_string()))?;
                self.key_for(&kid).await?
            }
        };

        let token_data = decode::<KeycloakClaims>(token, &key, &self.validation())?;
        debug!(sub = %token_data.claims.sub, "verified access token");
        Ok(token_data.claims)
    }

    /// Cached key for `kid`, refreshing the JWKS when the id is unknown
    async fn key_for(&self, kid: &str) -> Result<DecodingKey> {
        {
            let keys = self.keys.read().await;
            if let Some(key) = keys.keys.get(kid) {
                return Ok(key.clone());
            }
        }

        let mut keys = self.keys.write().await;
        if let Some(key) = keys.keys.get(kid) {
            return Ok(key.clone());
        }

        let min_interval = Duration::from_secs(self.config.jwks_min_refresh_secs);
        let may_refresh = keys
            .fetched_at
            .is_none_or(|fetched_at| fetched_at.elapsed() >= min_interval);

        if may_refresh {
            // Stamped before fetching so failed attempts are rate limited too
            keys.fetched_at = Some(Instant::now());
            let fetched = self.jwks.fetch().await?;
            info!(url = self.jwks.url(), count = fetched.len(), "refreshed JWKS");
            keys.keys = fetched.into_iter().collect();
        }

        keys.keys.get(kid).cloned().ok_or_else(|| {
            warn!(kid, "token signed with unknown key");
            AppError::Unauthorized(format!("Unknown signing key '{}'", kid))
        })
    }
}
