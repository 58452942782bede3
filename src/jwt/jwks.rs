//! JWKS retrieval for the realm signing keys

use crate::error::{AppError, Result};
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
}

impl JwksFetcher {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the RS256 signing keys published by the realm, keyed by `kid`.
    ///
    /// Encryption keys and other algorithms are skipped.
    pub async fn fetch(&self) -> Result<Vec<(String, DecodingKey)>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::Keycloak(format!("Failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Keycloak(format!(
                "Failed to fetch JWKS: HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let body: JwksResponse = response
            .json()
            .await
            .map_err(|e| AppError::Keycloak(format!("Failed to decode JWKS: {}", e)))?;

        let mut keys = Vec::new();
        for key in body.keys {
            if !key.is_rs256_signing_key() {
                debug!(kid = ?key.kid, kty = %key.kty, "skipping non-RS256 JWKS entry");
                continue;
            }

            let (Some(kid), Some(n), Some(e)) = (key.kid, key.n, key.e) else {
                continue;
            };

            let decoding_key = DecodingKey::from_rsa_components(&n, &e).map_err(|err| {
                AppError::Keycloak(format!("Invalid RSA components for key {}: {}", kid, err))
            })?;
            keys.push((kid, decoding_key));
        }

        Ok(keys)
    }
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    #[serde(default)]
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: String,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

impl JwkEntry {
    fn is_rs256_signing_key(&self) -> bool {
        self.kty == "RSA"
            && self.alg.as_deref().is_none_or(|alg| alg == "RS256")
            && self.key_use.as_deref().is_none_or(|u| u == "sig")
    }
}
