//! JWT token verifier
//!
//! Verifies bearer tokens issued by the identity provider and returns the
//! subject as the external identity. Expiry is reported separately so the
//! guard can log it as such.

use crate::config::JwtConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use auth_guard::{ExternalIdentity, TokenError, TokenVerifier};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims the gateway reads from an identity token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub email: Option<String>,
}

pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn from_config(config: &JwtConfig) -> Result<Self> {
        let algorithm: Algorithm = config
            .algorithm
            .parse()
            .with_context(|| format!("Unsupported JWT algorithm: {}", config.algorithm))?;

        let decoding_key = match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                let secret = config
                    .signing_key
                    .as_deref()
                    .ok_or_else(|| anyhow!("JWT_SECRET required for {:?}", algorithm))?;
                DecodingKey::from_secret(secret.as_bytes())
            }
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(Self::public_key(config)?.as_bytes())
                .context("Invalid RSA public key")?,
            Algorithm::ES256 | Algorithm::ES384 => {
                DecodingKey::from_ec_pem(Self::public_key(config)?.as_bytes())
                    .context("Invalid EC public key")?
            }
            Algorithm::EdDSA => DecodingKey::from_ed_pem(Self::public_key(config)?.as_bytes())
                .context("Invalid Ed25519 public key")?,
        };

        let mut validation = Validation::new(algorithm);
        let mut required = vec!["exp"];
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        if config.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&config.audience);
            required.push("aud");
        }
        validation.set_required_spec_claims(&required);

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// HS256 verifier without issuer or audience checks
    pub fn hs256(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn public_key(config: &JwtConfig) -> Result<&str> {
        config
            .validation_key
            .as_deref()
            .ok_or_else(|| anyhow!("JWT_VALIDATION_KEY required for {}", config.algorithm))
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify_token(&self, raw_token: &str) -> Result<ExternalIdentity, TokenError> {
        let token_data = decode::<Claims>(raw_token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        Ok(ExternalIdentity {
            id: token_data.claims.sub,
            email: token_data.claims.email,
        })
    }
}
