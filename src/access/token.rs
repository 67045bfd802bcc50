//! Signed unlock token (HS256 JWT) carrying the category and post grants.
//!
//! The token is self-contained: nothing is stored server-side, so validity is
//! decided entirely by the signature and the `exp` claim at decode time.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

use crate::store::{CategoryId, PostId};

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_ALG: &str = "HS256";

/// Lifetime of a freshly signed or extended token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signing key")]
    Key,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token used before issued")]
    IssuedInFuture,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: TOKEN_ALG.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Resources a token bearer has unlocked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
    pub category_ids: Vec<CategoryId>,
    pub post_ids: Vec<PostId>,
}

impl Grants {
    #[must_use]
    pub fn categories(ids: &[CategoryId]) -> Self {
        Self {
            category_ids: ids.to_vec(),
            post_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn posts(ids: &[PostId]) -> Self {
        Self {
            category_ids: Vec::new(),
            post_ids: ids.to_vec(),
        }
    }

    #[must_use]
    pub fn has_category(&self, id: CategoryId) -> bool {
        self.category_ids.contains(&id)
    }

    #[must_use]
    pub fn has_post(&self, id: PostId) -> bool {
        self.post_ids.contains(&id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.category_ids.is_empty() && self.post_ids.is_empty()
    }

    /// Union `other` into `self`, keeping first-seen order.
    pub fn merge(&mut self, other: Self) {
        for id in other.category_ids {
            if !self.category_ids.contains(&id) {
                self.category_ids.push(id);
            }
        }
        for id in other.post_ids {
            if !self.post_ids.contains(&id) {
                self.post_ids.push(id);
            }
        }
    }
}

/// JWT payload. Field names match tokens already issued by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    #[serde(default, deserialize_with = "nullable_ids")]
    pub category_ids: Vec<CategoryId>,
    #[serde(default, deserialize_with = "nullable_ids")]
    pub post_ids: Vec<PostId>,
    #[serde(default)]
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl TokenClaims {
    #[must_use]
    pub fn grants(&self) -> Grants {
        Grants {
            category_ids: self.category_ids.clone(),
            post_ids: self.post_ids.clone(),
        }
    }
}

// Older issuers serialize an empty id list as `null`.
fn nullable_ids<'de, D>(deserializer: D) -> Result<Vec<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<i32>>::deserialize(deserializer)?.unwrap_or_default())
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// Signs and verifies unlock tokens with the server-wide secret.
pub struct TokenCodec {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Returns `None` when the secret is empty: no token can be signed or
    /// trusted without one.
    #[must_use]
    pub fn new(secret: SecretString, ttl: Duration) -> Option<Self> {
        if secret.expose_secret().is_empty() {
            return None;
        }
        Some(Self { secret, ttl })
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::Key)
    }

    fn ttl_seconds(&self) -> i64 {
        i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)
    }

    /// Sign `grants` with `iat = now` and `exp = now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized.
    pub fn encode_at(&self, grants: &Grants, now: i64) -> Result<String, TokenError> {
        let claims = TokenClaims {
            category_ids: grants.category_ids.clone(),
            post_ids: grants.post_ids.clone(),
            exp: now.saturating_add(self.ttl_seconds()),
            iat: now,
        };
        self.sign(&claims)
    }

    /// Sign `grants` as of the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized.
    pub fn encode(&self, grants: &Grants) -> Result<String, TokenError> {
        self.encode_at(grants, unix_now())
    }

    /// Sign arbitrary claims as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify the token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the token is malformed or contains invalid base64/json,
    /// - the algorithm is not HS256 or the signature does not match,
    /// - `exp` is in the past or `iat` in the future.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != TOKEN_ALG {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: TokenClaims = b64d_json(claims_b64)?;
        if claims.exp < now {
            return Err(TokenError::Expired);
        }
        if claims.iat > now {
            return Err(TokenError::IssuedInFuture);
        }

        Ok(claims)
    }

    /// Grants carried by a valid token, `None` for anything else.
    #[must_use]
    pub fn decode_at(&self, token: &str, now: i64) -> Option<Grants> {
        if token.is_empty() {
            return None;
        }
        match self.verify_at(token, now) {
            Ok(claims) => Some(claims.grants()),
            Err(err) => {
                debug!("Ignoring unlock token: {err}");
                None
            }
        }
    }

    #[must_use]
    pub fn decode(&self, token: &str) -> Option<Grants> {
        self.decode_at(token, unix_now())
    }

    /// Add `grants` to the ones already carried by `token` and re-sign.
    ///
    /// The expiry slides to `now + ttl`. An absent, expired or forged token
    /// is replaced by a fresh one holding only `grants`.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized.
    pub fn extend_at(&self, token: &str, grants: Grants, now: i64) -> Result<String, TokenError> {
        let merged = match self.decode_at(token, now) {
            Some(mut existing) => {
                existing.merge(grants);
                existing
            }
            None => grants,
        };
        self.encode_at(&merged, now)
    }

    /// [`TokenCodec::extend_at`] as of the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized.
    pub fn extend(
        &self,
        token: &str,
        category_ids: &[CategoryId],
        post_ids: &[PostId],
    ) -> Result<String, TokenError> {
        let grants = Grants {
            category_ids: category_ids.to_vec(),
            post_ids: post_ids.to_vec(),
        };
        self.extend_at(token, grants, unix_now())
    }
}
