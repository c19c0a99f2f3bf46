use crate::shared::time::current_time_millis;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const KEY_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const KEY_CACHE_CAPACITY: usize = 100;
const MAX_KEY_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed ticket")]
    Malformed,
    #[error("ticket claims are not valid json")]
    BadClaims(#[from] serde_json::Error),
    #[error("key url is not trusted")]
    UntrustedKeyUrl,
    #[error("audience is not allowed")]
    AudienceNotAllowed,
    #[error("ticket timestamp is outside the accepted window")]
    StaleTimestamp,
    #[error("ticket signature does not match")]
    BadSignature,
    #[error("signing key rejected")]
    BadKey,
    #[error("signing key fetch failed")]
    KeyFetch(#[from] reqwest::Error),
    #[error("signing key response too large")]
    KeyTooLarge,
}

/// Claims carried inside a platform ticket. The signature covers the
/// base64 payload, keyed by whatever the platform publishes at `key_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketClaims {
    pub player_ref: String,
    pub audience: String,
    pub key_url: String,
    pub issued_at_ms: i64,
}

struct CachedKey {
    key: Vec<u8>,
    expires_at: Instant,
}

/// Verifies `payload_b64.signature_b64` platform tickets. Signing keys are
/// fetched over https from the ticket's own key url, which is why the url
/// must match a configured trusted prefix before anything is fetched.
pub struct TicketVerifier {
    trusted_key_prefixes: Vec<String>,
    allowed_audiences: Vec<String>,
    timestamp_tolerance: Duration,
    http: reqwest::Client,
    static_keys: StdMutex<HashMap<String, Vec<u8>>>,
    cache: StdMutex<HashMap<String, CachedKey>>,
}

impl TicketVerifier {
    pub fn new(
        trusted_key_prefixes: Vec<String>,
        allowed_audiences: Vec<String>,
        timestamp_tolerance: Duration,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(KEY_FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            trusted_key_prefixes,
            allowed_audiences,
            timestamp_tolerance,
            http,
            static_keys: StdMutex::new(HashMap::new()),
            cache: StdMutex::new(HashMap::new()),
        })
    }

    /// Seeds a signing key that never expires and is never fetched. Used
    /// for development setups and tests.
    pub fn insert_key(&self, url: &str, key: Vec<u8>) {
        self.static_keys.lock().unwrap().insert(url.to_string(), key);
    }

    pub async fn verify(&self, ticket: &str) -> Result<TicketClaims, AuthError> {
        let (payload_b64, signature_b64) =
            ticket.split_once('.').ok_or(AuthError::Malformed)?;
        if payload_b64.is_empty() || signature_b64.is_empty() || signature_b64.contains('.') {
            return Err(AuthError::Malformed);
        }
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::Malformed)?;
        let claims: TicketClaims = serde_json::from_slice(&payload)?;

        if !self
            .trusted_key_prefixes
            .iter()
            .any(|prefix| claims.key_url.starts_with(prefix.as_str()))
        {
            return Err(AuthError::UntrustedKeyUrl);
        }
        if !self.allowed_audiences.iter().any(|a| *a == claims.audience) {
            return Err(AuthError::AudienceNotAllowed);
        }
        // Tolerance zero disables the freshness check entirely.
        if !self.timestamp_tolerance.is_zero() {
            let skew = (current_time_millis() - claims.issued_at_ms).unsigned_abs();
            if skew > self.timestamp_tolerance.as_millis() as u64 {
                return Err(AuthError::StaleTimestamp);
            }
        }

        let key = self.signing_key(&claims.key_url).await?;
        let mut mac =
            HmacSha256::new_from_slice(&key).map_err(|_| AuthError::BadKey)?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        Ok(claims)
    }

    async fn signing_key(&self, url: &str) -> Result<Vec<u8>, AuthError> {
        if let Some(key) = self.static_keys.lock().unwrap().get(url).cloned() {
            return Ok(key);
        }
        if let Some(key) = self.cached_key(url) {
            return Ok(key);
        }

        tracing::debug!(%url, "fetching ticket signing key");
        let mut response = self.http.get(url).send().await?.error_for_status()?;
        let mut key = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if key.len() + chunk.len() > MAX_KEY_BYTES {
                return Err(AuthError::KeyTooLarge);
            }
            key.extend_from_slice(&chunk);
        }

        let mut cache = self.cache.lock().unwrap();
        if cache.len() >= KEY_CACHE_CAPACITY {
            let now = Instant::now();
            cache.retain(|_, cached| cached.expires_at > now);
        }
        if cache.len() >= KEY_CACHE_CAPACITY {
            if let Some(evicted) = cache.keys().next().cloned() {
                cache.remove(&evicted);
            }
        }
        cache.insert(
            url.to_string(),
            CachedKey {
                key: key.clone(),
                expires_at: Instant::now() + KEY_CACHE_TTL,
            },
        );
        Ok(key)
    }

    fn cached_key(&self, url: &str) -> Option<Vec<u8>> {
        let cache = self.cache.lock().unwrap();
        let cached = cache.get(url)?;
        if cached.expires_at > Instant::now() {
            Some(cached.key.clone())
        } else {
            None
        }
    }
}

/// Produces a ticket the verifier accepts. The platform does this on its
/// side; here it backs development tooling and tests.
#[allow(dead_code)]
pub fn sign_ticket(claims: &TicketClaims, key: &[u8]) -> Result<String, AuthError> {
    let payload = serde_json::to_vec(claims)?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload);

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| AuthError::BadKey)?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{payload_b64}.{signature_b64}"))
}
