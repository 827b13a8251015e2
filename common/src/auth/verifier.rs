// common/src/auth/verifier.rs
//! Login widget assertion verification.
//!
//! The widget signs its fields with HMAC-SHA-256, keyed by the raw SHA-256
//! digest of the bot token, over the `name=value` pairs sorted by name and
//! joined with `\n`. Any deviation here breaks every login.

use std::collections::BTreeMap;
use std::fmt;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::BotToken;
use crate::utils::unix_now;

type HmacSha256 = Hmac<Sha256>;

/// Maximum assertion age in seconds (24 hours)
pub const MAX_AUTH_AGE_SECS: i64 = 86400;
/// Tolerated clock drift for assertions dated slightly in the future
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

const REQUIRED_FIELDS: [&str; 3] = ["id", "hash", "auth_date"];

/// Field set asserted by the login widget. Ordered by field name, which is
/// byte-wise for `String` keys.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct IdentityAssertion {
    fields: BTreeMap<String, String>,
}

impl IdentityAssertion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get("id")
    }

    pub fn username(&self) -> Option<&str> {
        self.get("username")
    }

    pub fn first_name(&self) -> Option<&str> {
        self.get("first_name")
    }

    /// Build from a JSON object. Scalars are rendered as strings, anything
    /// else is dropped since the widget never signs it.
    pub fn from_json(map: BTreeMap<String, serde_json::Value>) -> Self {
        let fields = map
            .into_iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((name, value))
            })
            .collect();
        Self { fields }
    }

    /// Overlay `other` onto this assertion; its fields win on conflict
    pub fn merge(&mut self, other: IdentityAssertion) {
        self.fields.extend(other.fields);
    }

    /// Canonical check string over every field except `hash`
    pub fn check_string(&self) -> String {
        self.fields
            .iter()
            .filter(|(name, _)| name.as_str() != "hash")
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IdentityAssertion {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// Only the user id is safe to print; the rest is personal data plus the hash.
impl fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAssertion")
            .field("id", &self.user_id())
            .field("fields", &self.fields.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyReason {
    Ok,
    MissingFields,
    BadSecret,
    HashMismatch,
    Expired,
}

impl VerifyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyReason::Ok => "ok",
            VerifyReason::MissingFields => "missing_fields",
            VerifyReason::BadSecret => "bad_secret",
            VerifyReason::HashMismatch => "hash_mismatch",
            VerifyReason::Expired => "expired",
        }
    }

    /// User-facing explanation
    pub fn message(&self) -> &'static str {
        match self {
            VerifyReason::Ok => "Successfully authenticated with Telegram",
            VerifyReason::MissingFields => "Authentication data is incomplete",
            VerifyReason::BadSecret => "Authentication is not configured on this server",
            VerifyReason::HashMismatch => "Invalid Telegram authentication data",
            VerifyReason::Expired => "Authentication data has expired, please log in again",
        }
    }
}

impl fmt::Display for VerifyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub valid: bool,
    pub reason: VerifyReason,
}

impl Verdict {
    fn ok() -> Self {
        Self { valid: true, reason: VerifyReason::Ok }
    }

    fn fail(reason: VerifyReason) -> Self {
        Self { valid: false, reason }
    }
}

/// Verifies login widget assertions against the bot token
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    token: BotToken,
}

impl SignatureVerifier {
    pub fn new(token: BotToken) -> Self {
        Self { token }
    }

    /// Verify against the wall clock
    pub fn verify(&self, assertion: &IdentityAssertion) -> Verdict {
        self.verify_at(assertion, unix_now())
    }

    /// Verify with an explicit "now" in UNIX seconds
    pub fn verify_at(&self, assertion: &IdentityAssertion, now: i64) -> Verdict {
        if self.token.is_empty() {
            tracing::error!("Login verification attempted without a configured bot token");
            return Verdict::fail(VerifyReason::BadSecret);
        }

        if REQUIRED_FIELDS.iter().any(|f| assertion.get(f).is_none()) {
            return Verdict::fail(VerifyReason::MissingFields);
        }

        let mut fields = assertion.clone();
        let received = fields.remove("hash").unwrap_or_default();

        // Only the exact lowercase rendering `sign` produces is accepted
        if !is_lowercase_digest(&received) {
            return Verdict::fail(VerifyReason::HashMismatch);
        }
        let received_bytes = match hex::decode(&received) {
            Ok(bytes) => bytes,
            Err(_) => return Verdict::fail(VerifyReason::HashMismatch),
        };

        let mut mac = self.mac();
        mac.update(fields.check_string().as_bytes());
        // verify_slice compares in constant time
        if mac.verify_slice(&received_bytes).is_err() {
            return Verdict::fail(VerifyReason::HashMismatch);
        }

        let auth_date = match fields.get("auth_date").and_then(|v| v.trim().parse::<i64>().ok()) {
            Some(ts) => ts,
            None => return Verdict::fail(VerifyReason::Expired),
        };

        let age = match now.checked_sub(auth_date) {
            Some(age) => age,
            None => return Verdict::fail(VerifyReason::Expired),
        };
        if age > MAX_AUTH_AGE_SECS || age < -MAX_CLOCK_SKEW_SECS {
            return Verdict::fail(VerifyReason::Expired);
        }

        Verdict::ok()
    }

    /// Lowercase hex HMAC of the assertion's check string. This is what a
    /// correctly signing widget puts in `hash`.
    pub fn sign(&self, assertion: &IdentityAssertion) -> String {
        let mut mac = self.mac();
        mac.update(assertion.check_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn mac(&self) -> HmacSha256 {
        let key = Sha256::digest(self.token.expose().as_bytes());
        HmacSha256::new_from_slice(&key).expect("HMAC accepts any key length")
    }
}

fn is_lowercase_digest(hash: &str) -> bool {
    hash.len() == 2 * <Sha256 as Digest>::output_size()
        && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
