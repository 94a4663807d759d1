use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static SCRUBBER: LazyLock<SecretScrubber> = LazyLock::new(SecretScrubber::new);

/// Scrub `message` with the shared scrubber.
///
/// For log output only. Errors returned to callers keep their text.
pub fn scrub_secrets(message: &str) -> String {
    SCRUBBER.scrub_message(message)
}

/// Redacts credentials from free-form text such as error messages from a
/// credential provider or an object store.
#[derive(Clone)]
pub struct SecretScrubber {
    access_key_pattern: Regex,
    key_value_pattern: Regex,
    bearer_pattern: Regex,
    sas_pattern: Regex,
}

impl SecretScrubber {
    pub fn new() -> Self {
        Self {
            // AWS access key ids: long-term (AKIA) and temporary (ASIA)
            access_key_pattern: Regex::new(r"\b(?:AKIA|ASIA)[A-Z0-9]{16}\b")
                .expect("access key pattern is valid"),
            // key=value or "key": "value" where the key names a secret
            key_value_pattern: Regex::new(
                r#"(?i)(["']?[a-z0-9_]*(?:secret|token|password|access_key|account_key|private_key|client_secret|sas_key)[a-z0-9_]*["']?\s*[:=]\s*)["']?[^"'\s,}&]+["']?"#,
            )
            .expect("key/value pattern is valid"),
            bearer_pattern: Regex::new(r"Bearer\s+[a-zA-Z0-9\-_\.=]+")
                .expect("bearer pattern is valid"),
            // Azure SAS signature query parameter
            sas_pattern: Regex::new(r"([?&]sig=)[^&\s]+").expect("sas pattern is valid"),
        }
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        let scrubbed = self
            .access_key_pattern
            .replace_all(message, "[ACCESS_KEY_REDACTED]");
        let scrubbed = self
            .bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        let scrubbed = self.sas_pattern.replace_all(&scrubbed, "${1}[REDACTED]");
        self.key_value_pattern
            .replace_all(&scrubbed, "${1}[REDACTED]")
            .into_owned()
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
