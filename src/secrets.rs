use keyring::{Entry, Error as KeyringError};
use std::env;

const KEYRING_SERVICE: &str = "io.tempo-sync";

pub const JIRA_TOKEN_ENV: &str = "TEMPO_SYNC_JIRA_TOKEN";
pub const TEMPO_TOKEN_ENV: &str = "TEMPO_SYNC_TEMPO_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Jira,
    Tempo,
}

impl TokenKind {
    fn keyring_account(&self) -> &'static str {
        match self {
            TokenKind::Jira => "jira-api-token",
            TokenKind::Tempo => "tempo-token",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            TokenKind::Jira => JIRA_TOKEN_ENV,
            TokenKind::Tempo => TEMPO_TOKEN_ENV,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TokenKind::Jira => "Jira API token",
            TokenKind::Tempo => "Tempo token",
        }
    }
}

/// API tokens come from the environment first, then from the OS keyring.
#[derive(Clone)]
pub struct SecretsManager {
    keyring_service: String,
}

impl SecretsManager {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            keyring_service: service.into(),
        }
    }

    pub fn token(&self, kind: TokenKind) -> Result<Option<String>, String> {
        if let Some(token) = clean_token(env::var(kind.env_var()).ok().as_deref()) {
            return Ok(Some(token));
        }

        let entry = self.entry(kind)?;
        match entry.get_password() {
            Ok(secret) => Ok(clean_token(Some(&secret))),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(err) => Err(format!("Failed to read {} from keyring: {err}", kind.label())),
        }
    }

    /// Like [`token`](Self::token) but treats a missing token as an error.
    pub fn require_token(&self, kind: TokenKind) -> Result<String, String> {
        self.token(kind)?.ok_or_else(|| {
            format!(
                "{} is not set; export {} or store it with `tempo-sync token`",
                kind.label(),
                kind.env_var()
            )
        })
    }

    pub fn save_token(&self, kind: TokenKind, token: &str) -> Result<(), String> {
        let token = clean_token(Some(token))
            .ok_or_else(|| format!("{} must not be empty", kind.label()))?;
        self.entry(kind)?
            .set_password(&token)
            .map_err(|err| format!("Failed to store {} in keyring: {err}", kind.label()))
    }

    pub fn clear(&self) -> Result<(), String> {
        for kind in [TokenKind::Jira, TokenKind::Tempo] {
            match self.entry(kind)?.delete_credential() {
                Ok(()) | Err(KeyringError::NoEntry) => {}
                Err(err) => {
                    return Err(format!("Failed to delete {} from keyring: {err}", kind.label()))
                }
            }
        }
        Ok(())
    }

    fn entry(&self, kind: TokenKind) -> Result<Entry, String> {
        Entry::new(&self.keyring_service, kind.keyring_account())
            .map_err(|err| format!("Failed to open keyring entry: {err}"))
    }
}

impl Default for SecretsManager {
    fn default() -> Self {
        Self::new()
    }
}

fn clean_token(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_treated_as_missing() {
        assert_eq!(clean_token(None), None);
        assert_eq!(clean_token(Some("   ")), None);
        assert_eq!(clean_token(Some(" abc \n")).as_deref(), Some("abc"));
    }

    #[test]
    fn token_kinds_map_to_distinct_sources() {
        assert_ne!(TokenKind::Jira.env_var(), TokenKind::Tempo.env_var());
        assert_ne!(
            TokenKind::Jira.keyring_account(),
            TokenKind::Tempo.keyring_account()
        );
    }

    #[test]
    fn saving_empty_token_is_rejected_before_touching_keyring() {
        let secrets = SecretsManager::with_service("tempo-sync-tests");
        let err = secrets.save_token(TokenKind::Tempo, "  ").unwrap_err();
        assert!(err.contains("must not be empty"));
    }
}
