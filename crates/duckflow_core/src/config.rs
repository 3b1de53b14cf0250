//! Session configuration resolution.
//!
//! # Responsibility
//! - Resolve the effective connection target for local and hosted modes.
//! - Load the hosted-service credential from the process environment.
//! - Validate identifiers that are interpolated into SQL text.
//!
//! # Invariants
//! - Hosted configs always carry a non-empty token.
//! - Hosted configs never target the in-memory sentinel.

use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Environment variable holding the MotherDuck access token.
pub const TOKEN_ENV_VAR: &str = "MOTHERDUCK_TOKEN";
/// Local target for a transient in-memory database.
pub const IN_MEMORY_TARGET: &str = ":memory:";
/// Database selected in hosted mode when no explicit name is given.
pub const DEFAULT_HOSTED_DATABASE: &str = "demo_db";

const MAX_TABLE_NAME_PARTS: usize = 3;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Configuration failures. Always fatal, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Hosted mode was requested but the credential variable is unset or blank.
    MissingCredential { var: &'static str },
    /// A hosted-only operation was invoked on a local session.
    HostedModeRequired { operation: &'static str },
    /// A table or database name is not a plain SQL identifier.
    InvalidIdentifier { kind: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential { var } => {
                write!(f, "{var} environment variable not set")
            }
            Self::HostedModeRequired { operation } => {
                write!(f, "`{operation}` requires a hosted (MotherDuck) session")
            }
            Self::InvalidIdentifier { kind, value } => {
                write!(f, "invalid {kind} name `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Where a session connects to.
#[derive(Debug)]
pub enum Target {
    /// Local database file, or the in-memory sentinel.
    Local(String),
    /// Named MotherDuck database reached with an access token.
    Hosted {
        database: String,
        token: SecretString,
    },
}

/// Resolved, validated session configuration.
#[derive(Debug)]
pub struct SessionConfig {
    target: Target,
}

impl SessionConfig {
    /// Resolves a configuration, reading the token from the process environment.
    ///
    /// # Errors
    /// - `MissingCredential` when `hosted` is set and `MOTHERDUCK_TOKEN` is absent.
    /// - `InvalidIdentifier` when a hosted database name is not an identifier.
    pub fn new(target: impl Into<String>, hosted: bool) -> Result<Self, ConfigError> {
        Self::with_lookup(target, hosted, |var| std::env::var(var).ok())
    }

    /// Local file or in-memory configuration. Never fails.
    pub fn local(target: impl Into<String>) -> Self {
        Self {
            target: Target::Local(target.into()),
        }
    }

    /// In-memory local configuration.
    pub fn in_memory() -> Self {
        Self::local(IN_MEMORY_TARGET)
    }

    /// Same as [`SessionConfig::new`] with a caller-supplied variable lookup.
    pub fn with_lookup<F>(
        target: impl Into<String>,
        hosted: bool,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let target = target.into();
        if !hosted {
            return Ok(Self::local(target));
        }

        let token = lookup(TOKEN_ENV_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingCredential { var: TOKEN_ENV_VAR })?;

        let database = hosted_database_name(&target);
        validate_identifier("database", &database)?;

        Ok(Self {
            target: Target::Hosted {
                database,
                token: SecretString::from(token),
            },
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn is_hosted(&self) -> bool {
        matches!(self.target, Target::Hosted { .. })
    }

    /// Local path or hosted database name, safe for logging.
    pub fn display_target(&self) -> &str {
        match &self.target {
            Target::Local(path) => path,
            Target::Hosted { database, .. } => database,
        }
    }
}

/// Builds the MotherDuck connection string without a selected database.
pub(crate) fn hosted_url(token: &SecretString) -> String {
    format!("md:?motherduck_token={}", token.expose_secret())
}

fn hosted_database_name(target: &str) -> String {
    let trimmed = target.trim();
    if trimmed.is_empty() || trimmed == IN_MEMORY_TARGET {
        DEFAULT_HOSTED_DATABASE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rejects anything that is not a bare `[A-Za-z_][A-Za-z0-9_]*` identifier.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), ConfigError> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Accepts `table`, `schema.table` or `catalog.schema.table`, each part a
/// bare identifier.
pub fn validate_table_name(value: &str) -> Result<(), ConfigError> {
    let parts = value.split('.').collect::<Vec<_>>();
    if parts.len() <= MAX_TABLE_NAME_PARTS && parts.iter().all(|part| IDENTIFIER_RE.is_match(part))
    {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind: "table",
            value: value.to_string(),
        })
    }
}

/// Quotes a value as a SQL string literal.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_lookup(value: Option<&str>) -> impl FnOnce(&str) -> Option<String> {
        let value = value.map(str::to_string);
        move |var: &str| {
            assert_eq!(var, TOKEN_ENV_VAR);
            value
        }
    }

    #[test]
    fn local_config_keeps_target_verbatim() {
        let config = SessionConfig::with_lookup("data/sales.duckdb", false, |_| {
            panic!("local mode must not read the credential")
        })
        .unwrap();
        assert!(!config.is_hosted());
        assert_eq!(config.display_target(), "data/sales.duckdb");
    }

    #[test]
    fn hosted_without_token_is_rejected() {
        let err = SessionConfig::with_lookup(IN_MEMORY_TARGET, true, token_lookup(None))
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential { var: TOKEN_ENV_VAR });
        assert!(err.to_string().contains(TOKEN_ENV_VAR));
    }

    #[test]
    fn hosted_with_blank_token_is_rejected() {
        let err = SessionConfig::with_lookup("", true, token_lookup(Some("   "))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }

    #[test]
    fn hosted_replaces_memory_sentinel_with_default_database() {
        let config =
            SessionConfig::with_lookup(IN_MEMORY_TARGET, true, token_lookup(Some("tok"))).unwrap();
        assert!(config.is_hosted());
        assert_eq!(config.display_target(), DEFAULT_HOSTED_DATABASE);
    }

    #[test]
    fn hosted_uses_explicit_database_name() {
        let config =
            SessionConfig::with_lookup("analytics", true, token_lookup(Some("tok"))).unwrap();
        assert_eq!(config.display_target(), "analytics");
    }

    #[test]
    fn hosted_rejects_non_identifier_database() {
        let err = SessionConfig::with_lookup("my-db; DROP", true, token_lookup(Some("tok")))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidIdentifier {
                kind: "database",
                ..
            }
        ));
    }

    #[test]
    fn debug_output_redacts_token() {
        let config =
            SessionConfig::with_lookup("", true, token_lookup(Some("super-secret"))).unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn hosted_url_embeds_token() {
        let token = SecretString::from("abc".to_string());
        assert_eq!(hosted_url(&token), "md:?motherduck_token=abc");
    }

    #[test]
    fn quote_literal_escapes_single_quotes() {
        assert_eq!(quote_literal("it's.csv"), "'it''s.csv'");
    }

    #[test]
    fn validate_identifier_accepts_plain_names_only() {
        assert!(validate_identifier("table", "sales_data").is_ok());
        assert!(validate_identifier("table", "_t1").is_ok());
        assert!(validate_identifier("table", "1sales").is_err());
        assert!(validate_identifier("table", "sales data").is_err());
        assert!(validate_identifier("table", "").is_err());
        assert!(validate_identifier("database", "main.sales").is_err());
    }

    #[test]
    fn validate_table_name_accepts_qualified_names() {
        assert!(validate_table_name("sales").is_ok());
        assert!(validate_table_name("main.sales").is_ok());
        assert!(validate_table_name("local_db.main.sales").is_ok());
        assert!(validate_table_name("a.b.c.d").is_err());
        assert!(validate_table_name("main.").is_err());
        assert!(validate_table_name(".sales").is_err());
        assert!(validate_table_name("main.sales; DROP").is_err());
        assert!(validate_table_name("").is_err());
    }
}
