use duckdb::types::Value;
use duckflow_core::{
    ConfigError, DbError, Session, SessionConfig, DEFAULT_HOSTED_DATABASE, IN_MEMORY_TARGET,
    TOKEN_ENV_VAR,
};

#[test]
fn upload_table_on_local_session_is_config_error_without_sql() {
    let mut session = Session::new(SessionConfig::in_memory());
    session.start().unwrap();
    session
        .execute("CREATE TABLE sales AS SELECT 'Tools' AS category")
        .unwrap();

    let err = session.upload_table("sales", "sales_data").unwrap_err();
    assert!(matches!(
        err,
        DbError::Config(ConfigError::HostedModeRequired {
            operation: "upload_table"
        })
    ));

    let result = session
        .execute(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sales_data'",
        )
        .unwrap();
    assert_eq!(result.first_value(), Some(&Value::BigInt(0)));
}

#[test]
fn upload_table_checks_mode_before_session_state() {
    let session = Session::new(SessionConfig::in_memory());
    let err = session.upload_table("sales", "sales_data").unwrap_err();
    assert!(err.is_config());
}

#[test]
fn hosted_config_without_credential_fails_before_connecting() {
    let err = SessionConfig::with_lookup(IN_MEMORY_TARGET, true, |_| None).unwrap_err();
    assert_eq!(err, ConfigError::MissingCredential { var: TOKEN_ENV_VAR });
}

#[test]
fn session_from_env_without_token_is_config_error() {
    std::env::remove_var(TOKEN_ENV_VAR);

    let err = match Session::from_env(IN_MEMORY_TARGET, true) {
        Ok(_) => panic!("hosted session must require a token"),
        Err(err) => err,
    };
    assert!(err.is_config());
    assert!(err.to_string().contains(TOKEN_ENV_VAR));
}

#[test]
fn hosted_session_reports_mode_and_default_database() {
    let config = SessionConfig::with_lookup(IN_MEMORY_TARGET, true, |_| {
        Some("test-token".to_string())
    })
    .unwrap();
    let session = Session::new(config);

    assert!(session.uses_hosted_mode());
    assert!(!session.is_open());
    assert_eq!(session.config().display_target(), DEFAULT_HOSTED_DATABASE);
}

#[test]
fn local_from_env_ignores_credential() {
    let session = Session::from_env(IN_MEMORY_TARGET, false).unwrap();
    assert!(!session.uses_hosted_mode());
    assert_eq!(session.config().display_target(), IN_MEMORY_TARGET);
}
