// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Meetlr configuration system.

use meetlr_config::diagnostic::ConfigError;
use meetlr_config::model::{MeetlrConfig, ProviderMode};
use meetlr_config::{load_and_validate_str, load_config_from_path, load_config_from_str};
use serial_test::serial;

#[test]
fn valid_toml_deserializes_into_meetlr_config() {
    let toml = r#"
[service]
name = "meetlr-test"
log_level = "debug"

[storage]
database_path = "/tmp/meetlr-test.db"
wal_mode = false

[poller]
poll_interval_secs = 5
lease_ttl_secs = 120

[tasks]
max_retries = 5
backoff_base_secs = 10
backoff_cap_secs = 600
reminder_offset_minutes = 60

[booking]
reschedule_notice_hours = 48

[credits]
sms_cost = 2

[providers]
mode = "webhook"
webhook_base_url = "http://127.0.0.1:9000"

[providers.meeting_plugins]
zoom = "zoom-v2"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "meetlr-test");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/meetlr-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.poller.poll_interval_secs, 5);
    assert_eq!(config.poller.lease_ttl_secs, 120);
    assert_eq!(config.poller.expired_booking_every_polls, 20);
    assert_eq!(config.tasks.max_retries, 5);
    assert_eq!(config.tasks.reminder_offset(), chrono::Duration::hours(1));
    assert_eq!(config.booking.reschedule_notice_hours, 48);
    assert_eq!(config.credits.sms_cost, 2);
    assert_eq!(config.credits.email_cost, 1);
    assert_eq!(config.providers.mode, ProviderMode::Webhook);
    assert_eq!(
        config.providers.meeting_plugins.get("zoom").map(String::as_str),
        Some("zoom-v2")
    );
}

#[test]
fn defaults_match_documented_policy() {
    let config = MeetlrConfig::default();

    assert_eq!(config.poller.poll_interval_secs, 30);
    assert_eq!(config.poller.dispatch_every_polls, 1);
    assert_eq!(config.poller.expired_booking_every_polls, 20);
    assert_eq!(config.poller.one_time_code_every_polls, 720);
    assert_eq!(config.poller.payment_reconciliation_every_polls, 4);
    assert_eq!(config.poller.slot_expiry_every_polls, 10);
    assert_eq!(config.tasks.max_retries, 3);
    assert_eq!(config.tasks.reminder_offset(), chrono::Duration::hours(24));
    assert_eq!(config.booking.reschedule_notice_hours, 72);
    assert_eq!(config.booking.max_reschedules, 1);
    assert_eq!(config.booking.pending_payment_timeout_minutes, 60);
    assert_eq!(config.providers.mode, ProviderMode::Log);
    assert_eq!(config.providers.request_timeout_secs, 30);
    assert!(!config.prometheus.enabled);
    assert_eq!(config.prometheus.listen_addr, "127.0.0.1:9464");
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    assert_eq!(config.service.name, "meetlr");
    assert!(config.storage.wal_mode);
}

#[test]
fn unknown_field_in_section_is_rejected() {
    let err = load_config_from_str("[poller]\npoll_intervl_secs = 5\n")
        .expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("poll_intervl_secs"),
        "error should mention the bad key, got: {err_str}"
    );
}

#[test]
fn unknown_top_level_section_is_rejected() {
    assert!(load_config_from_str("[scheduler]\nenabled = true\n").is_err());
}

#[test]
fn diagnostic_suggests_correct_key() {
    let errors = load_and_validate_str("[tasks]\nmax_retires = 2\n").unwrap_err();
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => Some((key.clone(), suggestion.clone())),
            _ => None,
        })
        .expect("an unknown key diagnostic");
    assert_eq!(unknown.0, "max_retires");
    assert_eq!(unknown.1.as_deref(), Some("max_retries"));
}

#[test]
fn diagnostic_reports_invalid_type() {
    let errors = load_and_validate_str("[poller]\nlease_ttl_secs = \"ten\"\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "expected an invalid type diagnostic, got: {errors:?}"
    );
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "max_retires".to_string(),
        suggestion: Some("max_retries".to_string()),
        valid_keys: "max_retries, backoff_base_secs".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("max_retires"));
    assert!(buf.contains("did you mean `max_retries`"));
}

#[test]
fn validation_runs_after_successful_parse() {
    let errors = load_and_validate_str("[providers]\nmode = \"webhook\"\n").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

#[test]
#[serial]
fn env_var_overrides_underscored_key() {
    // SAFETY: serialized with other env-mutating tests.
    unsafe { std::env::set_var("MEETLR_POLLER_LEASE_TTL_SECS", "90") };
    unsafe { std::env::set_var("MEETLR_TASKS_MAX_RETRIES", "7") };
    unsafe { std::env::set_var("MEETLR_PROVIDERS_WEBHOOK_BASE_URL", "http://hooks.local") };

    let config = load_config_from_path(std::path::Path::new("/nonexistent/meetlr.toml"))
        .expect("env overrides should merge");

    unsafe { std::env::remove_var("MEETLR_POLLER_LEASE_TTL_SECS") };
    unsafe { std::env::remove_var("MEETLR_TASKS_MAX_RETRIES") };
    unsafe { std::env::remove_var("MEETLR_PROVIDERS_WEBHOOK_BASE_URL") };

    assert_eq!(config.poller.lease_ttl_secs, 90);
    assert_eq!(config.tasks.max_retries, 7);
    assert_eq!(
        config.providers.webhook_base_url.as_deref(),
        Some("http://hooks.local")
    );
}

#[test]
fn dotted_override_merges_like_env() {
    use figment::{Figment, providers::Serialized};

    let config: MeetlrConfig = Figment::new()
        .merge(Serialized::defaults(MeetlrConfig::default()))
        .merge(("booking.max_reschedules", 2))
        .extract()
        .expect("should set nested key via dot notation");

    assert_eq!(config.booking.max_reschedules, 2);
}
