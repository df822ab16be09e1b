// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::{MeetlrConfig, ProviderMode};

/// Validate a deserialized configuration, collecting every failure.
pub fn validate_config(config: &MeetlrConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let poller = &config.poller;
    if poller.poll_interval_secs == 0 {
        errors.push(ConfigError::validation(
            "poller.poll_interval_secs must be at least 1",
        ));
    }
    if poller.dispatch_batch_size == 0 {
        errors.push(ConfigError::validation(
            "poller.dispatch_batch_size must be at least 1",
        ));
    }
    for (name, every) in [
        ("dispatch_every_polls", poller.dispatch_every_polls),
        ("expired_booking_every_polls", poller.expired_booking_every_polls),
        ("one_time_code_every_polls", poller.one_time_code_every_polls),
        (
            "payment_reconciliation_every_polls",
            poller.payment_reconciliation_every_polls,
        ),
        ("slot_expiry_every_polls", poller.slot_expiry_every_polls),
        ("lease_reclaim_every_polls", poller.lease_reclaim_every_polls),
    ] {
        if every == 0 {
            errors.push(ConfigError::validation(format!(
                "poller.{name} must be at least 1"
            )));
        }
    }

    let tasks = &config.tasks;
    if tasks.max_retries == 0 {
        errors.push(ConfigError::validation("tasks.max_retries must be at least 1"));
    }
    if tasks.backoff_cap_secs < tasks.backoff_base_secs {
        errors.push(ConfigError::validation(format!(
            "tasks.backoff_cap_secs ({}) must not be below tasks.backoff_base_secs ({})",
            tasks.backoff_cap_secs, tasks.backoff_base_secs
        )));
    }
    for (name, minutes) in [
        ("reminder_offset_minutes", tasks.reminder_offset_minutes),
        ("follow_up_offset_minutes", tasks.follow_up_offset_minutes),
        ("sms_reminder_offset_minutes", tasks.sms_reminder_offset_minutes),
    ] {
        if minutes < 0 {
            errors.push(ConfigError::validation(format!(
                "tasks.{name} must be non-negative, got {minutes}"
            )));
        }
    }

    for (name, cost) in [
        ("email_cost", config.credits.email_cost),
        ("sms_cost", config.credits.sms_cost),
        ("whatsapp_cost", config.credits.whatsapp_cost),
    ] {
        if cost < 0 {
            errors.push(ConfigError::validation(format!(
                "credits.{name} must be non-negative, got {cost}"
            )));
        }
    }

    if config.booking.pending_payment_timeout_minutes <= 0 {
        errors.push(ConfigError::validation(
            "booking.pending_payment_timeout_minutes must be positive",
        ));
    }

    if config.providers.mode == ProviderMode::Webhook {
        match config.providers.webhook_base_url.as_deref() {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
            Some(url) => errors.push(ConfigError::validation(format!(
                "providers.webhook_base_url `{url}` must start with http:// or https://"
            ))),
            None => errors.push(ConfigError::validation(
                "providers.webhook_base_url is required when providers.mode = \"webhook\"",
            )),
        }
    }
    if config.providers.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "providers.request_timeout_secs must be at least 1",
        ));
    }

    if config.prometheus.enabled
        && config
            .prometheus
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ConfigError::validation(format!(
            "prometheus.listen_addr `{}` is not a socket address",
            config.prometheus.listen_addr
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&MeetlrConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_failure() {
        let mut config = MeetlrConfig::default();
        config.tasks.max_retries = 0;
        config.tasks.backoff_cap_secs = 1;
        config.poller.slot_expiry_every_polls = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn webhook_mode_requires_url() {
        let mut config = MeetlrConfig::default();
        config.providers.mode = ProviderMode::Webhook;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("webhook_base_url"));

        config.providers.webhook_base_url = Some("https://hooks.internal".into());
        assert!(validate_config(&config).is_ok());
    }
}
