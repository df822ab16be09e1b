// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Meetlr task pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level Meetlr configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MeetlrConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Poll interval and maintenance job cadences.
    #[serde(default)]
    pub poller: PollerConfig,

    /// Retry and scheduling policy for pending tasks.
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Booking lifecycle rules.
    #[serde(default)]
    pub booking: BookingConfig,

    /// Per-send credit costs.
    #[serde(default)]
    pub credits: CreditsConfig,

    /// Outbound collaborator adapters.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Prometheus metrics exporter.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "meetlr".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("meetlr").join("meetlr.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("meetlr.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Poller configuration.
///
/// Every maintenance job runs once every `*_every_polls` ticks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollerConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum rows claimed per dispatch pass.
    #[serde(default = "default_dispatch_batch_size")]
    pub dispatch_batch_size: usize,

    #[serde(default = "default_dispatch_every_polls")]
    pub dispatch_every_polls: u32,

    #[serde(default = "default_expired_booking_every_polls")]
    pub expired_booking_every_polls: u32,

    #[serde(default = "default_one_time_code_every_polls")]
    pub one_time_code_every_polls: u32,

    #[serde(default = "default_payment_reconciliation_every_polls")]
    pub payment_reconciliation_every_polls: u32,

    #[serde(default = "default_slot_expiry_every_polls")]
    pub slot_expiry_every_polls: u32,

    #[serde(default = "default_lease_reclaim_every_polls")]
    pub lease_reclaim_every_polls: u32,

    /// Rows left in `processing` longer than this are requeued.
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            dispatch_batch_size: default_dispatch_batch_size(),
            dispatch_every_polls: default_dispatch_every_polls(),
            expired_booking_every_polls: default_expired_booking_every_polls(),
            one_time_code_every_polls: default_one_time_code_every_polls(),
            payment_reconciliation_every_polls: default_payment_reconciliation_every_polls(),
            slot_expiry_every_polls: default_slot_expiry_every_polls(),
            lease_reclaim_every_polls: default_lease_reclaim_every_polls(),
            lease_ttl_secs: default_lease_ttl_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_dispatch_batch_size() -> usize {
    50
}

fn default_dispatch_every_polls() -> u32 {
    1
}

fn default_expired_booking_every_polls() -> u32 {
    20
}

fn default_one_time_code_every_polls() -> u32 {
    720
}

fn default_payment_reconciliation_every_polls() -> u32 {
    4
}

fn default_slot_expiry_every_polls() -> u32 {
    10
}

fn default_lease_reclaim_every_polls() -> u32 {
    10
}

fn default_lease_ttl_secs() -> u64 {
    600
}

/// Retry and scheduling policy for pending tasks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TasksConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay; doubles on every subsequent failure.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,

    /// Reminder emails fire this long before the booking starts.
    #[serde(default = "default_reminder_offset_minutes")]
    pub reminder_offset_minutes: i64,

    /// Follow-up emails fire this long after the booking ends.
    #[serde(default = "default_follow_up_offset_minutes")]
    pub follow_up_offset_minutes: i64,

    #[serde(default = "default_sms_reminder_offset_minutes")]
    pub sms_reminder_offset_minutes: i64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
            reminder_offset_minutes: default_reminder_offset_minutes(),
            follow_up_offset_minutes: default_follow_up_offset_minutes(),
            sms_reminder_offset_minutes: default_sms_reminder_offset_minutes(),
        }
    }
}

impl TasksConfig {
    pub fn reminder_offset(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reminder_offset_minutes)
    }

    pub fn follow_up_offset(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.follow_up_offset_minutes)
    }

    pub fn sms_reminder_offset(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.sms_reminder_offset_minutes)
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_secs() -> u64 {
    60
}

fn default_backoff_cap_secs() -> u64 {
    3600
}

fn default_reminder_offset_minutes() -> i64 {
    24 * 60
}

fn default_follow_up_offset_minutes() -> i64 {
    60
}

fn default_sms_reminder_offset_minutes() -> i64 {
    120
}

/// Booking lifecycle rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BookingConfig {
    /// A reschedule must land at least this far in the future.
    #[serde(default = "default_reschedule_notice_hours")]
    pub reschedule_notice_hours: i64,

    #[serde(default = "default_max_reschedules")]
    pub max_reschedules: u32,

    /// Unpaid pending bookings older than this are cancelled.
    #[serde(default = "default_pending_payment_timeout_minutes")]
    pub pending_payment_timeout_minutes: i64,

    /// How long a slot invitation holds its slot.
    #[serde(default = "default_slot_hold_minutes")]
    pub slot_hold_minutes: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            reschedule_notice_hours: default_reschedule_notice_hours(),
            max_reschedules: default_max_reschedules(),
            pending_payment_timeout_minutes: default_pending_payment_timeout_minutes(),
            slot_hold_minutes: default_slot_hold_minutes(),
        }
    }
}

fn default_reschedule_notice_hours() -> i64 {
    72
}

fn default_max_reschedules() -> u32 {
    1
}

fn default_pending_payment_timeout_minutes() -> i64 {
    60
}

fn default_slot_hold_minutes() -> i64 {
    30
}

/// Credits charged per outbound message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreditsConfig {
    #[serde(default = "default_credit_cost")]
    pub email_cost: i64,

    #[serde(default = "default_credit_cost")]
    pub sms_cost: i64,

    #[serde(default = "default_credit_cost")]
    pub whatsapp_cost: i64,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            email_cost: default_credit_cost(),
            sms_cost: default_credit_cost(),
            whatsapp_cost: default_credit_cost(),
        }
    }
}

fn default_credit_cost() -> i64 {
    1
}

/// How outbound collaborators are reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    /// Log every call and report success. Used for local runs.
    #[default]
    Log,
    /// POST JSON to `webhook_base_url`.
    Webhook,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub mode: ProviderMode,

    #[serde(default)]
    pub webhook_base_url: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Booking location type to video meeting plugin id.
    #[serde(default = "default_meeting_plugins")]
    pub meeting_plugins: BTreeMap<String, String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::default(),
            webhook_base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            meeting_plugins: default_meeting_plugins(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_meeting_plugins() -> BTreeMap<String, String> {
    [
        ("zoom", "zoom"),
        ("google_meet", "google-meet"),
        ("microsoft_teams", "microsoft-teams"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Prometheus metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Address the scrape endpoint listens on.
    #[serde(default = "default_metrics_listen_addr")]
    pub listen_addr: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_listen_addr(),
        }
    }
}

fn default_metrics_listen_addr() -> String {
    "127.0.0.1:9464".to_string()
}
