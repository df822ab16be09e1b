// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `meetlr serve` command implementation.
//!
//! Wires storage, the credit ledger, collaborator adapters, the executor
//! registry, and the booking service together, then runs the scheduled
//! poller until SIGTERM or Ctrl-C.

use std::sync::Arc;

use meetlr_booking::{BookingService, EventDispatcher, Policies};
use meetlr_config::model::MeetlrConfig;
use meetlr_core::{Clock, HealthStatus, MeetlrError, PluginAdapter, SystemClock};
use meetlr_credits::CreditLedger;
use meetlr_cron::{Poller, PollerDeps};
use meetlr_storage::{Database, SqliteStorage};
use meetlr_tasks::executors::{
    CalendarEventCreateExecutor, CalendarEventDeleteExecutor, NotificationExecutor,
    RefundPaymentExecutor, VideoMeetingCreateExecutor, VideoMeetingDeleteExecutor,
};
use meetlr_tasks::{ExecutorRegistry, RetryPolicy, TaskDispatcher};
use tracing::{error, info, warn};

use crate::adapters::Providers;
use crate::shutdown;

/// Every long-lived component of one process.
pub struct App {
    pub db: Arc<Database>,
    pub storage: SqliteStorage,
    pub clock: Arc<dyn Clock>,
    pub providers: Providers,
    pub bookings: Arc<BookingService>,
    pub dispatcher: Arc<TaskDispatcher>,
}

impl App {
    pub async fn build(config: &MeetlrConfig) -> Result<Self, MeetlrError> {
        Self::build_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn build_with_clock(
        config: &MeetlrConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MeetlrError> {
        let storage = SqliteStorage::open(&config.storage).await?;
        let db = storage.database();
        let ledger = Arc::new(CreditLedger::from_database(&db, clock.clone()));
        let providers = Providers::from_config(&config.providers)?;

        let registry = Arc::new(build_registry(config, &ledger, &providers));
        let missing = registry.missing_kinds();
        if !missing.is_empty() {
            warn!(?missing, "no executor registered for some task kinds");
        }

        let bookings = Arc::new(BookingService::new(
            db.clone(),
            Arc::new(EventDispatcher::with_default_handlers()),
            clock.clone(),
            Policies::from_config(config),
        ));
        let dispatcher = Arc::new(TaskDispatcher::new(
            db.clone(),
            registry,
            RetryPolicy::from_config(&config.tasks),
            clock.clone(),
        ));

        Ok(Self {
            db,
            storage,
            clock,
            providers,
            bookings,
            dispatcher,
        })
    }

    pub fn poller(&self, config: &MeetlrConfig) -> Poller {
        Poller::standard(
            &config.poller,
            PollerDeps {
                db: self.db.clone(),
                clock: self.clock.clone(),
                bookings: self.bookings.clone(),
                dispatcher: self.dispatcher.clone(),
                payments: self.providers.payments.clone(),
            },
        )
    }
}

fn build_registry(
    config: &MeetlrConfig,
    ledger: &Arc<CreditLedger>,
    providers: &Providers,
) -> ExecutorRegistry {
    let mut notifications = NotificationExecutor::new(ledger.clone(), config.credits.clone());
    for sender in &providers.senders {
        notifications = notifications.with_sender(sender.clone());
    }

    let mut registry = ExecutorRegistry::new();
    registry.register(Arc::new(notifications));
    registry.register(Arc::new(VideoMeetingCreateExecutor::new(
        providers.meetings.clone(),
        config.providers.meeting_plugins.clone(),
    )));
    registry.register(Arc::new(VideoMeetingDeleteExecutor::new(
        providers.meetings.clone(),
    )));
    registry.register(Arc::new(CalendarEventCreateExecutor::new(
        providers.calendars.clone(),
    )));
    registry.register(Arc::new(CalendarEventDeleteExecutor::new(
        providers.calendars.clone(),
    )));
    registry.register(Arc::new(RefundPaymentExecutor::new(
        providers.payments.clone(),
    )));
    registry
}

/// Run the `meetlr serve` command.
pub async fn run_serve(config: MeetlrConfig) -> Result<(), MeetlrError> {
    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, "starting meetlr serve");

    #[cfg(feature = "prometheus")]
    let _metrics = if config.prometheus.enabled {
        let addr = config
            .prometheus
            .listen_addr
            .parse()
            .map_err(|e| MeetlrError::Config(format!("prometheus.listen_addr: {e}")))?;
        Some(meetlr_prometheus::PrometheusAdapter::install(addr)?)
    } else {
        None
    };

    let app = App::build(&config).await?;
    match app.storage.health_check().await? {
        HealthStatus::Healthy => info!("storage healthy"),
        HealthStatus::Degraded(reason) => warn!(%reason, "storage degraded"),
        HealthStatus::Unhealthy(reason) => {
            return Err(MeetlrError::Internal(format!("storage unhealthy: {reason}")));
        }
    }

    let poller = app.poller(&config);
    for (job, every_polls) in poller.schedule() {
        info!(job, every_polls, "job scheduled");
    }

    let cancel = shutdown::install_signal_handler();
    poller.run(cancel).await;

    for sender in &app.providers.senders {
        if let Err(e) = sender.shutdown().await {
            error!(adapter = sender.name(), error = %e, "adapter shutdown failed");
        }
    }
    info!("meetlr serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let directives = [
        "meetlr",
        "meetlr_booking",
        "meetlr_credits",
        "meetlr_cron",
        "meetlr_storage",
        "meetlr_tasks",
    ]
    .iter()
    .map(|target| format!("{target}={log_level}"))
    .collect::<Vec<_>>()
    .join(",");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{directives},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetlr_core::TaskKind;

    fn config_in(dir: &tempfile::TempDir) -> MeetlrConfig {
        let path = dir.path().join("meetlr.db");
        meetlr_config::load_and_validate_str(&format!(
            "[storage]\ndatabase_path = \"{}\"\n",
            path.display()
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn build_registers_an_executor_for_every_kind() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let app = App::build(&config).await.unwrap();
        let ledger = Arc::new(CreditLedger::from_database(&app.db, app.clock.clone()));
        let registry = build_registry(&config, &ledger, &app.providers);
        assert!(registry.missing_kinds().is_empty());
        assert!(registry.get(TaskKind::SmsNotification).is_some());
    }

    #[tokio::test]
    async fn poller_uses_the_standard_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let app = App::build(&config).await.unwrap();
        let names: Vec<_> = app
            .poller(&config)
            .schedule()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names.len(), 6);
        assert_eq!(names[0], "dispatch_pending_tasks");
    }
}
