// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; with no recorder installed every call is a
//! no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Meetlr metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("meetlr_tasks_enqueued_total", "Pending tasks written by event handlers");
    describe_counter!(
        "meetlr_tasks_finalized_total",
        "Task executions by outcome (sent, skipped, retried, failed)"
    );
    describe_histogram!(
        "meetlr_task_processing_seconds",
        "Wall time spent executing one task"
    );
    describe_counter!("meetlr_poller_job_runs_total", "Maintenance job runs by result");
    describe_counter!(
        "meetlr_credit_reservations_total",
        "Credit reservation attempts by result"
    );
    describe_gauge!("meetlr_pending_tasks", "Rows in the pending task store by status");
}

pub fn record_enqueued(kind: &str) {
    metrics::counter!("meetlr_tasks_enqueued_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_finalized(kind: &str, outcome: &'static str) {
    metrics::counter!(
        "meetlr_tasks_finalized_total",
        "kind" => kind.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_processing_time(kind: &str, seconds: f64) {
    metrics::histogram!("meetlr_task_processing_seconds", "kind" => kind.to_string())
        .record(seconds);
}

/// Record a maintenance job run; `result` is `ok` or `error`.
pub fn record_job_run(job: &'static str, result: &'static str) {
    metrics::counter!("meetlr_poller_job_runs_total", "job" => job, "result" => result)
        .increment(1);
}

pub fn record_credit_reservation(service: &str, result: &'static str) {
    metrics::counter!(
        "meetlr_credit_reservations_total",
        "service" => service.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn set_pending_tasks(status: &str, count: i64) {
    metrics::gauge!("meetlr_pending_tasks", "status" => status.to_string()).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn helpers_render_with_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            record_enqueued("reminder_email");
            record_finalized("reminder_email", "sent");
            record_job_run("lease_reclaim", "ok");
            set_pending_tasks("queued", 4);
        });
        let text = handle.render();
        assert!(text.contains("meetlr_tasks_enqueued_total{kind=\"reminder_email\"} 1"));
        assert!(text.contains("outcome=\"sent\""));
        assert!(text.contains("meetlr_poller_job_runs_total"));
        assert!(text.contains("meetlr_pending_tasks{status=\"queued\"} 4"));
    }

    #[test]
    fn helpers_without_recorder_are_noops() {
        record_enqueued("confirmation_email");
        record_processing_time("confirmation_email", 0.25);
    }
}
