// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `meetlr history` command implementation.
//!
//! Prints a booking's pending tasks and archived outcomes, one JSON object
//! per line with `--json`, or a plain table otherwise.

use meetlr_config::model::MeetlrConfig;
use meetlr_core::{MeetlrError, PendingTask, TaskHistory};
use meetlr_storage::Database;
use meetlr_storage::queries::{pending_tasks, task_history};

pub async fn run_history(
    config: &MeetlrConfig,
    booking_id: &str,
    json: bool,
) -> Result<(), MeetlrError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let pending = pending_tasks::list_for_booking(&db, booking_id).await?;
    let archived = task_history::list_for_booking(&db, booking_id).await?;

    if json {
        for task in &pending {
            println!("{}", serde_json::to_string(task)?);
        }
        for record in &archived {
            println!("{}", serde_json::to_string(record)?);
        }
    } else if pending.is_empty() && archived.is_empty() {
        println!("no tasks for booking {booking_id}");
    } else {
        for task in &pending {
            println!("{}", pending_line(task));
        }
        for record in &archived {
            println!("{}", archived_line(record));
        }
    }
    Ok(())
}

fn pending_line(task: &PendingTask) -> String {
    format!(
        "pending  {:<24} {:<11} execute_at={} retries={}/{}",
        task.kind.to_string(),
        task.status.to_string(),
        task.execute_at.to_rfc3339(),
        task.retry_count,
        task.max_retries
    )
}

fn archived_line(record: &TaskHistory) -> String {
    let mut line = format!(
        "archived {:<24} {:<11} processed_at={} retries={}",
        record.kind.to_string(),
        record.final_status.to_string(),
        record.processed_at.to_rfc3339(),
        record.retry_count
    );
    if let Some(category) = record.failure_category {
        line.push_str(&format!(" category={category}"));
    }
    if let Some(error) = &record.error_message {
        line.push_str(&format!(" error={error:?}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetlr_core::{FailureCategory, FinalStatus, TaskKind};
    use meetlr_test_utils::fixtures;

    #[test]
    fn archived_line_includes_failure_details() {
        let booking = fixtures::confirmed_booking("b1");
        let task =
            fixtures::notification_task(&booking, TaskKind::ConfirmationEmail, fixtures::base_time());
        let record = TaskHistory {
            id: task.id.clone(),
            tenant_id: task.tenant_id.clone(),
            booking_id: task.booking_id.clone(),
            meetlr_event_id: task.meetlr_event_id.clone(),
            user_id: task.user_id.clone(),
            kind: task.kind,
            trigger: task.trigger,
            payload: task.payload.clone(),
            recipient: task.recipient.clone(),
            scheduled_at: task.scheduled_at,
            execute_at: task.execute_at,
            retry_count: 3,
            max_retries: 3,
            error_message: Some("relay down".into()),
            error_details: None,
            external_message_id: None,
            final_status: FinalStatus::Failed,
            failure_category: Some(FailureCategory::Transient),
            processed_at: fixtures::base_time(),
            processing_time_ms: 12,
        };
        let line = archived_line(&record);
        assert!(line.starts_with("archived confirmation_email"));
        assert!(line.contains("failed"));
        assert!(line.contains("category=transient"));
        assert!(line.contains("error=\"relay down\""));
    }
}
