// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `meetlr drain` command implementation.
//!
//! Runs one dispatch pass over due tasks and exits. Useful from an external
//! scheduler when the long-running poller is not deployed.

use meetlr_config::model::MeetlrConfig;
use meetlr_core::MeetlrError;
use meetlr_tasks::DrainReport;
use tracing::info;

use crate::serve::{App, init_tracing};

pub async fn run_drain(config: &MeetlrConfig, limit: Option<usize>) -> Result<(), MeetlrError> {
    init_tracing(&config.service.log_level);
    let limit = limit.unwrap_or(config.poller.dispatch_batch_size);
    let app = App::build(config).await?;
    let report = app.dispatcher.drain_due(limit).await?;
    info!(limit, claimed = report.claimed, "drain finished");
    println!("{}", format_report(&report));
    Ok(())
}

fn format_report(report: &DrainReport) -> String {
    format!(
        "claimed={} sent={} skipped={} retried={} failed={} stale={} errors={}",
        report.claimed,
        report.sent,
        report.skipped,
        report.retried,
        report.failed,
        report.stale,
        report.errors
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_line_lists_every_counter() {
        let report = DrainReport {
            claimed: 4,
            sent: 2,
            skipped: 1,
            retried: 1,
            failed: 1,
            stale: 0,
            errors: 0,
        };
        assert_eq!(
            format_report(&report),
            "claimed=4 sent=2 skipped=1 retried=1 failed=1 stale=0 errors=0"
        );
    }
}
