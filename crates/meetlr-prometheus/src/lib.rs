// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the Meetlr pipeline.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. The exporter
//! serves the text format on its own HTTP listener.

pub mod recording;

use std::net::SocketAddr;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use meetlr_core::{AdapterType, HealthStatus, MeetlrError, PluginAdapter};

pub use recording::{
    record_credit_reservation, record_enqueued, record_finalized, record_job_run,
    record_processing_time, register_metrics, set_pending_tasks,
};

/// Installed Prometheus recorder and scrape endpoint.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
    listen_addr: SocketAddr,
}

impl PrometheusAdapter {
    /// Install the recorder globally and spawn the scrape listener on the
    /// current tokio runtime.
    ///
    /// Only one recorder can be installed per process.
    pub fn install(listen_addr: SocketAddr) -> Result<Self, MeetlrError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(listen_addr)
            .build()
            .map_err(|e| MeetlrError::Internal(format!("failed to build Prometheus exporter: {e}")))?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| {
            MeetlrError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;
        tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "prometheus exporter stopped");
            }
        });

        recording::register_metrics();
        tracing::info!(%listen_addr, "prometheus metrics recorder installed");

        Ok(Self {
            handle,
            listen_addr,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, MeetlrError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MeetlrError> {
        Ok(())
    }
}
