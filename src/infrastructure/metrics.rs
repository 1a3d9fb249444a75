// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 安装 Prometheus 导出器
///
/// 安装失败只记录警告，不影响服务启动
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        info!("Metrics exporter disabled");
        return;
    }

    let addr: SocketAddr = match settings.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.listen, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(
        "cep_jobs_processed_total",
        "Jobs that reached a terminal result, by outcome"
    );
    describe_counter!("cep_jobs_retried_total", "Retries scheduled, by error code");
    describe_counter!("crawls_finalized_total", "Crawls moved to a terminal status");
    describe_counter!(
        "rate_limiter_backoff_increases_total",
        "Rate limit signals that widened the dispatch interval"
    );
    describe_gauge!(
        "rate_limiter_backoff_multiplier",
        "Current dispatch interval multiplier"
    );
    describe_histogram!(
        "cep_lookup_duration_seconds",
        Unit::Seconds,
        "Lookup latency including rate limiter wait"
    );
}
