//! Runs the selected tiers in order and collects their reports.

use crate::client::ApiClient;
use crate::config::HarnessConfig;
use crate::offline::offline_scenarios;
use crate::online::{online_scenarios, OnlineContext};
use crate::report::{SuiteReport, TierReport};
use crate::scenario::Tier;
use crate::server::{wait_until_ready, ServerHandle};
use chrono::Utc;
use tracing::{error, info};

/// Tiers to run for a command-line selection; `None` means all of them.
pub fn selected_tiers(selection: Option<Tier>) -> Vec<Tier> {
    match selection {
        Some(tier) => vec![tier],
        None => vec![Tier::Unit, Tier::Integration],
    }
}

pub async fn run_suite(selection: Option<Tier>, config: &HarnessConfig) -> SuiteReport {
    let started_at = Utc::now();
    let mut tiers = Vec::new();

    for tier in selected_tiers(selection) {
        println!("Running {} tests...", tier);
        let report = match tier {
            Tier::Unit => run_offline().await,
            Tier::Integration => run_online(config).await,
        };
        info!(
            "{} tier finished: {} passed, {} failed",
            tier,
            report.passed(),
            report.failed()
        );
        tiers.push(report);
    }

    SuiteReport::new(started_at, tiers)
}

pub async fn run_offline() -> TierReport {
    offline_scenarios().run_all(Tier::Unit, &()).await
}

/// Start the service when configured, wait until it answers, then run the
/// online scenarios. The service is stopped when this returns.
pub async fn run_online(config: &HarnessConfig) -> TierReport {
    let client = match ApiClient::new(config) {
        Ok(client) => client,
        Err(e) => return abort(e.to_string()),
    };

    let _server = match &config.server {
        Some(server_config) => match ServerHandle::spawn(server_config) {
            Ok(handle) => Some(handle),
            Err(e) => return abort(e.to_string()),
        },
        None => None,
    };

    if let Err(e) = wait_until_ready(&client, &config.readiness).await {
        return abort(e.to_string());
    }

    let ctx = OnlineContext::new(client, config.clone());
    online_scenarios().run_all(Tier::Integration, &ctx).await
}

fn abort(reason: String) -> TierReport {
    error!("Integration tier aborted: {}", reason);
    TierReport::aborted(Tier::Integration, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadinessConfig;

    #[test]
    fn test_selected_tiers() {
        assert_eq!(selected_tiers(None), vec![Tier::Unit, Tier::Integration]);
        assert_eq!(selected_tiers(Some(Tier::Unit)), vec![Tier::Unit]);
    }

    #[tokio::test]
    async fn test_unit_selection_skips_online_tier() {
        // nothing listens here; selecting the unit tier must not notice
        let config = HarnessConfig::default().with_base_url("http://127.0.0.1:9");
        let report = run_suite(Some(Tier::Unit), &config).await;
        assert_eq!(report.tiers.len(), 1);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_unreachable_service_aborts_integration_tier() {
        let config = HarnessConfig::default()
            .with_base_url("http://127.0.0.1:9")
            .with_readiness(ReadinessConfig {
                max_attempts: 2,
                interval_ms: 10,
                probe_timeout_ms: 200,
                ..ReadinessConfig::default()
            });
        let report = run_online(&config).await;
        assert!(report.is_aborted());
        assert!(report.outcomes.is_empty());
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_server_spawn_failure_aborts_tier() {
        let config = HarnessConfig::default()
            .with_server(crate::config::ServerConfig::new("/nonexistent/server-binary"));
        let report = run_online(&config).await;
        match report.status {
            crate::report::TierStatus::Aborted { reason } => {
                assert!(reason.contains("/nonexistent/server-binary"))
            }
            other => panic!("expected abort, got {other:?}"),
        }
    }
}
