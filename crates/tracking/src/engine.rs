//! The engine instance tying the store, stitcher, and analyzer status
//! together, plus the read-only query façade. Constructed once at process
//! start and handed to callers by reference — multiple isolated instances
//! can coexist (tests construct their own).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use journeypulse_core::config::AppConfig;
use journeypulse_core::error::{EngineError, EngineResult};
use journeypulse_core::event_bus::EventSink;
use journeypulse_core::status::AnalysisStatus;
use journeypulse_core::types::{
    ConversionPath, CustomerJourney, DropOffAnalysis, HealthReport, HealthStatus,
    JourneyOptimization, JourneyVisualization, StageSummary, Touchpoint, TouchpointRequest,
    VisualizationEdge, VisualizationNode,
};

use crate::stitcher::JourneyStitcher;
use crate::store::{JourneyStore, MemoryJourneyStore};

pub struct JourneyEngine {
    config: AppConfig,
    store: Arc<dyn JourneyStore>,
    events: Arc<dyn EventSink>,
    stitcher: JourneyStitcher,
    status: Arc<AnalysisStatus>,
}

impl std::fmt::Debug for JourneyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JourneyEngine")
            .field("journeys", &self.store.journey_count())
            .field("touchpoints", &self.store.touchpoint_count())
            .finish()
    }
}

impl JourneyEngine {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn JourneyStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let stitcher = JourneyStitcher::new(
            store.clone(),
            events.clone(),
            config.tracking.session_window_minutes,
        );
        Self {
            config,
            store,
            events,
            stitcher,
            status: Arc::new(AnalysisStatus::new()),
        }
    }

    /// Engine backed by the in-memory store.
    pub fn in_memory(config: AppConfig, events: Arc<dyn EventSink>) -> Self {
        Self::new(config, Arc::new(MemoryJourneyStore::new()), events)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn JourneyStore> {
        self.store.clone()
    }

    pub fn events(&self) -> Arc<dyn EventSink> {
        self.events.clone()
    }

    pub fn status(&self) -> Arc<AnalysisStatus> {
        self.status.clone()
    }

    /// Scores and stitches one incoming touchpoint synchronously.
    pub fn track(&self, request: TouchpointRequest) -> EngineResult<Touchpoint> {
        self.stitcher.ingest(request)
    }

    // ─── Query Façade ───────────────────────────────────────────────────

    /// All journeys (open or closed) for the identity; stable iteration
    /// order only.
    pub fn journeys_for_identity(&self, identity: &str) -> Vec<CustomerJourney> {
        self.store.journeys_for_identity(identity)
    }

    /// Node/edge graph of one journey plus per-stage rollups.
    pub fn journey_visualization(&self, journey_id: Uuid) -> EngineResult<JourneyVisualization> {
        let journey = self
            .store
            .get_journey(journey_id)
            .ok_or(EngineError::JourneyNotFound(journey_id))?;

        let nodes = journey
            .path
            .iter()
            .map(|tp| VisualizationNode {
                touchpoint_id: tp.id,
                touchpoint_type: tp.touchpoint_type,
                channel: tp.channel,
                page: tp.page.clone(),
                stage: tp.stage,
                value: tp.value_score,
                timestamp: tp.timestamp,
            })
            .collect();

        let edges = journey
            .path
            .windows(2)
            .map(|pair| VisualizationEdge {
                from: pair[0].id,
                to: pair[1].id,
                duration_ms: pair[1]
                    .timestamp
                    .signed_duration_since(pair[0].timestamp)
                    .num_milliseconds(),
            })
            .collect();

        let stage_summary: HashMap<_, _> = journey
            .stages
            .iter()
            .map(|(stage, bucket)| {
                (
                    *stage,
                    StageSummary {
                        touchpoint_count: bucket.touchpoints.len(),
                        conversion_rate: bucket.conversion_rate,
                    },
                )
            })
            .collect();

        Ok(JourneyVisualization {
            journey_id,
            nodes,
            edges,
            stage_summary,
            converted: journey.converted,
        })
    }

    /// Top-N mined conversion paths by frequency, descending.
    pub fn top_conversion_paths(&self, limit: usize) -> Vec<ConversionPath> {
        let mut paths = self.store.list_conversion_paths();
        paths.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        paths.truncate(limit);
        paths
    }

    /// Top-N drop-off analyses by impact score, descending.
    pub fn top_dropoff_analyses(&self, limit: usize) -> Vec<DropOffAnalysis> {
        let mut analyses = self.store.list_dropoff_analyses();
        analyses.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));
        analyses.truncate(limit);
        analyses
    }

    /// Top-N optimizations by projected conversion increase, descending.
    pub fn top_optimizations(&self, limit: usize) -> Vec<JourneyOptimization> {
        let mut optimizations = self.store.list_optimizations();
        optimizations.sort_by(|a, b| {
            b.projected_conversion_increase
                .total_cmp(&a.projected_conversion_increase)
        });
        optimizations.truncate(limit);
        optimizations
    }

    /// Engine health: unhealthy with zero journeys, degraded while an
    /// analysis cycle is in flight or overdue, healthy otherwise.
    pub fn health_check(&self) -> HealthReport {
        let journey_count = self.store.journey_count();
        let mut issues = Vec::new();

        let status = if journey_count == 0 {
            issues.push("no journeys tracked".to_string());
            HealthStatus::Unhealthy
        } else {
            if self.status.any_in_flight() {
                issues.push("analysis cycle in flight".to_string());
            }
            let staleness =
                Duration::seconds(self.config.analysis.staleness_threshold_secs as i64);
            let overdue = match self.status.latest_completion() {
                Some(completed) => Utc::now().signed_duration_since(completed) > staleness,
                None => true,
            };
            if overdue {
                issues.push("analysis overdue".to_string());
            }
            if issues.is_empty() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            }
        };

        HealthReport {
            status,
            journey_count,
            touchpoint_count: self.store.touchpoint_count(),
            conversion_path_count: self.store.list_conversion_paths().len(),
            drop_off_count: self.store.list_dropoff_analyses().len(),
            optimization_count: self.store.list_optimizations().len(),
            issues,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journeypulse_core::event_bus::noop_sink;

    fn engine() -> JourneyEngine {
        JourneyEngine::in_memory(AppConfig::default(), noop_sink())
    }

    fn request(user: &str, touchpoint_type: &str, page: Option<&str>) -> TouchpointRequest {
        TouchpointRequest {
            session_id: "sess-1".into(),
            user_id: Some(user.into()),
            touchpoint_type: touchpoint_type.into(),
            channel: "web".into(),
            source: "google".into(),
            medium: "organic".into(),
            page: page.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_visualization_nodes_and_edges() {
        let engine = engine();
        engine.track(request("u-1", "page_view", Some("/blog/a"))).unwrap();
        engine.track(request("u-1", "page_view", Some("/pricing"))).unwrap();
        engine.track(request("u-1", "demo_request", None)).unwrap();

        let journey = &engine.journeys_for_identity("u-1")[0];
        let viz = engine.journey_visualization(journey.id).unwrap();

        assert_eq!(viz.nodes.len(), 3);
        assert_eq!(viz.edges.len(), 2);
        assert_eq!(viz.edges[0].from, viz.nodes[0].touchpoint_id);
        assert_eq!(viz.edges[0].to, viz.nodes[1].touchpoint_id);
        assert!(viz.converted);
        assert_eq!(
            viz.stage_summary.values().map(|s| s.touchpoint_count).sum::<usize>(),
            3
        );
    }

    #[test]
    fn test_visualization_unknown_journey() {
        let engine = engine();
        let err = engine.journey_visualization(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, EngineError::JourneyNotFound(_)));
    }

    #[test]
    fn test_health_unhealthy_with_no_journeys() {
        let engine = engine();
        let report = engine.health_check();
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.journey_count, 0);
        assert!(report.issues.iter().any(|i| i.contains("no journeys")));
    }

    #[test]
    fn test_health_degraded_until_first_analysis_completes() {
        let engine = engine();
        engine.track(request("u-1", "page_view", None)).unwrap();

        let report = engine.health_check();
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(report.issues.iter().any(|i| i.contains("overdue")));

        engine.status().dropoff.begin();
        engine.status().dropoff.complete();
        let report = engine.health_check();
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_health_degraded_while_cycle_in_flight() {
        let engine = engine();
        engine.track(request("u-1", "page_view", None)).unwrap();
        engine.status().conversion_paths.begin();
        engine.status().dropoff.begin();
        engine.status().dropoff.complete();

        let report = engine.health_check();
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(report.issues.iter().any(|i| i.contains("in flight")));
        engine.status().conversion_paths.abort();
    }
}
