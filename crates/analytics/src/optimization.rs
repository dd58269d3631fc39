//! Optimization generator — scans the step breakdowns of the top mined
//! conversion paths and emits ranked improvement opportunities with
//! projected impact. Prior optimizations are discarded each cycle.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use journeypulse_core::error::EngineResult;
use journeypulse_core::event_bus::{make_event, EventSink};
use journeypulse_core::types::{
    EffortLevel, EventType, JourneyOptimization, OpportunityKind, OptimizationOpportunity,
    RecommendationTiers,
};
use journeypulse_tracking::store::JourneyStore;

/// A step slower than this before the next touchpoint is a friction point.
const FRICTION_THRESHOLD_MS: i64 = 60_000;

/// A step worth less than this is a content-improvement candidate.
const LOW_VALUE_THRESHOLD: f64 = 30.0;

pub struct OptimizationGenerator {
    store: Arc<dyn JourneyStore>,
    events: Arc<dyn EventSink>,
    /// Number of top paths (by frequency) considered per cycle.
    top_paths: usize,
}

impl OptimizationGenerator {
    pub fn new(store: Arc<dyn JourneyStore>, events: Arc<dyn EventSink>, top_paths: usize) -> Self {
        Self {
            store,
            events,
            top_paths,
        }
    }

    /// One generation cycle over the currently mined conversion paths.
    pub fn run_once(&self) -> EngineResult<Vec<JourneyOptimization>> {
        let mut paths = self.store.list_conversion_paths();
        paths.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        paths.truncate(self.top_paths);

        let generated_at = Utc::now();
        let mut optimizations = Vec::new();

        for path in &paths {
            let mut opportunities = Vec::new();
            for step in &path.steps {
                if step.time_to_next_ms.is_some_and(|t| t > FRICTION_THRESHOLD_MS) {
                    opportunities.push(OptimizationOpportunity {
                        step_position: step.position,
                        kind: OpportunityKind::ReduceFriction,
                        description: format!(
                            "Users stall after the {} step on {} before moving on",
                            step.touchpoint_type.as_str(),
                            step.channel.as_str()
                        ),
                        expected_improvement_pct: 15.0,
                        confidence: 70.0,
                        effort: EffortLevel::Medium,
                        priority: 7,
                    });
                }
                if step.value < LOW_VALUE_THRESHOLD {
                    opportunities.push(OptimizationOpportunity {
                        step_position: step.position,
                        kind: OpportunityKind::ImproveContent,
                        description: format!(
                            "The {} step on {} delivers low value to the journey",
                            step.touchpoint_type.as_str(),
                            step.channel.as_str()
                        ),
                        expected_improvement_pct: 20.0,
                        confidence: 60.0,
                        effort: EffortLevel::High,
                        priority: 5,
                    });
                }
            }

            // A path with nothing to improve yields no optimization.
            if opportunities.is_empty() {
                continue;
            }

            let projected_conversion_increase: f64 = opportunities
                .iter()
                .map(|o| o.expected_improvement_pct)
                .sum();
            let projected_revenue_impact =
                path.total_revenue * projected_conversion_increase / 100.0;

            optimizations.push(JourneyOptimization {
                id: Uuid::new_v4(),
                path_id: path.id,
                path_signature: path.signature.clone(),
                opportunities,
                projected_conversion_increase,
                projected_revenue_impact,
                recommendations: recommendation_tiers(),
                generated_at,
            });
        }

        optimizations.sort_by(|a, b| {
            b.projected_conversion_increase
                .total_cmp(&a.projected_conversion_increase)
        });
        self.store.replace_optimizations(optimizations.clone());

        info!(
            paths = paths.len(),
            optimizations = optimizations.len(),
            "optimization cycle complete"
        );
        self.events.emit(make_event(
            EventType::OptimizationsGenerated,
            None,
            None,
            serde_json::json!({"optimizations": optimizations.len()}),
        ));

        Ok(optimizations)
    }
}

/// Static recommendation tiers — not computed from the path.
fn recommendation_tiers() -> RecommendationTiers {
    RecommendationTiers {
        immediate: vec![
            "Tighten calls-to-action on the highest-traffic steps".to_string(),
            "Remove optional fields from conversion forms".to_string(),
        ],
        short_term: vec![
            "A/B test alternative content on low-value steps".to_string(),
            "Add contextual nudges where users stall between steps".to_string(),
        ],
        long_term: vec![
            "Re-sequence the journey around the highest-intent touchpoints".to_string(),
            "Invest in the channels that assist the most conversions".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journeypulse_core::event_bus::{capture_sink, noop_sink};
    use journeypulse_core::types::{Channel, ConversionPath, PathStep, TouchpointType};
    use journeypulse_tracking::store::{JourneyStore, MemoryJourneyStore};

    fn path(frequency: u64, steps: Vec<PathStep>, revenue: f64) -> ConversionPath {
        ConversionPath {
            id: Uuid::new_v4(),
            signature: steps
                .iter()
                .map(|s| format!("{}_{}", s.touchpoint_type.as_str(), s.channel.as_str()))
                .collect(),
            frequency,
            conversion_rate: 100.0,
            average_duration_ms: 1_000.0,
            average_touchpoints: steps.len() as f64,
            efficiency: 100.0,
            satisfaction: 80.0,
            total_conversions: frequency,
            total_revenue: revenue,
            average_order_value: 0.0,
            steps,
            mined_at: Utc::now(),
        }
    }

    fn step(position: usize, value: f64, time_to_next_ms: Option<i64>) -> PathStep {
        PathStep {
            position,
            touchpoint_type: TouchpointType::PageView,
            channel: Channel::Web,
            value,
            time_to_next_ms,
        }
    }

    #[test]
    fn test_slow_step_yields_friction_opportunity() {
        let store = MemoryJourneyStore::shared();
        store.replace_conversion_paths(vec![path(
            5,
            vec![step(0, 50.0, Some(90_000)), step(1, 60.0, None)],
            1_000.0,
        )]);

        let generator = OptimizationGenerator::new(store.clone(), capture_sink(), 5);
        let optimizations = generator.run_once().unwrap();

        assert_eq!(optimizations.len(), 1);
        let opt = &optimizations[0];
        assert_eq!(opt.opportunities.len(), 1);
        let opportunity = &opt.opportunities[0];
        assert_eq!(opportunity.kind, OpportunityKind::ReduceFriction);
        assert_eq!(opportunity.expected_improvement_pct, 15.0);
        assert_eq!(opportunity.confidence, 70.0);
        assert_eq!(opportunity.effort, EffortLevel::Medium);
        assert_eq!(opportunity.priority, 7);
        assert_eq!(opt.projected_conversion_increase, 15.0);
        assert_eq!(opt.projected_revenue_impact, 150.0);
    }

    #[test]
    fn test_low_value_step_yields_content_opportunity() {
        let store = MemoryJourneyStore::shared();
        store.replace_conversion_paths(vec![path(
            3,
            vec![step(0, 12.0, Some(5_000)), step(1, 80.0, None)],
            0.0,
        )]);

        let generator = OptimizationGenerator::new(store.clone(), noop_sink(), 5);
        let optimizations = generator.run_once().unwrap();

        let opportunity = &optimizations[0].opportunities[0];
        assert_eq!(opportunity.kind, OpportunityKind::ImproveContent);
        assert_eq!(opportunity.expected_improvement_pct, 20.0);
        assert_eq!(opportunity.effort, EffortLevel::High);
        assert_eq!(opportunity.priority, 5);
    }

    #[test]
    fn test_clean_path_yields_no_optimization() {
        let store = MemoryJourneyStore::shared();
        store.replace_conversion_paths(vec![path(
            8,
            vec![step(0, 50.0, Some(10_000)), step(1, 75.0, None)],
            500.0,
        )]);

        let generator = OptimizationGenerator::new(store.clone(), noop_sink(), 5);
        let optimizations = generator.run_once().unwrap();
        assert!(optimizations.is_empty());
        assert!(store.list_optimizations().is_empty());
    }

    #[test]
    fn test_only_top_paths_considered() {
        let store = MemoryJourneyStore::shared();
        let mut paths = Vec::new();
        // Six paths with a slow step each; only the five most frequent are
        // scanned.
        for frequency in 1..=6u64 {
            paths.push(path(
                frequency,
                vec![step(0, 50.0, Some(120_000)), step(1, 50.0, None)],
                0.0,
            ));
        }
        store.replace_conversion_paths(paths);

        let generator = OptimizationGenerator::new(store.clone(), noop_sink(), 5);
        let optimizations = generator.run_once().unwrap();
        assert_eq!(optimizations.len(), 5);
    }

    #[test]
    fn test_prior_optimizations_overwritten() {
        let store = MemoryJourneyStore::shared();
        store.replace_conversion_paths(vec![path(
            5,
            vec![step(0, 10.0, None)],
            0.0,
        )]);

        let generator = OptimizationGenerator::new(store.clone(), noop_sink(), 5);
        generator.run_once().unwrap();
        let first_id = store.list_optimizations()[0].id;
        generator.run_once().unwrap();
        let second_id = store.list_optimizations()[0].id;
        assert_ne!(first_id, second_id);
        assert_eq!(store.list_optimizations().len(), 1);
    }
}
