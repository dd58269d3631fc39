//! Conversion-path miner — groups converted journeys by the ordered
//! `(type, channel)` sequence of their full path and maintains per-pattern
//! frequency, revenue, and quality statistics. Each cycle recomputes the
//! whole collection and replaces the previous one.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use journeypulse_core::error::EngineResult;
use journeypulse_core::event_bus::{make_event, EventSink};
use journeypulse_core::types::{ConversionPath, CustomerJourney, EventType, PathStep};
use journeypulse_tracking::store::JourneyStore;

pub struct ConversionPathMiner {
    store: Arc<dyn JourneyStore>,
    events: Arc<dyn EventSink>,
}

impl ConversionPathMiner {
    pub fn new(store: Arc<dyn JourneyStore>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    /// One full mining cycle over the current journey snapshot.
    pub fn run_once(&self) -> EngineResult<Vec<ConversionPath>> {
        let journeys = self.store.list_journeys();
        let mined_at = Utc::now();
        let mut patterns: HashMap<String, ConversionPath> = HashMap::new();

        for journey in journeys.iter().filter(|j| j.converted) {
            let signature: Vec<String> = journey
                .path
                .iter()
                .map(|tp| format!("{}_{}", tp.touchpoint_type.as_str(), tp.channel.as_str()))
                .collect();
            // Order matters; exact match only.
            let key = signature.join(">");
            match patterns.get_mut(&key) {
                Some(path) => update_path(path, journey),
                None => {
                    patterns.insert(key, seed_path(signature, journey, mined_at));
                }
            }
        }

        let mut mined: Vec<ConversionPath> = patterns.into_values().collect();
        mined.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        self.store.replace_conversion_paths(mined.clone());

        info!(patterns = mined.len(), "conversion-path mining cycle complete");
        self.events.emit(make_event(
            EventType::ConversionPathsAnalyzed,
            None,
            None,
            serde_json::json!({
                "patterns": mined.len(),
                "top_frequency": mined.first().map(|p| p.frequency),
            }),
        ));

        Ok(mined)
    }
}

fn seed_path(
    signature: Vec<String>,
    journey: &CustomerJourney,
    mined_at: DateTime<Utc>,
) -> ConversionPath {
    ConversionPath {
        id: Uuid::new_v4(),
        signature,
        frequency: 1,
        conversion_rate: 100.0,
        average_duration_ms: journey.duration_ms as f64,
        average_touchpoints: journey.touchpoint_count() as f64,
        efficiency: journey.efficiency,
        satisfaction: journey.satisfaction,
        total_conversions: 1,
        total_revenue: journey.conversion_value,
        average_order_value: journey.conversion_value,
        steps: build_steps(journey),
        mined_at,
    }
}

fn update_path(path: &mut ConversionPath, journey: &CustomerJourney) {
    path.frequency += 1;
    path.total_conversions += 1;
    path.total_revenue += journey.conversion_value;
    path.average_order_value = path.total_revenue / path.total_conversions as f64;
    // Running average of the previous value and the new sample only.
    path.average_duration_ms = (path.average_duration_ms + journey.duration_ms as f64) / 2.0;
    path.average_touchpoints =
        (path.average_touchpoints + journey.touchpoint_count() as f64) / 2.0;
    path.efficiency = (path.efficiency + journey.efficiency) / 2.0;
    path.satisfaction = (path.satisfaction + journey.satisfaction) / 2.0;
}

/// Step-by-step breakdown seeded from the pattern's first observed journey.
fn build_steps(journey: &CustomerJourney) -> Vec<PathStep> {
    journey
        .path
        .iter()
        .enumerate()
        .map(|(i, tp)| PathStep {
            position: i,
            touchpoint_type: tp.touchpoint_type,
            channel: tp.channel,
            value: tp.value_score,
            time_to_next_ms: journey.path.get(i + 1).map(|next| {
                next.timestamp
                    .signed_duration_since(tp.timestamp)
                    .num_milliseconds()
            }),
        })
        .collect()
}
