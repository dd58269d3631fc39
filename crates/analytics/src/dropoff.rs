//! Drop-off analyzer — scans every journey path, groups terminal
//! non-converting touchpoints by `(type, channel, page)` signature, and
//! materializes ranked analyses for signatures losing more than the
//! configured share of journeys. Each run recomputes from scratch and
//! overwrites the previous result set.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use journeypulse_core::error::EngineResult;
use journeypulse_core::event_bus::{make_event, EventSink};
use journeypulse_core::types::{Channel, DropOffAnalysis, EventType, TouchpointType};
use journeypulse_tracking::store::JourneyStore;

pub struct DropOffAnalyzer {
    store: Arc<dyn JourneyStore>,
    events: Arc<dyn EventSink>,
    /// Signatures at or below this drop-off rate are not materialized.
    rate_threshold: f64,
}

struct SignatureCounts {
    touchpoint_type: TouchpointType,
    channel: Channel,
    page: String,
    total: u64,
    drop_offs: u64,
}

impl DropOffAnalyzer {
    pub fn new(
        store: Arc<dyn JourneyStore>,
        events: Arc<dyn EventSink>,
        rate_threshold: f64,
    ) -> Self {
        Self {
            store,
            events,
            rate_threshold,
        }
    }

    /// One full analysis cycle over the current journey snapshot.
    pub fn run_once(&self) -> EngineResult<Vec<DropOffAnalysis>> {
        let journeys = self.store.list_journeys();
        let mut counts: HashMap<String, SignatureCounts> = HashMap::new();

        for journey in &journeys {
            let last = journey.path.len().saturating_sub(1);
            for (i, tp) in journey.path.iter().enumerate() {
                let page = tp.page.as_deref().unwrap_or("unknown");
                let signature = format!(
                    "{}_{}_{}",
                    tp.touchpoint_type.as_str(),
                    tp.channel.as_str(),
                    page
                );
                let entry = counts.entry(signature).or_insert_with(|| SignatureCounts {
                    touchpoint_type: tp.touchpoint_type,
                    channel: tp.channel,
                    page: page.to_string(),
                    total: 0,
                    drop_offs: 0,
                });
                entry.total += 1;
                if i == last && !journey.converted {
                    entry.drop_offs += 1;
                }
            }
        }

        let analyzed_at = Utc::now();
        let mut analyses: Vec<DropOffAnalysis> = counts
            .into_iter()
            .filter_map(|(signature, c)| {
                if c.drop_offs == 0 {
                    return None;
                }
                let rate = c.drop_offs as f64 / c.total as f64;
                if rate <= self.rate_threshold {
                    return None;
                }
                let impact_score = (70.0 * rate + 10.0 * (c.drop_offs as f64).ln()).min(100.0);
                let (likely_reasons, recommendations) = signature_insights(&signature);
                Some(DropOffAnalysis {
                    id: signature,
                    touchpoint_type: c.touchpoint_type,
                    channel: c.channel,
                    page: c.page,
                    total_occurrences: c.total,
                    drop_off_count: c.drop_offs,
                    drop_off_rate: rate,
                    impact_score,
                    device_breakdown: device_breakdown(),
                    time_of_day_breakdown: time_of_day_breakdown(),
                    source_breakdown: source_breakdown(),
                    likely_reasons,
                    recommendations,
                    analyzed_at,
                })
            })
            .collect();

        analyses.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));
        self.store.replace_dropoff_analyses(analyses.clone());

        info!(
            journeys = journeys.len(),
            hotspots = analyses.len(),
            "drop-off analysis cycle complete"
        );
        self.events.emit(make_event(
            EventType::DropoffIdentified,
            None,
            None,
            serde_json::json!({
                "hotspots": analyses.len(),
                "top_signature": analyses.first().map(|a| a.id.clone()),
            }),
        ));

        Ok(analyses)
    }
}

/// Heuristic fixed distribution — not measured.
fn device_breakdown() -> HashMap<String, f64> {
    HashMap::from([
        ("desktop".to_string(), 0.45),
        ("mobile".to_string(), 0.40),
        ("tablet".to_string(), 0.15),
    ])
}

/// Heuristic fixed distribution — not measured.
fn time_of_day_breakdown() -> HashMap<String, f64> {
    HashMap::from([
        ("morning".to_string(), 0.25),
        ("afternoon".to_string(), 0.35),
        ("evening".to_string(), 0.30),
        ("night".to_string(), 0.10),
    ])
}

/// Heuristic fixed distribution — not measured.
fn source_breakdown() -> HashMap<String, f64> {
    HashMap::from([
        ("organic".to_string(), 0.40),
        ("direct".to_string(), 0.30),
        ("referral".to_string(), 0.20),
        ("paid".to_string(), 0.10),
    ])
}

/// Rule-based likely reasons and recommendations, keyed by substring match
/// on the signature.
fn signature_insights(signature: &str) -> (Vec<String>, Vec<String>) {
    if signature.contains("form") {
        return (
            vec![
                "Form length or complexity discourages completion".to_string(),
                "Required fields ask for too much too early".to_string(),
            ],
            vec![
                "Shorten the form to essential fields".to_string(),
                "Add inline validation and progress indication".to_string(),
            ],
        );
    }
    if signature.contains("pricing") {
        return (
            vec![
                "Price sensitivity at the decision point".to_string(),
                "Plan comparison is unclear or overwhelming".to_string(),
            ],
            vec![
                "Surface a recommended plan and social proof".to_string(),
                "Offer a trial or money-back guarantee near the price".to_string(),
            ],
        );
    }
    if signature.contains("demo") {
        return (
            vec!["Scheduling friction before the demo booking completes".to_string()],
            vec!["Offer instant self-serve demo access as an alternative".to_string()],
        );
    }
    if signature.contains("video") {
        return (
            vec!["Video length or relevance loses viewers".to_string()],
            vec!["Lead with a shorter highlight cut and a clear next step".to_string()],
        );
    }
    (
        vec!["Content does not answer the visitor's next question".to_string()],
        vec!["Add a clear call-to-action guiding the next step".to_string()],
    )
}
