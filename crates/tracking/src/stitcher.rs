//! Journey Stitcher — decides whether an incoming touchpoint extends the
//! identity's active journey or starts a new one, and recomputes the
//! journey-level aggregates on every append.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use journeypulse_core::error::EngineResult;
use journeypulse_core::event_bus::{make_event, EventSink};
use journeypulse_core::scoring::score_touchpoint;
use journeypulse_core::types::{
    Attribution, CustomerJourney, EventType, StageBucket, Touchpoint, TouchpointRequest,
};

use crate::store::JourneyStore;

pub struct JourneyStitcher {
    store: Arc<dyn JourneyStore>,
    events: Arc<dyn EventSink>,
    /// A journey is active for stitching while `now − endDate` stays under
    /// this window.
    session_window: Duration,
}

impl JourneyStitcher {
    pub fn new(
        store: Arc<dyn JourneyStore>,
        events: Arc<dyn EventSink>,
        session_window_minutes: u64,
    ) -> Self {
        Self {
            store,
            events,
            session_window: Duration::minutes(session_window_minutes as i64),
        }
    }

    /// Scores and ingests one touchpoint. Validation happens before any
    /// mutation; stitching failures are reported on the event bus and leave
    /// the store untouched.
    pub fn ingest(&self, request: TouchpointRequest) -> EngineResult<Touchpoint> {
        let touchpoint = score_touchpoint(request)?;
        let identity = touchpoint.identity().to_string();

        match self.stitch(&identity, &touchpoint) {
            Ok(journey) => {
                metrics::counter!("touchpoints.tracked").increment(1);
                self.events.emit(make_event(
                    EventType::TouchpointTracked,
                    Some(identity.clone()),
                    Some(journey.id),
                    serde_json::json!({
                        "touchpoint_id": touchpoint.id,
                        "touchpoint_type": touchpoint.touchpoint_type,
                        "channel": touchpoint.channel,
                        "stage": touchpoint.stage,
                        "is_conversion": touchpoint.is_conversion,
                    }),
                ));
                self.events.emit(make_event(
                    EventType::JourneyUpdated,
                    Some(identity),
                    Some(journey.id),
                    serde_json::json!({
                        "touchpoint_count": journey.touchpoint_count(),
                        "converted": journey.converted,
                        "journey_value": journey.journey_value,
                    }),
                ));
                Ok(touchpoint)
            }
            Err(e) => {
                self.events.emit(make_event(
                    EventType::TrackingError,
                    Some(identity),
                    None,
                    serde_json::json!({"error": e.to_string()}),
                ));
                Err(e)
            }
        }
    }

    /// Stages the mutation on a local journey value and only commits to the
    /// store once the updated journey is fully built, so a failed ingest
    /// never leaves partial state behind.
    fn stitch(&self, identity: &str, touchpoint: &Touchpoint) -> EngineResult<CustomerJourney> {
        let journey = match self.find_active_journey(identity) {
            Some(active) => {
                debug!(journey_id = %active.id, identity, "extending active journey");
                Self::extend_journey(active, touchpoint)
            }
            None => {
                metrics::counter!("journeys.created").increment(1);
                let journey = Self::create_journey(identity, touchpoint);
                info!(journey_id = %journey.id, identity, "journey created");
                journey
            }
        };

        self.store.append_touchpoint(identity, touchpoint.clone());
        self.store.put_journey(journey.clone());
        Ok(journey)
    }

    /// The identity's journey with the latest end time, if it is still inside
    /// the active window. Journeys past the window are immutable from the
    /// stitcher's perspective.
    pub fn find_active_journey(&self, identity: &str) -> Option<CustomerJourney> {
        let latest = self
            .store
            .journeys_for_identity(identity)
            .into_iter()
            .max_by_key(|j| j.ended_at)?;
        if Utc::now().signed_duration_since(latest.ended_at) < self.session_window {
            Some(latest)
        } else {
            None
        }
    }

    fn create_journey(identity: &str, tp: &Touchpoint) -> CustomerJourney {
        let mut journey = CustomerJourney {
            id: Uuid::new_v4(),
            identity_id: identity.to_string(),
            session_ids: vec![tp.session_id.clone()],
            started_at: tp.timestamp,
            ended_at: tp.timestamp,
            duration_ms: 0,
            path: vec![tp.clone()],
            channels: vec![tp.channel],
            sources: vec![tp.source.clone()],
            stages: Default::default(),
            converted: tp.is_conversion,
            conversion_type: tp.conversion_type,
            conversion_value: tp.conversion_value.unwrap_or(0.0),
            journey_value: tp.value_score,
            efficiency: 0.0,
            engagement: 0.0,
            intent: 0.0,
            satisfaction: 0.0,
            attribution: Attribution {
                first_touch: tp.clone(),
                last_touch: tp.clone(),
                assisting: Vec::new(),
            },
        };
        Self::update_stage_bucket(&mut journey, tp);
        Self::recompute_scores(&mut journey);
        journey
    }

    fn extend_journey(mut journey: CustomerJourney, tp: &Touchpoint) -> CustomerJourney {
        journey.ended_at = tp.timestamp;
        journey.path.push(tp.clone());
        if !journey.session_ids.contains(&tp.session_id) {
            journey.session_ids.push(tp.session_id.clone());
        }
        if !journey.channels.contains(&tp.channel) {
            journey.channels.push(tp.channel);
        }
        if !journey.sources.contains(&tp.source) {
            journey.sources.push(tp.source.clone());
        }
        Self::update_stage_bucket(&mut journey, tp);

        if tp.is_conversion {
            // Sticky: a later non-conversion touchpoint never resets this.
            journey.converted = true;
            if tp.conversion_type.is_some() {
                journey.conversion_type = tp.conversion_type;
            }
            journey.conversion_value += tp.conversion_value.unwrap_or(0.0);
        }
        journey.journey_value += tp.value_score;

        journey.attribution.last_touch = tp.clone();
        let len = journey.path.len();
        journey.attribution.assisting = journey.path[1..len - 1].to_vec();

        Self::recompute_scores(&mut journey);
        journey
    }

    fn update_stage_bucket(journey: &mut CustomerJourney, tp: &Touchpoint) {
        let bucket = journey
            .stages
            .entry(tp.stage)
            .or_insert_with(StageBucket::default);
        bucket.touchpoints.push(tp.clone());
        let conversions = bucket.touchpoints.iter().filter(|t| t.is_conversion).count();
        bucket.conversion_rate = conversions as f64 / bucket.touchpoints.len() as f64;
    }

    fn recompute_scores(journey: &mut CustomerJourney) {
        let count = journey.path.len() as f64;
        let optimal = if journey.converted { 2.0 } else { 1.0 };
        journey.efficiency = (100.0 - 10.0 * (count - optimal)).max(10.0);
        journey.engagement =
            journey.path.iter().map(|t| t.engagement_score).sum::<f64>() / count;
        journey.intent = journey
            .path
            .iter()
            .map(|t| t.intent_score)
            .fold(0.0, f64::max);
        journey.satisfaction = 0.4 * journey.efficiency + 0.6 * journey.engagement;
        journey.duration_ms = journey
            .ended_at
            .signed_duration_since(journey.started_at)
            .num_milliseconds();
    }
}
