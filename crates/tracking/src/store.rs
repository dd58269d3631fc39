//! Journey Store — concurrent-safe ownership of touchpoints-per-identity,
//! journeys-by-id, and the derived insight collections written back by the
//! periodic analyzers.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use journeypulse_core::types::{
    ConversionPath, CustomerJourney, DropOffAnalysis, JourneyOptimization, Touchpoint,
};

/// Abstract store interface. Journeys are committed whole-value, so a reader
/// always observes either the previous or the next version of a journey,
/// never a half-applied touchpoint append.
pub trait JourneyStore: Send + Sync {
    fn append_touchpoint(&self, identity: &str, touchpoint: Touchpoint);
    fn touchpoints_for_identity(&self, identity: &str) -> Vec<Touchpoint>;
    fn list_touchpoints(&self) -> Vec<Touchpoint>;
    fn touchpoint_count(&self) -> usize;

    fn put_journey(&self, journey: CustomerJourney);
    fn get_journey(&self, id: Uuid) -> Option<CustomerJourney>;
    fn journeys_for_identity(&self, identity: &str) -> Vec<CustomerJourney>;
    fn list_journeys(&self) -> Vec<CustomerJourney>;
    fn journey_count(&self) -> usize;

    fn replace_conversion_paths(&self, paths: Vec<ConversionPath>);
    fn list_conversion_paths(&self) -> Vec<ConversionPath>;
    fn replace_dropoff_analyses(&self, analyses: Vec<DropOffAnalysis>);
    fn list_dropoff_analyses(&self) -> Vec<DropOffAnalysis>;
    fn replace_optimizations(&self, optimizations: Vec<JourneyOptimization>);
    fn list_optimizations(&self) -> Vec<JourneyOptimization>;
}

/// In-memory store. Journeys and touchpoint lists live in `DashMap`s; the
/// derived collections are replaced wholesale per analysis cycle, so they sit
/// behind plain `RwLock`ed vectors.
#[derive(Default)]
pub struct MemoryJourneyStore {
    touchpoints: DashMap<String, Vec<Touchpoint>>,
    journeys: DashMap<Uuid, CustomerJourney>,
    /// Index: identity id -> journey ids owned by that identity.
    journeys_by_identity: DashMap<String, Vec<Uuid>>,
    conversion_paths: RwLock<Vec<ConversionPath>>,
    dropoff_analyses: RwLock<Vec<DropOffAnalysis>>,
    optimizations: RwLock<Vec<JourneyOptimization>>,
}

impl MemoryJourneyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl JourneyStore for MemoryJourneyStore {
    fn append_touchpoint(&self, identity: &str, touchpoint: Touchpoint) {
        self.touchpoints
            .entry(identity.to_string())
            .or_default()
            .push(touchpoint);
    }

    fn touchpoints_for_identity(&self, identity: &str) -> Vec<Touchpoint> {
        self.touchpoints
            .get(identity)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn list_touchpoints(&self) -> Vec<Touchpoint> {
        self.touchpoints
            .iter()
            .flat_map(|r| r.value().clone())
            .collect()
    }

    fn touchpoint_count(&self) -> usize {
        self.touchpoints.iter().map(|r| r.value().len()).sum()
    }

    fn put_journey(&self, journey: CustomerJourney) {
        let mut ids = self
            .journeys_by_identity
            .entry(journey.identity_id.clone())
            .or_default();
        if !ids.contains(&journey.id) {
            ids.push(journey.id);
        }
        drop(ids);
        self.journeys.insert(journey.id, journey);
    }

    fn get_journey(&self, id: Uuid) -> Option<CustomerJourney> {
        self.journeys.get(&id).map(|r| r.clone())
    }

    fn journeys_for_identity(&self, identity: &str) -> Vec<CustomerJourney> {
        let Some(ids) = self.journeys_by_identity.get(identity) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.journeys.get(id).map(|r| r.clone()))
            .collect()
    }

    fn list_journeys(&self) -> Vec<CustomerJourney> {
        self.journeys.iter().map(|r| r.value().clone()).collect()
    }

    fn journey_count(&self) -> usize {
        self.journeys.len()
    }

    fn replace_conversion_paths(&self, paths: Vec<ConversionPath>) {
        *self.conversion_paths.write() = paths;
    }

    fn list_conversion_paths(&self) -> Vec<ConversionPath> {
        self.conversion_paths.read().clone()
    }

    fn replace_dropoff_analyses(&self, analyses: Vec<DropOffAnalysis>) {
        *self.dropoff_analyses.write() = analyses;
    }

    fn list_dropoff_analyses(&self) -> Vec<DropOffAnalysis> {
        self.dropoff_analyses.read().clone()
    }

    fn replace_optimizations(&self, optimizations: Vec<JourneyOptimization>) {
        *self.optimizations.write() = optimizations;
    }

    fn list_optimizations(&self) -> Vec<JourneyOptimization> {
        self.optimizations.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use journeypulse_core::scoring::score_touchpoint;
    use journeypulse_core::types::{Attribution, TouchpointRequest};
    use std::collections::HashMap;

    fn touchpoint(user: &str) -> Touchpoint {
        score_touchpoint(TouchpointRequest {
            session_id: "sess-1".into(),
            user_id: Some(user.into()),
            touchpoint_type: "page_view".into(),
            channel: "web".into(),
            source: "google".into(),
            medium: "organic".into(),
            ..Default::default()
        })
        .unwrap()
    }

    fn journey(identity: &str) -> CustomerJourney {
        let tp = touchpoint(identity);
        CustomerJourney {
            id: Uuid::new_v4(),
            identity_id: identity.into(),
            session_ids: vec![tp.session_id.clone()],
            started_at: tp.timestamp,
            ended_at: tp.timestamp,
            duration_ms: 0,
            path: vec![tp.clone()],
            channels: vec![tp.channel],
            sources: vec![tp.source.clone()],
            stages: HashMap::new(),
            converted: false,
            conversion_type: None,
            conversion_value: 0.0,
            journey_value: tp.value_score,
            efficiency: 100.0,
            engagement: tp.engagement_score,
            intent: tp.intent_score,
            satisfaction: 0.0,
            attribution: Attribution {
                first_touch: tp.clone(),
                last_touch: tp.clone(),
                assisting: Vec::new(),
            },
        }
    }

    #[test]
    fn test_touchpoints_grouped_by_identity() {
        let store = MemoryJourneyStore::new();
        store.append_touchpoint("u-1", touchpoint("u-1"));
        store.append_touchpoint("u-1", touchpoint("u-1"));
        store.append_touchpoint("u-2", touchpoint("u-2"));

        assert_eq!(store.touchpoints_for_identity("u-1").len(), 2);
        assert_eq!(store.touchpoints_for_identity("u-2").len(), 1);
        assert_eq!(store.touchpoints_for_identity("u-3").len(), 0);
        assert_eq!(store.list_touchpoints().len(), 3);
        assert_eq!(store.touchpoint_count(), 3);
    }

    #[test]
    fn test_journey_identity_index() {
        let store = MemoryJourneyStore::new();
        let j1 = journey("u-1");
        let j2 = journey("u-1");
        let j3 = journey("u-2");
        store.put_journey(j1.clone());
        store.put_journey(j2.clone());
        store.put_journey(j3);

        let owned = store.journeys_for_identity("u-1");
        assert_eq!(owned.len(), 2);
        assert_eq!(store.journey_count(), 3);
        assert!(store.get_journey(j1.id).is_some());

        // Re-putting an updated journey must not duplicate the index entry.
        let mut updated = j1.clone();
        updated.converted = true;
        store.put_journey(updated);
        assert_eq!(store.journeys_for_identity("u-1").len(), 2);
        assert!(store.get_journey(j1.id).unwrap().converted);
    }

    #[test]
    fn test_derived_collections_replaced_wholesale() {
        let store = MemoryJourneyStore::new();
        assert!(store.list_conversion_paths().is_empty());

        let mined_at = Utc::now();
        let path = ConversionPath {
            id: Uuid::new_v4(),
            signature: vec!["page_view_web".into()],
            frequency: 3,
            conversion_rate: 100.0,
            average_duration_ms: 1_000.0,
            average_touchpoints: 1.0,
            efficiency: 100.0,
            satisfaction: 80.0,
            total_conversions: 3,
            total_revenue: 0.0,
            average_order_value: 0.0,
            steps: Vec::new(),
            mined_at,
        };
        store.replace_conversion_paths(vec![path]);
        assert_eq!(store.list_conversion_paths().len(), 1);

        store.replace_conversion_paths(Vec::new());
        assert!(store.list_conversion_paths().is_empty());
    }
}
