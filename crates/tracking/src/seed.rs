//! Demo data seeding for development and manual testing.

use chrono::{Duration, Utc};
use tracing::info;

use journeypulse_core::types::TouchpointRequest;

use crate::engine::JourneyEngine;

/// Seeds a handful of representative identities: a converting pricing→demo
/// journey, a blog reader, and a form abandoner.
pub fn seed_demo_touchpoints(engine: &JourneyEngine) {
    info!("seeding demo touchpoints");

    let now = Utc::now();
    let requests = vec![
        // Alice reads the blog, checks pricing, then books a demo.
        TouchpointRequest {
            session_id: "demo-sess-alice".into(),
            user_id: Some("demo-alice".into()),
            touchpoint_type: "page_view".into(),
            channel: "organic".into(),
            source: "google".into(),
            medium: "organic".into(),
            page: Some("/blog/getting-started".into()),
            timestamp: Some(now - Duration::minutes(20)),
            ..Default::default()
        },
        TouchpointRequest {
            session_id: "demo-sess-alice".into(),
            user_id: Some("demo-alice".into()),
            touchpoint_type: "page_view".into(),
            channel: "web".into(),
            source: "site".into(),
            medium: "internal".into(),
            page: Some("/pricing".into()),
            timestamp: Some(now - Duration::minutes(12)),
            ..Default::default()
        },
        TouchpointRequest {
            session_id: "demo-sess-alice".into(),
            user_id: Some("demo-alice".into()),
            touchpoint_type: "demo_request".into(),
            channel: "direct".into(),
            source: "site".into(),
            medium: "internal".into(),
            page: Some("/request-demo".into()),
            timestamp: Some(now - Duration::minutes(8)),
            ..Default::default()
        },
        // Anonymous blog reader.
        TouchpointRequest {
            session_id: "demo-sess-anon".into(),
            touchpoint_type: "page_view".into(),
            channel: "social".into(),
            source: "linkedin".into(),
            medium: "social".into(),
            page: Some("/blog/customer-stories".into()),
            timestamp: Some(now - Duration::minutes(15)),
            ..Default::default()
        },
        // Bob browses features, starts the contact form, never converts.
        TouchpointRequest {
            session_id: "demo-sess-bob".into(),
            user_id: Some("demo-bob".into()),
            touchpoint_type: "page_view".into(),
            channel: "paid".into(),
            source: "ads".into(),
            medium: "cpc".into(),
            page: Some("/features".into()),
            timestamp: Some(now - Duration::minutes(10)),
            ..Default::default()
        },
        TouchpointRequest {
            session_id: "demo-sess-bob".into(),
            user_id: Some("demo-bob".into()),
            touchpoint_type: "click".into(),
            channel: "web".into(),
            source: "site".into(),
            medium: "internal".into(),
            page: Some("/contact".into()),
            element: Some("contact-form-start".into()),
            timestamp: Some(now - Duration::minutes(6)),
            ..Default::default()
        },
    ];

    let mut tracked = 0usize;
    for request in requests {
        match engine.track(request) {
            Ok(_) => tracked += 1,
            Err(e) => tracing::warn!(error = %e, "demo touchpoint rejected"),
        }
    }

    info!(tracked, "demo touchpoints seeded");
}

#[cfg(test)]
mod tests {
    use super::*;
    use journeypulse_core::config::AppConfig;
    use journeypulse_core::event_bus::noop_sink;

    #[test]
    fn test_seed_creates_journeys() {
        let engine = JourneyEngine::in_memory(AppConfig::default(), noop_sink());
        seed_demo_touchpoints(&engine);

        assert_eq!(engine.journeys_for_identity("demo-alice").len(), 1);
        assert!(engine.journeys_for_identity("demo-alice")[0].converted);
        assert_eq!(engine.journeys_for_identity("demo-bob").len(), 1);
        assert!(!engine.journeys_for_identity("demo-bob")[0].converted);
    }
}
