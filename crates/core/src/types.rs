use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Identity used for touchpoints arriving without a user id.
pub const ANONYMOUS_IDENTITY: &str = "anonymous";

// ─── Touchpoint Classification ──────────────────────────────────────────

/// The kind of interaction a touchpoint records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchpointType {
    PageView,
    Click,
    FormSubmission,
    Download,
    VideoPlay,
    Scroll,
    EmailOpen,
    EmailClick,
    SocialShare,
    ChatStart,
    CallRequest,
    DemoRequest,
}

impl TouchpointType {
    /// Parses the raw ingestion field, rejecting unknown values before any
    /// state is mutated.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        match raw {
            "page_view" => Ok(Self::PageView),
            "click" => Ok(Self::Click),
            "form_submission" => Ok(Self::FormSubmission),
            "download" => Ok(Self::Download),
            "video_play" => Ok(Self::VideoPlay),
            "scroll" => Ok(Self::Scroll),
            "email_open" => Ok(Self::EmailOpen),
            "email_click" => Ok(Self::EmailClick),
            "social_share" => Ok(Self::SocialShare),
            "chat_start" => Ok(Self::ChatStart),
            "call_request" => Ok(Self::CallRequest),
            "demo_request" => Ok(Self::DemoRequest),
            other => Err(EngineError::InvalidTouchpointType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::Click => "click",
            Self::FormSubmission => "form_submission",
            Self::Download => "download",
            Self::VideoPlay => "video_play",
            Self::Scroll => "scroll",
            Self::EmailOpen => "email_open",
            Self::EmailClick => "email_click",
            Self::SocialShare => "social_share",
            Self::ChatStart => "chat_start",
            Self::CallRequest => "call_request",
            Self::DemoRequest => "demo_request",
        }
    }
}

/// Acquisition channel a touchpoint arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Web,
    Email,
    Social,
    Paid,
    Organic,
    Direct,
    Referral,
    Chat,
    Phone,
}

impl Channel {
    pub fn parse(raw: &str) -> EngineResult<Self> {
        match raw {
            "web" => Ok(Self::Web),
            "email" => Ok(Self::Email),
            "social" => Ok(Self::Social),
            "paid" => Ok(Self::Paid),
            "organic" => Ok(Self::Organic),
            "direct" => Ok(Self::Direct),
            "referral" => Ok(Self::Referral),
            "chat" => Ok(Self::Chat),
            "phone" => Ok(Self::Phone),
            other => Err(EngineError::InvalidChannel(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Email => "email",
            Self::Social => "social",
            Self::Paid => "paid",
            Self::Organic => "organic",
            Self::Direct => "direct",
            Self::Referral => "referral",
            Self::Chat => "chat",
            Self::Phone => "phone",
        }
    }
}

/// Content category derived from page/content text by keyword matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Blog,
    Demo,
    Pricing,
    Features,
    CaseStudy,
    Documentation,
    Support,
    Company,
    Other,
}

/// Funnel stage a touchpoint is assigned to, by trigger priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStage {
    Awareness,
    Consideration,
    Evaluation,
    Purchase,
}

/// Classification of a conversion touchpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    Trial,
    Lead,
    Purchase,
}

// ─── Touchpoint ─────────────────────────────────────────────────────────

/// Raw ingestion request as supplied by the external tracking layer.
/// Type and channel arrive as strings and are validated during scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TouchpointRequest {
    pub session_id: String,
    pub user_id: Option<String>,
    pub touchpoint_type: String,
    pub channel: String,
    pub source: String,
    pub medium: String,
    pub campaign: Option<String>,
    pub page: Option<String>,
    pub content: Option<String>,
    pub element: Option<String>,
    pub conversion_value: Option<f64>,
    /// Event time; defaults to ingestion time when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

/// An immutable, fully-scored record of one customer interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Touchpoint {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub user_id: Option<String>,
    pub touchpoint_type: TouchpointType,
    pub channel: Channel,
    pub source: String,
    pub medium: String,
    pub campaign: Option<String>,
    pub page: Option<String>,
    pub content: Option<String>,
    pub element: Option<String>,
    pub category: ContentCategory,
    /// 0–100, interaction-type base + channel bonus + page-keyword bonus.
    pub value_score: f64,
    /// 0–100, interaction-type bonus + flat session-context increment.
    pub engagement_score: f64,
    /// 0–100, high-intent type and page keyword bonuses.
    pub intent_score: f64,
    pub stage: JourneyStage,
    pub is_conversion: bool,
    pub conversion_type: Option<ConversionType>,
    pub conversion_value: Option<f64>,
}

impl Touchpoint {
    /// Identity this touchpoint belongs to; anonymous when no user id is set.
    pub fn identity(&self) -> &str {
        self.user_id.as_deref().unwrap_or(ANONYMOUS_IDENTITY)
    }
}

// ─── Customer Journey ───────────────────────────────────────────────────

/// Touchpoints grouped under one funnel stage within a journey.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageBucket {
    pub touchpoints: Vec<Touchpoint>,
    /// Conversions divided by touchpoints within this stage.
    pub conversion_rate: f64,
}

/// First-touch / last-touch / assisting attribution over a journey path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub first_touch: Touchpoint,
    pub last_touch: Touchpoint,
    /// Touchpoints strictly between first and last.
    pub assisting: Vec<Touchpoint>,
}

/// A mutable aggregate over the ordered touchpoints of one identity within
/// the active session window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerJourney {
    pub id: Uuid,
    pub identity_id: String,
    pub session_ids: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
    /// Ordered, append-only touchpoint path.
    pub path: Vec<Touchpoint>,
    pub channels: Vec<Channel>,
    pub sources: Vec<String>,
    pub stages: HashMap<JourneyStage, StageBucket>,
    /// Sticky — once true, never reset by later touchpoints.
    pub converted: bool,
    pub conversion_type: Option<ConversionType>,
    pub conversion_value: f64,
    /// Running sum of touchpoint value scores.
    pub journey_value: f64,
    /// max(10, 100 − 10·(touchpoints − optimal)); optimal is 2 when
    /// converted, 1 otherwise.
    pub efficiency: f64,
    /// Mean of touchpoint engagement scores.
    pub engagement: f64,
    /// Max of touchpoint intent scores.
    pub intent: f64,
    /// 0.4·efficiency + 0.6·engagement.
    pub satisfaction: f64,
    pub attribution: Attribution,
}

impl CustomerJourney {
    pub fn touchpoint_count(&self) -> usize {
        self.path.len()
    }
}

// ─── Mined Patterns ─────────────────────────────────────────────────────

/// One step of a mined conversion path's touchpoint breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathStep {
    pub position: usize,
    pub touchpoint_type: TouchpointType,
    pub channel: Channel,
    pub value: f64,
    pub time_to_next_ms: Option<i64>,
}

/// A conversion pattern keyed by the ordered `(type, channel)` sequence of a
/// converted journey's full path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionPath {
    pub id: Uuid,
    /// Ordered `type_channel` entries; exact match, order matters.
    pub signature: Vec<String>,
    pub frequency: u64,
    /// Always 100 — patterns are mined from converted journeys only.
    pub conversion_rate: f64,
    pub average_duration_ms: f64,
    pub average_touchpoints: f64,
    pub efficiency: f64,
    pub satisfaction: f64,
    pub total_conversions: u64,
    pub total_revenue: f64,
    pub average_order_value: f64,
    pub steps: Vec<PathStep>,
    pub mined_at: DateTime<Utc>,
}

/// A terminal non-converting touchpoint pattern keyed by
/// `(type, channel, page)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropOffAnalysis {
    /// The `type_channel_page` signature.
    pub id: String,
    pub touchpoint_type: TouchpointType,
    pub channel: Channel,
    pub page: String,
    /// Touchpoint occurrences of this signature across all journey paths.
    pub total_occurrences: u64,
    /// Journeys ending on this signature without converting.
    pub drop_off_count: u64,
    pub drop_off_rate: f64,
    /// min(100, 70·rate + 10·ln(dropOffCount)).
    pub impact_score: f64,
    pub device_breakdown: HashMap<String, f64>,
    pub time_of_day_breakdown: HashMap<String, f64>,
    pub source_breakdown: HashMap<String, f64>,
    pub likely_reasons: Vec<String>,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

// ─── Optimizations ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    ReduceFriction,
    ImproveContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    Low,
    Medium,
    High,
}

/// A single improvement opportunity found on a mined path step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOpportunity {
    pub step_position: usize,
    pub kind: OpportunityKind,
    pub description: String,
    pub expected_improvement_pct: f64,
    pub confidence: f64,
    pub effort: EffortLevel,
    pub priority: u8,
}

/// Static recommendation buckets attached to every optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationTiers {
    pub immediate: Vec<String>,
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

/// Ranked improvement opportunities derived from a top conversion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyOptimization {
    pub id: Uuid,
    pub path_id: Uuid,
    pub path_signature: Vec<String>,
    pub opportunities: Vec<OptimizationOpportunity>,
    pub projected_conversion_increase: f64,
    pub projected_revenue_impact: f64,
    pub recommendations: RecommendationTiers,
    pub generated_at: DateTime<Utc>,
}

// ─── Query Façade Views ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationNode {
    pub touchpoint_id: Uuid,
    pub touchpoint_type: TouchpointType,
    pub channel: Channel,
    pub page: Option<String>,
    pub stage: JourneyStage,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Directed edge between consecutive touchpoints carrying the elapsed time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationEdge {
    pub from: Uuid,
    pub to: Uuid,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
    pub touchpoint_count: usize,
    pub conversion_rate: f64,
}

/// Node/edge graph of a single journey plus per-stage rollups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyVisualization {
    pub journey_id: Uuid,
    pub nodes: Vec<VisualizationNode>,
    pub edges: Vec<VisualizationEdge>,
    pub stage_summary: HashMap<JourneyStage, StageSummary>,
    pub converted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub journey_count: usize,
    pub touchpoint_count: usize,
    pub conversion_path_count: usize,
    pub drop_off_count: usize,
    pub optimization_count: usize,
    pub issues: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

// ─── Outbound Events ────────────────────────────────────────────────────

/// Named notification events consumed by dashboards/alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TouchpointTracked,
    JourneyUpdated,
    ConversionPathsAnalyzed,
    DropoffIdentified,
    OptimizationsGenerated,
    TrackingError,
    AnalysisError,
}

/// Event emitted on the engine's outbound notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub identity_id: Option<String>,
    pub journey_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touchpoint_type_round_trip() {
        for raw in [
            "page_view",
            "click",
            "form_submission",
            "download",
            "video_play",
            "scroll",
            "email_open",
            "email_click",
            "social_share",
            "chat_start",
            "call_request",
            "demo_request",
        ] {
            let parsed = TouchpointType::parse(raw).unwrap();
            assert_eq!(parsed.as_str(), raw);
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = TouchpointType::parse("hover").unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::InvalidTouchpointType(_)
        ));
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let err = Channel::parse("carrier_pigeon").unwrap_err();
        assert!(matches!(err, crate::error::EngineError::InvalidChannel(_)));
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let json = serde_json::to_string(&JourneyStage::Consideration).unwrap();
        assert_eq!(json, "\"consideration\"");
    }
}
