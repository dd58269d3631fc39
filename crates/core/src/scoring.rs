//! Touchpoint scorer — pure derivation of value/engagement/intent scores,
//! content category, journey stage, and conversion classification for one
//! incoming event. No state, no side effects; identical raw fields always
//! produce identical derived fields.

use chrono::Utc;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::types::{
    Channel, ContentCategory, ConversionType, JourneyStage, Touchpoint, TouchpointRequest,
    TouchpointType,
};

const MAX_SCORE: f64 = 100.0;

/// Flat session-context increment applied to every engagement score.
const SESSION_CONTEXT_BONUS: f64 = 10.0;

/// Validates and scores a raw ingestion request into a full [`Touchpoint`].
///
/// Rejects unknown type/channel values before anything else; all other raw
/// fields are carried through unchanged.
pub fn score_touchpoint(request: TouchpointRequest) -> EngineResult<Touchpoint> {
    let touchpoint_type = TouchpointType::parse(&request.touchpoint_type)?;
    let channel = Channel::parse(&request.channel)?;

    let haystack = text_haystack(request.page.as_deref(), request.content.as_deref());
    let category = content_category(&haystack);
    let stage = journey_stage(touchpoint_type, &haystack);

    let value_score = value_score(touchpoint_type, channel, request.page.as_deref());
    let engagement_score = engagement_score(touchpoint_type);
    let intent_score = intent_score(touchpoint_type, &haystack);

    let is_conversion = is_conversion(touchpoint_type, request.conversion_value);
    let conversion_type = conversion_type(touchpoint_type, request.conversion_value);

    Ok(Touchpoint {
        id: Uuid::new_v4(),
        timestamp: request.timestamp.unwrap_or_else(Utc::now),
        session_id: request.session_id,
        user_id: request.user_id,
        touchpoint_type,
        channel,
        source: request.source,
        medium: request.medium,
        campaign: request.campaign,
        page: request.page,
        content: request.content,
        element: request.element,
        category,
        value_score,
        engagement_score,
        intent_score,
        stage,
        is_conversion,
        conversion_type,
        conversion_value: request.conversion_value,
    })
}

/// Lowercased concatenation of content and page text used for keyword rules.
fn text_haystack(page: Option<&str>, content: Option<&str>) -> String {
    let mut text = String::new();
    if let Some(content) = content {
        text.push_str(&content.to_lowercase());
        text.push(' ');
    }
    if let Some(page) = page {
        text.push_str(&page.to_lowercase());
    }
    text
}

/// Case-insensitive substring rules, first match wins, default `Other`.
fn content_category(haystack: &str) -> ContentCategory {
    const RULES: &[(&str, ContentCategory)] = &[
        ("blog", ContentCategory::Blog),
        ("demo", ContentCategory::Demo),
        ("pricing", ContentCategory::Pricing),
        ("feature", ContentCategory::Features),
        ("case", ContentCategory::CaseStudy),
        ("doc", ContentCategory::Documentation),
        ("support", ContentCategory::Support),
        ("about", ContentCategory::Company),
        ("company", ContentCategory::Company),
    ];
    for (keyword, category) in RULES {
        if haystack.contains(keyword) {
            return *category;
        }
    }
    ContentCategory::Other
}

/// Interaction-type base + channel bonus + page-keyword bonus, capped at 100.
fn value_score(touchpoint_type: TouchpointType, channel: Channel, page: Option<&str>) -> f64 {
    let base = match touchpoint_type {
        TouchpointType::Scroll => 2.0,
        TouchpointType::Click => 3.0,
        TouchpointType::EmailOpen => 4.0,
        TouchpointType::PageView => 5.0,
        TouchpointType::EmailClick => 8.0,
        TouchpointType::SocialShare => 10.0,
        TouchpointType::VideoPlay => 12.0,
        TouchpointType::Download => 15.0,
        TouchpointType::ChatStart => 20.0,
        TouchpointType::FormSubmission => 30.0,
        TouchpointType::CallRequest => 35.0,
        TouchpointType::DemoRequest => 40.0,
    };

    let channel_bonus = match channel {
        Channel::Paid => 4.0,
        Channel::Web => 5.0,
        Channel::Social => 6.0,
        Channel::Email => 8.0,
        Channel::Organic | Channel::Referral => 10.0,
        Channel::Direct => 12.0,
        Channel::Chat => 15.0,
        Channel::Phone => 20.0,
    };

    let page_bonus = page.map_or(0.0, |page| {
        let page = page.to_lowercase();
        const RULES: &[(&str, f64)] = &[
            ("demo", 25.0),
            ("trial", 25.0),
            ("pricing", 20.0),
            ("contact", 15.0),
            ("case", 10.0),
            ("feature", 10.0),
            ("blog", 5.0),
        ];
        RULES
            .iter()
            .find(|(keyword, _)| page.contains(keyword))
            .map_or(0.0, |(_, bonus)| *bonus)
    });

    (base + channel_bonus + page_bonus).min(MAX_SCORE)
}

/// Interaction-type bonus plus the flat session-context increment, capped.
fn engagement_score(touchpoint_type: TouchpointType) -> f64 {
    let base = match touchpoint_type {
        TouchpointType::Scroll => 5.0,
        TouchpointType::EmailOpen => 8.0,
        TouchpointType::PageView => 10.0,
        TouchpointType::Click => 15.0,
        TouchpointType::EmailClick => 18.0,
        TouchpointType::SocialShare => 25.0,
        TouchpointType::Download => 25.0,
        TouchpointType::VideoPlay => 30.0,
        TouchpointType::ChatStart => 35.0,
        TouchpointType::FormSubmission => 40.0,
        TouchpointType::CallRequest => 45.0,
        TouchpointType::DemoRequest => 50.0,
    };
    (base + SESSION_CONTEXT_BONUS).min(MAX_SCORE)
}

/// High-intent interaction types and page keywords, capped at 100.
fn intent_score(touchpoint_type: TouchpointType, haystack: &str) -> f64 {
    let type_bonus = match touchpoint_type {
        TouchpointType::DemoRequest => 60.0,
        TouchpointType::CallRequest => 55.0,
        TouchpointType::FormSubmission => 45.0,
        TouchpointType::ChatStart => 35.0,
        TouchpointType::Download => 25.0,
        TouchpointType::EmailClick | TouchpointType::VideoPlay => 15.0,
        _ => 10.0,
    };

    const PAGE_RULES: &[(&str, f64)] = &[
        ("demo", 35.0),
        ("trial", 35.0),
        ("pricing", 30.0),
        ("contact", 25.0),
        ("comparison", 20.0),
        ("case", 15.0),
    ];
    let page_bonus = PAGE_RULES
        .iter()
        .find(|(keyword, _)| haystack.contains(keyword))
        .map_or(0.0, |(_, bonus)| *bonus);

    (type_bonus + page_bonus).min(MAX_SCORE)
}

/// Stage triggers in priority order: purchase outranks evaluation outranks
/// consideration; awareness is the default.
fn journey_stage(touchpoint_type: TouchpointType, haystack: &str) -> JourneyStage {
    if touchpoint_type == TouchpointType::DemoRequest
        || haystack.contains("trial")
        || haystack.contains("purchase")
    {
        return JourneyStage::Purchase;
    }
    if haystack.contains("pricing") || haystack.contains("comparison") || haystack.contains("case")
    {
        return JourneyStage::Evaluation;
    }
    if haystack.contains("feature") || haystack.contains("product") || haystack.contains("guide") {
        return JourneyStage::Consideration;
    }
    JourneyStage::Awareness
}

fn is_conversion(touchpoint_type: TouchpointType, conversion_value: Option<f64>) -> bool {
    matches!(
        touchpoint_type,
        TouchpointType::FormSubmission | TouchpointType::DemoRequest | TouchpointType::CallRequest
    ) || conversion_value.is_some_and(|v| v > 0.0)
}

/// Trial / lead / purchase, evaluated in that priority order; `None` when the
/// touchpoint is not a conversion of a typed kind.
fn conversion_type(
    touchpoint_type: TouchpointType,
    conversion_value: Option<f64>,
) -> Option<ConversionType> {
    match touchpoint_type {
        TouchpointType::DemoRequest => Some(ConversionType::Trial),
        TouchpointType::FormSubmission => Some(ConversionType::Lead),
        _ if conversion_value.is_some_and(|v| v > 0.0) => Some(ConversionType::Purchase),
        _ => None,
    }
}
