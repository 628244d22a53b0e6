use serde::{Deserialize, Serialize};

pub const MAX_REASON_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    #[default]
    Individual,
}

impl Segment {
    /// Only `individual` is served today; anything else (including nothing)
    /// is coerced to it instead of being rejected.
    pub fn from_optional_str(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("individual") => Self::Individual,
            _ => Self::default(),
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Individual => "individual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Invalid,
    Primary,
    Fallback,
}

impl Mode {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDefinition {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
}

impl ServiceAction {
    pub fn navigate(target: impl Into<String>) -> Self {
        Self {
            kind: "navigate".to_string(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub action: ServiceAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredIntent {
    pub id: String,
    pub label: String,
    pub confidence: f64,
    pub reason: String,
}

impl ScoredIntent {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        confidence: f64,
        reason: &str,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            confidence: clamp_confidence(confidence),
            reason: truncate_chars(reason, MAX_REASON_CHARS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub mode: Mode,
    pub segment: Segment,
    pub input_text: String,
    pub detected_intent: Option<String>,
    pub confidence: f64,
    pub top_intents: Vec<ScoredIntent>,
    pub services: Vec<ServiceRecord>,
    pub service_bundle: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl ClassificationResult {
    pub fn invalid(segment: Segment, input_text: impl Into<String>) -> Self {
        Self {
            mode: Mode::Invalid,
            segment,
            input_text: input_text.into(),
            detected_intent: None,
            confidence: 0.0,
            top_intents: Vec::new(),
            services: Vec::new(),
            service_bundle: Vec::new(),
            fallback_reason: None,
        }
    }

    /// Builds a ranked result; the head of `top_intents` becomes the
    /// detected intent and `service_bundle` mirrors `services` titles.
    pub fn ranked(
        mode: Mode,
        segment: Segment,
        input_text: impl Into<String>,
        top_intents: Vec<ScoredIntent>,
        services: Vec<ServiceRecord>,
    ) -> Self {
        let detected_intent = top_intents.first().map(|intent| intent.id.clone());
        let confidence = top_intents
            .first()
            .map(|intent| intent.confidence)
            .unwrap_or(0.0);
        let service_bundle = services
            .iter()
            .map(|service| service.title.clone())
            .collect();

        Self {
            mode,
            segment,
            input_text: input_text.into(),
            detected_intent,
            confidence,
            top_intents,
            services,
            service_bundle,
            fallback_reason: None,
        }
    }

    pub fn with_fallback_reason(mut self, reason: impl Into<String>) -> Self {
        self.fallback_reason = Some(reason.into());
        self
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}
