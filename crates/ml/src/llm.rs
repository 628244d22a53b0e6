use std::sync::Arc;

use gie_core::{Catalog, ScoredIntent};
use serde::Deserialize;
use tracing::debug;

use crate::backend::{CompletionBackend, CompletionRequest};
use crate::ClassifierError;

pub const DEFAULT_TOP_K: usize = 3;
const TEMPERATURE: f32 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 300;

const SYSTEM_PROMPT: &str = "أنت مصنّف نوايا لطلبات الخدمات الحكومية الرقمية المكتوبة بالعربية. \
اختر أقرب النوايا من القائمة الثابتة المرفقة فقط. أخرج JSON فقط دون أي نص إضافي.";

#[derive(Debug, Deserialize)]
struct ModelReply {
    top_intents: Vec<ModelIntent>,
}

#[derive(Debug, Deserialize)]
struct ModelIntent {
    id: String,
    #[serde(default)]
    confidence: Option<ModelConfidence>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelConfidence {
    Number(f64),
    Text(String),
}

impl ModelConfidence {
    fn value(&self) -> Result<f64, ClassifierError> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(raw) => raw.trim().parse::<f64>().map_err(|_| {
                ClassifierError::Malformed(format!("confidence `{raw}` is not a number"))
            }),
        }
    }
}

/// Primary classifier. Without a backend every call reports
/// [`ClassifierError::Unavailable`].
pub struct LlmIntentClassifier<B> {
    catalog: Arc<Catalog>,
    backend: Option<B>,
}

impl<B> LlmIntentClassifier<B>
where
    B: CompletionBackend,
{
    pub fn new(catalog: Arc<Catalog>, backend: Option<B>) -> Self {
        Self { catalog, backend }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub async fn classify(
        &self,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredIntent>, ClassifierError> {
        let backend = self.backend.as_ref().ok_or(ClassifierError::Unavailable)?;
        let request = self.build_request(text, top_k);
        let raw = backend.complete(&request).await?;
        parse_reply(&self.catalog, &raw, top_k)
    }

    pub fn build_request(&self, text: &str, top_k: usize) -> CompletionRequest {
        let intents_catalog = self
            .catalog
            .intents()
            .iter()
            .map(|intent| serde_json::json!({ "id": intent.id, "label": intent.label }))
            .collect::<Vec<_>>();

        let user = serde_json::json!({
            "text": text,
            "intents_catalog": intents_catalog,
            "required_output": {
                "top_intents": [
                    { "id": "intent_id", "confidence": 0.0, "reason": "سبب قصير" }
                ]
            },
            "rules": [
                "اختر فقط من معرّفات النوايا (id) الموجودة في intents_catalog.",
                format!("أعد {top_k} نتائج كحد أقصى مرتبة من الأعلى ثقة إلى الأقل."),
                "confidence رقم بين 0 و 1."
            ]
        });

        CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user.to_string(),
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

/// Decodes the model's JSON reply. Shape problems fail the whole reply;
/// ids outside the catalog are dropped one by one.
pub fn parse_reply(
    catalog: &Catalog,
    raw: &str,
    top_k: usize,
) -> Result<Vec<ScoredIntent>, ClassifierError> {
    let body = strip_code_fence(raw);
    let reply: ModelReply =
        serde_json::from_str(body).map_err(|err| ClassifierError::Malformed(err.to_string()))?;

    let mut ranked = Vec::new();
    for candidate in reply.top_intents {
        if !catalog.contains(&candidate.id) {
            debug!(intent_id = %candidate.id, "dropping intent outside the catalog");
            continue;
        }

        let confidence = candidate
            .confidence
            .as_ref()
            .map(ModelConfidence::value)
            .transpose()?
            .unwrap_or(0.0);
        let label = catalog.label_for(&candidate.id);
        ranked.push(ScoredIntent::new(
            candidate.id,
            label,
            confidence,
            candidate.reason.as_deref().unwrap_or_default(),
        ));
    }

    ranked.truncate(top_k);
    Ok(ranked)
}

/// Removes a surrounding ``` fence and an optional `json` language tag.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let inner = trimmed.trim_matches('`').trim();
    match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => inner[4..].trim(),
        _ => inner,
    }
}
