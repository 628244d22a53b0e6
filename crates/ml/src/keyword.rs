use std::sync::Arc;

use gie_core::{Catalog, ScoredIntent};

pub const KEYWORD_REASON: &str = "تطابق كلمات مفتاحية";

/// Deterministic substring scorer used when the model path is unavailable.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    catalog: Arc<Catalog>,
}

impl KeywordClassifier {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Counts raw, case-sensitive keyword hits per intent. Zero scores are
    /// dropped and ties keep catalog declaration order. Blank keywords never
    /// get here; `Catalog` refuses them.
    pub fn score(&self, text: &str) -> Vec<(&str, usize)> {
        let text = text.trim();
        let mut scored = self
            .catalog
            .intents()
            .iter()
            .map(|intent| {
                let hits = intent
                    .keywords
                    .iter()
                    .filter(|keyword| text.contains(keyword.as_str()))
                    .count();
                (intent.id.as_str(), hits)
            })
            .filter(|(_, hits)| *hits > 0)
            .collect::<Vec<_>>();

        // sort_by is stable
        scored.sort_by(|lhs, rhs| rhs.1.cmp(&lhs.1));
        scored
    }

    pub fn rank(&self, text: &str, top_k: usize) -> Vec<ScoredIntent> {
        self.score(text)
            .into_iter()
            .take(top_k)
            .map(|(intent_id, hits)| {
                ScoredIntent::new(
                    intent_id,
                    self.catalog.label_for(intent_id),
                    keyword_confidence(hits),
                    KEYWORD_REASON,
                )
            })
            .collect()
    }
}

/// `min(0.85, 0.30 + 0.15 * hits)`, computed in hundredths so the steps are
/// exact.
pub fn keyword_confidence(hits: usize) -> f64 {
    let hundredths = (30 + 15 * hits.min(4)).min(85);
    hundredths as f64 / 100.0
}
