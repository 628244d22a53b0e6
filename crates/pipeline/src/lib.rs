mod config;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use gie_core::{
    Catalog, ClassificationResult, Mode, QueryValidator, ScoredIntent, Segment, Verdict,
};
use gie_ml::{
    ClassifierError, CompletionBackend, KeywordClassifier, LlmIntentClassifier, OpenAiBackend,
};
use gie_observability::AppMetrics;
use tracing::{debug, info, instrument, warn};

pub use config::{EngineConfig, MAX_TOP_K};

/// The pipeline wired to the OpenAI backend, as the binaries run it.
pub type Engine = ClassificationPipeline<OpenAiBackend>;

pub struct ClassificationPipeline<B> {
    catalog: Arc<Catalog>,
    validator: QueryValidator,
    keywords: KeywordClassifier,
    primary: LlmIntentClassifier<B>,
    metrics: Arc<AppMetrics>,
    top_k: usize,
}

impl ClassificationPipeline<OpenAiBackend> {
    pub fn from_config(config: &EngineConfig, metrics: Arc<AppMetrics>) -> Result<Self> {
        let catalog = Arc::new(config.load_catalog()?);
        let backend = match &config.openai {
            Some(openai) => Some(
                OpenAiBackend::new(openai.clone()).context("failed to build model backend")?,
            ),
            None => None,
        };

        info!(
            intents = catalog.intents().len(),
            primary_classifier = backend.is_some(),
            top_k = config.top_k,
            "classification pipeline ready"
        );

        Ok(Self::new(catalog, backend, metrics).with_top_k(config.top_k))
    }
}

impl<B> ClassificationPipeline<B>
where
    B: CompletionBackend,
{
    pub fn new(catalog: Arc<Catalog>, backend: Option<B>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            validator: QueryValidator::new(catalog.validator_rules()),
            keywords: KeywordClassifier::new(catalog.clone()),
            primary: LlmIntentClassifier::new(catalog.clone(), backend),
            catalog,
            metrics,
            top_k: gie_ml::DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.clamp(1, MAX_TOP_K);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    pub fn primary_available(&self) -> bool {
        self.primary.is_available()
    }

    pub fn backend(&self) -> Option<&B> {
        self.primary.backend()
    }

    pub fn inspect(&self, text: &str) -> Verdict {
        self.validator.inspect(text)
    }

    pub async fn run_pipeline(&self, user_text: &str) -> ClassificationResult {
        self.classify(None, user_text).await
    }

    /// Validation, then the model, then keywords if the model failed. Once
    /// the text is accepted a ranked result is always produced.
    #[instrument(skip(self, user_text), fields(chars = user_text.chars().count()))]
    pub async fn classify(&self, segment: Option<&str>, user_text: &str) -> ClassificationResult {
        let started = Instant::now();

        let segment = Segment::from_optional_str(segment);
        let text = user_text.trim();

        let verdict = self.validator.inspect(text);
        let result = if !verdict.is_accepted() {
            debug!(verdict = ?verdict, "query rejected");
            ClassificationResult::invalid(segment, text)
        } else {
            match self.primary.classify(text, self.top_k).await {
                Ok(top_intents) => self.ranked(Mode::Primary, segment, text, top_intents),
                Err(err) => {
                    match err {
                        ClassifierError::Unavailable => {
                            debug!("primary classifier unavailable, using keywords")
                        }
                        ClassifierError::Timeout => {
                            self.metrics.record_model_timeout();
                            warn!(error = %err, "primary classifier timed out, using keywords")
                        }
                        _ => warn!(error = %err, "primary classifier failed, using keywords"),
                    }
                    let top_intents = self.keywords.rank(text, self.top_k);
                    self.ranked(Mode::Fallback, segment, text, top_intents)
                        .with_fallback_reason(err.to_string())
                }
            }
        };

        self.metrics.record(result.mode, started.elapsed());
        info!(
            mode = result.mode.as_code(),
            detected_intent = ?result.detected_intent,
            confidence = result.confidence,
            "query classified"
        );

        result
    }

    fn ranked(
        &self,
        mode: Mode,
        segment: Segment,
        text: &str,
        mut top_intents: Vec<ScoredIntent>,
    ) -> ClassificationResult {
        top_intents.retain(|intent| self.catalog.contains(&intent.id));
        top_intents.truncate(self.top_k);

        let services = self
            .catalog
            .services_for(top_intents.first().map(|intent| intent.id.as_str()))
            .to_vec();

        ClassificationResult::ranked(mode, segment, text, top_intents, services)
    }
}
