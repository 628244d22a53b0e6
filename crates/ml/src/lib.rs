mod backend;
#[cfg(any(test, feature = "test-util"))]
mod canned;
mod keyword;
mod llm;

use thiserror::Error;

pub use backend::{
    extract_output_text, CompletionBackend, CompletionRequest, OpenAiBackend, OpenAiConfig,
    DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
};
#[cfg(any(test, feature = "test-util"))]
pub use canned::CannedBackend;
pub use keyword::{keyword_confidence, KeywordClassifier, KEYWORD_REASON};
pub use llm::{parse_reply, strip_code_fence, LlmIntentClassifier, DEFAULT_TOP_K};

/// Every way the primary classifier can fail. None of these reach the
/// caller of the pipeline; they select the keyword fallback instead.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("primary classifier unavailable: no model credential configured")]
    Unavailable,
    #[error("model request timed out")]
    Timeout,
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model reply carried no output text")]
    EmptyOutput,
    #[error("model reply is malformed: {0}")]
    Malformed(String),
}
