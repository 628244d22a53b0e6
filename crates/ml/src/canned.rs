use parking_lot::Mutex;

use crate::{ClassifierError, CompletionBackend, CompletionRequest};

/// In-memory backend that replays a fixed reply (or failure) and keeps the
/// requests it was given. Only built for tests and the `test-util` feature.
#[derive(Debug)]
pub struct CannedBackend {
    reply: Result<String, String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl CannedBackend {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

impl CompletionBackend for CannedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClassifierError> {
        self.requests.lock().push(request.clone());
        self.reply.clone().map_err(ClassifierError::Transport)
    }
}
