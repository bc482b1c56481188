use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use futures_util::stream;

use super::gateway::{
    ChatCompletion, ChatCompletionRequest, CompletionStream, LlmGateway, LlmGatewayError,
    LlmGatewayFuture,
};

/// One canned provider answer.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Whole reply text. Streams as a single fragment.
    Text(String),
    /// Streamed fragments. Non-streamed calls receive them concatenated.
    Fragments(Vec<String>),
    /// Provider rejects the call outright.
    Fail(String),
    /// Provider accepts a stream, emits `fragments`, then breaks.
    FailAfter {
        fragments: Vec<String>,
        error: String,
    },
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fragments(fragments.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    completions: VecDeque<ScriptedReply>,
    streams: VecDeque<ScriptedReply>,
    completion_requests: Vec<ChatCompletionRequest>,
    stream_requests: Vec<ChatCompletionRequest>,
}

/// In-process gateway replaying queued replies. Non-streamed and streamed
/// calls draw from separate queues; every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    state: Mutex<ScriptState>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_completion(&self, reply: ScriptedReply) -> &Self {
        self.lock().completions.push_back(reply);
        self
    }

    pub fn push_stream(&self, reply: ScriptedReply) -> &Self {
        self.lock().streams.push_back(reply);
        self
    }

    pub fn completion_requests(&self) -> Vec<ChatCompletionRequest> {
        self.lock().completion_requests.clone()
    }

    pub fn stream_requests(&self) -> Vec<ChatCompletionRequest> {
        self.lock().stream_requests.clone()
    }

    pub fn pending_replies(&self) -> usize {
        let state = self.lock();
        state.completions.len() + state.streams.len()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl LlmGateway for ScriptedGateway {
    fn complete<'a>(
        &'a self,
        request: ChatCompletionRequest,
    ) -> LlmGatewayFuture<'a, ChatCompletion> {
        Box::pin(async move {
            let model = request.model.clone();
            let reply = {
                let mut state = self.lock();
                state.completion_requests.push(request);
                state.completions.pop_front()
            };

            let content = match reply {
                Some(ScriptedReply::Text(content)) => content,
                Some(ScriptedReply::Fragments(fragments)) => fragments.concat(),
                Some(ScriptedReply::Fail(error)) | Some(ScriptedReply::FailAfter { error, .. }) => {
                    return Err(LlmGatewayError::ProviderFailure(error));
                }
                None => return Err(exhausted()),
            };

            Ok(ChatCompletion {
                model,
                provider_request_id: None,
                content,
                usage: None,
            })
        })
    }

    fn stream<'a>(
        &'a self,
        request: ChatCompletionRequest,
    ) -> LlmGatewayFuture<'a, CompletionStream> {
        Box::pin(async move {
            let reply = {
                let mut state = self.lock();
                state.stream_requests.push(request);
                state.streams.pop_front()
            };

            let items: Vec<Result<String, LlmGatewayError>> = match reply {
                Some(ScriptedReply::Text(content)) => vec![Ok(content)],
                Some(ScriptedReply::Fragments(fragments)) => {
                    fragments.into_iter().map(Ok).collect()
                }
                Some(ScriptedReply::Fail(error)) => {
                    return Err(LlmGatewayError::ProviderFailure(error));
                }
                Some(ScriptedReply::FailAfter { fragments, error }) => fragments
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(LlmGatewayError::ProviderFailure(error))))
                    .collect(),
                None => return Err(exhausted()),
            };

            let fragments: CompletionStream = Box::pin(stream::iter(items));
            Ok(fragments)
        })
    }
}

fn exhausted() -> LlmGatewayError {
    LlmGatewayError::ProviderFailure("scripted_replies_exhausted".to_string())
}
