//! Endpoint descriptors.
//!
//! Every API call is described by an [`Operation`]: HTTP method, expanded
//! path, query parameters, JSON body and the response type it decodes into.
//! Descriptors carry no control flow; the client's dispatcher executes them.
//! The builder functions in this module validate the typed request and
//! return a ready-to-dispatch descriptor, so callers can adjust it (for
//! instance with [`Operation::with_timeout`]) before handing it to
//! [`crate::Client::execute`].

use std::{fmt, time::Duration};

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::{
    chat::{ChatCompletionRequest, ChatCompletionResponse},
    embeddings::{EmbeddingRequest, EmbeddingResponse, RerankRequest, RerankResponse},
    errors::{Error, Result, ValidationError},
    threads::{CreateMessageBody, CreateRunBody, MessageList, Run, Thread, ThreadMessage},
    types::Role,
    vision::{
        ModerationMediaRequest, ModerationResponse, ModerationTextRequest, VisionAnalyzeRequest,
        VisionOcrRequest, VisionResponse, VisionTagsRequest, VisionVideoRequest,
    },
};

pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
pub const THREADS_PATH: &str = "/threads";
pub const THREAD_MESSAGES_PATH: &str = "/threads/{thread_id}/messages";
pub const THREAD_RUNS_PATH: &str = "/threads/{thread_id}/runs";
pub const THREAD_RUN_PATH: &str = "/threads/{thread_id}/runs/{run_id}";
pub const VISION_ANALYZE_PATH: &str = "/vision/analyze";
pub const VISION_TAGS_PATH: &str = "/vision/tags";
pub const VISION_OCR_PATH: &str = "/vision/ocr";
pub const VISION_VIDEO_PATH: &str = "/vision/video";
pub const MODERATION_TEXT_PATH: &str = "/moderation/text";
pub const MODERATION_MEDIA_PATH: &str = "/moderation/media";
pub const EMBEDDINGS_PATH: &str = "/embeddings";
pub const RERANK_PATH: &str = "/rerank";

pub(crate) type Check<T> = Box<dyn FnOnce(&mut T) -> std::result::Result<(), String> + Send>;

/// A single API call, ready for dispatch.
pub struct Operation<T> {
    pub(crate) method: Method,
    pub(crate) template: &'static str,
    pub(crate) path: String,
    pub(crate) query: Vec<(&'static str, String)>,
    pub(crate) body: Option<Value>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) check: Option<Check<T>>,
}

impl<T> Operation<T> {
    fn new(method: Method, template: &'static str, params: &[(&str, &str)]) -> Result<Self> {
        Ok(Self {
            method,
            template,
            path: expand_path(template, params)?,
            query: Vec::new(),
            body: None,
            timeout: None,
            check: None,
        })
    }

    fn with_body(mut self, body: &impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|err| ValidationError::new(format!("request is not serializable: {err}")))?;
        self.body = Some(value);
        Ok(self)
    }

    fn with_query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    fn with_check<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&mut T) -> std::result::Result<(), String> + Send + 'static,
    {
        self.check = Some(Box::new(check));
        self
    }

    /// Override the call budget (all retry attempts included).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path template this operation was built from, e.g. `/threads/{thread_id}/runs`.
    pub fn template(&self) -> &'static str {
        self.template
    }

    /// Path with parameters interpolated, relative to the base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(&'static str, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("check", &self.check.as_ref().map(|_| "check"))
            .finish()
    }
}

/// Interpolate `{name}` placeholders, percent-encoding each value.
pub fn expand_path(template: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::Config(format!("unterminated placeholder in {template}")))?;
        let name = &after[..end];
        let value = params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim())
            .ok_or_else(|| Error::Config(format!("missing path parameter {name} for {template}")))?;
        if value.is_empty() {
            return Err(ValidationError::new("is required").with_field(name).into());
        }
        out.push_str(&urlencoding::encode(value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn create_chat_completion(
    req: &ChatCompletionRequest,
) -> Result<Operation<ChatCompletionResponse>> {
    req.validate()?;
    Ok(Operation::new(Method::POST, CHAT_COMPLETIONS_PATH, &[])?
        .with_body(req)?
        .with_check(|resp: &mut ChatCompletionResponse| {
            if resp.choices.is_empty() {
                return Err("completion returned no choices".to_string());
            }
            resp.usage.check()
        }))
}

pub fn create_thread() -> Result<Operation<Thread>> {
    Operation::new(Method::POST, THREADS_PATH, &[])?.with_body(&serde_json::json!({}))
}

pub fn create_message(
    thread_id: &str,
    role: Role,
    content: &str,
) -> Result<Operation<ThreadMessage>> {
    if content.trim().is_empty() {
        return Err(ValidationError::new("is required").with_field("content").into());
    }
    Operation::new(
        Method::POST,
        THREAD_MESSAGES_PATH,
        &[("thread_id", thread_id)],
    )?
    .with_body(&CreateMessageBody { role, content })
}

/// Messages come back newest-first, as the service returns them.
pub fn list_messages(thread_id: &str, limit: u32) -> Result<Operation<MessageList>> {
    if limit == 0 {
        return Err(ValidationError::new("must be positive").with_field("limit").into());
    }
    Ok(Operation::new(
        Method::GET,
        THREAD_MESSAGES_PATH,
        &[("thread_id", thread_id)],
    )?
    .with_query("limit", limit))
}

pub fn create_run(
    thread_id: &str,
    assistant_id: &str,
    enable_thinking: Option<bool>,
) -> Result<Operation<Run>> {
    if assistant_id.trim().is_empty() {
        return Err(ValidationError::new("is required")
            .with_field("assistant_id")
            .into());
    }
    Operation::new(Method::POST, THREAD_RUNS_PATH, &[("thread_id", thread_id)])?.with_body(
        &CreateRunBody {
            assistant_id: assistant_id.trim(),
            enable_thinking,
        },
    )
}

pub fn get_run(thread_id: &str, run_id: &str) -> Result<Operation<Run>> {
    Operation::new(
        Method::GET,
        THREAD_RUN_PATH,
        &[("thread_id", thread_id), ("run_id", run_id)],
    )
}

fn vision_op(template: &'static str, body: &impl Serialize) -> Result<Operation<VisionResponse>> {
    Ok(Operation::new(Method::POST, template, &[])?
        .with_body(body)?
        .with_check(|resp: &mut VisionResponse| resp.usage.check()))
}

pub fn analyze_image(req: &VisionAnalyzeRequest) -> Result<Operation<VisionResponse>> {
    req.validate()?;
    vision_op(VISION_ANALYZE_PATH, req)
}

pub fn analyze_image_for_tags(req: &VisionTagsRequest) -> Result<Operation<VisionResponse>> {
    req.validate()?;
    vision_op(VISION_TAGS_PATH, req)
}

pub fn extract_text(req: &VisionOcrRequest) -> Result<Operation<VisionResponse>> {
    req.validate()?;
    vision_op(VISION_OCR_PATH, req)
}

pub fn analyze_video(req: &VisionVideoRequest) -> Result<Operation<VisionResponse>> {
    req.validate()?;
    vision_op(VISION_VIDEO_PATH, req)
}

pub fn moderate_text(req: &ModerationTextRequest) -> Result<Operation<ModerationResponse>> {
    req.validate()?;
    Ok(Operation::new(Method::POST, MODERATION_TEXT_PATH, &[])?
        .with_body(req)?
        .with_check(|resp: &mut ModerationResponse| resp.usage.check()))
}

pub fn moderate_media(req: &ModerationMediaRequest) -> Result<Operation<ModerationResponse>> {
    req.validate()?;
    Ok(Operation::new(Method::POST, MODERATION_MEDIA_PATH, &[])?
        .with_body(req)?
        .with_check(|resp: &mut ModerationResponse| resp.usage.check()))
}

/// Data in the decoded response is ordered so that `data[i].index == i`.
pub fn create_embedding(req: &EmbeddingRequest) -> Result<Operation<EmbeddingResponse>> {
    req.validate()?;
    let expected = req.input.len();
    Ok(Operation::new(Method::POST, EMBEDDINGS_PATH, &[])?
        .with_body(req)?
        .with_check(move |resp: &mut EmbeddingResponse| resp.normalize(expected)))
}

/// Results in the decoded response are sorted by descending relevance.
pub fn rerank(req: &RerankRequest) -> Result<Operation<RerankResponse>> {
    req.validate()?;
    let top_k = req.top_k;
    Ok(Operation::new(Method::POST, RERANK_PATH, &[])?
        .with_body(req)?
        .with_check(move |resp: &mut RerankResponse| resp.normalize(top_k)))
}
