//! Embedding and rerank payloads, plus the response normalization the
//! dispatcher applies after decoding.

use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, types::Usage};

/// A single text or a batch of texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Batch(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for EmbeddingInput {
    fn from(value: &str) -> Self {
        EmbeddingInput::Single(value.to_string())
    }
}

impl From<String> for EmbeddingInput {
    fn from(value: String) -> Self {
        EmbeddingInput::Single(value)
    }
}

impl From<Vec<String>> for EmbeddingInput {
    fn from(value: Vec<String>) -> Self {
        EmbeddingInput::Batch(value)
    }
}

impl From<Vec<&str>> for EmbeddingInput {
    fn from(value: Vec<&str>) -> Self {
        EmbeddingInput::Batch(value.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingRequest {
    pub input: EmbeddingInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl EmbeddingRequest {
    pub fn new(input: impl Into<EmbeddingInput>) -> Self {
        Self {
            input: input.into(),
            model: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let empty = match &self.input {
            EmbeddingInput::Single(text) => text.is_empty(),
            EmbeddingInput::Batch(texts) => texts.is_empty(),
        };
        if empty {
            return Err(ValidationError::new("input must not be empty").with_field("input"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingDatum {
    pub embedding: Vec<f32>,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingDatum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub usage: Usage,
}

impl EmbeddingResponse {
    /// Order data by input position and check it covers every input exactly once.
    pub(crate) fn normalize(&mut self, expected: usize) -> Result<(), String> {
        if self.data.len() != expected {
            return Err(format!(
                "expected {} embeddings, received {}",
                expected,
                self.data.len()
            ));
        }
        self.data.sort_by_key(|d| d.index);
        for (position, datum) in self.data.iter().enumerate() {
            if datum.index != position {
                return Err(format!(
                    "embedding indices are not 0..{expected} (found {} at position {position})",
                    datum.index
                ));
            }
            if datum.embedding.is_empty() {
                return Err(format!("embedding {position} is empty"));
            }
        }
        self.usage.check()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankRequest {
    pub query: String,
    pub documents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl RerankRequest {
    pub fn new(query: impl Into<String>, documents: Vec<String>) -> Self {
        Self {
            query: query.into(),
            documents,
            top_k: None,
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::new("is required").with_field("query"));
        }
        if self.documents.is_empty() {
            return Err(
                ValidationError::new("at least one document is required").with_field("documents"),
            );
        }
        if self.top_k == Some(0) {
            return Err(ValidationError::new("must be positive").with_field("top_k"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    pub document: String,
    pub relevance_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResponse {
    pub results: Vec<RerankResult>,
    pub usage: Usage,
}

impl RerankResponse {
    /// Sort results by descending relevance and apply `top_k`.
    pub(crate) fn normalize(&mut self, top_k: Option<usize>) -> Result<(), String> {
        if let Some(bad) = self.results.iter().find(|r| r.relevance_score.is_nan()) {
            return Err(format!("relevance_score is NaN for document {:?}", bad.document));
        }
        self.results
            .sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        if let Some(k) = top_k {
            self.results.truncate(k);
        }
        self.usage.check()
    }
}
