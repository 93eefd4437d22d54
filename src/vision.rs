//! Vision analysis and content moderation payloads.

use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, types::Usage};

fn require_url(value: &str, field: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("is required").with_field(field));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ValidationError::new("must be an http(s) URL").with_field(field));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionAnalyzeRequest {
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
}

impl VisionAnalyzeRequest {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            user_prompt: None,
        }
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.user_prompt = Some(prompt.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_url(&self.image_url, "image_url")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionTagsRequest {
    pub image_url: String,
}

impl VisionTagsRequest {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_url(&self.image_url, "image_url")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionOcrRequest {
    pub image_url: String,
}

impl VisionOcrRequest {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_url(&self.image_url, "image_url")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionVideoRequest {
    pub video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
}

impl VisionVideoRequest {
    pub fn new(video_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            user_prompt: None,
        }
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.user_prompt = Some(prompt.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_url(&self.video_url, "video_url")
    }
}

/// Shared response for every vision endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionResponse {
    #[serde(default)]
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationTextRequest {
    pub prompt: String,
}

impl ModerationTextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::new("is required").with_field("prompt"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationMediaRequest {
    pub media_url: String,
    pub is_video: bool,
}

impl ModerationMediaRequest {
    pub fn image(media_url: impl Into<String>) -> Self {
        Self {
            media_url: media_url.into(),
            is_video: false,
        }
    }

    pub fn video(media_url: impl Into<String>) -> Self {
        Self {
            media_url: media_url.into(),
            is_video: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_url(&self.media_url, "media_url")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResponse {
    pub category: String,
    pub score: f64,
    pub usage: Usage,
}
