// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response types for the Gemini REST API.
//!
//! Video generation goes through the long-running `predictLongRunning`
//! endpoint; still edits and previews go through `generateContent`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use vidra_core::{ImageInput, VidraError};

// --- predictLongRunning ---

/// Body of a `models/{model}:predictLongRunning` call.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

/// One video to generate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInstance {
    pub prompt: String,
    /// Start frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EncodedImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<ReferenceImage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParameters {
    pub aspect_ratio: String,
    pub resolution: String,
}

/// Image bytes in the shape the video endpoint expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

impl From<&ImageInput> for EncodedImage {
    fn from(image: &ImageInput) -> Self {
        Self {
            bytes_base64_encoded: STANDARD.encode(&image.data),
            mime_type: image.mime_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    pub image: EncodedImage,
    pub reference_type: String,
}

impl ReferenceImage {
    pub fn asset(image: &ImageInput) -> Self {
        Self {
            image: image.into(),
            reference_type: "asset".into(),
        }
    }
}

/// A long-running operation as returned by submit and poll.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<OperationResponse>,
}

impl Operation {
    /// URI of the first generated sample, if the operation produced one.
    pub fn first_sample_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .first()
            .map(|s| s.video.uri.as_str())
    }

    /// Filter reasons reported in place of samples.
    pub fn filtered_reasons(&self) -> &[String] {
        self.response
            .as_ref()
            .and_then(|r| r.generate_video_response.as_ref())
            .map(|g| g.rai_media_filtered_reasons.as_slice())
            .unwrap_or_default()
    }
}

/// gRPC-style status attached to a failed operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl OperationError {
    /// Canonical status name for the numeric code.
    pub fn status_name(&self) -> &'static str {
        match self.code {
            1 => "CANCELLED",
            3 => "INVALID_ARGUMENT",
            4 => "DEADLINE_EXCEEDED",
            5 => "NOT_FOUND",
            7 => "PERMISSION_DENIED",
            8 => "RESOURCE_EXHAUSTED",
            9 => "FAILED_PRECONDITION",
            13 => "INTERNAL",
            14 => "UNAVAILABLE",
            16 => "UNAUTHENTICATED",
            _ => "UNKNOWN",
        }
    }

    pub fn into_error(self) -> VidraError {
        VidraError::generation(format!(
            "{} {}: {}",
            self.code,
            self.status_name(),
            self.message
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
    /// Reasons given when every sample was withheld by content filters.
    #[serde(default)]
    pub rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedSample {
    pub video: VideoRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoRef {
    pub uri: String,
}

// --- generateContent ---

/// Body of a `models/{model}:generateContent` call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// A single user turn carrying the given images followed by the text.
    pub fn image_prompt(images: &[&ImageInput], text: &str) -> Self {
        let mut parts: Vec<Part> = images.iter().map(|img| Part::image(img)).collect();
        parts.push(Part::text(text));
        Self {
            contents: vec![Content {
                role: Some("user".into()),
                parts,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn image(image: &ImageInput) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.data),
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Decodes the first inline image across all candidates.
    pub fn first_image(&self) -> Result<Option<ImageInput>, VidraError> {
        let inline = self
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.inline_data.as_ref());

        let Some(inline) = inline else {
            return Ok(None);
        };
        let data = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| VidraError::Generation {
                message: format!("invalid image payload: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Some(ImageInput::new(data, inline.mime_type.clone())))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

// --- errors ---

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

impl std::fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.code, self.status, self.message)
    }
}
