// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini generator adapter for the Vidra studio.
//!
//! Video comes from Veo through a submit-then-poll long-running operation.
//! Still edits and previews come from the Gemini image model. Failures carry
//! the upstream `{code} {status}: {message}` text so the studio can classify
//! them.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use vidra_config::model::GeminiConfig;
use vidra_core::traits::{GeneratorAdapter, PluginAdapter};
use vidra_core::{
    AdapterHealth, AdapterType, GeneratedMedia, GenerationParams, ImageInput, ProgressFn,
    VidraError,
};

pub use crate::client::GeminiClient;
use crate::types::{
    GenerateContentRequest, GenerateContentResponse, Operation, PredictRequest, ReferenceImage,
    VideoInstance, VideoParameters,
};

/// Progress message before the character edit starts.
pub const STAGE_PREPARING: &str = "Preparing character swap";
/// Progress message before the edited scene is animated.
pub const STAGE_ANIMATING: &str = "Animating scene";

const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Gemini-backed [`GeneratorAdapter`].
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: GeminiClient,
    video_model: String,
    image_model: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl GeminiGenerator {
    pub fn new(config: &GeminiConfig) -> Result<Self, VidraError> {
        let client = GeminiClient::new(config)?;
        info!(
            video_model = config.video_model,
            image_model = config.image_model,
            has_key = client.has_api_key(),
            "gemini generator initialized"
        );
        Ok(Self {
            client,
            video_model: config.video_model.clone(),
            image_model: config.image_model.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_poll_attempts: config.max_poll_attempts,
        })
    }

    /// Overrides the wait between operation polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The underlying client. Clones share its API key.
    pub fn client(&self) -> &GeminiClient {
        &self.client
    }

    fn video_model_for<'a>(&'a self, params: &'a GenerationParams) -> &'a str {
        if params.model.trim().is_empty() {
            &self.video_model
        } else {
            &params.model
        }
    }

    fn predict_request(params: &GenerationParams) -> PredictRequest {
        PredictRequest {
            instances: vec![VideoInstance {
                prompt: params.prompt.clone(),
                image: params.start_frame.as_ref().map(Into::into),
                reference_images: params
                    .reference_images
                    .iter()
                    .map(ReferenceImage::asset)
                    .collect(),
            }],
            parameters: VideoParameters {
                aspect_ratio: params.aspect_ratio.to_string(),
                resolution: params.resolution.to_string(),
            },
        }
    }

    /// Polls `op` until it is done or the attempt budget runs out.
    async fn wait_for_operation(&self, mut op: Operation) -> Result<Operation, VidraError> {
        let mut attempts = 0u32;
        while !op.done {
            if attempts >= self.max_poll_attempts {
                warn!(operation = %op.name, attempts, "video operation did not finish");
                return Err(VidraError::Timeout {
                    duration: self.poll_interval * self.max_poll_attempts,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
            attempts += 1;
            debug!(operation = %op.name, attempts, "polling video operation");
            op = self.client.get_json(&op.name).await?;
        }
        Ok(op)
    }

    async fn generate_content(
        &self,
        images: &[&ImageInput],
        text: &str,
    ) -> Result<ImageInput, VidraError> {
        let path = format!("models/{}:generateContent", self.image_model);
        let request = GenerateContentRequest::image_prompt(images, text);
        let response: GenerateContentResponse = self.client.post_json(&path, &request).await?;

        if let Some(image) = response.first_image()? {
            return Ok(image);
        }
        let reason = response
            .candidates
            .iter()
            .find_map(|c| c.finish_reason.as_deref())
            .unwrap_or("no image returned");
        Err(VidraError::generation(format!(
            "image generation produced no image ({reason})"
        )))
    }
}

#[async_trait]
impl PluginAdapter for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<AdapterHealth, VidraError> {
        if self.client.has_api_key() {
            Ok(AdapterHealth::Healthy)
        } else {
            Ok(AdapterHealth::Degraded("no API key configured".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), VidraError> {
        Ok(())
    }
}

#[async_trait]
impl GeneratorAdapter for GeminiGenerator {
    async fn generate_video(
        &self,
        params: &GenerationParams,
    ) -> Result<GeneratedMedia, VidraError> {
        let path = format!("models/{}:predictLongRunning", self.video_model_for(params));
        let request = Self::predict_request(params);
        let op: Operation = self.client.post_json(&path, &request).await?;
        info!(operation = %op.name, mode = %params.mode, resolution = %params.resolution, "video operation submitted");

        let mut op = self.wait_for_operation(op).await?;
        if let Some(error) = op.error.take() {
            return Err(error.into_error());
        }

        let Some(uri) = op.first_sample_uri() else {
            let reasons = op.filtered_reasons();
            let message = if reasons.is_empty() {
                "video operation finished without a video".to_string()
            } else {
                format!("video blocked by safety filters: {}", reasons.join("; "))
            };
            return Err(VidraError::generation(message));
        };

        let (blob, content_type) = self.client.download(uri).await?;
        debug!(operation = %op.name, bytes = blob.len(), "video downloaded");
        Ok(GeneratedMedia {
            url: uri.to_string(),
            blob,
            mime_type: content_type.unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string()),
        })
    }

    async fn edit_image(&self, image: &ImageInput, prompt: &str) -> Result<ImageInput, VidraError> {
        self.generate_content(&[image], prompt).await
    }

    async fn generate_character_replacement(
        &self,
        params: &GenerationParams,
        on_progress: ProgressFn,
    ) -> Result<GeneratedMedia, VidraError> {
        let (Some(scene), Some(character)) =
            (params.start_frame.as_ref(), params.character_image.as_ref())
        else {
            return Err(VidraError::generation(
                "400 INVALID_ARGUMENT: character replacement needs a scene frame and a character image",
            ));
        };

        on_progress(STAGE_PREPARING);
        let instruction = format!(
            "Replace the main subject of the first image with the character shown in the second \
             image. Keep the setting, lighting and framing of the first image. {}",
            params.prompt
        );
        let edited = self
            .generate_content(&[scene, character], instruction.trim_end())
            .await?;

        on_progress(STAGE_ANIMATING);
        let mut animate = params.clone();
        animate.start_frame = Some(edited);
        animate.character_image = None;
        self.generate_video(&animate).await
    }

    async fn generate_preview(
        &self,
        params: &GenerationParams,
    ) -> Result<ImageInput, VidraError> {
        let text = format!(
            "Create a single {} still frame previewing this shot: {}",
            params.aspect_ratio, params.prompt
        );
        match params.start_frame.as_ref() {
            Some(frame) => self.generate_content(&[frame], &text).await,
            None => self.generate_content(&[], &text).await,
        }
    }
}
