// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generator adapter for deterministic testing.
//!
//! `MockGenerator` implements `GeneratorAdapter` with a FIFO queue of
//! scripted outcomes. Every generator call pops one outcome; when the queue
//! is empty the call succeeds immediately.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use vidra_core::traits::adapter::PluginAdapter;
use vidra_core::traits::generator::{GeneratorAdapter, ProgressFn};
use vidra_core::types::{
    AdapterHealth, AdapterType, GeneratedMedia, GenerationParams, ImageInput,
};
use vidra_core::VidraError;

/// One recorded call into the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorCall {
    Video(GenerationParams),
    Edit { image: ImageInput, prompt: String },
    CharacterReplacement(GenerationParams),
    Preview(GenerationParams),
}

#[derive(Debug, Clone)]
struct Scripted {
    delay: Duration,
    failure: Option<String>,
}

/// A mock generator that replays scripted outcomes.
pub struct MockGenerator {
    outcomes: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<GeneratorCall>>>,
    produced: AtomicU64,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            produced: AtomicU64::new(0),
        }
    }

    pub async fn queue_success(&self) {
        self.push(Duration::ZERO, None).await;
    }

    /// The next call fails with `raw` as its upstream message.
    pub async fn queue_failure(&self, raw: impl Into<String>) {
        self.push(Duration::ZERO, Some(raw.into())).await;
    }

    pub async fn queue_delayed_success(&self, delay: Duration) {
        self.push(delay, None).await;
    }

    pub async fn queue_delayed_failure(&self, delay: Duration, raw: impl Into<String>) {
        self.push(delay, Some(raw.into())).await;
    }

    async fn push(&self, delay: Duration, failure: Option<String>) {
        self.outcomes
            .lock()
            .await
            .push_back(Scripted { delay, failure });
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn record(&self, call: GeneratorCall) {
        self.calls.lock().await.push(call);
    }

    /// Pops the next outcome and waits out its delay.
    async fn resolve(&self) -> Result<(), VidraError> {
        let scripted = self.outcomes.lock().await.pop_front();
        let Some(scripted) = scripted else {
            return Ok(());
        };
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        match scripted.failure {
            Some(raw) => Err(VidraError::generation(raw)),
            None => Ok(()),
        }
    }

    fn next_video(&self) -> GeneratedMedia {
        let n = self.produced.fetch_add(1, Ordering::SeqCst) + 1;
        GeneratedMedia {
            url: format!("mock://video/{n}"),
            blob: format!("mock-video-{n}").into_bytes(),
            mime_type: "video/mp4".to_string(),
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<AdapterHealth, VidraError> {
        Ok(AdapterHealth::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VidraError> {
        Ok(())
    }
}

#[async_trait]
impl GeneratorAdapter for MockGenerator {
    async fn generate_video(
        &self,
        params: &GenerationParams,
    ) -> Result<GeneratedMedia, VidraError> {
        self.record(GeneratorCall::Video(params.clone())).await;
        self.resolve().await?;
        Ok(self.next_video())
    }

    async fn edit_image(&self, image: &ImageInput, prompt: &str) -> Result<ImageInput, VidraError> {
        self.record(GeneratorCall::Edit {
            image: image.clone(),
            prompt: prompt.to_string(),
        })
        .await;
        self.resolve().await?;
        Ok(ImageInput::new(
            format!("edited:{prompt}").into_bytes(),
            image.mime_type.clone(),
        ))
    }

    async fn generate_character_replacement(
        &self,
        params: &GenerationParams,
        on_progress: ProgressFn,
    ) -> Result<GeneratedMedia, VidraError> {
        self.record(GeneratorCall::CharacterReplacement(params.clone()))
            .await;
        on_progress("Preparing character swap");
        on_progress("Animating scene");
        self.resolve().await?;
        Ok(self.next_video())
    }

    async fn generate_preview(
        &self,
        params: &GenerationParams,
    ) -> Result<ImageInput, VidraError> {
        self.record(GeneratorCall::Preview(params.clone())).await;
        self.resolve().await?;
        Ok(ImageInput::new(
            format!("preview:{}", params.prompt).into_bytes(),
            "image/png",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeds_when_queue_empty() {
        let generator = MockGenerator::new();
        let params = GenerationParams::text("a fox", "veo");
        let media = generator.generate_video(&params).await.unwrap();
        assert_eq!(media.url, "mock://video/1");
        assert_eq!(generator.calls().await, vec![GeneratorCall::Video(params)]);
    }

    #[tokio::test]
    async fn scripted_outcomes_replay_in_order() {
        let generator = MockGenerator::new();
        generator.queue_failure("429 RESOURCE_EXHAUSTED").await;
        generator.queue_success().await;

        let params = GenerationParams::text("a fox", "veo");
        let err = generator.generate_video(&params).await.unwrap_err();
        assert_eq!(err.to_string(), "429 RESOURCE_EXHAUSTED");
        assert!(generator.generate_video(&params).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_outcome_waits() {
        let generator = MockGenerator::new();
        generator
            .queue_delayed_success(Duration::from_secs(5))
            .await;
        let start = tokio::time::Instant::now();
        generator
            .generate_video(&GenerationParams::text("x", "veo"))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn character_replacement_reports_two_stages() {
        let generator = MockGenerator::new();
        let stages = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&stages);
        let progress: ProgressFn = Arc::new(move |s: &str| sink.lock().unwrap().push(s.to_string()));

        generator
            .generate_character_replacement(&GenerationParams::text("x", "veo"), progress)
            .await
            .unwrap();
        assert_eq!(
            *stages.lock().unwrap(),
            vec!["Preparing character swap", "Animating scene"]
        );
    }
}
