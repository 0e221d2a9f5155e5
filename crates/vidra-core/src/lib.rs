// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Vidra generation studio.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Vidra workspace. The generation API,
//! persistence layer, credential prompt and media cache are all consumed
//! through the traits defined here.

pub mod classify;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use classify::{ClassifiedError, ErrorKind, classify};
pub use error::VidraError;
pub use types::{
    AdapterHealth, AdapterType, AspectRatio, GeneratedMedia, GenerationJob, GenerationMode,
    GenerationParams, HealthStatus, ImageInput, JobId, JobStatus, LogLevel, Resolution,
    ResultMedia,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    CachePurger, CredentialPrompt, GeneratorAdapter, PersistenceAdapter, PluginAdapter,
    ProgressFn,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vidra_error_has_all_variants() {
        let _config = VidraError::Config("test".into());
        let _storage = VidraError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _generation = VidraError::Generation {
            message: "test".into(),
            source: None,
        };
        let _not_found = VidraError::AdapterNotFound {
            adapter_type: "Generator".into(),
            name: "test".into(),
        };
        let _job = VidraError::JobNotFound(JobId::new());
        let _cache = VidraError::Cache("test".into());
        let _timeout = VidraError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = VidraError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Generator,
            AdapterType::Persistence,
            AdapterType::MediaCache,
        ] {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_generator_adapter<T: GeneratorAdapter>() {}
        fn _assert_persistence_adapter<T: PersistenceAdapter>() {}
        fn _assert_credential_prompt<T: CredentialPrompt>() {}
        fn _assert_cache_purger<T: CachePurger>() {}
    }
}
