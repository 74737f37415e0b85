//! Login CAPTCHA: digit images with short-lived, single-use answers.

mod generator;
mod store;
mod verifier;

pub use generator::CaptchaGenerator;
pub use store::{CaptchaStore, sweep_worker};
pub use verifier::CaptchaVerifier;

use std::sync::Arc;
use std::time::Duration;

use warden_common::{CaptchaChallenge, WardenError};

use crate::config::CaptchaConfig;

/// Generates challenges and verifies answers against the shared store
pub struct CaptchaService {
    generator: CaptchaGenerator,
    store: Arc<CaptchaStore>,
}

impl CaptchaService {
    pub fn new(config: &CaptchaConfig) -> Self {
        let store = CaptchaStore::new(config.capacity, Duration::from_secs(config.ttl_secs));
        Self {
            generator: CaptchaGenerator::new(config),
            store: Arc::new(store),
        }
    }

    /// Shared handle to the store, for the background sweeper and readiness probe
    pub fn store(&self) -> Arc<CaptchaStore> {
        self.store.clone()
    }

    /// Create a challenge and remember its answer
    pub async fn generate(&self) -> Result<CaptchaChallenge, WardenError> {
        let digits = self.generator.random_digits();
        let captcha_image = self.generator.render_data_uri(&digits)?;
        let captcha_id = self.generator.generate_challenge_id();

        self.store.insert(captcha_id.clone(), digits).await?;

        tracing::debug!(captcha_id = %captcha_id, "Generated CAPTCHA challenge");

        Ok(CaptchaChallenge {
            captcha_id,
            captcha_image,
            expires_in_secs: self.store.ttl().as_secs(),
        })
    }

    /// Check an answer. The challenge is consumed whatever the result.
    pub async fn verify(&self, captcha_id: &str, answer: &str) -> bool {
        let Some(expected) = self.store.take(captcha_id).await else {
            tracing::debug!(captcha_id = %captcha_id, "CAPTCHA unknown or expired");
            return false;
        };

        let success = CaptchaVerifier::matches(&expected, answer);
        tracing::debug!(captcha_id = %captcha_id, success = success, "CAPTCHA verified");
        success
    }

    /// Store a known answer under a chosen id
    #[cfg(test)]
    pub(crate) async fn insert_known(&self, captcha_id: &str, digits: Vec<u8>) {
        self.store
            .insert(captcha_id.to_string(), digits)
            .await
            .expect("CAPTCHA store accepts test entry");
    }

    #[cfg(test)]
    pub(crate) async fn answer_for(&self, captcha_id: &str) -> Option<String> {
        let digits = self.store.peek(captcha_id).await?;
        Some(digits.iter().map(|d| char::from(b'0' + d)).collect())
    }
}
