//! GraphGenerator trait definition

use async_trait::async_trait;

use super::GenerateError;

/// Stateless diagram generator - each call is an independent request
///
/// The returned text is whatever the model produced. It is not guaranteed to
/// be valid diagram syntax; the renderer decides that.
#[async_trait]
pub trait GraphGenerator: Send + Sync {
    /// Ask for a character-relationship diagram of `subject_title`
    async fn generate(&self, subject_title: &str) -> Result<String, GenerateError>;
}
