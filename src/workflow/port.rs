//! Generation Port
//!
//! The controller's only collaborator: turn instruction text into a
//! schema-conformant artifact or fail. Transport, model choice, retries and
//! timeouts all live behind this trait.

use async_trait::async_trait;
use std::sync::Arc;

use super::schema::Artifact;
use crate::types::Result;

/// Capability that produces typed artifacts from instructions
///
/// Implementations guarantee that a returned value has passed
/// [`Artifact::check`]. Any failure (transport, malformed output, upstream
/// rejection) is returned as an error and is fatal to the calling run.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn generate<A: Artifact>(&self, instructions: &str) -> Result<A>;
}

#[async_trait]
impl<P: GenerationPort> GenerationPort for Arc<P> {
    async fn generate<A: Artifact>(&self, instructions: &str) -> Result<A> {
        (**self).generate::<A>(instructions).await
    }
}
