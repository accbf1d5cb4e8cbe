//! Retrieval capability — embedding + nearest-neighbour search behind a trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::TenantScope;
use crate::error::RetrievalError;
use crate::tool::Citation;

/// A passage returned by a retrieval backend, ranked by relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPassage {
    pub document_id: String,
    pub chunk_index: usize,
    pub score: f32,
    pub text: String,
}

impl RankedPassage {
    pub fn to_citation(&self) -> Citation {
        Citation {
            document_id: self.document_id.clone(),
            chunk_index: self.chunk_index,
            score: self.score,
            text: self.text.clone(),
        }
    }
}

/// Implementations: in-process keyword index, vector databases.
#[async_trait]
pub trait RetrievalCapability: Send + Sync {
    fn name(&self) -> &str;

    /// Return at most `top_k` passages visible to `tenant`, best first.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        tenant: &TenantScope,
    ) -> Result<Vec<RankedPassage>, RetrievalError>;
}
