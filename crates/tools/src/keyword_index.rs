//! In-process keyword retrieval index.
//!
//! Documents are split into paragraph chunks at ingestion. A chunk's score
//! is the fraction of distinct query terms it contains, so scores land in
//! `[0, 1]` and compare directly against `min_relevance_score`.

use async_trait::async_trait;
use std::collections::HashSet;

use conductor_core::agent::TenantScope;
use conductor_core::error::RetrievalError;
use conductor_core::retrieval::{RankedPassage, RetrievalCapability};

#[derive(Debug, Clone)]
struct Chunk {
    /// `None` = visible to every tenant
    tenant: Option<TenantScope>,
    document_id: String,
    chunk_index: usize,
    text: String,
    terms: HashSet<String>,
}

/// A keyword index over paragraph chunks. Built before serving, then
/// shared read-only.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    chunks: Vec<Chunk>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a document visible to all tenants. Returns the number of chunks.
    pub fn add_document(&mut self, document_id: impl Into<String>, text: &str) -> usize {
        self.insert(None, document_id.into(), text)
    }

    /// Index a document visible only to `tenant`.
    pub fn add_tenant_document(
        &mut self,
        tenant: TenantScope,
        document_id: impl Into<String>,
        text: &str,
    ) -> usize {
        self.insert(Some(tenant), document_id.into(), text)
    }

    fn insert(&mut self, tenant: Option<TenantScope>, document_id: String, text: &str) -> usize {
        let mut added = 0;
        for (chunk_index, paragraph) in split_paragraphs(text).into_iter().enumerate() {
            self.chunks.push(Chunk {
                tenant: tenant.clone(),
                document_id: document_id.clone(),
                chunk_index,
                terms: terms(&paragraph),
                text: paragraph,
            });
            added += 1;
        }
        tracing::debug!(document = %document_id, chunks = added, "Indexed document");
        added
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait]
impl RetrievalCapability for KeywordIndex {
    fn name(&self) -> &str {
        "keyword_index"
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        tenant: &TenantScope,
    ) -> Result<Vec<RankedPassage>, RetrievalError> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut passages: Vec<RankedPassage> = self
            .chunks
            .iter()
            .filter(|c| c.tenant.as_ref().is_none_or(|t| t == tenant))
            .filter_map(|c| {
                let hits = query_terms.iter().filter(|t| c.terms.contains(*t)).count();
                (hits > 0).then(|| RankedPassage {
                    document_id: c.document_id.clone(),
                    chunk_index: c.chunk_index,
                    score: hits as f32 / query_terms.len() as f32,
                    text: c.text.clone(),
                })
            })
            .collect();

        passages.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document_id.cmp(&b.document_id))
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });
        passages.truncate(top_k);
        Ok(passages)
    }
}

fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}
