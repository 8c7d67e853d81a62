use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{CoreError, Result};
use crate::gene::GeneRecord;
use crate::source::{GeneRepository, GeneSource};

/// In-memory gene repository keyed by the uppercased gene name.
///
/// Cheap to clone; clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeneRepository {
    genes: Arc<DashMap<String, GeneRecord>>,
}

impl InMemoryGeneRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `genes`.
    ///
    /// Later entries win when two names differ only by case.
    pub fn with_genes(genes: impl IntoIterator<Item = GeneRecord>) -> Self {
        let repo = Self::new();
        for gene in genes {
            repo.genes.insert(gene.normalized_name(), gene);
        }
        repo
    }

    /// Loads a JSON array of gene records from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let genes: Vec<GeneRecord> = serde_json::from_str(&raw)?;
        if let Some(blank) = genes.iter().position(|g| g.name.trim().is_empty()) {
            return Err(CoreError::invalid_record(format!(
                "entry {blank} in {} has a blank name",
                path.display()
            )));
        }
        tracing::info!(path = %path.display(), count = genes.len(), "Loaded gene seed data");
        Ok(Self::with_genes(genes))
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[async_trait]
impl GeneSource for InMemoryGeneRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<GeneRecord>> {
        let key = name.trim().to_uppercase();
        Ok(self.genes.get(&key).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl GeneRepository for InMemoryGeneRepository {
    async fn find_all(&self) -> Result<Vec<GeneRecord>> {
        let mut genes: Vec<GeneRecord> = self.genes.iter().map(|e| e.value().clone()).collect();
        genes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genes)
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<GeneRecord>> {
        let needle = fragment.trim().to_uppercase();
        let mut genes: Vec<GeneRecord> = self
            .genes
            .iter()
            .filter(|e| e.key().contains(&needle))
            .map(|e| e.value().clone())
            .collect();
        genes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genes)
    }

    async fn save(&self, gene: GeneRecord) -> Result<GeneRecord> {
        let key = gene.normalized_name();
        if key.is_empty() {
            return Err(CoreError::invalid_record("gene name must not be blank"));
        }
        self.genes.insert(key, gene.clone());
        Ok(gene)
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool> {
        Ok(self.genes.remove(&name.trim().to_uppercase()).is_some())
    }
}
