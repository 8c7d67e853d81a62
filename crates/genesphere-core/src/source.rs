//! Record-source traits.
//!
//! The cache layer only ever needs [`GeneSource::find_by_name`]; the wider
//! [`GeneRepository`] surface is used by the HTTP layer to manage records.

use async_trait::async_trait;

use crate::error::Result;
use crate::gene::GeneRecord;

/// The system of record for gene lookups.
///
/// # Example
///
/// ```ignore
/// use genesphere_core::{GeneSource, CoreError};
///
/// async fn describe(source: &dyn GeneSource, name: &str) -> Result<String, CoreError> {
///     Ok(source
///         .find_by_name(name)
///         .await?
///         .map(|gene| gene.description)
///         .unwrap_or_default())
/// }
/// ```
#[async_trait]
pub trait GeneSource: Send + Sync {
    /// Looks up a gene by name, ignoring case.
    ///
    /// Returns `Ok(None)` if no such gene exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing genes.
    async fn find_by_name(&self, name: &str) -> Result<Option<GeneRecord>>;
}

/// Full record management on top of [`GeneSource`].
#[async_trait]
pub trait GeneRepository: GeneSource {
    /// Returns every stored gene, ordered by name.
    async fn find_all(&self) -> Result<Vec<GeneRecord>>;

    /// Returns genes whose name contains `fragment`, ignoring case.
    async fn search_by_name(&self, fragment: &str) -> Result<Vec<GeneRecord>>;

    /// Inserts or replaces the gene with the same (case-insensitive) name.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidRecord` if the name is blank.
    async fn save(&self, gene: GeneRecord) -> Result<GeneRecord>;

    /// Removes a gene. Returns `false` if it did not exist.
    async fn delete_by_name(&self, name: &str) -> Result<bool>;
}
