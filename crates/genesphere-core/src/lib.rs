//! # genesphere-core
//!
//! Gene reference records and the record-source contracts the cache layer consumes.
//!
//! The system of record is abstracted behind [`GeneSource`] (the single lookup the
//! cache needs) and [`GeneRepository`] (the list/save/delete surface used by the API).
//! [`InMemoryGeneRepository`] is the bundled implementation.

pub mod error;
pub mod gene;
pub mod memory;
pub mod source;

pub use error::{CoreError, Result};
pub use gene::GeneRecord;
pub use memory::InMemoryGeneRepository;
pub use source::{GeneRepository, GeneSource};
