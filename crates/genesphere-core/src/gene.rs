use serde::{Deserialize, Serialize};

/// Reference data for a single gene.
///
/// `name` is the natural key. Records are never edited in place: a newer
/// version is obtained by fetching again from the record source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub normal_function: String,
    #[serde(default)]
    pub mutation_effect: String,
    #[serde(default)]
    pub prevalence: String,
    #[serde(default)]
    pub therapies: String,
    #[serde(default)]
    pub research_links: String,
}

impl GeneRecord {
    /// Create a record with only its name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            normal_function: String::new(),
            mutation_effect: String::new(),
            prevalence: String::new(),
            therapies: String::new(),
            research_links: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_normal_function(mut self, normal_function: impl Into<String>) -> Self {
        self.normal_function = normal_function.into();
        self
    }

    pub fn with_mutation_effect(mut self, mutation_effect: impl Into<String>) -> Self {
        self.mutation_effect = mutation_effect.into();
        self
    }

    pub fn with_prevalence(mut self, prevalence: impl Into<String>) -> Self {
        self.prevalence = prevalence.into();
        self
    }

    pub fn with_therapies(mut self, therapies: impl Into<String>) -> Self {
        self.therapies = therapies.into();
        self
    }

    pub fn with_research_links(mut self, research_links: impl Into<String>) -> Self {
        self.research_links = research_links.into();
        self
    }

    /// Name folded for case-insensitive comparison.
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_uppercase()
    }
}
