//! Section-driven entity attributes
//!
//! Entities extracted elsewhere in a pipeline can inherit assertion flags
//! from the section they occur in: a problem mentioned under
//! `family_history` concerns a family member, one under
//! `patient_instructions` is hypothetical. This module defines the entity
//! and flag types, the default title-to-flags mapping, and the propagation
//! step that writes flags onto entities based on their owning section.
//!
//! An entity spanning a section boundary takes its flags from the section
//! owning its first token.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Range;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::section::partition::Segmentation;

/// Flag assignments per section title
pub type AttributeMap = BTreeMap<String, BTreeMap<String, bool>>;

/// Default section-to-flag mapping for clinical notes
pub static DEFAULT_ATTRS: Lazy<AttributeMap> = Lazy::new(|| {
    let mut mapping = AttributeMap::new();
    let mut insert = |title: &str, flag: &str| {
        mapping
            .entry(title.to_string())
            .or_default()
            .insert(flag.to_string(), true);
    };
    insert("past_medical_history", "is_historical");
    insert("sexual_and_social_history", "is_historical");
    insert("family_history", "is_family");
    insert("patient_instructions", "is_hypothetical");
    insert("education", "is_hypothetical");
    insert("allergy", "is_hypothetical");
    mapping
});

/// An extracted entity: a label, a token span, and its assertion flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub label: String,
    pub span: Range<usize>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
}

impl Entity {
    pub fn new(label: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            label: label.into(),
            span,
            flags: BTreeMap::new(),
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }
}

/// Errors raised while validating attribute mappings
#[derive(Debug, Clone)]
pub enum AttributeError {
    /// A mapping references a flag the schema never declared
    Undeclared(String),
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeError::Undeclared(name) => {
                write!(
                    f,
                    "Attribute '{}' has not been declared in the entity schema",
                    name
                )
            }
        }
    }
}

impl std::error::Error for AttributeError {}

/// The set of assertion flags entities may carry
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    flags: BTreeSet<String>,
}

impl Default for EntitySchema {
    fn default() -> Self {
        let flags = [
            "is_negated",
            "is_uncertain",
            "is_historical",
            "is_hypothetical",
            "is_family",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        Self { flags }
    }
}

impl EntitySchema {
    /// A schema with an explicit flag set
    pub fn with_flags<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn declare(&mut self, flag: impl Into<String>) {
        self.flags.insert(flag.into());
    }

    pub fn is_declared(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Check that every flag a mapping assigns has been declared
    pub fn validate(&self, mapping: &AttributeMap) -> Result<(), AttributeError> {
        for flags in mapping.values() {
            for name in flags.keys() {
                if !self.flags.contains(name) {
                    return Err(AttributeError::Undeclared(name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Set every declared flag to false where the entity has no value yet
    pub fn initialize(&self, entity: &mut Entity) {
        for flag in &self.flags {
            entity.flags.entry(flag.clone()).or_insert(false);
        }
    }
}

/// Write mapped flags onto each entity based on its owning section
pub fn apply_attributes(
    mapping: &AttributeMap,
    segmentation: &Segmentation,
    entities: &mut [Entity],
) {
    for entity in entities {
        let title = match segmentation.title_at(entity.span.start) {
            Some(title) => title,
            None => continue,
        };
        if let Some(flags) = mapping.get(title) {
            for (name, value) in flags {
                entity.flags.insert(name.clone(), *value);
            }
        }
    }
}
