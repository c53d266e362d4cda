//! The sectionizer facade
//!
//! [`Sectionizer`] wires the pipeline together: rule loading, match
//! aggregation, line filtering, overlap pruning, partitioning, parent
//! resolution, and optional attribute propagation. Construction validates
//! configuration up front so that [`Sectionizer::segment`] itself is
//! infallible.
//!
//! ## Example
//!
//! ```rust
//! use sectionizer::section::lexing;
//! use sectionizer::section::sectionizer::Sectionizer;
//!
//! let sectionizer = Sectionizer::with_defaults().unwrap();
//! let doc = lexing::document("Past Medical History: PE");
//! let segmentation = sectionizer.segment(&doc);
//! assert_eq!(segmentation.titles(), vec![Some("past_medical_history")]);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use log::debug;
use once_cell::sync::Lazy;

use crate::section::attributes::{
    apply_attributes, AttributeError, AttributeMap, Entity, EntitySchema, DEFAULT_ATTRS,
};
use crate::section::loader::{LoaderError, PatternLoader};
use crate::section::matching::{begins_line, ends_line};
use crate::section::partition::{partition, resolve_parents, Segmentation};
use crate::section::pattern::{PatternError, PatternRegistry, SectionPattern};
use crate::section::resolve::prune_overlapping_matches;
use crate::section::token::Document;

/// Filepath to the default rules which are included in the package
pub static DEFAULT_RULES_FILEPATH: Lazy<PathBuf> = Lazy::new(|| {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("resources")
        .join("section_patterns.jsonl")
});

/// Where the rule set comes from
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PatternSource {
    /// The bundled default rule file
    #[default]
    Default,
    /// A caller-supplied JSONL rule file
    File(PathBuf),
    /// Rules built in code
    Inline(Vec<SectionPattern>),
    /// Start with no rules; add them later with [`Sectionizer::add`]
    Empty,
}

/// Whether and how entity flags are propagated from sections
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AttributePolicy {
    #[default]
    Disabled,
    /// Use [`DEFAULT_ATTRS`]
    Default,
    /// Use a caller-supplied mapping, validated against the entity schema
    Custom(AttributeMap),
}

/// How overlapping header candidates are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PruneStrategy {
    #[default]
    Longest,
}

impl fmt::Display for PruneStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneStrategy::Longest => write!(f, "longest"),
        }
    }
}

impl FromStr for PruneStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "longest" => Ok(PruneStrategy::Longest),
            other => Err(ConfigError::UnsupportedStrategy(other.to_string())),
        }
    }
}

/// Configuration for building a [`Sectionizer`]
#[derive(Debug, Clone, Default)]
pub struct SectionizerConfig {
    pub patterns: PatternSource,
    pub attributes: AttributePolicy,
    pub schema: EntitySchema,
    /// Maximum number of body tokens after a header. `None` means bodies
    /// run to the next header
    pub max_scope: Option<usize>,
    /// Only accept headers preceded by nothing but whitespace on their line
    pub require_start_line: bool,
    /// Only accept headers followed by nothing but whitespace on their line
    pub require_end_line: bool,
    pub strategy: PruneStrategy,
}

/// Error that can occur when building a [`Sectionizer`]
#[derive(Debug)]
pub enum ConfigError {
    /// The bundled default rule file is not where the package expects it
    DefaultRulesMissing(PathBuf),
    /// `max_scope` must be at least 1 when set
    InvalidMaxScope,
    /// Unknown prune strategy name
    UnsupportedStrategy(String),
    /// Rule file loading failed
    Loader(LoaderError),
    /// Rule compilation failed
    Pattern(PatternError),
    /// Attribute mapping validation failed
    Attribute(AttributeError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DefaultRulesMissing(path) => write!(
                f,
                "The expected location of the default rule file cannot be found. \
                 Please either add rules manually or add a jsonl file to: {}",
                path.display()
            ),
            ConfigError::InvalidMaxScope => {
                write!(f, "max_scope must be at least 1 when set")
            }
            ConfigError::UnsupportedStrategy(name) => {
                write!(f, "Unsupported prune strategy: '{}'", name)
            }
            ConfigError::Loader(err) => write!(f, "{}", err),
            ConfigError::Pattern(err) => write!(f, "{}", err),
            ConfigError::Attribute(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<LoaderError> for ConfigError {
    fn from(err: LoaderError) -> Self {
        ConfigError::Loader(err)
    }
}

impl From<PatternError> for ConfigError {
    fn from(err: PatternError) -> Self {
        ConfigError::Pattern(err)
    }
}

impl From<AttributeError> for ConfigError {
    fn from(err: AttributeError) -> Self {
        ConfigError::Attribute(err)
    }
}

/// Rule-based section detector for tokenized documents
pub struct Sectionizer {
    registry: PatternRegistry,
    attributes: Option<AttributeMap>,
    schema: EntitySchema,
    max_scope: Option<usize>,
    require_start_line: bool,
    require_end_line: bool,
}

impl Sectionizer {
    /// Build a sectionizer from a validated configuration
    pub fn new(config: SectionizerConfig) -> Result<Self, ConfigError> {
        if config.max_scope == Some(0) {
            return Err(ConfigError::InvalidMaxScope);
        }

        let mut registry = PatternRegistry::new();
        match config.patterns {
            PatternSource::Default => {
                if !DEFAULT_RULES_FILEPATH.exists() {
                    return Err(ConfigError::DefaultRulesMissing(
                        DEFAULT_RULES_FILEPATH.clone(),
                    ));
                }
                let patterns = PatternLoader::from_path(&*DEFAULT_RULES_FILEPATH)?.load()?;
                registry.add(patterns)?;
            }
            PatternSource::File(path) => {
                let patterns = PatternLoader::from_path(&path)?.load()?;
                registry.add(patterns)?;
            }
            PatternSource::Inline(patterns) => {
                registry.add(patterns)?;
            }
            PatternSource::Empty => {}
        }
        debug!("registered {} section rules", registry.patterns().len());

        let attributes = match config.attributes {
            AttributePolicy::Disabled => None,
            AttributePolicy::Default => {
                config.schema.validate(&DEFAULT_ATTRS)?;
                Some(DEFAULT_ATTRS.clone())
            }
            AttributePolicy::Custom(mapping) => {
                config.schema.validate(&mapping)?;
                Some(mapping)
            }
        };

        Ok(Self {
            registry,
            attributes,
            schema: config.schema,
            max_scope: config.max_scope,
            require_start_line: config.require_start_line,
            require_end_line: config.require_end_line,
        })
    }

    /// A sectionizer over the bundled default rules
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(SectionizerConfig::default())
    }

    /// Compile and register additional rules
    pub fn add(&mut self, patterns: Vec<SectionPattern>) -> Result<(), PatternError> {
        self.registry.add(patterns)
    }

    /// The registered declarative rules
    pub fn patterns(&self) -> &[SectionPattern] {
        self.registry.patterns()
    }

    /// All known section titles, sorted
    pub fn titles(&self) -> Vec<&str> {
        self.registry.titles().collect()
    }

    /// Detect sections in a document.
    ///
    /// Every failure mode is caught at construction, so segmentation
    /// always produces a result: a document with no matching rules comes
    /// back as a single untitled section.
    pub fn segment(&self, doc: &Document) -> Segmentation {
        let mut matches = self.registry.find_matches(doc);
        debug!("{} raw header candidates", matches.len());

        if self.require_start_line {
            matches.retain(|m| begins_line(doc, m));
        }
        if self.require_end_line {
            matches.retain(|m| ends_line(doc, m));
        }

        let matches = prune_overlapping_matches(matches);
        debug!("{} headers after pruning", matches.len());

        let mut sections = partition(doc.len(), &matches, self.max_scope);
        resolve_parents(&mut sections, &self.registry);
        Segmentation::new(doc.len(), sections)
    }

    /// Propagate section flags onto entities, if attribute propagation is
    /// enabled. Declared flags are initialized to false first
    pub fn apply_attributes(&self, segmentation: &Segmentation, entities: &mut [Entity]) {
        let mapping = match &self.attributes {
            Some(mapping) => mapping,
            None => return,
        };
        for entity in entities.iter_mut() {
            self.schema.initialize(entity);
        }
        apply_attributes(mapping, segmentation, entities);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::lexing::document;

    fn inline(patterns: Vec<SectionPattern>) -> Sectionizer {
        Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Inline(patterns),
            ..SectionizerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_with_defaults_loads_rules() {
        let sectionizer = Sectionizer::with_defaults().unwrap();
        assert!(!sectionizer.patterns().is_empty());
        assert!(sectionizer.titles().contains(&"past_medical_history"));
    }

    #[test]
    fn test_empty_source_has_no_rules() {
        let sectionizer = Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Empty,
            ..SectionizerConfig::default()
        })
        .unwrap();
        assert!(sectionizer.patterns().is_empty());
    }

    #[test]
    fn test_add_registers_rules() {
        let mut sectionizer = Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Empty,
            ..SectionizerConfig::default()
        })
        .unwrap();
        sectionizer
            .add(vec![SectionPattern::exact("section", "my pattern")])
            .unwrap();
        assert!(!sectionizer.patterns().is_empty());
    }

    #[test]
    fn test_zero_max_scope_rejected() {
        let result = Sectionizer::new(SectionizerConfig {
            max_scope: Some(0),
            ..SectionizerConfig::default()
        });
        assert!(matches!(result, Err(ConfigError::InvalidMaxScope)));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("longest".parse::<PruneStrategy>().unwrap(), PruneStrategy::Longest);
        assert!(matches!(
            "shortest".parse::<PruneStrategy>(),
            Err(ConfigError::UnsupportedStrategy(name)) if name == "shortest"
        ));
    }

    #[test]
    fn test_custom_attribute_mapping_validated() {
        let mut mapping = AttributeMap::new();
        mapping
            .entry("labs_and_studies".to_string())
            .or_default()
            .insert("is_critical".to_string(), true);
        let result = Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Empty,
            attributes: AttributePolicy::Custom(mapping.clone()),
            ..SectionizerConfig::default()
        });
        assert!(matches!(result, Err(ConfigError::Attribute(_))));

        // Declaring the flag makes the same mapping acceptable
        let mut schema = EntitySchema::default();
        schema.declare("is_critical");
        let result = Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Empty,
            attributes: AttributePolicy::Custom(mapping),
            schema,
            ..SectionizerConfig::default()
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_segment_string_match() {
        let sectionizer = inline(vec![SectionPattern::exact(
            "past_medical_history",
            "Past Medical History:",
        )]);
        let doc = document("Past Medical History: PE");
        let segmentation = sectionizer.segment(&doc);

        let sections = segmentation.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title.as_deref(), Some("past_medical_history"));
        assert_eq!(
            doc.slice(sections[0].header.as_ref().unwrap()),
            "Past Medical History:"
        );
        assert_eq!(doc.slice(&sections[0].body), "Past Medical History: PE");
    }

    #[test]
    fn test_segment_document_starts_without_header() {
        let sectionizer = inline(vec![SectionPattern::exact(
            "past_medical_history",
            "Past Medical History:",
        )]);
        let doc = document("This is separate. Past Medical History: PE");
        let segmentation = sectionizer.segment(&doc);

        let sections = segmentation.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, None);
        assert_eq!(sections[0].header, None);
        assert_eq!(doc.slice(&sections[0].body), "This is separate.");
        assert_eq!(
            doc.slice(&sections[1].body),
            "Past Medical History: PE"
        );
    }

    #[test]
    fn test_segment_no_rules_single_untitled_section() {
        let sectionizer = Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Empty,
            ..SectionizerConfig::default()
        })
        .unwrap();
        let doc = document("just some note text");
        let segmentation = sectionizer.segment(&doc);
        assert_eq!(segmentation.titles(), vec![None]);
    }

    #[test]
    fn test_segment_require_start_line() {
        let sectionizer = Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Inline(vec![SectionPattern::exact(
                "past_medical_history",
                "Past Medical History:",
            )]),
            require_start_line: true,
            ..SectionizerConfig::default()
        })
        .unwrap();
        let doc = document("\n\n Past Medical History: The patient has a Past Medical History:");
        let segmentation = sectionizer.segment(&doc);
        assert_eq!(segmentation.sections().len(), 1);
        assert_eq!(
            segmentation.titles(),
            vec![Some("past_medical_history")]
        );
    }

    #[test]
    fn test_segment_require_end_line() {
        let sectionizer = Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Inline(vec![SectionPattern::exact(
                "past_medical_history",
                "Past Medical History:",
            )]),
            require_end_line: true,
            ..SectionizerConfig::default()
        })
        .unwrap();
        let doc = document("\n\n Past Medical History:\n The patient has a Past Medical History: this");
        let segmentation = sectionizer.segment(&doc);
        assert_eq!(segmentation.sections().len(), 1);
    }

    #[test]
    fn test_segment_max_scope_limits_ownership() {
        let sectionizer = Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Inline(vec![SectionPattern::exact(
                "past_medical_history",
                "Past Medical History:",
            )]),
            max_scope: Some(2),
            ..SectionizerConfig::default()
        })
        .unwrap();
        // Tokens: Past Medical History : This is the sentence .
        let doc = document("Past Medical History: This is the sentence.");
        let segmentation = sectionizer.segment(&doc);
        assert_eq!(segmentation.title_at(5), Some("past_medical_history"));
        assert_eq!(segmentation.title_at(6), None);
    }

    #[test]
    fn test_apply_attributes_disabled_is_noop() {
        let sectionizer = inline(vec![SectionPattern::exact(
            "family_history",
            "Family History:",
        )]);
        let doc = document("Family History: colon cancer");
        let segmentation = sectionizer.segment(&doc);
        let mut entities = vec![Entity::new("CONDITION", 3..5)];
        sectionizer.apply_attributes(&segmentation, &mut entities);
        assert!(entities[0].flags.is_empty());
    }

    #[test]
    fn test_apply_attributes_default_mapping() {
        let sectionizer = Sectionizer::new(SectionizerConfig {
            patterns: PatternSource::Inline(vec![SectionPattern::exact(
                "family_history",
                "Family History:",
            )]),
            attributes: AttributePolicy::Default,
            ..SectionizerConfig::default()
        })
        .unwrap();
        let doc = document("Family History: colon cancer");
        let segmentation = sectionizer.segment(&doc);
        let mut entities = vec![Entity::new("CONDITION", 3..5)];
        sectionizer.apply_attributes(&segmentation, &mut entities);
        assert_eq!(entities[0].flag("is_family"), Some(true));
        assert_eq!(entities[0].flag("is_negated"), Some(false));
    }
}
