//! # sectionizer
//!
//! Rule-based section detection for clinical notes.
//!
//! Documents are tokenized, matched against section header rules, and
//! partitioned into titled sections. Entities can then inherit assertion
//! flags from the section they occur in.
//!
//! ```rust
//! use sectionizer::section::lexing;
//! use sectionizer::Sectionizer;
//!
//! let sectionizer = Sectionizer::with_defaults().unwrap();
//! let doc = lexing::document("Past Medical History: PE");
//! let segmentation = sectionizer.segment(&doc);
//! ```

pub mod section;

pub use section::attributes::{Entity, EntitySchema};
pub use section::partition::{Section, Segmentation};
pub use section::pattern::SectionPattern;
pub use section::sectionizer::{Sectionizer, SectionizerConfig};
