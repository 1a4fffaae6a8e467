//! # Toolvet Embed
//!
//! The embedding service behind toolvet's semantic checks.
//!
//! Maps arbitrary text to a fixed-dimension, L2-normalized vector such that
//! cosine similarity approximates semantic proximity, and holds a small
//! table of named *concept anchors* (exemplar phrase groups) so callers can
//! ask "does this text semantically match concept C at threshold t?".
//!
//! The vector function is a deterministic hashed-feature embedder: token
//! and character-trigram features, each hashed into one of 384 signed
//! buckets. Identical text always embeds identically, which keeps whole
//! analysis runs byte-reproducible. Token-based heuristics alone miss
//! morphological and synonymic matches ("userQuery" vs "user input"); the
//! trigram features and the exemplar groups close most of that gap without
//! a model file to load.
//!
//! ## Quick Start
//!
//! ```rust
//! use toolvet_embed::{embed, cosine, init_concept_anchors, is_concept_match, Concept};
//!
//! init_concept_anchors();
//!
//! let v = embed("api_key");
//! assert!(is_concept_match(&v, Concept::Sensitive, 0.45));
//! assert!(cosine(&embed("user query"), &embed("userQuery")) > 0.9);
//! ```
//!
//! The cache and the anchor table are process-wide singletons, initialized
//! lazily and shared by concurrent analyses.

pub mod concepts;
pub mod embedder;

pub use concepts::{
    find_best_matching_field, init_concept_anchors, is_concept_match, Concept,
};
pub use embedder::{cosine, embed, EMBEDDING_DIM};
