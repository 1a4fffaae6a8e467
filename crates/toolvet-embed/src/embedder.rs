//! Hashed-feature text embedding with a process-wide cache.
//!
//! Feature extraction: identifier-aware tokens (camelCase and underscore
//! splitting, stopwords dropped) plus character trigrams per token. Each
//! feature is hashed with SHA-256 into one of [`EMBEDDING_DIM`] buckets
//! with a hash-derived sign, accumulated, and L2-normalized. The token
//! feature and the trigram block of a token carry equal norm: exact token
//! overlap and morphological overlap both move the cosine, exact matches
//! counting double.

use moka::sync::Cache;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use toolvet_core::Embedding;

/// Dimension of every embedding vector.
pub const EMBEDDING_DIM: usize = 384;

/// Process-wide cache, keyed on trimmed text. Case folding happens per
/// token inside feature extraction, after camelCase splitting, so `User
/// Query` and `userQuery` land on the same vector while staying distinct
/// cache entries.
static EMBED_CACHE: Lazy<Cache<String, Embedding>> =
    Lazy::new(|| Cache::builder().max_capacity(65_536).build());

/// Embed a text. Deterministic for a given text after trimming;
/// whitespace-only text yields the empty vector, and every similarity
/// against the empty vector is zero.
pub fn embed(text: &str) -> Embedding {
    let key = text.trim();
    if key.is_empty() {
        return Vec::new();
    }
    EMBED_CACHE.get_with(key.to_string(), move || compute(key))
}

/// Cosine similarity. Zero when either vector is empty or lengths differ;
/// otherwise the dot product, since inputs are normalized.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

fn compute(normalized: &str) -> Embedding {
    let tokens = feature_tokens(normalized);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut acc = vec![0.0f32; EMBEDDING_DIM];
    for token in &tokens {
        bump(&mut acc, &format!("t:{token}"), 1.0);

        let grams = trigrams(token);
        if grams.is_empty() {
            continue;
        }
        // the gram block of a token carries one unit of norm, same as the
        // token feature itself
        let w = 1.0 / (grams.len() as f32).sqrt();
        for gram in grams {
            bump(&mut acc, &format!("g:{gram}"), w);
        }
    }

    let norm: f32 = acc.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut acc {
            *x /= norm;
        }
    }
    acc
}

fn bump(acc: &mut [f32], feature: &str, weight: f32) {
    let digest = Sha256::digest(feature.as_bytes());
    let h = u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"));
    let index = ((h >> 1) % EMBEDDING_DIM as u64) as usize;
    if h & 1 == 0 {
        acc[index] += weight;
    } else {
        acc[index] -= weight;
    }
}

/// Tokens that carry signal: camelCase/underscore split, then lowercased,
/// stopwords and single characters dropped. Splitting must run before case
/// folding or camel boundaries disappear.
fn feature_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .flat_map(split_camel)
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() >= 2 && !is_stopword(t))
        .collect()
}

fn split_camel(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in word.chars() {
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn trigrams(token: &str) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 3 {
        return Vec::new();
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

fn is_stopword(word: &str) -> bool {
    matches!(
        word,
        "an" | "the" | "is" | "it" | "of" | "to" | "in" | "for" | "on" | "with" | "at"
            | "by" | "from" | "as" | "or" | "and" | "but" | "not" | "be" | "are" | "was"
            | "were" | "this" | "that" | "these" | "those" | "will" | "can" | "may"
            | "its" | "your" | "our" | "their" | "if" | "into" | "about" | "given"
    )
}
