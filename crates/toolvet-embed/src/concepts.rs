//! Concept anchors: named bundles of exemplar phrases whose embeddings
//! define a semantic neighborhood.
//!
//! The groups are fixed at build time. Domain concepts are stable and
//! small, so the anchor matrix is embedded once per process and shared by
//! every analysis run.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use toolvet_core::Embedding;
use tracing::debug;

use crate::embedder::{cosine, embed};

/// The named concept groups the rule set probes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concept {
    /// Values an end user types: queries, messages, names, contact details
    UserData,
    /// Credentials and secrets
    Sensitive,
    /// Operations that produce data a caller would consume
    ReturnsData,
    /// Safe-to-retry phrasing
    Idempotent,
    /// State-changing phrasing
    Mutation,
}

impl Concept {
    /// Exemplar phrases for this concept. Single-word anchors carry most of
    /// the matching weight under the hashed embedder; multi-word phrases
    /// cover the compound spellings seen in real tool contracts.
    pub fn phrases(self) -> &'static [&'static str] {
        match self {
            Concept::UserData => &[
                "user input",
                "user query",
                "search query",
                "query",
                "question",
                "prompt",
                "message",
                "text",
                "input",
                "username",
                "user name",
                "user id",
                "email",
                "email address",
                "phone number",
                "phone",
                "person name",
                "address",
                "location",
                "comment",
                "feedback",
            ],
            Concept::Sensitive => &[
                "password",
                "secret",
                "secret key",
                "api key",
                "api token",
                "access token",
                "access key",
                "private key",
                "auth token",
                "authorization",
                "auth",
                "credential",
                "credentials",
                "passphrase",
                "session token",
                "bearer token",
                "client secret",
                "signing key",
            ],
            Concept::ReturnsData => &[
                "retrieve",
                "retrieves",
                "return",
                "returns",
                "returns data",
                "get",
                "gets",
                "fetch",
                "fetches",
                "read",
                "reads",
                "list",
                "lists",
                "query",
                "lookup",
                "search",
                "find",
                "download",
                "export",
                "get details",
                "fetch records",
                "query results",
            ],
            Concept::Idempotent => &[
                "idempotent",
                "safe to retry",
                "retryable",
                "can be called repeatedly",
                "no side effects",
                "read only",
                "readonly",
                "does not modify",
                "pure lookup",
                "stateless",
            ],
            Concept::Mutation => &[
                "create",
                "creates",
                "update",
                "updates",
                "delete",
                "deletes",
                "remove",
                "removes",
                "write",
                "writes",
                "insert",
                "inserts",
                "modify",
                "modifies",
                "send",
                "sends",
                "set",
                "sets",
                "save",
                "saves",
                "cancel",
                "archive",
                "create a record",
                "update a record",
                "delete a record",
                "change state",
                "post content",
            ],
        }
    }

    fn all() -> [Concept; 5] {
        [
            Concept::UserData,
            Concept::Sensitive,
            Concept::ReturnsData,
            Concept::Idempotent,
            Concept::Mutation,
        ]
    }
}

static ANCHORS: OnceCell<HashMap<Concept, Vec<Embedding>>> = OnceCell::new();

/// Embed each phrase of each concept group exactly once. Idempotent;
/// concurrent callers share one initialization.
pub fn init_concept_anchors() {
    ANCHORS.get_or_init(|| {
        let mut table = HashMap::new();
        let mut phrase_count = 0usize;
        for concept in Concept::all() {
            let vectors: Vec<Embedding> =
                concept.phrases().iter().map(|p| embed(p)).collect();
            phrase_count += vectors.len();
            table.insert(concept, vectors);
        }
        debug!(concepts = table.len(), phrases = phrase_count, "concept anchors initialized");
        table
    });
}

/// True iff the cosine between `v` and any anchor phrase of the concept
/// meets or exceeds `tau`. False for an empty vector or before
/// [`init_concept_anchors`] has run.
pub fn is_concept_match(v: &[f32], concept: Concept, tau: f64) -> bool {
    if v.is_empty() {
        return false;
    }
    let Some(table) = ANCHORS.get() else {
        return false;
    };
    table
        .get(&concept)
        .is_some_and(|anchors| anchors.iter().any(|a| cosine(v, a) >= tau))
}

/// The field name with the highest cosine against `v` that also meets
/// `tau`, or `None`. Iteration is in key order, and a later field must
/// strictly beat the current best, so ties resolve to the first name.
pub fn find_best_matching_field(
    v: &[f32],
    fields: &std::collections::BTreeMap<String, Embedding>,
    tau: f64,
) -> Option<String> {
    if v.is_empty() {
        return None;
    }
    let mut best: Option<(&str, f64)> = None;
    for (name, vector) in fields {
        let sim = cosine(v, vector);
        if sim >= tau && best.map_or(true, |(_, b)| sim > b) {
            best = Some((name, sim));
        }
    }
    best.map(|(name, _)| name.to_string())
}
