//! Read-only lookup tables over a normalized tool set.
//!
//! Three maps, all keyed lowercase: tool name -> position, field name ->
//! every occurrence per direction (no deduplication), keyword -> owning
//! tool names. Building is linear in the total field count.

use std::collections::{BTreeSet, HashMap};

use toolvet_core::{text, FieldSpec, ToolSpec};

/// The index bundle handed to rules via the analysis context.
#[derive(Debug, Clone, Default)]
pub struct ToolIndexes {
    by_name: HashMap<String, usize>,
    input_fields: HashMap<String, Vec<FieldSpec>>,
    output_fields: HashMap<String, Vec<FieldSpec>>,
    keywords: HashMap<String, BTreeSet<String>>,
}

impl ToolIndexes {
    /// Build all indexes in one pass over the tool list.
    ///
    /// On duplicate tool names the first occurrence wins the name slot;
    /// the duplicate itself is a rule matter, not an indexing one.
    pub fn build(tools: &[ToolSpec]) -> Self {
        let mut indexes = ToolIndexes::default();
        for (position, tool) in tools.iter().enumerate() {
            indexes
                .by_name
                .entry(tool.name.to_lowercase())
                .or_insert(position);

            for field in &tool.inputs {
                indexes
                    .input_fields
                    .entry(field.name.to_lowercase())
                    .or_default()
                    .push(field.clone());
            }
            for field in &tool.outputs {
                indexes
                    .output_fields
                    .entry(field.name.to_lowercase())
                    .or_default()
                    .push(field.clone());
            }

            for keyword in text::tokens(&format!("{} {}", tool.name, tool.description)) {
                indexes
                    .keywords
                    .entry(keyword)
                    .or_default()
                    .insert(tool.name.clone());
            }
        }
        indexes
    }

    /// Position of the tool with this (case-insensitive) name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Every input field with this (case-insensitive) name, across tools,
    /// in tool order.
    pub fn input_occurrences(&self, field_name: &str) -> &[FieldSpec] {
        self.input_fields
            .get(&field_name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every output field with this (case-insensitive) name.
    pub fn output_occurrences(&self, field_name: &str) -> &[FieldSpec] {
        self.output_fields
            .get(&field_name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tools whose name or description mentions the keyword.
    pub fn tools_mentioning(&self, keyword: &str) -> Option<&BTreeSet<String>> {
        self.keywords.get(&keyword.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolvet_core::FieldSpec;

    fn spec(name: &str, description: &str) -> ToolSpec {
        ToolSpec::new(name, description)
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let tools = vec![spec("GetUser", "Fetch a user")];
        let idx = ToolIndexes::build(&tools);
        assert_eq!(idx.position("getuser"), Some(0));
        assert_eq!(idx.position("GETUSER"), Some(0));
        assert_eq!(idx.position("other"), None);
    }

    #[test]
    fn field_occurrences_accumulate() {
        let mut a = spec("a", "first");
        a.inputs.push(FieldSpec::new("a", "userId", "string"));
        let mut b = spec("b", "second");
        b.inputs.push(FieldSpec::new("b", "userId", "integer"));
        b.outputs.push(FieldSpec::new("b", "userId", "integer"));

        let idx = ToolIndexes::build(&[a, b]);
        let inputs = idx.input_occurrences("userid");
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].tool, "a");
        assert_eq!(inputs[1].tool, "b");
        assert_eq!(idx.output_occurrences("USERID").len(), 1);
    }

    #[test]
    fn keyword_index_spans_name_and_description() {
        let tools = vec![
            spec("send_email", "Deliver a message"),
            spec("list_inbox", "Show unread email"),
        ];
        let idx = ToolIndexes::build(&tools);
        let owners = idx.tools_mentioning("email").unwrap();
        assert!(owners.contains("send_email"));
        assert!(owners.contains("list_inbox"));
        assert!(idx.tools_mentioning("xyzzy").is_none());
        // short fragments fall below the keyword floor
        assert!(idx.tools_mentioning("a").is_none());
    }

    #[test]
    fn duplicate_names_keep_first_position() {
        let tools = vec![spec("dup", "first"), spec("DUP", "second")];
        let idx = ToolIndexes::build(&tools);
        assert_eq!(idx.position("dup"), Some(0));
    }
}
