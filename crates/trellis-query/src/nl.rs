//! Natural-language templating stand-in
//!
//! Turns free-form text into query text by substring-triggered templates.
//! This is a placeholder for a real language-understanding service, kept
//! behind the `Templater` trait so a real implementation can be swapped in
//! without touching the compiler or engine.

use tracing::debug;

/// Strategy seam for natural-language-to-query translation
pub trait Templater {
    /// Produce query text for the given input; the original input is carried
    /// through as the query's INTENT.
    fn to_query_text(&self, input: &str) -> String;
}

/// Keyword-triggered canned templates.
///
/// Matching is lowercase substring containment; the first matching trigger
/// wins and anything else falls back to a generic fetch.
#[derive(Debug, Default)]
pub struct KeywordTemplater;

impl KeywordTemplater {
    pub fn new() -> Self {
        Self
    }
}

impl Templater for KeywordTemplater {
    fn to_query_text(&self, input: &str) -> String {
        let lower = input.to_lowercase();
        let intent = input.trim();

        let body = if lower.contains("find") && lower.contains("user") {
            if lower.contains("active") {
                "FETCH user {\n  WHERE { status: active }\n}".to_string()
            } else {
                "FETCH user".to_string()
            }
        } else if lower.contains("count") && lower.contains("order") {
            "FETCH order {\n  COMPUTE { n: COUNT() }\n}".to_string()
        } else if lower.contains("total") && lower.contains("order") {
            "FETCH order {\n  COMPUTE { total: SUM(total) }\n}".to_string()
        } else if lower.contains("related") || lower.contains("connected") {
            "GRAPH_TRAVERSE {\n  WHERE { start: 1, path: [RELATES_TO] }\n}".to_string()
        } else {
            "FETCH node".to_string()
        };

        debug!(input = intent, "templated natural-language query");
        format!("QUERY templated\nINTENT {intent}\n{body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AggregateFunc, Operation};
    use crate::parser::parse;
    use trellis_core::Value;

    #[test]
    fn test_find_user_template() {
        let text = KeywordTemplater::new().to_query_text("find all active users");
        let query = parse(&text).unwrap();
        assert_eq!(query.operation, Operation::Fetch);
        assert_eq!(query.target, "user");
        assert_eq!(query.intent, "find all active users");
        assert_eq!(
            query.where_clause.as_ref().unwrap().get("status"),
            Some(&Value::Str("active".into()))
        );
    }

    #[test]
    fn test_count_order_template() {
        let text = KeywordTemplater::new().to_query_text("count the orders");
        let query = parse(&text).unwrap();
        assert_eq!(query.target, "order");
        assert_eq!(
            query.compute.as_ref().unwrap().get("n").unwrap().func,
            AggregateFunc::Count
        );
    }

    #[test]
    fn test_generic_fallback() {
        let text = KeywordTemplater::new().to_query_text("do something unusual");
        let query = parse(&text).unwrap();
        assert_eq!(query.operation, Operation::Fetch);
        assert_eq!(query.target, "node");
        assert_eq!(query.intent, "do something unusual");
    }

    #[test]
    fn test_every_template_parses() {
        let inputs = [
            "find users",
            "find active users",
            "count orders",
            "total of orders",
            "what is connected to this",
            "gibberish",
        ];
        for input in inputs {
            let text = KeywordTemplater::new().to_query_text(input);
            assert!(parse(&text).is_ok(), "template for '{input}' must parse");
        }
    }
}
