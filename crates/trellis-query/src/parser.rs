//! Block-structured query parser
//!
//! An explicit-state recursive descent parser over the query text: header
//! lines, one operation line, brace-delimited WHERE/COMPUTE/FILTER sections,
//! and flat SORT BY / LIMIT directives. Brace depth is tracked character by
//! character, so a whole body may be wrapped in `{ ... }` and a query can sit
//! on a single line.
//!
//! ```text
//! QUERY active_users
//! INTENT which users are currently active
//! FETCH user {
//!   WHERE { status: active }
//!   FILTER { age >= 21 }
//!   SORT BY name ASC
//!   LIMIT 10
//! }
//! ```

use crate::ast::{Operation, Query, SortDirection, SortSpec};
use crate::lexer;
use std::collections::BTreeMap;
use trellis_core::{Error, Result};

/// Parse query text into a `Query` value
pub fn parse(text: &str) -> Result<Query> {
    let mut parser = Parser::new(text);
    parser.parse_query()
}

/// The three brace-delimited section kinds
#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Where,
    Compute,
    Filter,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn parse_query(&mut self) -> Result<Query> {
        let mut name = String::new();
        let mut intent = String::new();

        // Header: QUERY / INTENT lines, either order, both optional
        loop {
            self.skip_whitespace();
            if self.consume_keyword("QUERY") {
                self.consume_char(':');
                name = self.rest_of_line().trim().to_string();
            } else if self.consume_keyword("INTENT") {
                self.consume_char(':');
                intent = self.rest_of_line().trim().to_string();
            } else {
                break;
            }
        }

        // Operation line
        self.skip_whitespace();
        let op_word = self
            .parse_word()
            .ok_or_else(|| Error::Parse("expected an operation keyword".to_string()))?;
        let normalized = op_word.to_uppercase();
        // GRAPH_QUERY is a synonym for the traversal operation
        let operation = match normalized.as_str() {
            "FETCH" => Operation::Fetch,
            "INSERT" => Operation::Insert,
            "UPDATE" => Operation::Update,
            "DELETE" => Operation::Delete,
            "GRAPH_TRAVERSE" | "GRAPH_QUERY" => Operation::Traverse,
            _ => Operation::Other(normalized),
        };

        self.skip_inline_whitespace();
        let target = match self.peek_char() {
            Some(c) if c.is_alphanumeric() || c == '_' => self.parse_word().unwrap_or_default(),
            _ => String::new(),
        };

        let mut query = Query::new(operation, &target);
        query.name = name;
        query.intent = intent;

        // Body: statements, optionally wrapped in one outer brace pair
        let mut open_braces = 0usize;
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek_char() else { break };

            if c == '{' {
                self.pos += 1;
                open_braces += 1;
                continue;
            }
            if c == '}' {
                if open_braces == 0 {
                    return Err(Error::Parse("unexpected '}'".to_string()));
                }
                self.pos += 1;
                open_braces -= 1;
                continue;
            }

            if self.consume_keyword("WHERE") {
                self.read_section(Section::Where, &mut query)?;
            } else if self.consume_keyword("COMPUTE") {
                self.read_section(Section::Compute, &mut query)?;
            } else if self.consume_keyword("FILTER") {
                self.read_section(Section::Filter, &mut query)?;
            } else if self.consume_keyword("SORT") {
                if !self.consume_keyword("BY") {
                    return Err(Error::Parse("expected BY after SORT".to_string()));
                }
                let field = self
                    .parse_word()
                    .ok_or_else(|| Error::Parse("expected a field name after SORT BY".to_string()))?;
                let direction = if self.consume_keyword("DESC") {
                    SortDirection::Desc
                } else {
                    self.consume_keyword("ASC");
                    SortDirection::Asc
                };
                query.sort = Some(SortSpec { field, direction });
            } else if self.consume_keyword("LIMIT") {
                let word = self
                    .parse_word()
                    .ok_or_else(|| Error::Parse("expected a number after LIMIT".to_string()))?;
                let limit: usize = word
                    .parse()
                    .map_err(|_| Error::Parse(format!("invalid LIMIT value '{word}'")))?;
                query.limit = Some(limit);
            } else {
                let word = self.parse_word().unwrap_or_else(|| c.to_string());
                return Err(Error::Parse(format!("unexpected token '{word}'")));
            }
        }

        if open_braces > 0 {
            return Err(Error::Parse("unterminated '{'".to_string()));
        }

        Ok(query)
    }

    /// Read one section's entries and dispatch them into the query.
    ///
    /// Empty sections leave the clause absent rather than storing an empty
    /// map.
    fn read_section(&mut self, section: Section, query: &mut Query) -> Result<()> {
        let entries = self.section_entries()?;
        for entry in entries {
            match section {
                Section::Where => {
                    let (key, raw) = split_where_entry(&entry)?;
                    query
                        .where_clause
                        .get_or_insert_with(BTreeMap::new)
                        .insert(key, lexer::parse_literal(raw));
                }
                Section::Compute => {
                    let Some((key, raw)) = entry.split_once(':') else {
                        return Err(Error::Parse(format!(
                            "compute entry '{}' is missing ':'",
                            entry.trim()
                        )));
                    };
                    query
                        .compute
                        .get_or_insert_with(BTreeMap::new)
                        .insert(key.trim().to_string(), lexer::parse_aggregate(raw)?);
                }
                Section::Filter => {
                    let (field, condition) = lexer::parse_condition_entry(&entry)?;
                    query
                        .filter
                        .get_or_insert_with(BTreeMap::new)
                        .insert(field, condition);
                }
            }
        }
        Ok(())
    }

    /// Collect raw entry texts for a section.
    ///
    /// The braced form reads until the matching `}`; the braceless fallback
    /// reads to the end of the line. Entries split on commas and newlines,
    /// except inside brackets, parens, or quotes.
    fn section_entries(&mut self) -> Result<Vec<String>> {
        self.skip_whitespace();
        let braced = self.consume_char('{');

        let mut entries = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;

        let push_entry = |entries: &mut Vec<String>, current: &mut String| {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                entries.push(trimmed.to_string());
            }
            current.clear();
        };

        loop {
            let Some(c) = self.peek_char() else {
                if braced {
                    return Err(Error::Parse("unterminated section".to_string()));
                }
                push_entry(&mut entries, &mut current);
                return Ok(entries);
            };

            match c {
                '}' if depth == 0 => {
                    if braced {
                        self.pos += 1;
                    }
                    // Braceless sections end before an enclosing body brace
                    push_entry(&mut entries, &mut current);
                    return Ok(entries);
                }
                ',' | '\n' if depth == 0 => {
                    self.pos += 1;
                    if c == '\n' && !braced {
                        push_entry(&mut entries, &mut current);
                        return Ok(entries);
                    }
                    push_entry(&mut entries, &mut current);
                }
                '[' | '(' => {
                    self.pos += 1;
                    depth += 1;
                    current.push(c);
                }
                ']' | ')' => {
                    self.pos += 1;
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                '"' | '\'' => {
                    current.push_str(&self.consume_quoted(c));
                }
                _ => {
                    self.pos += 1;
                    current.push(c);
                }
            }
        }
    }

    /// Consume a quoted span including its delimiters
    fn consume_quoted(&mut self, quote: char) -> String {
        let mut out = String::new();
        out.push(quote);
        self.pos += 1;
        while let Some(c) = self.peek_char() {
            self.pos += 1;
            out.push(c);
            if c == quote {
                break;
            }
        }
        out
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let len = keyword.len();
        if self.pos + len > self.chars.len() {
            return false;
        }
        let candidate: String = self.chars[self.pos..self.pos + len].iter().collect();
        if !candidate.eq_ignore_ascii_case(keyword) {
            return false;
        }
        // Word boundary: the keyword must not run into an identifier
        if let Some(&next) = self.chars.get(self.pos + len) {
            if next.is_alphanumeric() || next == '_' {
                return false;
            }
        }
        self.pos += len;
        true
    }

    fn parse_word(&mut self) -> Option<String> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if start == self.pos {
            None
        } else {
            Some(self.chars[start..self.pos].iter().collect())
        }
    }

    fn rest_of_line(&mut self) -> String {
        let start = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn consume_char(&mut self, expected: char) -> bool {
        self.skip_inline_whitespace();
        if self.peek_char() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(&c) = self.chars.get(self.pos) {
            if c == ' ' || c == '\t' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }
}

/// Split a WHERE entry on `:` (preferred) or `=` into key and raw value text
fn split_where_entry(entry: &str) -> Result<(String, &str)> {
    let separator = entry
        .char_indices()
        .find(|(_, c)| *c == ':' || *c == '=')
        .map(|(i, _)| i);
    match separator {
        Some(idx) => {
            let key = entry[..idx].trim();
            if key.is_empty() {
                return Err(Error::Parse(format!(
                    "where entry '{}' is missing a field name",
                    entry.trim()
                )));
            }
            Ok((key.to_string(), &entry[idx + 1..]))
        }
        None => Err(Error::Parse(format!(
            "where entry '{}' is not of the form 'key: value'",
            entry.trim()
        ))),
    }
}
