//! Trellis Query Compiler
//!
//! Parses the block-structured query language into `Query` values, annotates
//! plans with advisory cost estimates, and offers a placeholder
//! natural-language templater.
//!
//! # Modules
//!
//! - `ast` - The compiled `Query` representation
//! - `lexer` - Expression tokenization and literal rules
//! - `parser` - The block-structured text parser
//! - `planner` - Cost annotation and plain-language explanation
//! - `nl` - Natural-language templating stand-in

pub mod ast;
pub mod lexer;
pub mod nl;
pub mod parser;
pub mod planner;

pub use ast::{
    Aggregate, AggregateFunc, CompareOp, Condition, Operation, Query, SortDirection, SortSpec,
};
pub use lexer::{Token, parse_literal};
pub use nl::{KeywordTemplater, Templater};
pub use parser::parse;
pub use planner::{QueryPlan, QueryPlanner};
