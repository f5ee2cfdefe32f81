//! Query planning and explanation
//!
//! The planner annotates a parsed query with an estimated cost and a list of
//! applied optimizations. The annotation is advisory metadata for status
//! reporting; execution never consults it.

use crate::ast::{Operation, Query, SortDirection};
use tracing::debug;

/// A cost-annotated query plan
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// The query, unchanged
    pub query: Query,

    /// Human-readable optimization notes
    pub optimizations: Vec<String>,

    /// Estimated execution time in milliseconds
    pub estimated_ms: f64,
}

/// Static cost heuristics for query plans
pub struct QueryPlanner {
    /// Cost assumed for a bare type scan
    base_cost_ms: f64,
}

impl QueryPlanner {
    pub fn new() -> Self {
        Self { base_cost_ms: 10.0 }
    }

    /// Annotate a query with estimated cost and optimization notes.
    ///
    /// Fixed deltas per clause: WHERE narrows the scan and lowers the
    /// estimate, COMPUTE and FILTER add passes, LIMIT caps the estimate
    /// proportionally.
    pub fn compile(&self, query: &Query) -> QueryPlan {
        let mut estimated_ms = self.base_cost_ms;
        let mut optimizations = Vec::new();

        if let Some(clause) = &query.where_clause {
            estimated_ms -= 2.0;
            optimizations.push(format!(
                "index lookup candidate on {} field(s)",
                clause.len()
            ));
        }

        if query.filter.is_some() {
            estimated_ms += 1.0;
            optimizations.push("post-scan comparison pass".to_string());
        }

        if let Some(compute) = &query.compute {
            estimated_ms += 1.5;
            optimizations.push(format!("aggregation pass ({} expression(s))", compute.len()));
        }

        if query.sort.is_some() {
            estimated_ms += 2.0;
        }

        if let Some(limit) = query.limit {
            // A tight limit caps the useful work proportionally
            let fraction = (limit as f64 / 100.0).min(1.0);
            estimated_ms *= fraction.max(0.1);
            optimizations.push(format!("result set capped at {limit} row(s)"));
        }

        let estimated_ms = estimated_ms.max(0.5);
        debug!(query = %query.name, estimated_ms, "compiled query plan");

        QueryPlan {
            query: query.clone(),
            optimizations,
            estimated_ms,
        }
    }

    /// Render a numbered plain-language description of the execution steps
    pub fn explain(&self, query: &Query) -> String {
        let mut steps = Vec::new();

        match &query.operation {
            Operation::Traverse => {
                steps.push("walk the graph breadth-first from the start node".to_string());
            }
            op => {
                steps.push(format!(
                    "{} nodes from collection '{}'",
                    op, query.target
                ));
            }
        }

        if let Some(clause) = &query.where_clause {
            let fields: Vec<&str> = clause.keys().map(String::as_str).collect();
            steps.push(format!("keep nodes matching equality on: {}", fields.join(", ")));
        }

        if let Some(filter) = &query.filter {
            let conds: Vec<String> = filter
                .iter()
                .map(|(field, c)| format!("{field} {} {}", c.op.symbol(), c.value))
                .collect();
            steps.push(format!("apply comparisons: {}", conds.join(", ")));
        }

        if let Some(sort) = &query.sort {
            let direction = match sort.direction {
                SortDirection::Asc => "ascending",
                SortDirection::Desc => "descending",
            };
            steps.push(format!("sort by '{}' {}", sort.field, direction));
        }

        if let Some(limit) = query.limit {
            steps.push(format!("truncate to {limit} row(s)"));
        }

        if let Some(compute) = &query.compute {
            let exprs: Vec<String> = compute
                .iter()
                .map(|(name, agg)| format!("{name} = {agg}"))
                .collect();
            steps.push(format!("collapse into one row: {}", exprs.join(", ")));
        }

        let plan = self.compile(query);
        let mut out = format!("Execution plan for '{}':\n", query.name);
        for (i, step) in steps.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, step));
        }
        out.push_str(&format!("(estimated {:.1} ms)", plan.estimated_ms));
        out
    }
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AggregateFunc, CompareOp};

    #[test]
    fn test_where_lowers_estimate() {
        let planner = QueryPlanner::new();
        let bare = planner.compile(&Query::fetch("user"));
        let narrowed = planner.compile(&Query::fetch("user").with_where("status", "active"));
        assert!(narrowed.estimated_ms < bare.estimated_ms);
        assert_eq!(narrowed.optimizations.len(), 1);
    }

    #[test]
    fn test_compute_and_filter_raise_estimate() {
        let planner = QueryPlanner::new();
        let bare = planner.compile(&Query::fetch("order"));
        let heavy = planner.compile(
            &Query::fetch("order")
                .with_filter("total", CompareOp::Gt, 100i64)
                .with_compute("total", AggregateFunc::Sum, Some("total")),
        );
        assert!(heavy.estimated_ms > bare.estimated_ms);
    }

    #[test]
    fn test_limit_caps_estimate() {
        let planner = QueryPlanner::new();
        let bare = planner.compile(&Query::fetch("user"));
        let capped = planner.compile(&Query::fetch("user").with_limit(5));
        assert!(capped.estimated_ms < bare.estimated_ms);
    }

    #[test]
    fn test_plan_never_mutates_query() {
        let planner = QueryPlanner::new();
        let query = Query::fetch("user").with_where("status", "active");
        let plan = planner.compile(&query);
        assert_eq!(plan.query, query);
    }

    #[test]
    fn test_explain_lists_steps_in_order() {
        let planner = QueryPlanner::new();
        let query = Query::fetch("user")
            .with_where("status", "active")
            .with_filter("age", CompareOp::Gte, 21i64)
            .with_limit(10);
        let text = planner.explain(&query);
        assert!(text.contains("1. FETCH nodes from collection 'user'"));
        assert!(text.contains("equality on: status"));
        assert!(text.contains("age >= 21"));
        assert!(text.contains("truncate to 10 row(s)"));
    }
}
