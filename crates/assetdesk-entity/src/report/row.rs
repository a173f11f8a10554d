//! Resolved report rows and the query that produces them.

use serde::{Deserialize, Serialize};

use assetdesk_core::types::{FilterField, SortField};

use super::kind::ReportKind;

/// A single resolved row: field name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A validated, source-level query for one report kind.
///
/// Every field name in a `ResourceQuery` has already been checked against
/// the kind's catalogue, so row sources may interpolate them as identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuery {
    /// Data source.
    pub kind: ReportKind,
    /// Projected columns, in output order.
    pub columns: Vec<String>,
    /// Conjunctive filters.
    pub filters: Vec<FilterField>,
    /// Sort order.
    pub sort: SortField,
}
