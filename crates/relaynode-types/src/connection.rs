//! Paginated list response shapes.
//!
//! ```text
//! { edges: [{ cursor, node }], pageInfo: { hasNextPage, hasPreviousPage, startCursor?, endCursor? } }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cursor::Cursor;

/// Page-existence metadata for one page of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether rows exist after this page.
    pub has_next_page: bool,
    /// Whether rows exist before this page.
    pub has_previous_page: bool,
    /// Cursor of the first row of the page; absent when the page is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub start_cursor: Option<Cursor>,
    /// Cursor of the last row of the page; absent when the page is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub end_cursor: Option<Cursor>,
}

/// A node paired with its position in the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Edge<T> {
    /// Position of the node.
    #[ts(as = "String")]
    pub cursor: Cursor,
    /// The resolved node.
    pub node: T,
}

/// One page of a paginated list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// The page, in connection order.
    pub edges: Vec<Edge<T>>,
    /// Page-existence metadata.
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// The nodes of the page, in edge order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }

    /// Number of edges on the page.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the page has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
