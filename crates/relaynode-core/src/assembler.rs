//! Joins page slices with loaded entities.
//!
//! Every row in a [`PageSlice`] is turned back into a [`NodeRef`] and
//! requested from the context's loaders. All loads are issued before any
//! is awaited, so a page costs at most one batch per entity type.

use futures::future;
use relaynode_db::QueryPort;
use relaynode_types::{Connection, Edge, Node, NodeRef};

use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::pagination::PageSlice;

/// Edge order of an assembled connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EdgeOrder {
    /// Keep the slice order.
    #[default]
    Slice,
    /// Stable re-sort by creation time, newest first.
    NewestFirst,
}

/// Resolve every row of `slice` and build the connection.
///
/// Rows whose entity no longer exists are dropped; the page info is kept
/// as computed.
///
/// # Errors
///
/// Fails with the first [`ResolveError::BatchFetch`] among the loads.
pub async fn assemble<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    slice: PageSlice,
    order: EdgeOrder,
) -> Result<Connection<Node>, ResolveError> {
    let loads: Vec<_> = slice
        .rows
        .iter()
        .map(|row| ctx.load_ref(&NodeRef::encode(row.entity, row.key())))
        .collect();
    let nodes = future::try_join_all(loads).await?;

    let requested = slice.rows.len();
    let mut edges: Vec<Edge<Node>> = slice
        .rows
        .into_iter()
        .zip(nodes)
        .filter_map(|(row, node)| {
            node.map(|node| Edge {
                cursor: row.cursor,
                node,
            })
        })
        .collect();

    if edges.len() < requested {
        tracing::debug!(
            request_id = %ctx.request_id(),
            requested,
            resolved = edges.len(),
            "Dropped edges for rows that vanished"
        );
    }

    if order == EdgeOrder::NewestFirst {
        edges.sort_by(|a, b| b.node.created_at().cmp(&a.node.created_at()));
    }

    Ok(Connection {
        edges,
        page_info: slice.page_info,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use relaynode_db::PageRow;
    use relaynode_types::{Cursor, EntityType, PageInfo};

    use super::*;
    use crate::pagination::PaginationEngine;
    use crate::testing::{at, seeded_port};

    fn slice(rows: &[(i64, i64)]) -> PageSlice {
        let rows: Vec<PageRow> = rows
            .iter()
            .map(|&(key, hour)| PageRow {
                entity: EntityType::Post,
                cursor: Cursor::new(at(hour), key),
            })
            .collect();
        PageSlice {
            page_info: PageInfo {
                has_next_page: true,
                has_previous_page: false,
                start_cursor: rows.first().map(|r| r.cursor),
                end_cursor: rows.last().map(|r| r.cursor),
            },
            rows,
        }
    }

    fn edge_keys(conn: &Connection<Node>) -> Vec<i64> {
        conn.nodes().map(Node::key).collect()
    }

    #[tokio::test]
    async fn edges_keep_slice_order_and_cursors_in_one_batch() {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port.clone(), PaginationEngine::default());
        let input = slice(&[(3, 3), (1, 1), (2, 2)]);
        let info = input.page_info;

        let conn = assemble(&ctx, input, EdgeOrder::Slice).await.unwrap();

        assert_eq!(edge_keys(&conn), vec![3, 1, 2]);
        assert!(conn.edges.iter().all(|e| e.node.cursor() == Some(e.cursor)));
        assert_eq!(conn.page_info, info);
        assert_eq!(port.batches(), vec![vec![3, 1, 2]]);
    }

    #[tokio::test]
    async fn newest_first_resorts_by_creation_time() {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port, PaginationEngine::default());

        let conn = assemble(&ctx, slice(&[(2, 2), (5, 5), (1, 1)]), EdgeOrder::NewestFirst)
            .await
            .unwrap();
        assert_eq!(edge_keys(&conn), vec![5, 2, 1]);
    }

    #[tokio::test]
    async fn vanished_rows_are_dropped() {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port.clone(), PaginationEngine::default());
        assert!(port.store().delete(EntityType::Post, 2).await);

        let input = slice(&[(1, 1), (2, 2), (3, 3)]);
        let info = input.page_info;
        let conn = assemble(&ctx, input, EdgeOrder::Slice).await.unwrap();

        assert_eq!(edge_keys(&conn), vec![1, 3]);
        assert_eq!(conn.page_info, info);
    }

    #[tokio::test]
    async fn a_failed_batch_fails_the_assembly() {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port.clone(), PaginationEngine::default());
        port.fail_next_fetch();

        let result = assemble(&ctx, slice(&[(1, 1), (2, 2)]), EdgeOrder::Slice).await;
        assert!(matches!(result, Err(ResolveError::BatchFetch(_))));
    }

    #[tokio::test]
    async fn empty_slice_makes_no_fetch() {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port.clone(), PaginationEngine::default());

        let conn = assemble(&ctx, PageSlice::default(), EdgeOrder::NewestFirst)
            .await
            .unwrap();
        assert!(conn.is_empty());
        assert_eq!(port.fetch_calls(), 0);
    }
}
