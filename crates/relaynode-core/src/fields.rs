//! Field resolvers: the operations the API surface exposes.
//!
//! Each resolver takes the [`RequestContext`] of the current request.
//! Parent entities are resolved through the loaders first, so a
//! connection under a missing parent is `Ok(None)` rather than an empty
//! page.

use chrono::{DateTime, SubsecRound, Utc};
use futures::future;
use relaynode_db::QueryPort;
use relaynode_types::{
    Connection, EntityType, IdentifierError, NewComment, NewPost, NewRecord, Node, NodeRef, PostKey, UserKey,
};
use serde::{Deserialize, Serialize};

use crate::assembler::{EdgeOrder, assemble};
use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::pagination::{PageArgs, PageSpec};

/// Row counts per entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounts {
    /// Rows in `users`.
    pub users: i64,
    /// Rows in `posts`.
    pub posts: i64,
    /// Rows in `comments`.
    pub comments: i64,
}

/// Client fields of a new post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostInput {
    /// Post title.
    pub title: String,
    /// Post body.
    #[serde(default)]
    pub body: String,
}

/// Client fields of a new comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommentInput {
    /// Comment body.
    pub body: String,
}

/// Look up one node by global identifier.
pub async fn node<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    id: &str,
) -> Result<Option<Node>, ResolveError> {
    ctx.node(id).await
}

/// Look up several nodes at once, batched per entity type.
///
/// Every identifier is decoded before any load is issued, so one malformed
/// identifier fails the call without touching the store. Results are in
/// `ids` order.
pub async fn nodes<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    ids: &[String],
) -> Result<Vec<Option<Node>>, ResolveError> {
    let refs = ids
        .iter()
        .map(|id| NodeRef::decode(id))
        .collect::<Result<Vec<_>, _>>()?;
    let loads: Vec<_> = refs.iter().map(|r| ctx.load_ref(r)).collect();
    Ok(future::try_join_all(loads).await?)
}

/// The authenticated user's node, `users:<username>`.
pub async fn viewer<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    username: &str,
) -> Result<Option<Node>, ResolveError> {
    let node_ref = NodeRef::new(EntityType::User, username)?;
    Ok(ctx.load_ref(&node_ref).await?)
}

/// Resolve `id` as a node of type `expected`.
async fn parent<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    id: &str,
    expected: EntityType,
) -> Result<Option<i64>, ResolveError> {
    let node_ref = NodeRef::decode(id)?;
    if node_ref.entity() != expected {
        return Err(IdentifierError::WrongType {
            expected,
            found: node_ref.to_string(),
        }
        .into());
    }
    Ok(ctx.load_ref(&node_ref).await?.map(|node| node.key()))
}

/// A user's posts, oldest first, two per page by default.
pub async fn user_posts<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    user_id: &str,
    args: &PageArgs,
) -> Result<Option<Connection<Node>>, ResolveError> {
    let Some(user) = parent(ctx, user_id, EntityType::User).await? else {
        return Ok(None);
    };
    let spec = PageSpec::user_posts(UserKey(user));
    let slice = ctx.pagination().paginate(ctx.port(), &spec, args).await?;
    assemble(ctx, slice, EdgeOrder::Slice).await.map(Some)
}

/// A post's comments, oldest first, ten per page by default.
pub async fn post_comments<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    post_id: &str,
    args: &PageArgs,
) -> Result<Option<Connection<Node>>, ResolveError> {
    let Some(post) = parent(ctx, post_id, EntityType::Post).await? else {
        return Ok(None);
    };
    let spec = PageSpec::post_comments(PostKey(post));
    let slice = ctx.pagination().paginate(ctx.port(), &spec, args).await?;
    assemble(ctx, slice, EdgeOrder::Slice).await.map(Some)
}

/// Every post, newest first, one per page by default, paged by offset.
pub async fn feed<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    args: &PageArgs,
) -> Result<Connection<Node>, ResolveError> {
    let slice = ctx
        .pagination()
        .paginate(ctx.port(), &PageSpec::feed(), args)
        .await?;
    assemble(ctx, slice, EdgeOrder::NewestFirst).await
}

/// Row counts of every entity type.
pub async fn counts<Q: QueryPort>(ctx: &RequestContext<Q>) -> Result<NodeCounts, ResolveError> {
    let (users, posts, comments) = futures::try_join!(
        ctx.loader(EntityType::User).get_count(),
        ctx.loader(EntityType::Post).get_count(),
        ctx.loader(EntityType::Comment).get_count(),
    )?;
    Ok(NodeCounts {
        users,
        posts,
        comments,
    })
}

/// Create a post by the user `user_id`.
///
/// Returns `Ok(None)` when the author does not exist. The new row is
/// primed into the post loader.
pub async fn create_post<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    user_id: &str,
    input: PostInput,
) -> Result<Option<Node>, ResolveError> {
    let Some(author) = parent(ctx, user_id, EntityType::User).await? else {
        return Ok(None);
    };
    let record = NewRecord::Post(NewPost {
        posted_by_user_id: UserKey(author),
        created_at: now(),
        title: input.title,
        body: input.body,
    });
    insert(ctx, record).await.map(Some)
}

/// Create a comment on `post_id` written by `author_id`.
///
/// Returns `Ok(None)` when the post or the author does not exist.
pub async fn create_comment<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    post_id: &str,
    author_id: &str,
    input: CommentInput,
) -> Result<Option<Node>, ResolveError> {
    let (post, author) = futures::try_join!(
        parent(ctx, post_id, EntityType::Post),
        parent(ctx, author_id, EntityType::User),
    )?;
    let (Some(post), Some(author)) = (post, author) else {
        return Ok(None);
    };
    let record = NewRecord::Comment(NewComment {
        post_id: PostKey(post),
        posted_by_user_id: UserKey(author),
        created_at: now(),
        body: input.body,
    });
    insert(ctx, record).await.map(Some)
}

/// Creation time for new rows, at the store's microsecond precision so
/// the primed row matches what a later fetch returns.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

async fn insert<Q: QueryPort>(
    ctx: &RequestContext<Q>,
    record: NewRecord,
) -> Result<Node, ResolveError> {
    let entity = record.entity_type();
    let key = ctx.port().insert(record.clone()).await?;
    let node = record.into_node(key);
    ctx.loader(entity).prime(node.clone());
    tracing::info!(
        request_id = %ctx.request_id(),
        %entity,
        key,
        "Created node"
    );
    Ok(node)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pagination::PaginationEngine;
    use crate::testing::{CountingPort, seeded_port};

    async fn ctx() -> (CountingPort, RequestContext<CountingPort>) {
        let port = seeded_port().await;
        let ctx = RequestContext::new(port.clone(), PaginationEngine::default());
        (port, ctx)
    }

    fn keys(conn: &Connection<Node>) -> Vec<i64> {
        conn.nodes().map(Node::key).collect()
    }

    #[tokio::test]
    async fn nodes_batches_per_type_and_keeps_order() {
        let (port, ctx) = ctx().await;
        let ids: Vec<String> = ["posts:2", "users:1", "posts:9", "posts:1"]
            .into_iter()
            .map(String::from)
            .collect();

        let found = nodes(&ctx, &ids).await.unwrap();
        let refs: Vec<Option<String>> = found
            .iter()
            .map(|n| n.as_ref().map(|n| n.node_ref().to_string()))
            .collect();
        assert_eq!(
            refs,
            vec![
                Some(String::from("posts:2")),
                Some(String::from("users:1")),
                None,
                Some(String::from("posts:1")),
            ]
        );
        assert_eq!(port.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn nodes_rejects_any_malformed_identifier_up_front() {
        let (port, ctx) = ctx().await;
        let ids = vec![String::from("posts:1"), String::from("posts")];
        assert!(matches!(
            nodes(&ctx, &ids).await,
            Err(ResolveError::InvalidIdentifier(_))
        ));
        assert_eq!(port.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn viewer_resolves_username_as_user_key() {
        let (_, ctx) = ctx().await;
        let me = viewer(&ctx, "1").await.unwrap().unwrap();
        assert_eq!(me.node_ref().to_string(), "users:1");
        assert_eq!(viewer(&ctx, "nobody").await.unwrap(), None);
        assert!(viewer(&ctx, "a:b").await.is_err());
    }

    #[tokio::test]
    async fn user_posts_pages_and_resolves_nodes() {
        let (port, ctx) = ctx().await;
        let conn = user_posts(&ctx, "users:1", &PageArgs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(keys(&conn), vec![1, 2]);
        assert!(conn.page_info.has_next_page);
        // One batch for the parent user, one for the page's posts.
        assert_eq!(port.batches(), vec![vec![1], vec![1, 2]]);
    }

    #[tokio::test]
    async fn connections_under_missing_parents_are_absent() {
        let (_, ctx) = ctx().await;
        assert_eq!(
            user_posts(&ctx, "users:42", &PageArgs::default()).await.unwrap(),
            None
        );
        assert_eq!(
            post_comments(&ctx, "posts:42", &PageArgs::default()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn connection_parent_must_have_the_right_type() {
        let (_, ctx) = ctx().await;
        assert!(matches!(
            user_posts(&ctx, "posts:1", &PageArgs::default()).await,
            Err(ResolveError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn post_comments_default_to_ten() {
        let (_, ctx) = ctx().await;
        let conn = post_comments(&ctx, "posts:1", &PageArgs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(keys(&conn), vec![1, 2, 3]);
        assert!(!conn.page_info.has_next_page);
    }

    #[tokio::test]
    async fn feed_is_newest_first() {
        let (_, ctx) = ctx().await;
        let conn = feed(&ctx, &PageArgs::first(3)).await.unwrap();
        assert_eq!(keys(&conn), vec![5, 4, 3]);
        assert!(conn.page_info.has_previous_page);

        let fourth = feed(&ctx, &PageArgs::first(1).offset(3)).await.unwrap();
        assert_eq!(keys(&fourth), vec![2]);
    }

    #[tokio::test]
    async fn counts_every_type() {
        let (_, ctx) = ctx().await;
        assert_eq!(
            counts(&ctx).await.unwrap(),
            NodeCounts {
                users: 2,
                posts: 5,
                comments: 3,
            }
        );
    }

    #[tokio::test]
    async fn created_post_resolves_from_the_cache() {
        let (port, ctx) = ctx().await;
        let input = PostInput {
            title: String::from("fresh"),
            body: String::from("text"),
        };
        let created = create_post(&ctx, "users:2", input).await.unwrap().unwrap();
        assert_eq!(created.key(), 6);

        let calls = port.fetch_calls();
        let again = ctx.node("posts:6").await.unwrap();
        assert_eq!(again, Some(created));
        assert_eq!(port.fetch_calls(), calls);
    }

    #[tokio::test]
    async fn create_comment_requires_post_and_author() {
        let (_, ctx) = ctx().await;
        let body = || CommentInput {
            body: String::from("hi"),
        };
        assert_eq!(
            create_comment(&ctx, "posts:99", "users:1", body()).await.unwrap(),
            None
        );
        assert_eq!(
            create_comment(&ctx, "posts:2", "users:99", body()).await.unwrap(),
            None
        );

        let created = create_comment(&ctx, "posts:2", "users:1", body())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            &created,
            Node::Comment(c) if c.post_id == PostKey(2) && c.posted_by_user_id == UserKey(1)
        ));
    }

    #[tokio::test]
    async fn new_posts_appear_after_the_last_page() {
        let (_, ctx) = ctx().await;
        let first = user_posts(&ctx, "users:1", &PageArgs::first(5))
            .await
            .unwrap()
            .unwrap();
        assert!(!first.page_info.has_next_page);

        create_post(&ctx, "users:1", PostInput::default()).await.unwrap();
        let after = first.page_info.end_cursor.unwrap();
        let next = user_posts(&ctx, "users:1", &PageArgs::first(5).after(after))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(keys(&next), vec![6]);
    }
}
