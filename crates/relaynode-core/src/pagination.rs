//! Keyset and offset pagination over `(created_at, id)` orderings.
//!
//! The [`PaginationEngine`] turns client arguments ([`PageArgs`]) and a
//! call-site description ([`PageSpec`]) into one [`PageQuery`], reads it
//! through the [`QueryPort`], and returns a [`PageSlice`]: identity rows
//! plus [`PageInfo`]. It never resolves entities; that is the
//! [`assembler`](crate::assembler)'s job.
//!
//! # Variants
//!
//! | Variant | Order | Read | `hasNextPage` | `hasPreviousPage` |
//! |---------|-------|------|---------------|-------------------|
//! | [`Keyset`](PageVariant::Keyset) | ascending, rows after `after` | `first + 2` | `fetched > first` | `false` |
//! | [`Feed`](PageVariant::Feed) | descending, `offset` rows skipped | `first + 1` | `false` | `fetched > first` |
//!
//! Keyset traversal is stable under inserts: a cursor names a position in
//! the ordering, not an index, so rows added after a page was read never
//! shift or repeat the rows that follow it.

use relaynode_db::{Filter, FilterColumn, PageQuery, PageRow, QueryPort, SortDirection};
use relaynode_types::{Cursor, EntityType, PageInfo, PostKey, UserKey};
use serde::Deserialize;

use crate::error::ResolveError;

/// Default page size of a user's posts.
pub const USER_POSTS_PAGE_SIZE: u32 = 2;

/// Default page size of a post's comments.
pub const POST_COMMENTS_PAGE_SIZE: u32 = 10;

/// Default page size of the global feed.
pub const FEED_PAGE_SIZE: u32 = 1;

/// Default upper bound on `first`.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Client pagination arguments, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageArgs {
    /// Requested page size; the call site's default when absent.
    pub first: Option<u32>,
    /// Opaque cursor; only rows after it are returned.
    pub after: Option<String>,
    /// Opaque cursor for backward paging. Always rejected.
    pub before: Option<String>,
    /// Rows to skip; feed only.
    pub offset: Option<u64>,
}

impl PageArgs {
    /// Arguments with only `first` set.
    pub const fn first(first: u32) -> Self {
        Self {
            first: Some(first),
            after: None,
            before: None,
            offset: None,
        }
    }

    /// Set the `after` cursor.
    #[must_use]
    pub fn after(mut self, cursor: impl ToString) -> Self {
        self.after = Some(cursor.to_string());
        self
    }

    /// Set the feed offset.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Which pagination algorithm a call site uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageVariant {
    /// Forward keyset traversal, oldest first.
    Keyset,
    /// Newest first with a numeric offset.
    Feed,
}

/// A paginated call site: collection, filter, variant, and default size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    /// Collection being paged.
    pub entity: EntityType,
    /// Equality filters on the collection.
    pub filters: Vec<Filter>,
    /// Pagination algorithm.
    pub variant: PageVariant,
    /// Page size when `first` is absent.
    pub default_page_size: u32,
}

impl PageSpec {
    /// A user's posts, oldest first.
    pub fn user_posts(user: UserKey) -> Self {
        Self {
            entity: EntityType::Post,
            filters: vec![Filter::eq(FilterColumn::PostedByUserId, user.get())],
            variant: PageVariant::Keyset,
            default_page_size: USER_POSTS_PAGE_SIZE,
        }
    }

    /// A post's comments, oldest first.
    pub fn post_comments(post: PostKey) -> Self {
        Self {
            entity: EntityType::Comment,
            filters: vec![Filter::eq(FilterColumn::PostId, post.get())],
            variant: PageVariant::Keyset,
            default_page_size: POST_COMMENTS_PAGE_SIZE,
        }
    }

    /// Every post, newest first.
    pub const fn feed() -> Self {
        Self {
            entity: EntityType::Post,
            filters: Vec::new(),
            variant: PageVariant::Feed,
            default_page_size: FEED_PAGE_SIZE,
        }
    }
}

/// One page of identity rows plus page metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSlice {
    /// Rows of the page, in page order.
    pub rows: Vec<PageRow>,
    /// Page-existence flags and boundary cursors.
    pub page_info: PageInfo,
}

impl PageSlice {
    fn new(mut rows: Vec<PageRow>, page_size: u32, variant: PageVariant) -> Self {
        let page_len = usize::try_from(page_size).unwrap_or(usize::MAX);
        let more = rows.len() > page_len;
        rows.truncate(page_len);

        let page_info = PageInfo {
            has_next_page: variant == PageVariant::Keyset && more,
            has_previous_page: variant == PageVariant::Feed && more,
            start_cursor: rows.first().map(|r| r.cursor),
            end_cursor: rows.last().map(|r| r.cursor),
        };
        Self { rows, page_info }
    }
}

/// Computes bounded, ordered row slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationEngine {
    max_page_size: u32,
}

impl Default for PaginationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGE_SIZE)
    }
}

impl PaginationEngine {
    /// Create an engine that rejects `first` above `max_page_size`.
    pub const fn new(max_page_size: u32) -> Self {
        Self { max_page_size }
    }

    /// The largest accepted `first`.
    pub const fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Validate `args` against `spec` and build the store query.
    ///
    /// Returns the query together with the effective page size.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Pagination`] for a malformed cursor or
    /// conflicting, unsupported, or out-of-range arguments.
    pub fn plan(&self, spec: &PageSpec, args: &PageArgs) -> Result<(PageQuery, u32), ResolveError> {
        if args.after.is_some() && args.before.is_some() {
            return Err(pagination("`after` and `before` are mutually exclusive"));
        }
        if args.before.is_some() {
            return Err(pagination("backward pagination with `before` is not supported"));
        }
        if args.offset.is_some() && args.after.is_some() {
            return Err(pagination("`offset` cannot be combined with a cursor"));
        }

        let page_size = args.first.unwrap_or(spec.default_page_size);
        if page_size == 0 {
            return Err(pagination("`first` must be at least 1"));
        }
        if page_size > self.max_page_size {
            return Err(ResolveError::Pagination(format!(
                "`first` must not exceed {}",
                self.max_page_size
            )));
        }

        let query = match spec.variant {
            PageVariant::Keyset => {
                if args.offset.is_some() {
                    return Err(pagination("`offset` is only supported on the feed"));
                }
                let after = args.after.as_deref().map(Cursor::decode).transpose()?;
                PageQuery {
                    entity: spec.entity,
                    filters: spec.filters.clone(),
                    direction: SortDirection::Ascending,
                    after,
                    offset: 0,
                    limit: u64::from(page_size).saturating_add(2),
                }
            }
            PageVariant::Feed => {
                if args.after.is_some() {
                    return Err(pagination("the feed pages by `offset`, not by cursor"));
                }
                let offset = args.offset.unwrap_or(0);
                if i64::try_from(offset).is_err() {
                    return Err(ResolveError::Pagination(format!(
                        "`offset` must not exceed {}",
                        i64::MAX
                    )));
                }
                PageQuery {
                    entity: spec.entity,
                    filters: spec.filters.clone(),
                    direction: SortDirection::Descending,
                    after: None,
                    offset,
                    limit: u64::from(page_size).saturating_add(1),
                }
            }
        };
        Ok((query, page_size))
    }

    /// Read one page of `spec` according to `args`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Pagination`] for invalid arguments (see
    /// [`plan`](Self::plan)) and [`ResolveError::Store`] if the read fails.
    pub async fn paginate<Q: QueryPort>(
        &self,
        port: &Q,
        spec: &PageSpec,
        args: &PageArgs,
    ) -> Result<PageSlice, ResolveError> {
        let (query, page_size) = self.plan(spec, args)?;
        let rows = port.fetch_page(&query).await?;
        let slice = PageSlice::new(rows, page_size, spec.variant);
        tracing::debug!(
            entity = %spec.entity,
            variant = ?spec.variant,
            page_size,
            rows = slice.rows.len(),
            has_next = slice.page_info.has_next_page,
            has_previous = slice.page_info.has_previous_page,
            "Computed page"
        );
        Ok(slice)
    }
}

fn pagination(message: &str) -> ResolveError {
    ResolveError::Pagination(message.to_owned())
}
