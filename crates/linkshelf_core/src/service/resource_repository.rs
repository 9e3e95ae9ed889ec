//! Resource command and query handlers.
//!
//! # Responsibility
//! - Expose the create/read/update/delete/search/vote/count surface.
//! - Consult the validation gateway and metadata fetcher before writing.
//! - Shape every outcome into the uniform [`Envelope`].
//!
//! # Invariants
//! - Each handler makes at most one store call (`create` also makes one
//!   metadata fetch) and yields exactly one outcome.
//! - Listing and search results are newest first.
//! - Votes are appended unconditionally; nothing is deduplicated here.
//! - Operations that match no resource still succeed.

use crate::config::{BootstrapError, LinkshelfConfig};
use crate::db::{open_db, open_db_in_memory};
use crate::metadata::{HttpMetadataFetcher, MetadataFetcher};
use crate::model::resource::{Resource, ResourceMeta, VoteKind};
use crate::repo::resource_store::{ResourceQuery, ResourceStore, SqliteResourceStore};
use crate::search::pattern::SearchPattern;
use crate::service::envelope::{
    Affected, CreatedResource, Envelope, FailureContext, Outcome, ResourceCount, ResourceList,
    ResourcePage, VotesCount, GENERIC_FAILURE_MESSAGE,
};
use crate::service::error::ResourceError;
use crate::url_utils::{StandardUrlUtilities, UrlUtilities};
use crate::validation::{ResourceValidator, RuleValidator};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

const MSG_CREATED: &str = "Successfully added into the database";
const MSG_RETRIEVED: &str = "Successfully retrieved the resources collection";
const MSG_LINK_UPDATED: &str = "Successfully updated the link";
const MSG_AUTHOR_UPDATED: &str = "Successfully updated the author";
const MSG_DELETED: &str = "Successfully deleted the link";
const MSG_SEARCHED: &str = "Search operation was successful";
const MSG_UPVOTED: &str = "Successfully upvoted";
const MSG_DOWNVOTED: &str = "Successfully downvoted";
const MSG_COUNTED: &str = "Count operation was successful";
const MSG_VOTES_COUNTED: &str = "Votes count operation was successful";

/// How a persistence failure is worded in the failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PersistenceMessage {
    /// Thread the store's own message through.
    Verbatim,
    /// Replace it with [`GENERIC_FAILURE_MESSAGE`].
    Generic,
}

/// Requested page, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Page {
    number: u64,
    limit: u64,
}

impl Page {
    fn new(page_number: u32, limit: u32) -> Result<Self, ResourceError> {
        if page_number == 0 || limit == 0 {
            return Err(ResourceError::InvalidPage { page_number, limit });
        }
        Ok(Self {
            number: u64::from(page_number),
            limit: u64::from(limit),
        })
    }

    fn skip(self) -> u64 {
        (self.number - 1) * self.limit
    }

    fn start(self) -> u64 {
        self.number * self.limit - self.limit + 1
    }

    fn end(self) -> u64 {
        self.number * self.limit
    }
}

/// Repository facade over a resource store and its collaborators.
///
/// All collaborators are injected, so tests can swap any of them.
#[derive(Clone)]
pub struct ResourceRepository {
    store: Arc<dyn ResourceStore>,
    validator: Arc<dyn ResourceValidator>,
    fetcher: Arc<dyn MetadataFetcher>,
    urls: Arc<dyn UrlUtilities>,
    case_insensitive_search: bool,
}

impl ResourceRepository {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        validator: Arc<dyn ResourceValidator>,
        fetcher: Arc<dyn MetadataFetcher>,
        urls: Arc<dyn UrlUtilities>,
    ) -> Self {
        Self {
            store,
            validator,
            fetcher,
            urls,
            case_insensitive_search: false,
        }
    }

    /// Makes `search`/`searchAll` ignore case.
    pub fn with_case_insensitive_search(mut self, enabled: bool) -> Self {
        self.case_insensitive_search = enabled;
        self
    }

    /// Opens the configured database and wires the default collaborators.
    pub fn from_config(config: &LinkshelfConfig) -> Result<Self, BootstrapError> {
        config.validate()?;
        let conn = match config.database_path.as_ref() {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        let store = SqliteResourceStore::try_new(conn)?;
        let fetcher = HttpMetadataFetcher::new(config.fetch_timeout(), &config.user_agent)?;

        Ok(Self::new(
            Arc::new(store),
            Arc::new(RuleValidator::new()),
            Arc::new(fetcher),
            Arc::new(StandardUrlUtilities),
        )
        .with_case_insensitive_search(config.case_insensitive_search))
    }

    /// Validates, fetches metadata for `link`, and stores a new resource.
    ///
    /// The stored image is normalized against the link's origin; the payload
    /// echoes the image exactly as the page published it.
    pub async fn create(&self, link: &str, author: &str) -> Outcome<CreatedResource> {
        let started_at = Instant::now();
        let result = async {
            self.validator.validate_resource(link, author).await?;
            let metadata = self.fetcher.fetch(link).await?;

            let image = match self.urls.get_domain(link) {
                Some(domain) => self.urls.normalize_url(&metadata.image, &domain),
                None => metadata.image.clone(),
            };
            let resource = Resource::new(
                link,
                author,
                ResourceMeta {
                    title: metadata.title.clone(),
                    description: metadata.description.clone(),
                    image,
                },
            );
            self.store.insert(&resource).await?;

            Ok::<_, ResourceError>(CreatedResource {
                title: metadata.title,
                url: link.to_string(),
                description: metadata.description,
                image: metadata.image,
            })
        }
        .await;

        settle(
            "resource_create",
            started_at,
            result,
            MSG_CREATED,
            PersistenceMessage::Verbatim,
            Some(FailureContext {
                url: link.to_string(),
            }),
        )
    }

    /// Returns one page of resources, newest first.
    pub async fn read(&self, page_number: u32, limit: u32) -> Outcome<ResourcePage> {
        let started_at = Instant::now();
        let result = async {
            let page = Page::new(page_number, limit)?;
            let resources = self
                .store
                .find(&ResourceQuery::all().window(page.skip(), page.limit))
                .await?;
            Ok::<_, ResourceError>(ResourcePage {
                start: page.start(),
                end: page.end(),
                resources,
            })
        }
        .await;

        settle(
            "resource_read",
            started_at,
            result,
            MSG_RETRIEVED,
            PersistenceMessage::Generic,
            None,
        )
    }

    /// Returns every resource, newest first.
    pub async fn read_all(&self) -> Outcome<ResourceList> {
        let started_at = Instant::now();
        let result = self
            .store
            .find(&ResourceQuery::all())
            .await
            .map(|resources| ResourceList { resources })
            .map_err(ResourceError::from);

        settle(
            "resource_read_all",
            started_at,
            result,
            MSG_RETRIEVED,
            PersistenceMessage::Generic,
            None,
        )
    }

    /// Validates `new_link` and moves the resource at `old_link` to it.
    pub async fn update_link(&self, old_link: &str, new_link: &str) -> Outcome<Affected> {
        let started_at = Instant::now();
        let result = async {
            self.validator.validate_link(new_link).await?;
            let affected = self.store.set_link(old_link, new_link).await?;
            Ok::<_, ResourceError>(Affected { affected })
        }
        .await;

        settle(
            "resource_update_link",
            started_at,
            result,
            MSG_LINK_UPDATED,
            PersistenceMessage::Verbatim,
            None,
        )
    }

    /// Validates `author` and sets it on the resource at `link`.
    pub async fn update_author(&self, link: &str, author: &str) -> Outcome<Affected> {
        let started_at = Instant::now();
        let result = async {
            self.validator.validate_author(author).await?;
            let affected = self.store.set_author(link, author).await?;
            Ok::<_, ResourceError>(Affected { affected })
        }
        .await;

        settle(
            "resource_update_author",
            started_at,
            result,
            MSG_AUTHOR_UPDATED,
            PersistenceMessage::Verbatim,
            None,
        )
    }

    /// Removes the resource at `link`.
    pub async fn delete(&self, link: &str) -> Outcome<Affected> {
        let started_at = Instant::now();
        let result = self
            .store
            .delete(link)
            .await
            .map(|affected| Affected { affected })
            .map_err(ResourceError::from);

        settle(
            "resource_delete",
            started_at,
            result,
            MSG_DELETED,
            PersistenceMessage::Generic,
            None,
        )
    }

    /// Literal substring search over link, title and description, paginated.
    pub async fn search(
        &self,
        search_key: &str,
        page_number: u32,
        limit: u32,
    ) -> Outcome<ResourcePage> {
        let started_at = Instant::now();
        let result = async {
            let page = Page::new(page_number, limit)?;
            let query =
                ResourceQuery::matching(self.pattern_for(search_key)?).window(page.skip(), page.limit);
            let resources = self.store.find(&query).await?;
            Ok::<_, ResourceError>(ResourcePage {
                start: page.start(),
                end: page.end(),
                resources,
            })
        }
        .await;

        settle(
            "resource_search",
            started_at,
            result,
            MSG_SEARCHED,
            PersistenceMessage::Generic,
            None,
        )
    }

    /// Literal substring search returning every match.
    pub async fn search_all(&self, search_key: &str) -> Outcome<ResourceList> {
        let started_at = Instant::now();
        let result = async {
            let query = ResourceQuery::matching(self.pattern_for(search_key)?);
            let resources = self.store.find(&query).await?;
            Ok::<_, ResourceError>(ResourceList { resources })
        }
        .await;

        settle(
            "resource_search_all",
            started_at,
            result,
            MSG_SEARCHED,
            PersistenceMessage::Generic,
            None,
        )
    }

    /// Appends `user_id` to the upvotes of the resource at `link`.
    pub async fn upvote(&self, link: &str, user_id: &str) -> Outcome<Affected> {
        self.vote("resource_upvote", VoteKind::Up, link, user_id, MSG_UPVOTED)
            .await
    }

    /// Appends `user_id` to the downvotes of the resource at `link`.
    pub async fn downvote(&self, link: &str, user_id: &str) -> Outcome<Affected> {
        self.vote("resource_downvote", VoteKind::Down, link, user_id, MSG_DOWNVOTED)
            .await
    }

    /// Total number of stored resources.
    pub async fn resource_count(&self) -> Outcome<ResourceCount> {
        let started_at = Instant::now();
        let result = self
            .store
            .count()
            .await
            .map(|count| ResourceCount { count })
            .map_err(ResourceError::from);

        settle(
            "resource_count",
            started_at,
            result,
            MSG_COUNTED,
            PersistenceMessage::Generic,
            None,
        )
    }

    /// Sums vote entries across every resource.
    ///
    /// Scans the whole collection; the read is not isolated from concurrent
    /// writers.
    pub async fn votes_count(&self) -> Outcome<VotesCount> {
        let started_at = Instant::now();
        let result = self
            .store
            .find(&ResourceQuery::all())
            .await
            .map(|resources| {
                resources
                    .iter()
                    .fold(VotesCount::default(), |mut totals, resource| {
                        totals.upvotes_count += resource.upvote_count() as u64;
                        totals.downvotes_count += resource.downvote_count() as u64;
                        totals
                    })
            })
            .map_err(ResourceError::from);

        settle(
            "resource_votes_count",
            started_at,
            result,
            MSG_VOTES_COUNTED,
            PersistenceMessage::Generic,
            None,
        )
    }

    async fn vote(
        &self,
        event: &'static str,
        kind: VoteKind,
        link: &str,
        user_id: &str,
        success_message: &str,
    ) -> Outcome<Affected> {
        let started_at = Instant::now();
        let result = self
            .store
            .push_vote(link, kind, user_id)
            .await
            .map(|affected| Affected { affected })
            .map_err(ResourceError::from);

        settle(
            event,
            started_at,
            result,
            success_message,
            PersistenceMessage::Generic,
            None,
        )
    }

    fn pattern_for(&self, search_key: &str) -> Result<SearchPattern, ResourceError> {
        let escaped = self.urls.escape_pattern(search_key);
        let pattern = if self.case_insensitive_search {
            SearchPattern::case_insensitive(escaped)?
        } else {
            SearchPattern::from_escaped(escaped)?
        };
        Ok(pattern)
    }
}

/// Converts a handler result into its single outcome and logs it.
fn settle<P>(
    event: &'static str,
    started_at: Instant,
    result: Result<P, ResourceError>,
    success_message: &str,
    persistence_message: PersistenceMessage,
    context: Option<FailureContext>,
) -> Outcome<P> {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(payload) => {
            info!("event={event} module=service status=ok duration_ms={duration_ms}");
            Ok(Envelope::success(success_message, payload))
        }
        Err(err) => {
            warn!(
                "event={event} module=service status=error duration_ms={duration_ms} error_code={}",
                err.code()
            );
            let message = if err.is_persistence() && persistence_message == PersistenceMessage::Generic
            {
                GENERIC_FAILURE_MESSAGE.to_string()
            } else {
                err.to_string()
            };
            Err(Envelope::failure(message, context))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Page;
    use crate::service::error::ResourceError;

    #[test]
    fn page_window_arithmetic() {
        let first = Page::new(1, 10).unwrap();
        assert_eq!((first.skip(), first.start(), first.end()), (0, 1, 10));

        let third = Page::new(3, 25).unwrap();
        assert_eq!((third.skip(), third.start(), third.end()), (50, 51, 75));
    }

    #[test]
    fn page_rejects_zero_values() {
        assert!(matches!(
            Page::new(0, 10),
            Err(ResourceError::InvalidPage {
                page_number: 0,
                limit: 10
            })
        ));
        assert!(Page::new(1, 0).is_err());
    }

    #[test]
    fn page_math_does_not_overflow_at_u32_bounds() {
        let page = Page::new(u32::MAX, u32::MAX).unwrap();
        assert_eq!(page.end(), u64::from(u32::MAX) * u64::from(u32::MAX));
    }
}
