use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;
use yatube_common::{
    model::{
        Id, ModelValidationError,
        auth::{AuthTokenHash, Authentication},
        group::{CreateGroup, Group, GroupMarker, GroupSlug},
        post::{CreatePost, Post, PostFilter, PostMarker, UpdatePost},
        user::{CreateUser, User, UserMarker, Username},
    },
    pagination::{Page, PageWindow, Paginator},
};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Duplicate value for unique field `{0}`")]
    Duplicate(&'static str),
    #[error("Referenced {0} does not exist")]
    MissingRecord(&'static str),
    #[error("In-memory store lock was poisoned")]
    Poisoned,
}

/// Persistence contract the handlers are written against.
///
/// Post listings are always ordered newest first: by creation time
/// descending, then by id descending.
#[async_trait]
pub trait Store: Debug + Send + Sync {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;

    async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>>;

    async fn create_user(&self, user: &CreateUser) -> Result<User>;

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>>;

    async fn create_auth(&self, authentication: &Authentication) -> Result<()>;

    async fn fetch_group(&self, group_id: Id<GroupMarker>) -> Result<Option<Group>>;

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>>;

    /// All groups, ordered by title.
    async fn fetch_groups(&self) -> Result<Vec<Group>>;

    async fn create_group(&self, group: &CreateGroup) -> Result<Group>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    async fn count_posts(&self, filter: PostFilter) -> Result<u64>;

    async fn fetch_posts(&self, filter: PostFilter, window: PageWindow) -> Result<Vec<Post>>;

    async fn create_post(&self, post: &CreatePost) -> Result<Post>;

    /// Returns `None` if the post does not exist.
    async fn update_post(&self, post: &UpdatePost) -> Result<Option<Post>>;
}

/// Loads one page of a post listing, clamping `raw_page` the way [`Paginator::get_page`] does.
pub async fn fetch_post_page(
    store: &dyn Store,
    filter: PostFilter,
    raw_page: Option<&str>,
) -> Result<Page<Post>> {
    let paginator = Paginator::new(
        store.count_posts(filter).await?,
        yatube_common::pagination::POSTS_PER_PAGE,
    );
    let number = paginator.get_page(raw_page);
    let posts = store.fetch_posts(filter, paginator.window(number)).await?;

    Ok(paginator.page(number, posts))
}
