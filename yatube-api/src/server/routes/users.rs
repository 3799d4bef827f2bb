use crate::server::{
    Result, ServerError, ServerRouter,
    extract::{Json, PageQuery},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use yatube_common::{
    model::{
        post::{Post, PostFilter},
        user::{User, Username},
    },
    pagination::Page,
};
use yatube_db::{Store, store::fetch_post_page};

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(profile)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/", rejection(ServerError))]
pub(crate) struct ProfilePath {
    pub username: Username,
}

#[derive(Serialize)]
struct ProfileContext {
    author: User,
    page_obj: Page<Post>,
    user_posts_count: u64,
}

async fn profile(
    ProfilePath { username }: ProfilePath,
    State(store): State<Arc<dyn Store>>,
    query: PageQuery,
) -> Result<Json<ProfileContext>> {
    let author = store
        .fetch_user_by_username(&username)
        .await?
        .ok_or(ServerError::UserByUsernameNotFound(username))?;

    let page_obj =
        fetch_post_page(store.as_ref(), PostFilter::Author(author.id), query.page()).await?;

    Ok(Json(ProfileContext {
        author,
        user_posts_count: page_obj.count,
        page_obj,
    }))
}
