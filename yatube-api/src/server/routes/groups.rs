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
        group::{Group, GroupSlug},
        post::{Post, PostFilter},
    },
    pagination::Page,
};
use yatube_db::{Store, store::fetch_post_page};

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(group_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/group/{slug}/", rejection(ServerError))]
struct GroupPostsPath {
    slug: GroupSlug,
}

#[derive(Serialize)]
struct GroupPostsContext {
    group: Group,
    page_obj: Page<Post>,
}

async fn group_posts(
    GroupPostsPath { slug }: GroupPostsPath,
    State(store): State<Arc<dyn Store>>,
    query: PageQuery,
) -> Result<Json<GroupPostsContext>> {
    let group = store
        .fetch_group_by_slug(&slug)
        .await?
        .ok_or(ServerError::GroupBySlugNotFound(slug))?;

    let page_obj =
        fetch_post_page(store.as_ref(), PostFilter::Group(group.id), query.page()).await?;

    Ok(Json(GroupPostsContext { group, page_obj }))
}
