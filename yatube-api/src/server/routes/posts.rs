use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::{Form, Json, PageQuery},
    forms::{PostForm, PostFormErrors, PostFormState, Validation},
    routes::users::ProfilePath,
};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use yatube_common::{
    model::{
        Id,
        group::Group,
        post::{Post, PostFilter, PostMarker},
    },
    pagination::Page,
};
use yatube_db::{Store, store::fetch_post_page};

pub const INDEX_TITLE: &str = "Latest updates";

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_get(post_detail)
        .typed_get(create_form)
        .typed_post(create_post)
        .typed_get(edit_form)
        .typed_post(edit_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct IndexPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/", rejection(ServerError))]
pub(crate) struct PostDetailPath {
    pub id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/create/", rejection(ServerError))]
struct CreatePostPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/edit/", rejection(ServerError))]
struct EditPostPath {
    id: Id<PostMarker>,
}

#[derive(Serialize)]
struct IndexContext {
    title: &'static str,
    page_obj: Page<Post>,
}

#[derive(Serialize)]
struct PostDetailContext {
    post: Post,
    post_count_user: u64,
}

#[derive(Serialize)]
struct PostFormContext {
    form: PostFormState,
    groups: Vec<Group>,
    is_edit: bool,
    post: Option<Post>,
}

impl PostFormContext {
    async fn new(
        store: &dyn Store,
        form: PostFormState,
        post: Option<Post>,
    ) -> Result<Json<Self>> {
        Ok(Json(Self {
            form,
            groups: store.fetch_groups().await?,
            is_edit: post.is_some(),
            post,
        }))
    }
}

async fn index(
    IndexPath(): IndexPath,
    State(store): State<Arc<dyn Store>>,
    query: PageQuery,
) -> Result<Json<IndexContext>> {
    let page_obj = fetch_post_page(store.as_ref(), PostFilter::All, query.page()).await?;

    Ok(Json(IndexContext {
        title: INDEX_TITLE,
        page_obj,
    }))
}

async fn post_detail(
    PostDetailPath { id }: PostDetailPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<PostDetailContext>> {
    let post = store
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    let post_count_user = store
        .count_posts(PostFilter::Author(post.author.id))
        .await?;

    Ok(Json(PostDetailContext {
        post,
        post_count_user,
    }))
}

async fn create_form(
    CreatePostPath(): CreatePostPath,
    State(store): State<Arc<dyn Store>>,
    _user: AuthenticatedUser,
) -> Result<Json<PostFormContext>> {
    PostFormContext::new(store.as_ref(), PostFormState::default(), None).await
}

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    let draft = match form.validate(store.as_ref()).await? {
        Validation::Valid(draft) => draft,
        Validation::Invalid(errors) => {
            debug!(?errors, "Rejected new post");
            let state = form.into_state(errors);
            return Ok(PostFormContext::new(store.as_ref(), state, None)
                .await?
                .into_response());
        }
    };

    let post = store.create_post(&draft.into_create(user.user_id())).await?;
    info!(post_id = %post.id, author = %post.author.username, "Created post");

    let profile = ProfilePath {
        username: post.author.username,
    };
    Ok(Redirect::to(&profile.to_string()).into_response())
}

async fn fetch_own_post(
    store: &dyn Store,
    id: Id<PostMarker>,
    user: &AuthenticatedUser,
) -> Result<Post> {
    let post = store
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    user.require_owner(&post)?;

    Ok(post)
}

async fn edit_form(
    EditPostPath { id }: EditPostPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
) -> Result<Json<PostFormContext>> {
    let post = fetch_own_post(store.as_ref(), id, &user).await?;
    let state = PostForm::from_post(&post).into_state(PostFormErrors::default());

    PostFormContext::new(store.as_ref(), state, Some(post)).await
}

async fn edit_post(
    EditPostPath { id }: EditPostPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    let post = fetch_own_post(store.as_ref(), id, &user).await?;

    let draft = match form.validate(store.as_ref()).await? {
        Validation::Valid(draft) => draft,
        Validation::Invalid(errors) => {
            debug!(post_id = %id, ?errors, "Rejected post edit");
            let state = form.into_state(errors);
            return Ok(PostFormContext::new(store.as_ref(), state, Some(post))
                .await?
                .into_response());
        }
    };

    store
        .update_post(&draft.into_update(id))
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    info!(post_id = %id, "Updated post");

    Ok(Redirect::to(&PostDetailPath { id }.to_string()).into_response())
}
