use crate::server::ServerRouter;
use axum::Router;

mod groups;
pub(crate) mod posts;
pub(crate) mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(groups::routes())
        .merge(users::routes())
}
