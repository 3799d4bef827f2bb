use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{FormRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use extract::Json;
use routes::posts::PostDetailPath;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::form_urlencoded;
use yatube_common::model::{
    Id,
    auth::AuthTokenHashError,
    group::GroupSlug,
    post::PostMarker,
    user::Username,
};
use yatube_db::{DbError, Store};

mod auth;
mod extract;
mod forms;
mod routes;

pub const LOGIN_URL: &str = "/auth/login/";

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn Store>,
}

impl ServerState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Submitted form rejected: {0}")]
    FormRejection(#[from] FormRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Login required to access {next}")]
    LoginRequired { next: String },
    #[error("Only the author may edit post {0}")]
    NotOwner(Id<PostMarker>),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Group with slug {0} was not found.")]
    GroupBySlugNotFound(GroupSlug),
    #[error("User with username {0} was not found.")]
    UserByUsernameNotFound(Username),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::GroupBySlugNotFound(_)
            | ServerError::UserByUsernameNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::LoginRequired { .. } | ServerError::NotOwner(_) => StatusCode::SEE_OTHER,
            ServerError::FormRejection(rejection) => rejection.status(),
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Where a redirecting error sends the client, if it redirects at all.
    fn redirect_location(&self) -> Option<String> {
        match self {
            ServerError::LoginRequired { next } => Some(login_uri(next)),
            ServerError::NotOwner(id) => Some(PostDetailPath { id: *id }.to_string()),
            _ => None,
        }
    }
}

/// Login page URL returning to `next` afterwards. Slashes in `next` stay readable.
#[must_use]
pub fn login_uri(next: &str) -> String {
    let next = next
        .split('/')
        .map(|segment| form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("/");

    format!("{LOGIN_URL}?next={next}")
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Some(location) = self.redirect_location() {
            debug!(reason = %self, %location, "Redirecting");
            return Redirect::to(&location).into_response();
        }

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            warn!(error = %self, %status, "Replying with error");
        }

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ServerError, login_uri};
    use axum::{
        http::{StatusCode, header::LOCATION},
        response::IntoResponse,
    };
    use yatube_common::model::Id;

    #[test]
    fn login_uri_keeps_return_path() {
        assert_eq!(login_uri("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_uri("/posts/1/edit/?a=b"),
            "/auth/login/?next=/posts/1/edit/%3Fa%3Db"
        );
        assert_eq!(
            login_uri("/create/?q=a b&x"),
            "/auth/login/?next=/create/%3Fq%3Da+b%26x"
        );
    }

    #[test]
    fn not_owner_redirects_to_detail() {
        let response = ServerError::NotOwner(Id::new(12)).into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/posts/12/");
    }

    #[test]
    fn not_found_has_status_body() {
        let response = ServerError::PostByIdNotFound(Id::new(12)).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
