use crate::server::{Result, ServerError};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::debug;
use yatube_common::model::{
    Id,
    auth::AuthToken,
    post::Post,
    user::{User, UserMarker},
};
use yatube_db::Store;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The caller's identity. Extracting it from a request without valid
/// credentials short-circuits with a redirect to the login page.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    user: User,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.user.id
    }

    /// Edits are reserved to the post's author; anybody else is sent back to the post.
    pub fn require_owner(&self, post: &Post) -> Result<()> {
        if post.author.id == self.user_id() {
            Ok(())
        } else {
            Err(ServerError::NotOwner(post.id))
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let next = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), ToString::to_string);
        let login_required = || ServerError::LoginRequired { next: next.clone() };

        let Ok(TypedHeader(Authorization(bearer))) =
            AuthorizationHeader::from_request_parts(parts, state).await
        else {
            return Err(login_required());
        };

        let request_token: AuthToken = match bearer.token().parse() {
            Ok(token) => token,
            Err(err) => {
                debug!(error = %err, "Ignoring undecodable auth token");
                return Err(login_required());
            }
        };
        let token_hash = request_token.hash()?;

        let store = Arc::<dyn Store>::from_ref(state);
        let Some(authentication) = store.fetch_auth(&token_hash).await? else {
            debug!(user_id = %request_token.user_id, "Unknown auth token");
            return Err(login_required());
        };

        if !authentication.admits(request_token.user_id, UtcDateTime::now()) {
            debug!(user_id = %authentication.user, "Rejecting expired or mismatched auth token");
            return Err(login_required());
        }

        let user = store
            .fetch_user(authentication.user)
            .await?
            .ok_or_else(login_required)?;

        Ok(Self { user })
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ServerError, auth::AuthenticatedUser};
    use time::OffsetDateTime;
    use yatube_common::model::{
        Id,
        post::Post,
        user::{User, Username},
    };

    fn user(id: u64, username: &str) -> User {
        User {
            id: Id::new(id),
            username: Username::new(username.to_owned()).unwrap(),
        }
    }

    #[test]
    fn only_the_author_owns_a_post() {
        let author = user(1, "author_user");
        let post = Post {
            id: Id::new(5),
            text: "Test post".to_owned(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            author: author.clone(),
            group: None,
        };

        let as_author = AuthenticatedUser { user: author };
        let as_reader = AuthenticatedUser {
            user: user(2, "auth_user"),
        };

        assert!(as_author.require_owner(&post).is_ok());
        assert!(matches!(
            as_reader.require_owner(&post),
            Err(ServerError::NotOwner(id)) if id == post.id
        ));
    }
}
