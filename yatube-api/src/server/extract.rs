use crate::server::ServerError;
use axum::{
    Form as AxumForm,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::Serialize;
use std::convert::Infallible;
use url::form_urlencoded;

/// JSON response body carrying a handler's context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(json) => (TypedHeader(ContentType::json()), json).into_response(),
            Err(err) => ServerError::JsonResponse(err).into_response(),
        }
    }
}

/// `application/x-www-form-urlencoded` request body.
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumForm), rejection(ServerError))]
pub struct Form<T>(pub T);

/// The `?page=` parameter of listing routes, kept raw so that malformed
/// values fall back to a valid page instead of rejecting the request.
/// A repeated parameter resolves to its last value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    #[must_use]
    pub fn from_query(query: Option<&str>) -> Self {
        let page = query.and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .filter(|(key, _)| key == "page")
                .last()
                .map(|(_, value)| value.into_owned())
        });

        Self { page }
    }

    #[must_use]
    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

impl<S> FromRequestParts<S> for PageQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_query(parts.uri.query()))
    }
}

#[cfg(test)]
mod tests {
    use crate::server::extract::PageQuery;

    #[test]
    fn page_parameter() {
        assert_eq!(PageQuery::from_query(None).page(), None);
        assert_eq!(PageQuery::from_query(Some("")).page(), None);
        assert_eq!(PageQuery::from_query(Some("other=1")).page(), None);
        assert_eq!(PageQuery::from_query(Some("page=2")).page(), Some("2"));
        assert_eq!(PageQuery::from_query(Some("page=%32&x=y")).page(), Some("2"));
        assert_eq!(PageQuery::from_query(Some("page")).page(), Some(""));
    }

    #[test]
    fn repeated_page_parameter_keeps_last_value() {
        let query = PageQuery::from_query(Some("page=1&sort=new&page=2"));

        assert_eq!(query.page(), Some("2"));
    }
}
