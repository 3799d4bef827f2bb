#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{
        Method, Request, Response, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, LOCATION},
    },
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use time::UtcDateTime;
use tower::ServiceExt;
use url::form_urlencoded;
use yatube_api::server::{ServerState, routes};
use yatube_common::model::{
    auth::Authentication,
    group::{CreateGroup, Group, GroupSlug},
    post::{CreatePost, Post, PostFilter},
    user::{CreateUser, User, Username},
};
use yatube_db::{Store, memory::MemoryStore};

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
}

/// A seeded user together with a bearer token that authenticates as them.
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = routes().with_state(ServerState::new(store.clone()));

        Self { store, router }
    }

    pub async fn user(&self, username: &str) -> TestUser {
        let user = self
            .store
            .create_user(&CreateUser {
                username: Username::new(username.to_owned()).unwrap(),
            })
            .await
            .unwrap();

        let (token, authentication) =
            Authentication::issue(user.id, UtcDateTime::now(), None).unwrap();
        self.store.create_auth(&authentication).await.unwrap();

        TestUser {
            user,
            token: token.as_token_str(),
        }
    }

    pub async fn group(&self, slug: &str) -> Group {
        self.store
            .create_group(&CreateGroup {
                title: format!("Group {slug}"),
                slug: GroupSlug::new(slug.to_owned()).unwrap(),
                description: format!("This is {slug}"),
            })
            .await
            .unwrap()
    }

    pub async fn post(&self, author: &TestUser, group: Option<&Group>, text: &str) -> Post {
        self.store
            .create_post(&CreatePost {
                author: author.user.id,
                text: text.to_owned(),
                group: group.map(|group| group.id),
            })
            .await
            .unwrap()
    }

    pub async fn post_count(&self) -> u64 {
        self.store.count_posts(PostFilter::All).await.unwrap()
    }

    pub async fn fetch_post(&self, post: &Post) -> Post {
        self.store.fetch_post(post.id).await.unwrap().unwrap()
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }

    pub async fn get(&self, uri: &str, as_user: Option<&TestUser>) -> Response<Body> {
        let mut request = Request::builder().method(Method::GET).uri(uri);
        if let Some(user) = as_user {
            request = request.header(AUTHORIZATION, format!("Bearer {}", user.token));
        }

        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn get_with_token(&self, uri: &str, token: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    pub async fn submit(
        &self,
        uri: &str,
        as_user: Option<&TestUser>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(user) = as_user {
            request = request.header(AUTHORIZATION, format!("Bearer {}", user.token));
        }

        self.send(request.body(Body::from(body)).unwrap()).await
    }
}

pub async fn json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

pub fn assert_redirect(response: &Response<Body>, location: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], location);
}

pub fn texts(page_obj: &Value) -> Vec<&str> {
    page_obj["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["text"].as_str().unwrap())
        .collect()
}
