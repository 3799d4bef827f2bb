use crate::model::{
    Id,
    group::{Group, GroupMarker},
    user::{User, UserMarker},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: User,
    pub group: Option<Group>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub text: String,
    pub group: Option<Id<GroupMarker>>,
}

/// The fields an edit may touch. Author and creation time are fixed.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct UpdatePost {
    pub id: Id<PostMarker>,
    pub text: String,
    pub group: Option<Id<GroupMarker>>,
}

/// Which posts a listing covers.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub enum PostFilter {
    #[default]
    All,
    Group(Id<GroupMarker>),
    Author(Id<UserMarker>),
}

impl PostFilter {
    #[must_use]
    pub fn group_id(self) -> Option<Id<GroupMarker>> {
        match self {
            PostFilter::Group(group_id) => Some(group_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn author_id(self) -> Option<Id<UserMarker>> {
        match self {
            PostFilter::Author(user_id) => Some(user_id),
            _ => None,
        }
    }
}
