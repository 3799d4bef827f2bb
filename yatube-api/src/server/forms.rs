use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use yatube_common::model::{
    Id,
    group::Group,
    post::{CreatePost, Post, PostMarker, UpdatePost},
    user::UserMarker,
};
use yatube_db::{Result, Store};

/// Fields a client may submit for a post. Anything else, notably an
/// `author`, is ignored.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum FieldError {
    #[error("This field is required.")]
    Required,
    #[error("Select a valid choice. That choice is not one of the available choices.")]
    InvalidChoice,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct PostFormErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<FieldError>,
}

/// A validated submission.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostDraft {
    pub text: String,
    pub group: Option<Group>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Validation {
    Valid(PostDraft),
    Invalid(PostFormErrors),
}

/// What the create/edit form shows: the entered values and their errors.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct PostFormState {
    pub text: String,
    pub group: Option<String>,
    pub errors: PostFormErrors,
}

impl Serialize for FieldError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl PostFormErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none()
    }
}

impl PostForm {
    #[must_use]
    pub fn from_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group.as_ref().map(|group| group.id.to_string()),
        }
    }

    /// Checks every field, looking the chosen group up in `store`.
    pub async fn validate(&self, store: &dyn Store) -> Result<Validation> {
        let mut errors = PostFormErrors::default();

        let text = self.text.trim();
        if text.is_empty() {
            errors.text = Some(FieldError::Required);
        }

        let group = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let group = match raw.parse() {
                    Ok(group_id) => store.fetch_group(group_id).await?,
                    Err(_) => None,
                };
                if group.is_none() {
                    errors.group = Some(FieldError::InvalidChoice);
                }
                group
            }
        };

        if !errors.is_empty() {
            return Ok(Validation::Invalid(errors));
        }

        Ok(Validation::Valid(PostDraft {
            text: text.to_owned(),
            group,
        }))
    }

    #[must_use]
    pub fn into_state(self, errors: PostFormErrors) -> PostFormState {
        PostFormState {
            text: self.text,
            group: self.group,
            errors,
        }
    }
}

impl PostDraft {
    #[must_use]
    pub fn into_create(self, author: Id<UserMarker>) -> CreatePost {
        CreatePost {
            author,
            text: self.text,
            group: self.group.map(|group| group.id),
        }
    }

    #[must_use]
    pub fn into_update(self, id: Id<PostMarker>) -> UpdatePost {
        UpdatePost {
            id,
            text: self.text,
            group: self.group.map(|group| group.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::server::forms::{FieldError, PostForm, PostFormErrors, Validation};
    use yatube_common::model::{
        Id,
        group::{CreateGroup, Group, GroupSlug},
    };
    use yatube_db::{Store, memory::MemoryStore};

    async fn store_with_group() -> (MemoryStore, Group) {
        let store = MemoryStore::new();
        let group = store
            .create_group(&CreateGroup {
                title: "Test group".to_owned(),
                slug: GroupSlug::new("test-slug".to_owned()).unwrap(),
                description: "A new test group".to_owned(),
            })
            .await
            .unwrap();

        (store, group)
    }

    fn form(text: &str, group: Option<&str>) -> PostForm {
        PostForm {
            text: text.to_owned(),
            group: group.map(ToOwned::to_owned),
        }
    }

    #[tokio::test]
    async fn valid_with_and_without_group() {
        let (store, group) = store_with_group().await;
        let group_id = group.id.to_string();

        let Validation::Valid(draft) = form("  Test post  ", Some(&group_id))
            .validate(&store)
            .await
            .unwrap()
        else {
            panic!("expected a valid form");
        };
        assert_eq!(draft.text, "Test post");
        assert_eq!(draft.group, Some(group));

        for empty_group in [None, Some("")] {
            let validation = form("Test post", empty_group).validate(&store).await.unwrap();
            assert!(matches!(validation, Validation::Valid(draft) if draft.group.is_none()));
        }
    }

    #[tokio::test]
    async fn reports_every_invalid_field() {
        let (store, _) = store_with_group().await;

        for bad_group in ["404", "not-a-number", "-1"] {
            let validation = form("   ", Some(bad_group)).validate(&store).await.unwrap();

            assert_eq!(
                validation,
                Validation::Invalid(PostFormErrors {
                    text: Some(FieldError::Required),
                    group: Some(FieldError::InvalidChoice),
                })
            );
        }
    }

    #[test]
    fn author_field_is_ignored() {
        let form: PostForm = serde_json::from_str(r#"{"text":"hi","author":"7"}"#).unwrap();

        assert_eq!(
            form,
            PostForm {
                text: "hi".to_owned(),
                group: None,
            }
        );
    }

    #[test]
    fn drafts_keep_identity_out_of_client_hands() {
        let draft = crate::server::forms::PostDraft {
            text: "hi".to_owned(),
            group: None,
        };

        assert_eq!(draft.clone().into_create(Id::new(3)).author, Id::new(3));
        assert_eq!(draft.into_update(Id::new(9)).id, Id::new(9));
    }

    #[test]
    fn errors_serialize_as_messages() {
        let errors = PostFormErrors {
            text: Some(FieldError::Required),
            group: None,
        };

        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({ "text": "This field is required." })
        );
    }
}
