use crate::store::{DbError, Result, Store};
use async_trait::async_trait;
use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use time::OffsetDateTime;
use tracing::trace;
use yatube_common::{
    model::{
        Id,
        auth::{AuthTokenHash, Authentication},
        group::{CreateGroup, Group, GroupMarker, GroupSlug},
        post::{CreatePost, Post, PostFilter, PostMarker, UpdatePost},
        user::{CreateUser, User, UserMarker, Username},
    },
    pagination::PageWindow,
};

/// [`Store`] kept entirely in process memory. Used when no database is
/// configured, and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: u64,
    users: BTreeMap<Id<UserMarker>, User>,
    authentications: HashMap<AuthTokenHash, Authentication>,
    groups: BTreeMap<Id<GroupMarker>, Group>,
    posts: BTreeMap<Id<PostMarker>, PostRow>,
}

#[derive(Clone, Debug)]
struct PostRow {
    text: String,
    created_at: OffsetDateTime,
    author: Id<UserMarker>,
    group: Option<Id<GroupMarker>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| DbError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| DbError::Poisoned)
    }
}

impl Tables {
    fn next_id<Marker>(&mut self) -> Id<Marker> {
        self.last_id += 1;
        Id::new(self.last_id)
    }

    fn check_references(
        &self,
        author: Option<Id<UserMarker>>,
        group: Option<Id<GroupMarker>>,
    ) -> Result<()> {
        if author.is_some_and(|author| !self.users.contains_key(&author)) {
            return Err(DbError::MissingRecord("user"));
        }
        if group.is_some_and(|group| !self.groups.contains_key(&group)) {
            return Err(DbError::MissingRecord("group"));
        }
        Ok(())
    }

    fn join(&self, id: Id<PostMarker>, row: &PostRow) -> Result<Post> {
        let author = self
            .users
            .get(&row.author)
            .cloned()
            .ok_or(DbError::MissingRecord("user"))?;
        // Posts outlive their group.
        let group = row.group.and_then(|group| self.groups.get(&group).cloned());

        Ok(Post {
            id,
            text: row.text.clone(),
            created_at: row.created_at,
            author,
            group,
        })
    }

    fn matching_posts(
        &self,
        filter: PostFilter,
    ) -> impl Iterator<Item = (&Id<PostMarker>, &PostRow)> {
        self.posts.iter().filter(move |(_, row)| match filter {
            PostFilter::All => true,
            PostFilter::Group(group) => row.group == Some(group),
            PostFilter::Author(author) => row.author == author,
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let tables = self.read()?;
        let user = tables.users.values().find(|user| &user.username == username);

        Ok(user.cloned())
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(DbError::Duplicate("username"));
        }

        let user = User {
            id: tables.next_id(),
            username: user.username.clone(),
        };
        tables.users.insert(user.id, user.clone());
        trace!(user_id = %user.id, "Inserted user");

        Ok(user)
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        Ok(self.read()?.authentications.get(token_hash).cloned())
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let mut tables = self.write()?;
        tables.check_references(Some(authentication.user), None)?;
        if tables.authentications.contains_key(&authentication.token_hash) {
            return Err(DbError::Duplicate("token_hash"));
        }

        tables
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());

        Ok(())
    }

    async fn fetch_group(&self, group_id: Id<GroupMarker>) -> Result<Option<Group>> {
        Ok(self.read()?.groups.get(&group_id).cloned())
    }

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let tables = self.read()?;
        let group = tables.groups.values().find(|group| &group.slug == slug);

        Ok(group.cloned())
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let mut groups: Vec<Group> = self.read()?.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

        Ok(groups)
    }

    async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let mut tables = self.write()?;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(DbError::Duplicate("slug"));
        }

        let group = Group {
            id: tables.next_id(),
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        };
        tables.groups.insert(group.id, group.clone());
        trace!(group_id = %group.id, "Inserted group");

        Ok(group)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let tables = self.read()?;

        tables
            .posts
            .get(&post_id)
            .map(|row| tables.join(post_id, row))
            .transpose()
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        Ok(self.read()?.matching_posts(filter).count() as u64)
    }

    async fn fetch_posts(&self, filter: PostFilter, window: PageWindow) -> Result<Vec<Post>> {
        let tables = self.read()?;

        let mut rows: Vec<_> = tables.matching_posts(filter).collect();
        rows.sort_by_key(|(id, row)| Reverse((row.created_at, **id)));

        rows.into_iter()
            .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
            .map(|(id, row)| tables.join(*id, row))
            .collect()
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut tables = self.write()?;
        tables.check_references(Some(post.author), post.group)?;

        let id = tables.next_id();
        let row = PostRow {
            text: post.text.clone(),
            created_at: OffsetDateTime::now_utc(),
            author: post.author,
            group: post.group,
        };
        let created = tables.join(id, &row)?;
        tables.posts.insert(id, row);
        trace!(post_id = %id, "Inserted post");

        Ok(created)
    }

    async fn update_post(&self, post: &UpdatePost) -> Result<Option<Post>> {
        let mut tables = self.write()?;
        tables.check_references(None, post.group)?;

        let Some(row) = tables.posts.get_mut(&post.id) else {
            return Ok(None);
        };
        row.text.clone_from(&post.text);
        row.group = post.group;
        let row = row.clone();

        tables.join(post.id, &row).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        memory::MemoryStore,
        store::{DbError, Store, fetch_post_page},
    };
    use yatube_common::{
        model::{
            Id,
            group::{CreateGroup, Group, GroupSlug},
            post::{CreatePost, PostFilter, UpdatePost},
            user::{CreateUser, User, Username},
        },
        pagination::PageWindow,
    };

    async fn user(store: &MemoryStore, username: &str) -> User {
        store
            .create_user(&CreateUser {
                username: Username::new(username.to_owned()).unwrap(),
            })
            .await
            .unwrap()
    }

    async fn group(store: &MemoryStore, slug: &str) -> Group {
        store
            .create_group(&CreateGroup {
                title: format!("Group {slug}"),
                slug: GroupSlug::new(slug.to_owned()).unwrap(),
                description: String::new(),
            })
            .await
            .unwrap()
    }

    async fn post(store: &MemoryStore, author: &User, group: Option<&Group>, text: &str) {
        store
            .create_post(&CreatePost {
                author: author.id,
                text: text.to_owned(),
                group: group.map(|g| g.id),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_filtered() {
        let store = MemoryStore::new();
        let leo = user(&store, "leo").await;
        let anna = user(&store, "anna").await;
        let cats = group(&store, "cats").await;

        post(&store, &leo, Some(&cats), "first").await;
        post(&store, &anna, None, "second").await;
        post(&store, &leo, None, "third").await;

        let window = PageWindow {
            offset: 0,
            limit: 10,
        };
        let texts = |posts: Vec<yatube_common::model::post::Post>| {
            posts.into_iter().map(|p| p.text).collect::<Vec<_>>()
        };

        let all = store.fetch_posts(PostFilter::All, window).await.unwrap();
        assert_eq!(texts(all), ["third", "second", "first"]);

        let by_leo = store
            .fetch_posts(PostFilter::Author(leo.id), window)
            .await
            .unwrap();
        assert_eq!(texts(by_leo), ["third", "first"]);

        let in_cats = store
            .fetch_posts(PostFilter::Group(cats.id), window)
            .await
            .unwrap();
        assert_eq!(texts(in_cats), ["first"]);

        assert_eq!(store.count_posts(PostFilter::All).await.unwrap(), 3);
        assert_eq!(store.count_posts(PostFilter::Author(anna.id)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn post_pages() {
        let store = MemoryStore::new();
        let author = user(&store, "author_user").await;
        let group = group(&store, "new-group").await;
        for i in 0..13 {
            post(&store, &author, Some(&group), &format!("Post {i}")).await;
        }

        let filter = PostFilter::Group(group.id);
        let first = fetch_post_page(&store, filter, None).await.unwrap();
        let second = fetch_post_page(&store, filter, Some("2")).await.unwrap();
        let beyond = fetch_post_page(&store, filter, Some("9")).await.unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(first.items[0].text, "Post 12");
        assert_eq!(second.len(), 3);
        assert_eq!(second.items[2].text, "Post 0");
        assert_eq!(beyond, second);
    }

    #[tokio::test]
    async fn update_changes_only_text_and_group() {
        let store = MemoryStore::new();
        let author = user(&store, "author_user").await;
        let group = group(&store, "new-group").await;
        post(&store, &author, None, "before").await;
        let original = store.fetch_post(Id::new(3)).await.unwrap().unwrap();

        let updated = store
            .update_post(&UpdatePost {
                id: original.id,
                text: "after".to_owned(),
                group: Some(group.id),
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.text, "after");
        assert_eq!(updated.group, Some(group));
        assert_eq!(updated.author, original.author);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(store.count_posts(PostFilter::All).await.unwrap(), 1);

        let missing = store
            .update_post(&UpdatePost {
                id: Id::new(999),
                text: "nope".to_owned(),
                group: None,
            })
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn references_and_uniqueness() {
        let store = MemoryStore::new();
        let author = user(&store, "author_user").await;

        let duplicate = store
            .create_user(&CreateUser {
                username: author.username.clone(),
            })
            .await;
        assert!(matches!(duplicate, Err(DbError::Duplicate("username"))));

        let dangling = store
            .create_post(&CreatePost {
                author: author.id,
                text: "text".to_owned(),
                group: Some(Id::new(404)),
            })
            .await;
        assert!(matches!(dangling, Err(DbError::MissingRecord("group"))));
        assert_eq!(store.count_posts(PostFilter::All).await.unwrap(), 0);
    }
}
