use crate::{
    record::{AuthenticationRecord, FullPostRecord, GroupRecord, UserRecord},
    store::{DbError, Result, Store},
};
use async_trait::async_trait;
use sqlx::{PgPool, query, query_as, query_scalar};
use time::PrimitiveDateTime;
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

const SELECT_FULL_POST: &str = "
    SELECT
        posts.post_id,
        posts.text,
        posts.created_at,
        users.user_id,
        users.username,
        groups.group_id,
        groups.title AS group_title,
        groups.slug AS group_slug,
        groups.description AS group_description
    FROM
        posts.posts
        JOIN users.users ON users.user_id = posts.user_id
        LEFT JOIN posts.groups ON groups.group_id = posts.group_id
";

/// [`Store`] backed by PostgreSQL. The expected tables are described in `schema.sql`.
#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_post_required(&self, post_id: i64) -> Result<Post> {
        self.fetch_post(post_id.cast_unsigned().into())
            .await?
            .ok_or(DbError::MissingRecord("post"))
    }
}

fn to_db_id<Marker>(id: Id<Marker>) -> i64 {
    id.get().cast_signed()
}

fn to_db_limit(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for DbClient {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT users.user_id, users.username
            FROM users.users
            WHERE users.user_id = $1
            ",
        )
        .bind(to_db_id(user_id))
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT users.user_id, users.username
            FROM users.users
            WHERE users.username = $1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (username)
            VALUES ($1)
            RETURNING users.user_id, users.username
            ",
        )
        .bind(user.username.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(User::try_from(record)?)
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_id,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM users.authentications
            WHERE authentications.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let created_at = PrimitiveDateTime::new(
            authentication.created_at.date(),
            authentication.created_at.time(),
        );

        query(
            "
            INSERT INTO users.authentications
                (user_id, token_hash, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(to_db_id(authentication.user))
        .bind(&authentication.token_hash.0[..])
        .bind(created_at)
        .bind(authentication.expires_after.map(|d| d.whole_seconds()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_group(&self, group_id: Id<GroupMarker>) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT groups.group_id, groups.title, groups.slug, groups.description
            FROM posts.groups
            WHERE groups.group_id = $1
            ",
        )
        .bind(to_db_id(group_id))
        .fetch_optional(&self.pool)
        .await?;

        let group = record.map(Group::try_from).transpose()?;
        Ok(group)
    }

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT groups.group_id, groups.title, groups.slug, groups.description
            FROM posts.groups
            WHERE groups.slug = $1
            ",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        let group = record.map(Group::try_from).transpose()?;
        Ok(group)
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let records = query_as::<_, GroupRecord>(
            "
            SELECT groups.group_id, groups.title, groups.slug, groups.description
            FROM posts.groups
            ORDER BY groups.title, groups.group_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let groups = records
            .into_iter()
            .map(Group::try_from)
            .collect::<Result<_, _>>()?;
        Ok(groups)
    }

    async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let record = query_as::<_, GroupRecord>(
            "
            INSERT INTO posts.groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING groups.group_id, groups.title, groups.slug, groups.description
            ",
        )
        .bind(&group.title)
        .bind(group.slug.get())
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(Group::try_from(record)?)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let sql = format!("{SELECT_FULL_POST} WHERE posts.post_id = $1");
        let record = query_as::<_, FullPostRecord>(&sql)
            .bind(to_db_id(post_id))
            .fetch_optional(&self.pool)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let count: i64 = query_scalar(
            "
            SELECT COUNT(*)
            FROM posts.posts
            WHERE ($1::BIGINT IS NULL OR posts.group_id = $1)
                AND ($2::BIGINT IS NULL OR posts.user_id = $2)
            ",
        )
        .bind(filter.group_id().map(to_db_id))
        .bind(filter.author_id().map(to_db_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(count.cast_unsigned())
    }

    async fn fetch_posts(&self, filter: PostFilter, window: PageWindow) -> Result<Vec<Post>> {
        let sql = format!(
            "{SELECT_FULL_POST}
            WHERE ($1::BIGINT IS NULL OR posts.group_id = $1)
                AND ($2::BIGINT IS NULL OR posts.user_id = $2)
            ORDER BY posts.created_at DESC, posts.post_id DESC
            LIMIT $3 OFFSET $4"
        );
        let records = query_as::<_, FullPostRecord>(&sql)
            .bind(filter.group_id().map(to_db_id))
            .bind(filter.author_id().map(to_db_id))
            .bind(to_db_limit(window.limit))
            .bind(to_db_limit(window.offset))
            .fetch_all(&self.pool)
            .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let post_id: i64 = query_scalar(
            "
            INSERT INTO posts.posts (text, user_id, group_id)
            VALUES ($1, $2, $3)
            RETURNING posts.post_id
            ",
        )
        .bind(&post.text)
        .bind(to_db_id(post.author))
        .bind(post.group.map(to_db_id))
        .fetch_one(&self.pool)
        .await?;

        self.fetch_post_required(post_id).await
    }

    async fn update_post(&self, post: &UpdatePost) -> Result<Option<Post>> {
        let updated = query(
            "
            UPDATE posts.posts
            SET text = $2, group_id = $3
            WHERE posts.post_id = $1
            ",
        )
        .bind(to_db_id(post.id))
        .bind(&post.text)
        .bind(post.group.map(to_db_id))
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_post(post.id).await
    }
}
