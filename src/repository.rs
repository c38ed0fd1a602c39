use crate::{
    auth::Requester,
    error::{ApiError, ApiResult},
    models::{
        Advertisement, AdvertisementRow, AdvertisementStatus, Favorite, FavoriteRecord, FavoriteRow,
        NewAdvertisement, UpdateAdvertisementRequest, User,
    },
    validation::{check_open_limit, is_opening},
};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Abstract contract for all persistence operations, so handlers never know whether
/// they talk to Postgres or the in-memory store.
///
/// Writes that can open an advertisement (`create_advertisement`, `update_advertisement`)
/// enforce the open cap themselves, atomically with the write.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn get_user(&self, id: Uuid) -> ApiResult<Option<User>>;

    // --- Advertisement Retrieval ---
    // Both apply the visibility rule of `visibility::is_visible` for `requester`.
    async fn list_advertisements(&self, requester: &Requester) -> ApiResult<Vec<Advertisement>>;
    async fn get_advertisement(
        &self,
        id: Uuid,
        requester: &Requester,
    ) -> ApiResult<Option<Advertisement>>;

    // --- Advertisement Writes ---
    // Fails with `ApiError::Validation` when the insert would exceed the open cap.
    async fn create_advertisement(&self, new: NewAdvertisement) -> ApiResult<Advertisement>;
    // `None` when the advertisement does not exist. Fails with `ApiError::Validation`
    // when the status change would exceed the creator's open cap.
    async fn update_advertisement(
        &self,
        id: Uuid,
        changes: UpdateAdvertisementRequest,
    ) -> ApiResult<Option<Advertisement>>;
    // Returns true if a row was deleted. No ownership check: callers authorize first.
    async fn delete_advertisement(&self, id: Uuid) -> ApiResult<bool>;

    // --- Favorites ---
    // `None` when the (user, advertisement) pair already exists.
    // `ApiError::NotFound` when the advertisement does not exist.
    async fn add_favorite(
        &self,
        user_id: Uuid,
        advertisement_id: Uuid,
    ) -> ApiResult<Option<FavoriteRecord>>;
    // Idempotent: returns whether a row was actually removed.
    async fn remove_favorite(&self, user_id: Uuid, advertisement_id: Uuid) -> ApiResult<bool>;
    // The requester's favorites, narrowed by the same visibility rule as the listing.
    // A favorited advertisement that went back to DRAFT drops out until it is published again.
    async fn list_favorites(&self, requester: &Requester) -> ApiResult<Vec<Favorite>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Columns and joins shared by every advertisement read. Yields `AdvertisementRow`.
const ADVERTISEMENT_SELECT: &str = r#"
    SELECT
        a.id, a.title, a.description, a.status, a.created_at, a.updated_at,
        u.id AS creator_id,
        u.username AS creator_username,
        u.first_name AS creator_first_name,
        u.last_name AS creator_last_name
    FROM advertisements a
    JOIN users u ON u.id = a.creator_id
"#;

/// Visibility rule as SQL: `$1` is the requester id (NULL when anonymous), `$2` is the admin flag.
const VISIBLE_TO_REQUESTER: &str = "(a.status <> 'DRAFT' OR a.creator_id = $1 OR $2)";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn open_count(conn: &mut PgConnection, creator_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM advertisements WHERE creator_id = $1 AND status = 'OPEN'",
    )
    .bind(creator_id)
    .fetch_one(&mut *conn)
    .await
}

/// Takes the creator's row lock. Every opening for a given user goes through this,
/// so concurrent openings serialize and the count stays accurate until commit.
async fn lock_creator(conn: &mut PgConnection, creator_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(creator_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

async fn fetch_advertisement(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Advertisement>, sqlx::Error> {
    let sql = format!("{ADVERTISEMENT_SELECT} WHERE a.id = $1");
    let row = sqlx::query_as::<_, AdvertisementRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Advertisement::from))
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, first_name, last_name, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// list_advertisements
    ///
    /// Newest first, with drafts filtered in SQL.
    async fn list_advertisements(&self, requester: &Requester) -> ApiResult<Vec<Advertisement>> {
        let sql = format!(
            "{ADVERTISEMENT_SELECT} WHERE {VISIBLE_TO_REQUESTER} ORDER BY a.created_at DESC"
        );
        let rows = sqlx::query_as::<_, AdvertisementRow>(&sql)
            .bind(requester.id())
            .bind(requester.is_admin())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Advertisement::from).collect())
    }

    async fn get_advertisement(
        &self,
        id: Uuid,
        requester: &Requester,
    ) -> ApiResult<Option<Advertisement>> {
        let sql = format!("{ADVERTISEMENT_SELECT} WHERE {VISIBLE_TO_REQUESTER} AND a.id = $3");
        let row = sqlx::query_as::<_, AdvertisementRow>(&sql)
            .bind(requester.id())
            .bind(requester.is_admin())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Advertisement::from))
    }

    /// create_advertisement
    ///
    /// Lock creator → count OPEN → check cap → insert, in one transaction.
    async fn create_advertisement(&self, new: NewAdvertisement) -> ApiResult<Advertisement> {
        let mut tx = self.pool.begin().await?;

        if !lock_creator(&mut tx, new.creator_id).await? {
            return Err(ApiError::NotFound("user"));
        }

        if is_opening(None, Some(new.status)) {
            let count = open_count(&mut tx, new.creator_id).await?;
            check_open_limit(None, Some(new.status), count)?;
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO advertisements (id, title, description, creator_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.creator_id)
        .bind(new.status)
        .execute(&mut *tx)
        .await?;

        let advertisement = fetch_advertisement(&mut tx, id)
            .await?
            .ok_or(ApiError::NotFound("advertisement"))?;

        tx.commit().await?;
        Ok(advertisement)
    }

    /// update_advertisement
    ///
    /// Locks the advertisement to read its prior status, and the creator when the change
    /// is an opening. `COALESCE` leaves absent fields untouched.
    async fn update_advertisement(
        &self,
        id: Uuid,
        changes: UpdateAdvertisementRequest,
    ) -> ApiResult<Option<Advertisement>> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(Uuid, AdvertisementStatus)> =
            sqlx::query_as("SELECT creator_id, status FROM advertisements WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((creator_id, prior)) = current else {
            return Ok(None);
        };

        if is_opening(Some(prior), changes.status) {
            lock_creator(&mut tx, creator_id).await?;
            let count = open_count(&mut tx, creator_id).await?;
            check_open_limit(Some(prior), changes.status, count)?;
        }

        sqlx::query(
            r#"
            UPDATE advertisements
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.status)
        .execute(&mut *tx)
        .await?;

        let advertisement = fetch_advertisement(&mut tx, id).await?;
        tx.commit().await?;
        Ok(advertisement)
    }

    async fn delete_advertisement(&self, id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query("DELETE FROM advertisements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// add_favorite
    ///
    /// The unique constraint decides duplicates (`ON CONFLICT DO NOTHING`), so two
    /// concurrent requests cannot both succeed. An advertisement deleted after the caller
    /// loaded it trips the foreign key and is reported as not found.
    async fn add_favorite(
        &self,
        user_id: Uuid,
        advertisement_id: Uuid,
    ) -> ApiResult<Option<FavoriteRecord>> {
        let record = sqlx::query_as::<_, FavoriteRecord>(
            r#"
            INSERT INTO favorite_advertisements (id, user_id, advertisement_id, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT ON CONSTRAINT favorite_advertisements_user_advertisement_key DO NOTHING
            RETURNING id, user_id, advertisement_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(advertisement_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ApiError::NotFound("advertisement")
            }
            other => ApiError::Database(other),
        })?;
        Ok(record)
    }

    async fn remove_favorite(&self, user_id: Uuid, advertisement_id: Uuid) -> ApiResult<bool> {
        let result = sqlx::query(
            "DELETE FROM favorite_advertisements WHERE user_id = $1 AND advertisement_id = $2",
        )
        .bind(user_id)
        .bind(advertisement_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// list_favorites
    ///
    /// `$1` doubles as the favoriting user and the visibility subject.
    async fn list_favorites(&self, requester: &Requester) -> ApiResult<Vec<Favorite>> {
        let sql = format!(
            r#"
            SELECT
                f.id AS favorite_id,
                f.created_at AS favorited_at,
                a.id, a.title, a.description, a.status, a.created_at, a.updated_at,
                u.id AS creator_id,
                u.username AS creator_username,
                u.first_name AS creator_first_name,
                u.last_name AS creator_last_name
            FROM favorite_advertisements f
            JOIN advertisements a ON a.id = f.advertisement_id
            JOIN users u ON u.id = a.creator_id
            WHERE f.user_id = $1 AND {VISIBLE_TO_REQUESTER}
            ORDER BY f.created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, FavoriteRow>(&sql)
            .bind(requester.id())
            .bind(requester.is_admin())
            .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Favorite::from).collect())
    }
}
