use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity ---

/// User
///
/// A row of the `users` table. Provisioned by the identity service; this API only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    // RBAC field: 'admin' or 'member'.
    pub role: String,
}

/// UserSummary
///
/// The public face of a user, embedded as `creator` in every advertisement and returned by `GET /me`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

// --- Advertisements ---

/// AdvertisementStatus
///
/// Lifecycle of a listing. Stored as the Postgres enum `advertisement_status`
/// and serialized as upper-case strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "advertisement_status", rename_all = "UPPERCASE")]
#[ts(export)]
pub enum AdvertisementStatus {
    /// Visible only to the creator and administrators.
    Draft,
    /// Counts toward the per-user open cap.
    #[default]
    Open,
    Closed,
}

/// Advertisement
///
/// API representation of a listing with its creator expanded.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Advertisement {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator: UserSummary,
    pub status: AdvertisementStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// AdvertisementRow
///
/// Flat result of `advertisements JOIN users`. Column aliases carry the `creator_` prefix.
#[derive(Debug, Clone, FromRow)]
pub struct AdvertisementRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: AdvertisementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator_id: Uuid,
    pub creator_username: String,
    pub creator_first_name: String,
    pub creator_last_name: String,
}

impl From<AdvertisementRow> for Advertisement {
    fn from(row: AdvertisementRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            creator: UserSummary {
                id: row.creator_id,
                username: row.creator_username,
                first_name: row.creator_first_name,
                last_name: row.creator_last_name,
            },
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// --- Favorites ---

/// FavoriteRecord
///
/// A row of `favorite_advertisements`. Returned by the repository when a favorite is inserted.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct FavoriteRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub advertisement_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Favorite
///
/// API representation of a bookmark with the full advertisement nested in.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Favorite {
    pub id: Uuid,
    pub advertisement: Advertisement,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(record: FavoriteRecord, advertisement: Advertisement) -> Self {
        Self {
            id: record.id,
            advertisement,
            created_at: record.created_at,
        }
    }
}

/// FavoriteRow
///
/// Result of `favorite_advertisements JOIN advertisements JOIN users`.
#[derive(Debug, Clone, FromRow)]
pub struct FavoriteRow {
    pub favorite_id: Uuid,
    pub favorited_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub advertisement: AdvertisementRow,
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Self {
            id: row.favorite_id,
            advertisement: row.advertisement.into(),
            created_at: row.favorited_at,
        }
    }
}

// --- Request Payloads ---

/// CreateAdvertisementRequest
///
/// Body of `POST /advertisements` and `PUT /advertisements/{id}`.
/// Unknown fields such as `creator` are ignored; the creator always comes from the session.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateAdvertisementRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to `OPEN` on create; left untouched on `PUT` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdvertisementStatus>,
}

/// UpdateAdvertisementRequest
///
/// Partial update payload for `PATCH /advertisements/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAdvertisementRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdvertisementStatus>,
}

impl From<CreateAdvertisementRequest> for UpdateAdvertisementRequest {
    fn from(req: CreateAdvertisementRequest) -> Self {
        Self {
            title: Some(req.title),
            description: Some(req.description),
            status: req.status,
        }
    }
}

// --- Repository Inputs ---

/// NewAdvertisement
///
/// Validated insert input. `creator_id` is always the authenticated requester.
#[derive(Debug, Clone)]
pub struct NewAdvertisement {
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: AdvertisementStatus,
}
