use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::Requester,
    error::{ApiError, ApiResult},
    models::{
        Advertisement, AdvertisementStatus, Favorite, FavoriteRecord, NewAdvertisement,
        UpdateAdvertisementRequest, User, UserSummary,
    },
    repository::Repository,
    validation::{check_open_limit, is_opening},
    visibility::{filter_visible, is_visible},
};

#[derive(Debug, Clone)]
struct StoredAdvertisement {
    id: Uuid,
    title: String,
    description: String,
    creator_id: Uuid,
    status: AdvertisementStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryStore {
    users: HashMap<Uuid, User>,
    // Insertion order; listings iterate it in reverse for newest-first.
    advertisements: Vec<StoredAdvertisement>,
    favorites: Vec<FavoriteRecord>,
}

impl MemoryStore {
    fn hydrate(&self, stored: &StoredAdvertisement) -> Advertisement {
        let creator = self
            .users
            .get(&stored.creator_id)
            .map(UserSummary::from)
            .unwrap_or_else(|| UserSummary {
                id: stored.creator_id,
                ..UserSummary::default()
            });

        Advertisement {
            id: stored.id,
            title: stored.title.clone(),
            description: stored.description.clone(),
            creator,
            status: stored.status,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    fn open_count(&self, creator_id: Uuid) -> i64 {
        let count = self
            .advertisements
            .iter()
            .filter(|ad| ad.creator_id == creator_id && ad.status == AdvertisementStatus::Open)
            .count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }
}

/// InMemoryRepository
///
/// A `Repository` that keeps everything in process memory. Every operation runs under a
/// single mutex, which gives the open-cap check the same check-and-write atomicity the
/// Postgres implementation gets from row locks. Used by the test suite and for local demos
/// without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<MemoryStore>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with users, standing in for the identity service.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = MemoryStore {
            users: users.into_iter().map(|user| (user.id, user)).collect(),
            ..MemoryStore::default()
        };
        Self {
            store: Mutex::new(store),
        }
    }

    pub async fn insert_user(&self, user: User) {
        self.store.lock().await.users.insert(user.id, user);
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> ApiResult<Option<User>> {
        Ok(self.store.lock().await.users.get(&id).cloned())
    }

    async fn list_advertisements(&self, requester: &Requester) -> ApiResult<Vec<Advertisement>> {
        let store = self.store.lock().await;
        let newest_first = store
            .advertisements
            .iter()
            .rev()
            .map(|stored| store.hydrate(stored))
            .collect();
        Ok(filter_visible(newest_first, requester))
    }

    async fn get_advertisement(
        &self,
        id: Uuid,
        requester: &Requester,
    ) -> ApiResult<Option<Advertisement>> {
        let store = self.store.lock().await;
        Ok(store
            .advertisements
            .iter()
            .find(|stored| stored.id == id)
            .map(|stored| store.hydrate(stored))
            .filter(|ad| is_visible(ad, requester)))
    }

    async fn create_advertisement(&self, new: NewAdvertisement) -> ApiResult<Advertisement> {
        let mut store = self.store.lock().await;

        if !store.users.contains_key(&new.creator_id) {
            return Err(ApiError::NotFound("user"));
        }
        check_open_limit(None, Some(new.status), store.open_count(new.creator_id))?;

        let now = Utc::now();
        let stored = StoredAdvertisement {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            creator_id: new.creator_id,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        let advertisement = store.hydrate(&stored);
        store.advertisements.push(stored);
        Ok(advertisement)
    }

    async fn update_advertisement(
        &self,
        id: Uuid,
        changes: UpdateAdvertisementRequest,
    ) -> ApiResult<Option<Advertisement>> {
        let mut store = self.store.lock().await;

        let Some(index) = store.advertisements.iter().position(|stored| stored.id == id) else {
            return Ok(None);
        };

        let (creator_id, prior) = {
            let current = &store.advertisements[index];
            (current.creator_id, current.status)
        };
        if is_opening(Some(prior), changes.status) {
            check_open_limit(Some(prior), changes.status, store.open_count(creator_id))?;
        }

        let stored = &mut store.advertisements[index];
        if let Some(title) = changes.title {
            stored.title = title;
        }
        if let Some(description) = changes.description {
            stored.description = description;
        }
        if let Some(status) = changes.status {
            stored.status = status;
        }
        stored.updated_at = Utc::now();

        let updated = store.advertisements[index].clone();
        Ok(Some(store.hydrate(&updated)))
    }

    async fn delete_advertisement(&self, id: Uuid) -> ApiResult<bool> {
        let mut store = self.store.lock().await;
        let before = store.advertisements.len();
        store.advertisements.retain(|stored| stored.id != id);
        let deleted = store.advertisements.len() < before;
        if deleted {
            store.favorites.retain(|favorite| favorite.advertisement_id != id);
        }
        Ok(deleted)
    }

    async fn add_favorite(
        &self,
        user_id: Uuid,
        advertisement_id: Uuid,
    ) -> ApiResult<Option<FavoriteRecord>> {
        let mut store = self.store.lock().await;

        if !store.advertisements.iter().any(|stored| stored.id == advertisement_id) {
            return Err(ApiError::NotFound("advertisement"));
        }
        let exists = store
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.advertisement_id == advertisement_id);
        if exists {
            return Ok(None);
        }

        let record = FavoriteRecord {
            id: Uuid::new_v4(),
            user_id,
            advertisement_id,
            created_at: Utc::now(),
        };
        store.favorites.push(record.clone());
        Ok(Some(record))
    }

    async fn remove_favorite(&self, user_id: Uuid, advertisement_id: Uuid) -> ApiResult<bool> {
        let mut store = self.store.lock().await;
        let before = store.favorites.len();
        store
            .favorites
            .retain(|f| !(f.user_id == user_id && f.advertisement_id == advertisement_id));
        Ok(store.favorites.len() < before)
    }

    async fn list_favorites(&self, requester: &Requester) -> ApiResult<Vec<Favorite>> {
        let Some(user_id) = requester.id() else {
            return Ok(Vec::new());
        };
        let store = self.store.lock().await;
        Ok(store
            .favorites
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id)
            .filter_map(|f| {
                store
                    .advertisements
                    .iter()
                    .find(|stored| stored.id == f.advertisement_id)
                    .map(|stored| store.hydrate(stored))
                    .filter(|ad| is_visible(ad, requester))
                    .map(|ad| Favorite::new(f.clone(), ad))
            })
            .collect())
    }
}
