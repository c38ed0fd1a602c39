#![allow(dead_code)]

use classifieds_api::{
    AppConfig, AppState, InMemoryRepository, RepositoryState,
    auth::{AuthUser, Requester},
    models::{Advertisement, AdvertisementStatus, NewAdvertisement, User},
    repository::Repository,
};
use std::sync::Arc;
use uuid::Uuid;

pub const ALICE_ID: Uuid = Uuid::from_u128(0xA11CE);
pub const BOB_ID: Uuid = Uuid::from_u128(0xB0B);
pub const ADMIN_ID: Uuid = Uuid::from_u128(0xAD);

pub fn user(id: Uuid, username: &str, role: &str) -> User {
    User {
        id,
        username: username.to_string(),
        first_name: format!("{username}-first"),
        last_name: format!("{username}-last"),
        role: role.to_string(),
    }
}

/// Alice and Bob are members, Root is an administrator.
pub fn seeded_repo() -> Arc<InMemoryRepository> {
    Arc::new(InMemoryRepository::with_users([
        user(ALICE_ID, "alice", "member"),
        user(BOB_ID, "bob", "member"),
        user(ADMIN_ID, "root", "admin"),
    ]))
}

pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState::new(repo as RepositoryState, AppConfig::default())
}

pub fn alice() -> Requester {
    Requester::User(AuthUser { id: ALICE_ID, role: "member".to_string() })
}

pub fn bob() -> Requester {
    Requester::User(AuthUser { id: BOB_ID, role: "member".to_string() })
}

pub fn admin() -> Requester {
    Requester::User(AuthUser { id: ADMIN_ID, role: "admin".to_string() })
}

/// Inserts straight through the repository, bypassing the handlers.
pub async fn seed_ad(
    repo: &InMemoryRepository,
    creator_id: Uuid,
    status: AdvertisementStatus,
) -> Advertisement {
    repo.create_advertisement(NewAdvertisement {
        creator_id,
        title: format!("{status:?} listing"),
        description: "seeded".to_string(),
        status,
    })
    .await
    .expect("seeding should stay under the open limit")
}

pub async fn seed_many(
    repo: &InMemoryRepository,
    creator_id: Uuid,
    status: AdvertisementStatus,
    count: usize,
) -> Vec<Advertisement> {
    let mut seeded = Vec::with_capacity(count);
    for _ in 0..count {
        seeded.push(seed_ad(repo, creator_id, status).await);
    }
    seeded
}

/// Number of OPEN advertisements `creator_id` currently has, as seen by an administrator.
pub async fn open_count(repo: &InMemoryRepository, creator_id: Uuid) -> usize {
    repo.list_advertisements(&admin())
        .await
        .expect("listing never fails in memory")
        .iter()
        .filter(|ad| ad.creator.id == creator_id && ad.status == AdvertisementStatus::Open)
        .count()
}
