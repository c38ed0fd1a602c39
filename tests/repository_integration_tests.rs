use classifieds_api::{
    ApiError,
    auth::{AuthUser, Requester},
    models::{AdvertisementStatus, NewAdvertisement, UpdateAdvertisementRequest, User},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the pool for a test. Requires `DATABASE_URL` pointing at a disposable database.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> Arc<PostgresRepository> {
        Arc::new(PostgresRepository::new(self.pool.clone()))
    }
}

// --- Test Data Helpers ---

/// Inserts a user with a unique username so tests can share one database.
async fn create_test_user(pool: &PgPool, role: &str) -> User {
    let id = Uuid::new_v4();
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, first_name, last_name, role)
        VALUES ($1, $2, 'Test', 'User', $3)
        RETURNING id, username, first_name, last_name, role
        "#,
    )
    .bind(id)
    .bind(format!("{role}-{id}"))
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("Failed to create test user")
}

fn new_ad(creator_id: Uuid, status: AdvertisementStatus) -> NewAdvertisement {
    NewAdvertisement {
        creator_id,
        title: format!("{status:?} listing"),
        description: "integration".to_string(),
        status,
    }
}

fn as_requester(user: &User) -> Requester {
    Requester::User(AuthUser::from(user.clone()))
}

async fn open_count(pool: &PgPool, creator_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM advertisements WHERE creator_id = $1 AND status = 'OPEN'",
    )
    .bind(creator_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count open advertisements")
}

// --- Tests ---

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_get_advertisement() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "member").await;

    let created = repo
        .create_advertisement(new_ad(user.id, AdvertisementStatus::Open))
        .await
        .unwrap();
    assert_eq!(created.creator.id, user.id);
    assert_eq!(created.creator.username, user.username);
    assert_eq!(created.status, AdvertisementStatus::Open);

    let fetched = repo
        .get_advertisement(created.id, &Requester::Anonymous)
        .await
        .unwrap();
    assert_eq!(fetched, Some(created));
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_drafts_filtered_in_sql() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&ctx.pool, "member").await;
    let stranger = create_test_user(&ctx.pool, "member").await;
    let admin = create_test_user(&ctx.pool, "admin").await;

    let draft = repo
        .create_advertisement(new_ad(owner.id, AdvertisementStatus::Draft))
        .await
        .unwrap();

    for (requester, visible) in [
        (Requester::Anonymous, false),
        (as_requester(&stranger), false),
        (as_requester(&owner), true),
        (as_requester(&admin), true),
    ] {
        let detail = repo.get_advertisement(draft.id, &requester).await.unwrap();
        assert_eq!(detail.is_some(), visible, "detail for {requester:?}");

        let listed = repo
            .list_advertisements(&requester)
            .await
            .unwrap()
            .iter()
            .any(|ad| ad.id == draft.id);
        assert_eq!(listed, visible, "list for {requester:?}");
    }
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_open_limit_on_create_and_update() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "member").await;

    for _ in 0..10 {
        repo.create_advertisement(new_ad(user.id, AdvertisementStatus::Open))
            .await
            .unwrap();
    }

    let eleventh = repo
        .create_advertisement(new_ad(user.id, AdvertisementStatus::Open))
        .await;
    assert!(matches!(eleventh, Err(ApiError::Validation(_))));

    // Drafts are not capped, but reopening one is.
    let draft = repo
        .create_advertisement(new_ad(user.id, AdvertisementStatus::Draft))
        .await
        .unwrap();
    let reopen = repo
        .update_advertisement(
            draft.id,
            UpdateAdvertisementRequest {
                status: Some(AdvertisementStatus::Open),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(reopen, Err(ApiError::Validation(_))));

    assert_eq!(open_count(&ctx.pool, user.id).await, 10);
}

#[test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_creates_respect_open_limit() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "member").await;

    for _ in 0..8 {
        repo.create_advertisement(new_ad(user.id, AdvertisementStatus::Open))
            .await
            .unwrap();
    }

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let repo = repo.clone();
            let creator_id = user.id;
            tokio::spawn(async move {
                repo.create_advertisement(new_ad(creator_id, AdvertisementStatus::Open))
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(ApiError::Validation(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(accepted, 2);
    assert_eq!(open_count(&ctx.pool, user.id).await, 10);
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_partial_update_keeps_absent_fields() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "member").await;

    let created = repo
        .create_advertisement(new_ad(user.id, AdvertisementStatus::Open))
        .await
        .unwrap();

    let updated = repo
        .update_advertisement(
            created.id,
            UpdateAdvertisementRequest {
                description: Some("now with a bell".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .expect("advertisement exists");

    assert_eq!(updated.title, created.title);
    assert_eq!(updated.status, created.status);
    assert_eq!(updated.description, "now with a bell");
    assert!(updated.updated_at >= created.updated_at);

    let missing = repo
        .update_advertisement(Uuid::new_v4(), UpdateAdvertisementRequest::default())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_favorites_are_unique_and_cascade() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&ctx.pool, "member").await;
    let fan = create_test_user(&ctx.pool, "member").await;

    let ad = repo
        .create_advertisement(new_ad(owner.id, AdvertisementStatus::Open))
        .await
        .unwrap();

    let first = repo.add_favorite(fan.id, ad.id).await.unwrap();
    assert!(first.is_some());
    let duplicate = repo.add_favorite(fan.id, ad.id).await.unwrap();
    assert!(duplicate.is_none(), "unique constraint absorbs the second insert");

    let fan_requester = as_requester(&fan);
    let favorites = repo.list_favorites(&fan_requester).await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].advertisement.id, ad.id);
    assert_eq!(favorites[0].advertisement.creator.id, owner.id);

    assert!(repo.delete_advertisement(ad.id).await.unwrap());
    assert!(repo.list_favorites(&fan_requester).await.unwrap().is_empty());
    assert!(!repo.remove_favorite(fan.id, ad.id).await.unwrap());
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_favorites_hide_foreign_drafts_in_sql() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&ctx.pool, "member").await;
    let fan = create_test_user(&ctx.pool, "member").await;
    let admin = create_test_user(&ctx.pool, "admin").await;

    let ad = repo
        .create_advertisement(new_ad(owner.id, AdvertisementStatus::Open))
        .await
        .unwrap();
    repo.add_favorite(fan.id, ad.id).await.unwrap();
    repo.add_favorite(admin.id, ad.id).await.unwrap();

    repo.update_advertisement(
        ad.id,
        UpdateAdvertisementRequest {
            status: Some(AdvertisementStatus::Draft),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(repo.list_favorites(&as_requester(&fan)).await.unwrap().is_empty());
    assert_eq!(repo.list_favorites(&as_requester(&admin)).await.unwrap().len(), 1);

    // The row is still there and can be removed.
    assert!(repo.remove_favorite(fan.id, ad.id).await.unwrap());
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_favorite_of_missing_advertisement_is_not_found() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let fan = create_test_user(&ctx.pool, "member").await;

    let result = repo.add_favorite(fan.id, Uuid::new_v4()).await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
}
