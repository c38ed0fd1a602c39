use crate::{
    AppState,
    auth::{AuthUser, Requester},
    error::{ApiError, ApiResult},
    models::{
        Advertisement, CreateAdvertisementRequest, Favorite, NewAdvertisement,
        UpdateAdvertisementRequest, UserSummary,
    },
    policy::{Action, authorize},
    validation::{
        DUPLICATE_FAVORITE_MESSAGE, SELF_FAVORITE_MESSAGE, validate_create, validate_update,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Loads an advertisement through the visibility filter. Invisible and unknown ids are both 404.
async fn load_visible(state: &AppState, id: Uuid, requester: &Requester) -> ApiResult<Advertisement> {
    state
        .repo
        .get_advertisement(id, requester)
        .await?
        .ok_or(ApiError::NotFound("advertisement"))
}

// --- Identity ---

/// get_me
///
/// [Authenticated Route] The requesting user's public representation.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = UserSummary),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<UserSummary>> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Json(UserSummary::from(&user)))
}

// --- Advertisements ---

/// list_advertisements
///
/// [Public Route] Every advertisement the requester may see, newest first.
/// Anonymous callers never receive drafts; signed-in users also receive their own drafts.
#[utoipa::path(
    get,
    path = "/advertisements",
    responses((status = 200, description = "Visible advertisements", body = [Advertisement]))
)]
pub async fn list_advertisements(
    requester: Requester,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Advertisement>>> {
    authorize(&requester, Action::List, None)?;
    let advertisements = state.repo.list_advertisements(&requester).await?;
    Ok(Json(advertisements))
}

/// get_advertisement
///
/// [Public Route] A single advertisement, subject to the same visibility rule as the listing.
#[utoipa::path(
    get,
    path = "/advertisements/{id}",
    params(("id" = Uuid, Path, description = "Advertisement ID")),
    responses(
        (status = 200, description = "Found", body = Advertisement),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_advertisement(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Advertisement>> {
    authorize(&requester, Action::Retrieve, None)?;
    let advertisement = load_visible(&state, id, &requester).await?;
    Ok(Json(advertisement))
}

/// create_advertisement
///
/// [Authenticated Route] Publishes a new advertisement. The creator is always the
/// requester; any `creator` in the body is ignored. Status defaults to OPEN.
#[utoipa::path(
    post,
    path = "/advertisements",
    request_body = CreateAdvertisementRequest,
    responses(
        (status = 201, description = "Created", body = Advertisement),
        (status = 400, description = "Open advertisement limit reached or invalid input"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_advertisement(
    requester: Requester,
    State(state): State<AppState>,
    Json(payload): Json<CreateAdvertisementRequest>,
) -> ApiResult<(StatusCode, Json<Advertisement>)> {
    authorize(&requester, Action::Create, None)?;
    let user = requester.require_user()?;
    validate_create(&payload)?;

    let new = NewAdvertisement {
        creator_id: user.id,
        title: payload.title,
        description: payload.description,
        status: payload.status.unwrap_or_default(),
    };

    let advertisement = state.repo.create_advertisement(new).await.inspect_err(|e| {
        if matches!(e, ApiError::Validation(_)) {
            tracing::warn!(user_id = %user.id, "create rejected: {}", e);
        }
    })?;

    tracing::info!(
        advertisement_id = %advertisement.id,
        user_id = %user.id,
        status = ?advertisement.status,
        "advertisement created"
    );
    Ok((StatusCode::CREATED, Json(advertisement)))
}

/// update_advertisement
///
/// [Authenticated Route] Full update. `title` is required; `status` is left unchanged when omitted.
#[utoipa::path(
    put,
    path = "/advertisements/{id}",
    params(("id" = Uuid, Path, description = "Advertisement ID")),
    request_body = CreateAdvertisementRequest,
    responses(
        (status = 200, description = "Updated", body = Advertisement),
        (status = 400, description = "Open advertisement limit reached or invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the creator or an administrator"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_advertisement(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateAdvertisementRequest>,
) -> ApiResult<Json<Advertisement>> {
    apply_update(&state, &requester, Action::Update, id, payload.into()).await
}

/// partial_update_advertisement
///
/// [Authenticated Route] Partial update; only the fields present in the body change.
/// Moving a DRAFT or CLOSED advertisement to OPEN is subject to the open limit.
#[utoipa::path(
    patch,
    path = "/advertisements/{id}",
    params(("id" = Uuid, Path, description = "Advertisement ID")),
    request_body = UpdateAdvertisementRequest,
    responses(
        (status = 200, description = "Updated", body = Advertisement),
        (status = 400, description = "Open advertisement limit reached or invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the creator or an administrator"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn partial_update_advertisement(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdvertisementRequest>,
) -> ApiResult<Json<Advertisement>> {
    apply_update(&state, &requester, Action::PartialUpdate, id, payload).await
}

async fn apply_update(
    state: &AppState,
    requester: &Requester,
    action: Action,
    id: Uuid,
    changes: UpdateAdvertisementRequest,
) -> ApiResult<Json<Advertisement>> {
    authorize(requester, action, None)?;
    let current = load_visible(state, id, requester).await?;
    authorize(requester, action, Some(&current))?;
    // A PUT body converts with `title` set, so the same check covers both verbs.
    validate_update(&changes)?;

    let updated = state
        .repo
        .update_advertisement(id, changes)
        .await
        .inspect_err(|e| {
            if matches!(e, ApiError::Validation(_)) {
                tracing::warn!(advertisement_id = %id, "update rejected: {}", e);
            }
        })?
        .ok_or(ApiError::NotFound("advertisement"))?;

    tracing::info!(advertisement_id = %id, status = ?updated.status, "advertisement updated");
    Ok(Json(updated))
}

/// delete_advertisement
///
/// [Authenticated Route] Removes an advertisement. Administrators may delete any
/// advertisement; everyone else only their own.
#[utoipa::path(
    delete,
    path = "/advertisements/{id}",
    params(("id" = Uuid, Path, description = "Advertisement ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the creator or an administrator"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_advertisement(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authorize(&requester, Action::Destroy, None)?;
    let current = load_visible(&state, id, &requester).await?;
    authorize(&requester, Action::Destroy, Some(&current))?;

    if !state.repo.delete_advertisement(id).await? {
        return Err(ApiError::NotFound("advertisement"));
    }

    tracing::info!(advertisement_id = %id, by_admin = requester.is_admin(), "advertisement deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- Favorites ---

/// add_favorite
///
/// [Authenticated Route] Bookmarks another user's advertisement.
/// Own advertisements and repeated favorites are rejected with 400.
#[utoipa::path(
    post,
    path = "/advertisements/{id}/favorite",
    params(("id" = Uuid, Path, description = "Advertisement ID")),
    responses(
        (status = 201, description = "Favorited", body = Favorite),
        (status = 400, description = "Own advertisement or already favorited"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_favorite(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<Favorite>)> {
    authorize(&requester, Action::Favorite, None)?;
    let user = requester.require_user()?;
    let advertisement = load_visible(&state, id, &requester).await?;

    if advertisement.creator.id == user.id {
        return Err(ApiError::validation(SELF_FAVORITE_MESSAGE));
    }

    let record = state
        .repo
        .add_favorite(user.id, id)
        .await?
        .ok_or_else(|| ApiError::validation(DUPLICATE_FAVORITE_MESSAGE))?;

    tracing::info!(advertisement_id = %id, user_id = %user.id, "advertisement favorited");
    Ok((StatusCode::CREATED, Json(Favorite::new(record, advertisement))))
}

/// remove_favorite
///
/// [Authenticated Route] Removes a bookmark. Idempotent: 204 even if it did not exist.
/// Deletes by (user, advertisement) without a visibility check, so a bookmark on a
/// listing that went back to DRAFT can still be dropped.
#[utoipa::path(
    delete,
    path = "/advertisements/{id}/favorite",
    params(("id" = Uuid, Path, description = "Advertisement ID")),
    responses(
        (status = 204, description = "Removed (or was not present)"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn remove_favorite(
    requester: Requester,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authorize(&requester, Action::Unfavorite, None)?;
    let user = requester.require_user()?;

    let removed = state.repo.remove_favorite(user.id, id).await?;
    tracing::debug!(advertisement_id = %id, user_id = %user.id, removed, "favorite removed");
    Ok(StatusCode::NO_CONTENT)
}

/// list_favorites
///
/// [Authenticated Route] The requester's bookmarks, newest first, each with the full advertisement.
/// Bookmarks on listings the requester can no longer see (foreign drafts) are left out.
#[utoipa::path(
    get,
    path = "/favorites",
    responses(
        (status = 200, description = "My favorites", body = [Favorite]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_favorites(
    requester: Requester,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Favorite>>> {
    authorize(&requester, Action::ListFavorites, None)?;
    let favorites = state.repo.list_favorites(&requester).await?;
    Ok(Json(favorites))
}
