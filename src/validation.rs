use crate::{
    error::ApiError,
    models::{AdvertisementStatus, CreateAdvertisementRequest, UpdateAdvertisementRequest},
};

/// Maximum number of advertisements a single user may have in status OPEN.
pub const MAX_OPEN_ADVERTISEMENTS: i64 = 10;

pub const OPEN_LIMIT_MESSAGE: &str = "a user may not have more than 10 open advertisements";
pub const SELF_FAVORITE_MESSAGE: &str = "cannot favorite your own advertisement";
pub const DUPLICATE_FAVORITE_MESSAGE: &str = "already favorited";
const TITLE_MAX_LEN: usize = 255;

/// is_opening
///
/// A write opens an advertisement when it ends in OPEN and did not start there.
/// `prior` is `None` on create; `desired` is `None` when the status is left untouched.
pub fn is_opening(prior: Option<AdvertisementStatus>, desired: Option<AdvertisementStatus>) -> bool {
    desired == Some(AdvertisementStatus::Open) && prior != Some(AdvertisementStatus::Open)
}

/// check_open_limit
///
/// `open_count` is the creator's current number of OPEN advertisements. An advertisement
/// that is already OPEN is never an opening, so it is not counted against itself.
///
/// Must run inside the same transaction (or lock) as the write it gates.
pub fn check_open_limit(
    prior: Option<AdvertisementStatus>,
    desired: Option<AdvertisementStatus>,
    open_count: i64,
) -> Result<(), ApiError> {
    if is_opening(prior, desired) && open_count >= MAX_OPEN_ADVERTISEMENTS {
        return Err(ApiError::validation(OPEN_LIMIT_MESSAGE));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::validation("title may not be blank"));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(ApiError::validation(format!(
            "title may not be longer than {TITLE_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_create(req: &CreateAdvertisementRequest) -> Result<(), ApiError> {
    validate_title(&req.title)
}

pub fn validate_update(req: &UpdateAdvertisementRequest) -> Result<(), ApiError> {
    match &req.title {
        Some(title) => validate_title(title),
        None => Ok(()),
    }
}
