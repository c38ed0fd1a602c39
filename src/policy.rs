//! Action-level and object-level authorization for advertisements.

use crate::{auth::Requester, error::ApiError, models::Advertisement};

/// Every operation the API exposes on advertisements and favorites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    Favorite,
    Unfavorite,
    ListFavorites,
}

/// What a requester must have to perform an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Any signed-in user.
    Authenticated,
    /// The advertisement's creator, or an administrator.
    OwnerOrAdmin,
}

impl Action {
    /// Lookup table: action → required capabilities. An empty set means unrestricted.
    pub const fn required_capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Action::List | Action::Retrieve => &[],
            Action::Create | Action::Favorite | Action::Unfavorite | Action::ListFavorites => {
                &[Authenticated]
            }
            Action::Update | Action::PartialUpdate | Action::Destroy => {
                &[Authenticated, OwnerOrAdmin]
            }
        }
    }
}

/// authorize
///
/// Checks `requester` against every capability `action` requires.
///
/// Called with `target = None` before the advertisement is loaded (only identity is
/// checked, so anonymous callers get 401 without revealing whether the id exists),
/// then again with the loaded advertisement for the ownership part (403).
pub fn authorize(
    requester: &Requester,
    action: Action,
    target: Option<&Advertisement>,
) -> Result<(), ApiError> {
    for capability in action.required_capabilities() {
        match capability {
            Capability::Authenticated => {
                requester.require_user()?;
            }
            Capability::OwnerOrAdmin => {
                let user = requester.require_user()?;
                if let Some(advertisement) = target {
                    if !user.is_admin() && advertisement.creator.id != user.id {
                        return Err(ApiError::Forbidden(
                            "only the creator or an administrator may modify this advertisement"
                                .to_string(),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}
