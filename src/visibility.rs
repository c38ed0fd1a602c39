use crate::{
    auth::Requester,
    models::{Advertisement, AdvertisementStatus},
};

/// is_visible
///
/// Drafts are visible to their creator and to administrators; everything else is public.
/// `PostgresRepository` applies the same rule as a `WHERE` predicate.
pub fn is_visible(advertisement: &Advertisement, requester: &Requester) -> bool {
    if advertisement.status != AdvertisementStatus::Draft {
        return true;
    }
    match requester {
        Requester::Anonymous => false,
        Requester::User(user) => user.is_admin() || advertisement.creator.id == user.id,
    }
}

/// Narrows `advertisements` to those `requester` may see, preserving order.
pub fn filter_visible(advertisements: Vec<Advertisement>, requester: &Requester) -> Vec<Advertisement> {
    advertisements
        .into_iter()
        .filter(|advertisement| is_visible(advertisement, requester))
        .collect()
}
