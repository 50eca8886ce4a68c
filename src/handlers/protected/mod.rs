pub mod cats;
pub mod pois;
pub mod trips;
pub mod users;

use axum::extract::{rejection::QueryRejection, Query};

use crate::config::config;
use crate::database::{PageQuery, PageRequest, Scope};
use crate::error::ApiError;
use crate::middleware::ValidatedUser;

/// Listing query string; a malformed one becomes a JSON 400 instead of
/// axum's plain-text rejection
pub(crate) type PageParams = Result<Query<PageQuery>, QueryRejection>;

pub(crate) fn page_request(query: PageParams) -> Result<PageRequest, ApiError> {
    let Query(query) = query?;
    Ok(PageRequest::from_query(&query, &config().api))
}

/// `?mine=true` narrows a count to the requester's documents
pub(crate) fn count_scope(query: PageParams, user: &ValidatedUser) -> Result<Scope, ApiError> {
    let Query(query) = query?;
    Ok(if query.mine() {
        Scope::OwnedBy(user.id)
    } else {
        Scope::All
    })
}
