// /api/users (protected part; register and login are public)

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;

use super::{count_scope, page_request, PageParams};
use crate::access::{user_id, CheckPermission, Permission, ProtectRole};
use crate::controllers::user::HashPassword;
use crate::controllers::{Count, Delete, Load, Paginate, Show, Update};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::ValidatedUser;
use crate::pipeline::{Pipeline, RequestContext};
use crate::state::AppState;

static LIST: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("GET /users")
        .stage(CheckPermission(Permission::is_admin()))
        .stage(Paginate::<User>::new())
});

static COUNT: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("GET /users/count")
        .stage(CheckPermission(Permission::is_admin()))
        .stage(Count::<User>::new())
});

static ME: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("GET /users/me")
        .stage(Load::<User>::new())
        .stage(Show::<User>::new())
});

static SHOW: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("GET /users/:userId")
        .stage(Load::<User>::new())
        .stage(CheckPermission(Permission::is_admin_or_owner(user_id)))
        .stage(Show::<User>::new())
});

static UPDATE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("PUT /users/:userId")
        .stage(Load::<User>::new())
        .stage(CheckPermission(Permission::is_admin_or_owner(user_id)))
        .stage(ProtectRole)
        .stage(HashPassword { required: false })
        .stage(Update::<User>::new())
        .stage(Show::<User>::new())
});

static DELETE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("DELETE /users/:userId")
        .stage(Load::<User>::new())
        .stage(CheckPermission(Permission::is_admin_or_owner(user_id)))
        .stage(Delete::<User>::new())
});

pub async fn users_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    query: PageParams,
) -> Result<Response, ApiError> {
    let page = page_request(query)?;
    Ok(LIST.run(&state, RequestContext::new(user).with_page(page)).await)
}

pub async fn users_count(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    query: PageParams,
) -> Result<Response, ApiError> {
    let scope = count_scope(query, &user)?;
    Ok(COUNT.run(&state, RequestContext::new(user).with_scope(scope)).await)
}

pub async fn users_me(State(state): State<AppState>, Extension(user): Extension<ValidatedUser>) -> Response {
    let id = user.id.to_string();
    ME.run(&state, RequestContext::new(user).with_user_id(id)).await
}

pub async fn user_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(user_id): Path<String>,
) -> Response {
    SHOW.run(&state, RequestContext::new(user).with_user_id(user_id)).await
}

pub async fn user_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Response {
    match RequestContext::new(user).with_user_id(user_id).with_body(&body) {
        Ok(ctx) => UPDATE.run(&state, ctx).await,
        Err(e) => e.into_response(),
    }
}

pub async fn user_delete(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(user_id): Path<String>,
) -> Response {
    DELETE.run(&state, RequestContext::new(user).with_user_id(user_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_protected_before_update() {
        assert_eq!(
            UPDATE.stage_names(),
            ["load", "checkPermission", "protectRole", "hashPassword", "update", "show"]
        );
        assert_eq!(LIST.stage_names(), ["checkPermission", "paginate"]);
    }
}
