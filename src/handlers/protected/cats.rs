// /api/cats - plain generic CRUD

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;

use super::{count_scope, page_request, PageParams};
use crate::access::{cat_owner, CheckPermission, Permission, SetCreator};
use crate::controllers::{Count, Delete, Insert, Load, Paginate, Show, Update};
use crate::database::models::Cat;
use crate::error::ApiError;
use crate::middleware::ValidatedUser;
use crate::pipeline::{Pipeline, RequestContext};
use crate::state::AppState;

static LIST: Lazy<Pipeline> = Lazy::new(|| Pipeline::new("GET /cats").stage(Paginate::<Cat>::new()));

static COUNT: Lazy<Pipeline> = Lazy::new(|| Pipeline::new("GET /cats/count").stage(Count::<Cat>::new()));

static CREATE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("POST /cats")
        .stage(SetCreator)
        .stage(Insert::<Cat>::new())
        .stage(Show::<Cat>::new())
});

static SHOW: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("GET /cats/:catId")
        .stage(Load::<Cat>::new())
        .stage(Show::<Cat>::new())
});

static UPDATE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("PUT /cats/:catId")
        .stage(Load::<Cat>::new())
        .stage(CheckPermission(Permission::is_owner(cat_owner)))
        .stage(Update::<Cat>::new())
        .stage(Show::<Cat>::new())
});

static DELETE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::new("DELETE /cats/:catId")
        .stage(Load::<Cat>::new())
        .stage(CheckPermission(Permission::is_admin_or_owner(cat_owner)))
        .stage(Delete::<Cat>::new())
});

pub async fn cats_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    query: PageParams,
) -> Result<Response, ApiError> {
    let page = page_request(query)?;
    Ok(LIST.run(&state, RequestContext::new(user).with_page(page)).await)
}

pub async fn cats_count(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    query: PageParams,
) -> Result<Response, ApiError> {
    let scope = count_scope(query, &user)?;
    Ok(COUNT.run(&state, RequestContext::new(user).with_scope(scope)).await)
}

pub async fn cats_post(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    body: Bytes,
) -> Response {
    match RequestContext::new(user).with_body(&body) {
        Ok(ctx) => CREATE.run(&state, ctx).await,
        Err(e) => e.into_response(),
    }
}

pub async fn cat_get(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(cat_id): Path<String>,
) -> Response {
    SHOW.run(&state, RequestContext::new(user).with_cat_id(cat_id)).await
}

pub async fn cat_put(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(cat_id): Path<String>,
    body: Bytes,
) -> Response {
    match RequestContext::new(user).with_cat_id(cat_id).with_body(&body) {
        Ok(ctx) => UPDATE.run(&state, ctx).await,
        Err(e) => e.into_response(),
    }
}

pub async fn cat_delete(
    State(state): State<AppState>,
    Extension(user): Extension<ValidatedUser>,
    Path(cat_id): Path<String>,
) -> Response {
    DELETE.run(&state, RequestContext::new(user).with_cat_id(cat_id)).await
}
