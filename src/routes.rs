use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::config;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};
use crate::state::AppState;

/// The full application router
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(public_api_routes())
        .merge(protected_routes(state.clone()));

    Router::new()
        // Public
        .route("/", get(public::service::root))
        .route("/health", get(public::service::health))
        .nest("/api", api)
        // Global middleware
        .layer(RequestBodyLimitLayer::new(config().api.max_request_size_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_api_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
}

/// Everything here runs JWT auth first, then re-validates the user
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(trip_routes())
        .merge(poi_routes())
        .merge(user_routes())
        .merge(cat_routes())
        // route_layer: last added runs first
        .route_layer(from_fn_with_state(state, validate_user_middleware))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn trip_routes() -> Router<AppState> {
    use protected::trips;

    Router::new()
        .route("/trips", get(trips::trips_get).post(trips::trips_post))
        .route("/trips/mine", get(trips::trips_mine))
        .route("/trips/count", get(trips::trips_count))
        .route("/trips/:tripId/addPOI", post(trips::trip_add_poi))
        .route(
            "/trips/:tripId",
            get(trips::trip_get).put(trips::trip_put).delete(trips::trip_delete),
        )
        .route("/trips/:tripId/:poiId", delete(trips::trip_remove_poi))
}

fn poi_routes() -> Router<AppState> {
    use protected::pois;

    Router::new()
        .route("/pois", get(pois::pois_get).post(pois::pois_post))
        .route("/pois/mine", get(pois::pois_mine))
        .route("/pois/count", get(pois::pois_count))
        .route(
            "/pois/:poiId",
            get(pois::poi_get).put(pois::poi_put).delete(pois::poi_delete),
        )
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/users", get(users::users_get))
        .route("/users/count", get(users::users_count))
        .route("/users/me", get(users::users_me))
        .route(
            "/users/:userId",
            get(users::user_get).put(users::user_put).delete(users::user_delete),
        )
}

fn cat_routes() -> Router<AppState> {
    use protected::cats;

    Router::new()
        .route("/cats", get(cats::cats_get).post(cats::cats_post))
        .route("/cats/count", get(cats::cats_count))
        .route(
            "/cats/:catId",
            get(cats::cat_get).put(cats::cat_put).delete(cats::cat_delete),
        )
}

fn cors_layer() -> CorsLayer {
    let security = &config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(origins)
}
