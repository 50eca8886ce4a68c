mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use travel_log_api::database::models::Role;

#[tokio::test]
async fn poi_location_is_validated() -> Result<()> {
    let Some(test) = common::db_app().await? else {
        return Ok(());
    };
    let token = common::token_for(&common::seed_user(&test.pool, Role::User).await?)?;

    let (status, body) = common::post(
        &test.router,
        "/api/pois",
        &token,
        json!({ "name": "Nowhere", "loc": { "coordinates": [200.0, 10.0] } }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "longitude 200 is out of range");

    let (status, created) = common::post(
        &test.router,
        "/api/pois",
        &token,
        json!({ "name": "Eiffel Tower", "loc": { "type": "Polygon", "coordinates": [2.2945, 48.8584] } }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["loc"], json!({ "type": "Point", "coordinates": [2.2945, 48.8584] }));
    Ok(())
}

#[tokio::test]
async fn deleting_poi_detaches_it_from_trips() -> Result<()> {
    let Some(test) = common::db_app().await? else {
        return Ok(());
    };
    let token = common::token_for(&common::seed_user(&test.pool, Role::User).await?)?;
    let (_, trip) = common::post(&test.router, "/api/trips", &token, json!({ "name": "Paris" })).await?;
    let trip_uri = format!("/api/trips/{}", trip["id"].as_str().unwrap());
    let (_, with_poi) = common::post(
        &test.router,
        &format!("{}/addPOI", trip_uri),
        &token,
        json!({ "name": "Louvre", "loc": { "coordinates": [2.3376, 48.8606] } }),
    )
    .await?;
    let poi_id = with_poi["pois"][0].as_str().unwrap().to_string();

    let (status, _) = common::delete(&test.router, &format!("/api/pois/{}", poi_id), &token).await?;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = common::get(&test.router, &trip_uri, &token).await?;
    assert_eq!(after["pois"], json!([]));
    Ok(())
}

#[tokio::test]
async fn cat_crud_respects_ownership() -> Result<()> {
    let Some(test) = common::db_app().await? else {
        return Ok(());
    };
    let owner = common::token_for(&common::seed_user(&test.pool, Role::User).await?)?;
    let stranger = common::token_for(&common::seed_user(&test.pool, Role::User).await?)?;

    let (status, cat) = common::post(&test.router, "/api/cats", &owner, json!({ "name": "Felix", "weight": 4.2 })).await?;
    assert_eq!(status, StatusCode::OK);
    let uri = format!("/api/cats/{}", cat["id"].as_str().unwrap());

    let (status, _) = common::put(&test.router, &uri, &stranger, json!({ "name": "Garfield" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = common::put(&test.router, &uri, &owner, json!({ "age": 5 })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Felix");
    assert_eq!(updated["age"], 5);

    let (status, _) = common::delete(&test.router, &uri, &stranger).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = common::delete(&test.router, &uri, &owner).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn non_object_body_is_400() -> Result<()> {
    let Some(test) = common::db_app().await? else {
        return Ok(());
    };
    let token = common::token_for(&common::seed_user(&test.pool, Role::User).await?)?;

    let (status, body) = common::post(&test.router, "/api/cats", &token, json!(["Felix"])).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "request body must be a JSON object");
    Ok(())
}
