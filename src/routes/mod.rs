pub mod devices;
pub mod health;
pub mod readings;

use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(readings::router())
                .merge(devices::router())
                .merge(crate::openapi::router()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::readings::Reading;
    use crate::store::ReadingStore;
    use crate::test_support::{test_now, test_state};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, minute, 0)
            .single()
            .expect("timestamp")
    }

    fn temperature(timestamp: DateTime<Utc>, value: f64) -> Reading {
        Reading {
            device_id: "field-7".to_string(),
            timestamp,
            soil_moisture: None,
            humidity: None,
            temperature: Some(value),
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn healthz_is_public() {
        let (state, _store) = test_state().await;
        let response = router(state).oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn hourly_profile_is_rotated_to_the_current_hour() {
        let (state, store) = test_state().await;
        for reading in [
            temperature(at(16, 10, 5), 20.0),
            temperature(at(16, 10, 40), 24.0),
            temperature(at(15, 15, 0), 30.0),
        ] {
            store.insert(&reading).await.unwrap();
        }

        let response = router(state)
            .oneshot(get(
                "/api/sensor-readings/hourly?device_id=field-7&field=temperature&range=day",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let slots = body.as_array().expect("slots");
        assert_eq!(slots.len(), 24);

        // now is 14:20, so the first slot is labelled 15.
        assert_eq!(slots[0]["time_range"], json!(15));
        assert_eq!(slots[9]["time_range"], json!(0));
        assert_eq!(
            slots[10],
            json!({ "time_range": 1, "value": 22.0, "samples": 2 })
        );
        assert_eq!(
            slots[15],
            json!({ "time_range": 6, "value": 30.0, "samples": 1 })
        );
        assert_eq!(slots[3]["value"], json!("no data"));
        assert_eq!(slots[3]["samples"], json!(0));
    }

    #[tokio::test]
    async fn hourly_profile_can_stay_in_clock_order() {
        let (state, store) = test_state().await;
        store
            .insert(&temperature(at(16, 10, 5), 20.0))
            .await
            .unwrap();

        let response = router(state)
            .oneshot(get(
                "/api/sensor-readings/hourly?deviceId=field-7&field=temperature&rotate=false",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["time_range"], json!(0));
        assert_eq!(
            body[10],
            json!({ "time_range": 10, "value": 20.0, "samples": 1 })
        );
    }

    #[tokio::test]
    async fn hourly_profile_rejects_unknown_field() {
        let (state, _store) = test_state().await;
        let response = router(state)
            .oneshot(get(
                "/api/sensor-readings/hourly?device_id=field-7&field=pressure",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn raw_range_honours_custom_bounds() {
        let (state, store) = test_state().await;
        for reading in [
            temperature(at(16, 9, 0), 18.0),
            temperature(at(16, 10, 0), 19.0),
            temperature(at(16, 11, 0), 21.0),
        ] {
            store.insert(&reading).await.unwrap();
        }

        let response = router(state)
            .oneshot(get(
                "/api/sensor-readings?device_id=field-7&start=2026-10-16%2009:30:00&end=2026-10-16T11:00:00Z",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let readings = body.as_array().expect("readings");
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0]["temperature"], json!(19.0));
    }

    #[tokio::test]
    async fn inverted_custom_bounds_are_bad_request() {
        let (state, _store) = test_state().await;
        let response = router(state)
            .oneshot(get(
                "/api/sensor-readings?device_id=field-7&start=2026-10-16T12:00:00Z&end=2026-10-16T11:00:00Z",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn padded_device_id_is_trimmed() {
        let (state, store) = test_state().await;
        store
            .insert(&temperature(at(16, 10, 0), 19.0))
            .await
            .unwrap();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(get("/api/sensor-readings?device_id=%20field-7%20&range=day"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));

        let response = app
            .oneshot(get(
                "/api/sensor-readings/hourly?device_id=%20field-7&field=temperature&range=day",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_device_is_not_found() {
        let (state, _store) = test_state().await;
        let response = router(state)
            .oneshot(get("/api/sensor-readings?device_id=ghost&range=week"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn latest_reading_is_returned_or_not_found() {
        let (state, store) = test_state().await;
        let app = router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/sensor-readings/latest",
                json!({ "device_id": "field-7" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        store
            .insert(&temperature(at(16, 9, 0), 18.0))
            .await
            .unwrap();
        store
            .insert(&temperature(at(16, 14, 0), 23.5))
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/api/sensor-readings/latest",
                json!({ "deviceId": "field-7" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["temperature"], json!(23.5));
    }

    #[tokio::test]
    async fn ingest_defaults_timestamp_to_clock() {
        let (state, store) = test_state().await;
        let response = router(state)
            .oneshot(post_json(
                "/api/sensor-readings",
                json!({ "device_id": "field-7", "soil_moisture": 41.5 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let latest = store.latest("field-7").await.unwrap().expect("stored");
        assert_eq!(latest.timestamp, test_now());
        assert_eq!(latest.soil_moisture, Some(41.5));
    }

    #[tokio::test]
    async fn ingest_rejects_empty_reading() {
        let (state, _store) = test_state().await;
        let response = router(state)
            .oneshot(post_json(
                "/api/sensor-readings",
                json!({ "device_id": "field-7" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ingest_rejects_out_of_range_values() {
        let (state, store) = test_state().await;
        let response = router(state)
            .oneshot(post_json(
                "/api/sensor-readings",
                json!({ "device_id": "field-7", "temperature": 1.7e307 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.latest("field-7").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn device_status_tracks_check_interval() {
        let (state, store) = test_state().await;
        let app = router(state);

        let response = app
            .clone()
            .oneshot(get("/api/devices/field-7/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], json!("Off"));
        assert_eq!(body["latest"], Value::Null);

        store
            .insert(&temperature(test_now() - Duration::minutes(4), 21.0))
            .await
            .unwrap();
        let response = app
            .clone()
            .oneshot(get("/api/devices/field-7/status"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["is_online"], json!(true));
        assert_eq!(body["status"], json!("On"));
        assert_eq!(body["name"], json!("North field"));

        let response = app
            .oneshot(get("/api/devices/ghost/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fleet_status_lists_registered_devices() {
        let (state, store) = test_state().await;
        store
            .insert(&temperature(test_now() - Duration::minutes(6), 21.0))
            .await
            .unwrap();

        let response = router(state)
            .oneshot(get("/api/devices/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let devices = body.as_array().expect("devices");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["device_id"], json!("field-7"));
        assert_eq!(devices[0]["status"], json!("Off"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (state, _store) = test_state().await;
        let response = router(state)
            .oneshot(get("/api/openapi.json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["paths"].is_object());
    }
}
