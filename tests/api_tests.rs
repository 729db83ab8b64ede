use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use car_rental::{db, state::AppState};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

impl TestApp {
    async fn new() -> Self {
        let db = Arc::new(db::open_in_memory().await.unwrap());
        let state = AppState::new(db, 4 /* bcrypt minimum cost; bcrypt::MIN_COST is private */);
        state
            .accounts
            .ensure_admin("admin@example.com", "admin123", "Admin")
            .await
            .unwrap();

        Self {
            router: car_rental::app(state),
        }
    }

    async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Reply { status, cookie, body }
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": email, "password": password})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.cookie.expect("login sets a session cookie")
    }

    async fn signup(&self, email: &str, name: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({"email": email, "password": "secret123", "name": name})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        assert_eq!(reply.body["data"]["user"]["role"], "customer");
        reply.cookie.expect("signup sets a session cookie")
    }

    async fn create_vehicle(&self, admin: &str, name: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/vehicles",
                Some(admin),
                Some(json!({
                    "name": name,
                    "brand": "Toyota",
                    "category": "suv",
                    "pricePerDay": "1500",
                    "seats": "7",
                    "transmission": "manual",
                    "fuel": "Diesel",
                    "features": ["GPS", "Bluetooth"]
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.body["data"]["vehicle"]["id"].as_str().unwrap().to_string()
    }

    async fn vehicle_available(&self, id: &str) -> bool {
        let reply = self.send(Method::GET, &format!("/vehicles/{id}"), None, None).await;
        reply.body["data"]["vehicle"]["available"].as_bool().unwrap()
    }
}

#[tokio::test]
async fn booking_lifecycle_drives_vehicle_availability() {
    let app = TestApp::new().await;
    let admin = app.login("admin@example.com", "admin123").await;
    let vehicle_id = app.create_vehicle(&admin, "Innova").await;

    let customer = app.signup("jane@example.com", "Jane").await;
    let created = app
        .send(
            Method::POST,
            "/bookings",
            Some(&customer),
            Some(json!({
                "vehicleId": vehicle_id,
                "startDate": "2024-01-01",
                "endDate": "2024-01-04"
            })),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK, "{}", created.body);
    assert_eq!(created.body["data"]["message"], "Booking created successfully");

    let booking = &created.body["data"]["booking"];
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["totalDays"], 3);
    assert_eq!(booking["pricePerDay"], 1500.0);
    assert_eq!(booking["totalAmount"], 4500.0);
    assert_eq!(booking["customerName"], "Jane");
    assert_eq!(booking["vehicleName"], "Innova");
    assert!(booking["bookingNumber"].as_str().unwrap().starts_with("BK-"));
    let booking_id = booking["id"].as_str().unwrap().to_string();

    // pending does not hold the vehicle
    assert!(app.vehicle_available(&vehicle_id).await);

    let confirmed = app
        .send(
            Method::PUT,
            "/bookings",
            Some(&admin),
            Some(json!({"id": booking_id, "status": "confirmed"})),
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK, "{}", confirmed.body);
    assert_eq!(confirmed.body["data"]["booking"]["status"], "confirmed");
    assert!(!app.vehicle_available(&vehicle_id).await);

    let other = app.signup("john@example.com", "John").await;
    let refused = app
        .send(
            Method::POST,
            "/bookings",
            Some(&other),
            Some(json!({
                "vehicleId": vehicle_id,
                "startDate": "2024-02-01",
                "endDate": "2024-02-02"
            })),
        )
        .await;
    assert_eq!(refused.status, StatusCode::BAD_REQUEST);
    assert_eq!(refused.body["message"], "Vehicle is not available");

    let cancelled = app
        .send(
            Method::DELETE,
            &format!("/bookings?id={booking_id}"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(
        cancelled.body,
        json!({"success": true, "message": "Booking cancelled successfully"})
    );
    assert!(app.vehicle_available(&vehicle_id).await);

    let again = app
        .send(
            Method::DELETE,
            &format!("/bookings?id={booking_id}"),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["message"], "Booking is already cancelled");
}

#[tokio::test]
async fn vehicle_wire_shape() {
    let app = TestApp::new().await;
    let admin = app.login("admin@example.com", "admin123").await;
    let id = app.create_vehicle(&admin, "Fortuner").await;

    let reply = app.send(Method::GET, &format!("/vehicles/{id}"), None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
    assert_eq!(reply.body["message"], "Success");

    let vehicle = &reply.body["data"]["vehicle"];
    assert_eq!(vehicle["id"], id.as_str());
    assert_eq!(vehicle["pricePerDay"], 1500.0);
    assert_eq!(vehicle["seats"], 7);
    assert_eq!(vehicle["transmission"], "Manual");
    assert_eq!(vehicle["available"], true);
    assert_eq!(vehicle["image"], "/placeholder.svg");
    assert_eq!(vehicle["features"], json!(["GPS", "Bluetooth"]));
    assert_eq!(vehicle["description"], Value::Null);
    assert!(vehicle.get("price_per_day").is_none());
}

#[tokio::test]
async fn vehicle_list_filters_and_update() {
    let app = TestApp::new().await;
    let admin = app.login("admin@example.com", "admin123").await;
    let innova = app.create_vehicle(&admin, "Innova").await;
    app.create_vehicle(&admin, "Fortuner").await;

    let updated = app
        .send(
            Method::PUT,
            "/vehicles",
            Some(&admin),
            Some(json!({"id": innova, "available": "0", "pricePerDay": 1750.5})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["data"]["message"], "Vehicle updated successfully");
    assert_eq!(updated.body["data"]["vehicle"]["pricePerDay"], 1750.5);
    assert_eq!(updated.body["data"]["vehicle"]["available"], false);

    let all = app.send(Method::GET, "/vehicles", None, None).await;
    assert_eq!(all.body["data"]["count"], 2);
    // newest first
    assert_eq!(all.body["data"]["vehicles"][0]["name"], "Fortuner");

    let available = app.send(Method::GET, "/vehicles?available=true", None, None).await;
    assert_eq!(available.body["data"]["count"], 1);
    assert_eq!(available.body["data"]["vehicles"][0]["name"], "Fortuner");

    let search = app.send(Method::GET, "/vehicles?search=inno", None, None).await;
    assert_eq!(search.body["data"]["count"], 1);
    assert_eq!(search.body["data"]["vehicles"][0]["id"], innova.as_str());

    let empty = app
        .send(Method::PUT, "/vehicles", Some(&admin), Some(json!({"id": innova})))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.body["message"], "No fields to update");
}

#[tokio::test]
async fn vehicle_with_open_booking_cannot_be_deleted() {
    let app = TestApp::new().await;
    let admin = app.login("admin@example.com", "admin123").await;
    let vehicle_id = app.create_vehicle(&admin, "Innova").await;
    let customer = app.signup("jane@example.com", "Jane").await;

    app.send(
        Method::POST,
        "/bookings",
        Some(&customer),
        Some(json!({"vehicleId": vehicle_id, "startDate": "2024-01-01", "endDate": "2024-01-02"})),
    )
    .await;

    let refused = app
        .send(Method::DELETE, &format!("/vehicles?id={vehicle_id}"), Some(&admin), None)
        .await;
    assert_eq!(refused.status, StatusCode::CONFLICT);
    assert_eq!(refused.body["message"], "Cannot delete vehicle with active bookings");

    let missing_id = app.send(Method::DELETE, "/vehicles", Some(&admin), None).await;
    assert_eq!(missing_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_id.body["message"], "Vehicle ID is required");
}

#[tokio::test]
async fn access_rules() {
    let app = TestApp::new().await;
    let admin = app.login("admin@example.com", "admin123").await;
    let vehicle_id = app.create_vehicle(&admin, "Innova").await;

    let anonymous = app.send(Method::GET, "/bookings", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["success"], false);
    assert_eq!(anonymous.body["message"], "Unauthorized. Please login.");

    let anonymous_create = app
        .send(Method::POST, "/vehicles", None, Some(json!({"name": "x"})))
        .await;
    assert_eq!(anonymous_create.status, StatusCode::UNAUTHORIZED);

    let jane = app.signup("jane@example.com", "Jane").await;
    let forbidden = app
        .send(Method::POST, "/vehicles", Some(&jane), Some(json!({"name": "x"})))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["message"], "Unauthorized. Admin access required.");

    let booking = app
        .send(
            Method::POST,
            "/bookings",
            Some(&jane),
            Some(json!({"vehicleId": vehicle_id, "startDate": "2024-01-01", "endDate": "2024-01-03"})),
        )
        .await;
    let booking_id = booking.body["data"]["booking"]["id"].as_str().unwrap().to_string();

    let status_change = app
        .send(
            Method::PUT,
            "/bookings",
            Some(&jane),
            Some(json!({"id": booking_id, "status": "completed"})),
        )
        .await;
    assert_eq!(status_change.status, StatusCode::FORBIDDEN);

    let john = app.signup("john@example.com", "John").await;
    let peek = app
        .send(Method::GET, &format!("/bookings/{booking_id}"), Some(&john), None)
        .await;
    assert_eq!(peek.status, StatusCode::FORBIDDEN);

    let johns_list = app.send(Method::GET, "/bookings", Some(&john), None).await;
    assert_eq!(johns_list.body["data"]["count"], 0);

    let admin_list = app.send(Method::GET, "/bookings", Some(&admin), None).await;
    assert_eq!(admin_list.body["data"]["count"], 1);

    let own = app
        .send(Method::GET, &format!("/bookings/{booking_id}"), Some(&jane), None)
        .await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["data"]["booking"]["customerEmail"], "jane@example.com");
}

#[tokio::test]
async fn booking_input_errors() {
    let app = TestApp::new().await;
    let admin = app.login("admin@example.com", "admin123").await;
    let vehicle_id = app.create_vehicle(&admin, "Innova").await;
    let jane = app.signup("jane@example.com", "Jane").await;

    let same_day = app
        .send(
            Method::POST,
            "/bookings",
            Some(&jane),
            Some(json!({"vehicleId": vehicle_id, "startDate": "2024-01-01", "endDate": "2024-01-01"})),
        )
        .await;
    assert_eq!(same_day.status, StatusCode::BAD_REQUEST);
    assert_eq!(same_day.body["message"], "End date must be after start date");

    let missing = app
        .send(Method::POST, "/bookings", Some(&jane), Some(json!({"vehicleId": vehicle_id})))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "Field 'startDate' is required");

    let unknown_vehicle = app
        .send(
            Method::POST,
            "/bookings",
            Some(&jane),
            Some(json!({"vehicleId": 999, "startDate": "2024-01-01", "endDate": "2024-01-02"})),
        )
        .await;
    assert_eq!(unknown_vehicle.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown_vehicle.body["message"], "Vehicle not found");

    let bad_filter = app
        .send(Method::GET, "/bookings?status=lost", Some(&admin), None)
        .await;
    assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);

    let bad_status = app
        .send(Method::PUT, "/bookings", Some(&admin), Some(json!({"id": 1, "status": "lost"})))
        .await;
    assert_eq!(bad_status.status, StatusCode::BAD_REQUEST);
    assert!(
        bad_status.body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid status value. Must be one of:")
    );
}

#[tokio::test]
async fn session_lifecycle() {
    let app = TestApp::new().await;
    let jane = app.signup("jane@example.com", "Jane").await;

    let me = app.send(Method::GET, "/auth/me", Some(&jane), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["user"]["email"], "jane@example.com");
    assert!(me.body["data"]["user"].get("password_hash").is_none());

    let duplicate = app
        .send(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({"email": "jane@example.com", "password": "secret123", "name": "Jane"})),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["message"], "Email already exists");

    let wrong = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "jane@example.com", "password": "nope"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid email or password");

    let logout = app.send(Method::POST, "/auth/logout", Some(&jane), None).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["message"], "Logged out successfully");

    let after = app.send(Method::GET, "/auth/me", Some(&jane), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);

    let twice = app.send(Method::POST, "/auth/logout", Some(&jane), None).await;
    assert_eq!(twice.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn framing_errors_use_the_envelope() {
    let app = TestApp::new().await;

    let unknown = app.send(Method::GET, "/nowhere", None, None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["success"], false);

    let wrong_method = app.send(Method::PATCH, "/vehicles", None, None).await;
    assert_eq!(wrong_method.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(wrong_method.body["message"], "Method not allowed");

    let bad_path_id = app.send(Method::GET, "/vehicles/abc", None, None).await;
    assert_eq!(bad_path_id.status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Invalid JSON request body");

    let ready = app.send(Method::GET, "/readyz", None, None).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["status"], "ok");
}
