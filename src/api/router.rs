//! HTTP router. All routes are nested under `/api`.
//!
//! Two route groups: the protected group sits behind the bearer token
//! middleware, the unprotected group carries only login and the health
//! check. `Extension<ApiContext>` is the outermost layer so middleware
//! can reach the context; handlers get it through `State`.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::Config;

pub fn api_router(config: Config) -> Router {
    build_router(ApiContext::new(config))
}

#[cfg(test)]
pub(crate) fn api_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/staff", get(endpoints::staff::list).post(endpoints::staff::create))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::delete),
        )
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route(
            "/appointments/:id",
            get(endpoints::appointments::detail).put(endpoints::appointments::update),
        )
        .route(
            "/appointments/stats/weekly",
            get(endpoints::appointments::weekly_stats),
        )
        .route("/diagnoses", post(endpoints::clinical::create_diagnosis))
        .route("/diagnoses/:id", get(endpoints::clinical::diagnosis_detail))
        .route("/test-requests", get(endpoints::clinical::list_test_requests))
        .route(
            "/test-requests/:id/status",
            put(endpoints::clinical::update_test_request),
        )
        .route("/test-requests/result", post(endpoints::clinical::record_result))
        .route("/lab/stats", get(endpoints::clinical::lab_stats))
        .route(
            "/prescriptions",
            get(endpoints::pharmacy::list_prescriptions)
                .post(endpoints::pharmacy::create_prescription),
        )
        .route(
            "/prescriptions/:id",
            get(endpoints::pharmacy::prescription_detail),
        )
        .route("/pharmacy/dispense", post(endpoints::pharmacy::dispense))
        .route(
            "/pharmacy/dispense/:id/pickup",
            put(endpoints::pharmacy::mark_picked_up),
        )
        .route(
            "/pharmacy/inventory",
            get(endpoints::pharmacy::list_inventory).post(endpoints::pharmacy::create_inventory),
        )
        .route(
            "/pharmacy/inventory/low-stock",
            get(endpoints::pharmacy::low_stock),
        )
        .route(
            "/pharmacy/inventory/:id",
            put(endpoints::pharmacy::update_inventory)
                .delete(endpoints::pharmacy::delete_inventory),
        )
        .route(
            "/billing/invoices",
            get(endpoints::billing::list_invoices).post(endpoints::billing::generate_invoice),
        )
        .route("/billing/invoices/:id", get(endpoints::billing::invoice_detail))
        .route(
            "/billing/payments",
            get(endpoints::billing::list_payments).post(endpoints::billing::process_payment),
        )
        .route(
            "/billing/payments/stats",
            get(endpoints::billing::payment_stats),
        )
        .route(
            "/billing/payments/:id/refund",
            post(endpoints::billing::refund_payment),
        )
        .route("/billing/revenue", get(endpoints::billing::revenue_by_month))
        .route(
            "/referrals",
            get(endpoints::referrals::list).post(endpoints::referrals::create),
        )
        .route("/referrals/:id", get(endpoints::referrals::detail))
        .route(
            "/referrals/:id/status",
            put(endpoints::referrals::update_status),
        )
        .route("/reports/registrations", get(endpoints::reports::registrations))
        .route(
            "/reports/test-distribution",
            get(endpoints::reports::test_distribution),
        )
        .route("/print/receipt/:id", get(endpoints::print::receipt))
        .route("/print/prescription/:id", get(endpoints::print::prescription))
        .route("/print/lab-report/:id", get(endpoints::print::lab_report))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/auth/login", post(endpoints::auth::login))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone())
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::auth;
    use crate::db;
    use crate::models::enums::StaffRole;
    use crate::testutil::{seed_staff, NOW};

    fn test_context() -> (ApiContext, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database_path = tmp.path().join("matibabu.db");
        // Run migrations once up front
        db::open_database(&config.database_path).unwrap();
        (ApiContext::new(config), tmp)
    }

    /// Insert a staff row and an already-open session, skipping the
    /// PBKDF2 login path.
    fn seed_session(ctx: &ApiContext, role: StaffRole) -> String {
        let conn = db::open_database(&ctx.db_path).unwrap();
        let staff_id = seed_staff(&conn, role);
        let token = auth::generate_token();
        db::insert_session(&conn, &auth::hash_token(&token), &staff_id, &NOW).unwrap();
        token
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn json_request(
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 65536).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let (ctx, _tmp) = test_context();
        let app = api_router_with_ctx(ctx);

        let response = app.oneshot(request("GET", "/api/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(!json["version"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn patients_require_auth() {
        let (ctx, _tmp) = test_context();
        let app = api_router_with_ctx(ctx);

        let response = app.oneshot(request("GET", "/api/patients", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn invalid_token_returns_401() {
        let (ctx, _tmp) = test_context();
        let app = api_router_with_ctx(ctx);

        let response = app
            .oneshot(request("GET", "/api/patients", Some("not-a-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (ctx, _tmp) = test_context();
        let app = api_router_with_ctx(ctx);

        let response = app
            .oneshot(request("GET", "/api/nonexistent", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn login_issues_usable_token() {
        let (ctx, _tmp) = test_context();

        {
            let conn = db::open_database(&ctx.db_path).unwrap();
            auth::create_staff(
                &conn,
                &auth::NewStaff {
                    name: "Nakato".into(),
                    email: "nakato@matibabu.example".into(),
                    password: "correct-horse".into(),
                    role: StaffRole::Receptionist,
                },
            )
            .unwrap();
        }

        let app = api_router_with_ctx(ctx.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                serde_json::json!({
                    "email": "nakato@matibabu.example",
                    "password": "correct-horse"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        let token = json["token"].as_str().unwrap().to_string();
        assert!(!token.is_empty());
        assert_eq!(json["staff"]["role"], "receptionist");

        let app2 = api_router_with_ctx(ctx);
        let response2 = app2
            .oneshot(request("GET", "/api/patients", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response2.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_password_returns_401() {
        let (ctx, _tmp) = test_context();

        {
            let conn = db::open_database(&ctx.db_path).unwrap();
            auth::create_staff(
                &conn,
                &auth::NewStaff {
                    name: "Nakato".into(),
                    email: "nakato@matibabu.example".into(),
                    password: "correct-horse".into(),
                    role: StaffRole::Receptionist,
                },
            )
            .unwrap();
        }

        let app = api_router_with_ctx(ctx);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                serde_json::json!({
                    "email": "nakato@matibabu.example",
                    "password": "wrong"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_invalidates_token() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::Receptionist);

        let app = api_router_with_ctx(ctx.clone());
        let response = app
            .oneshot(request("POST", "/api/auth/logout", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let app2 = api_router_with_ctx(ctx);
        let response2 = app2
            .oneshot(request("GET", "/api/patients", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response2.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn patient_create_rejected_for_wrong_role() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::LabTechnician);

        let app = api_router_with_ctx(ctx);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/patients",
                Some(&token),
                serde_json::json!({
                    "first_name": "Amina",
                    "last_name": "Ssempa",
                    "phone": "+256 701 111 222"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn patient_crud_over_http() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::Receptionist);

        // Create
        let app = api_router_with_ctx(ctx.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/patients",
                Some(&token),
                serde_json::json!({
                    "first_name": "Amina",
                    "last_name": "Ssempa",
                    "phone": "+256 701 111 222",
                    "gender": "female"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = response_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();

        // Read back the aggregate
        let app2 = api_router_with_ctx(ctx.clone());
        let response2 = app2
            .oneshot(request("GET", &format!("/api/patients/{id}"), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response2.status(), StatusCode::OK);
        let detail = response_json(response2).await;
        assert_eq!(detail["first_name"], "Amina");
        assert!(detail["appointments"].is_array());

        // Update
        let app3 = api_router_with_ctx(ctx.clone());
        let response3 = app3
            .oneshot(json_request(
                "PUT",
                &format!("/api/patients/{id}"),
                Some(&token),
                serde_json::json!({ "phone": "+256 702 333 444" }),
            ))
            .await
            .unwrap();
        assert_eq!(response3.status(), StatusCode::OK);
        let updated = response_json(response3).await;
        assert_eq!(updated["phone"], "+256 702 333 444");

        // Delete, then the detail fetch 404s
        let app4 = api_router_with_ctx(ctx.clone());
        let response4 = app4
            .oneshot(request("DELETE", &format!("/api/patients/{id}"), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response4.status(), StatusCode::OK);

        let app5 = api_router_with_ctx(ctx);
        let response5 = app5
            .oneshot(request("GET", &format!("/api/patients/{id}"), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response5.status(), StatusCode::NOT_FOUND);
        let json = response_json(response5).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn appointment_bad_status_query_rejected() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::Receptionist);

        let app = api_router_with_ctx(ctx);
        let response = app
            .oneshot(request(
                "GET",
                "/api/appointments?status=bogus",
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn weekly_stats_always_seven_days() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::Receptionist);

        let app = api_router_with_ctx(ctx);
        let response = app
            .oneshot(request("GET", "/api/appointments/stats/weekly", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn staff_creation_is_admin_only() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::Doctor);

        let app = api_router_with_ctx(ctx);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/staff",
                Some(&token),
                serde_json::json!({
                    "name": "New Nurse",
                    "email": "nurse@matibabu.example",
                    "password": "long-enough-pass",
                    "role": "nurse"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_creates_staff_over_http() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::Admin);

        let app = api_router_with_ctx(ctx.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/staff",
                Some(&token),
                serde_json::json!({
                    "name": "New Nurse",
                    "email": "nurse@matibabu.example",
                    "password": "long-enough-pass",
                    "role": "nurse"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["role"], "nurse");

        let app2 = api_router_with_ctx(ctx);
        let response2 = app2
            .oneshot(request("GET", "/api/staff?role=nurse", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response2.status(), StatusCode::OK);
        let list = response_json(response2).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lab_stats_response_shape() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::LabTechnician);

        let app = api_router_with_ctx(ctx);
        let response = app
            .oneshot(request("GET", "/api/lab/stats", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert!(json["by_type"].is_array());
        assert!(json["by_status"].is_array());
        assert_eq!(json["pending"], 0);
    }

    #[tokio::test]
    async fn payment_stats_response_shape() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::Cashier);

        let app = api_router_with_ctx(ctx);
        let response = app
            .oneshot(request("GET", "/api/billing/payments/stats", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["total_revenue"], 0);
        assert!(json["by_method"].is_array());
    }

    #[tokio::test]
    async fn revenue_report_has_twelve_months() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::Admin);

        let app = api_router_with_ctx(ctx);
        let response = app
            .oneshot(request("GET", "/api/billing/revenue?year=2026", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn registrations_report_has_twelve_months() {
        let (ctx, _tmp) = test_context();
        let token = seed_session(&ctx, StaffRole::Admin);

        let app = api_router_with_ctx(ctx);
        let response = app
            .oneshot(request(
                "GET",
                "/api/reports/registrations?year=2026",
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 12);
    }
}
