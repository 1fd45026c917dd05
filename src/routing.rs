//! Application router configuration with public and token protected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::{
    AppState,
    auth::{log_in, require_token, sign_up},
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        list_categories_api,
    },
    endpoints,
    expense::{
        bulk_delete_expenses_api, bulk_delete_expenses_endpoint, create_expense_api,
        create_expense_endpoint, delete_expense_api, delete_expense_endpoint,
        edit_expense_endpoint, get_delete_expense_page, get_edit_expense_page,
        get_expenses_page, get_new_expense_page, list_expenses_api, update_expense_api,
    },
    not_found::get_404_not_found,
    summary::{get_summary_api, get_summary_page},
};

/// Return a router with all the app's routes.
///
/// The HTML pages, signup, login and the category list are public. The expense and summary
/// API routes require an `Authorization: Bearer <token>` header.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route(endpoints::EXPENSES_VIEW, get(get_expenses_page))
        .route(
            endpoints::NEW_EXPENSE_VIEW,
            get(get_new_expense_page).post(create_expense_endpoint),
        )
        .route(
            endpoints::EDIT_EXPENSE_VIEW,
            get(get_edit_expense_page).post(edit_expense_endpoint),
        )
        .route(
            endpoints::DELETE_EXPENSE_VIEW,
            get(get_delete_expense_page).post(delete_expense_endpoint),
        )
        .route(
            endpoints::BULK_DELETE_EXPENSES,
            post(bulk_delete_expenses_endpoint),
        )
        .route(endpoints::SUMMARY_VIEW, get(get_summary_page))
        .route(
            endpoints::CATEGORIES_VIEW,
            get(get_categories_page).post(create_category_endpoint),
        )
        .route(endpoints::DELETE_CATEGORY, post(delete_category_endpoint))
        .route(endpoints::SIGN_UP_API, post(sign_up))
        .route(endpoints::LOG_IN_API, post(log_in))
        .route(endpoints::CATEGORIES_API, get(list_categories_api));

    let protected_routes = Router::new()
        .route(
            endpoints::EXPENSES_API,
            get(list_expenses_api).post(create_expense_api),
        )
        .route(
            endpoints::EXPENSE_API,
            put(update_expense_api).delete(delete_expense_api),
        )
        .route(
            endpoints::BULK_DELETE_EXPENSES_API,
            post(bulk_delete_expenses_api),
        )
        .route(endpoints::SUMMARY_API, get(get_summary_api))
        .layer(middleware::from_fn_with_state(state.clone(), require_token));

    protected_routes
        .merge(public_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, endpoints};

    use super::build_router;

    fn get_test_server() -> TestServer {
        let mut state = AppState::new(Connection::open_in_memory().unwrap(), "Etc/UTC").unwrap();
        state.password_hash_cost = 4;
        let app = build_router(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    async fn sign_up(server: &TestServer, email: &str) -> String {
        let response = server
            .post(endpoints::SIGN_UP_API)
            .json(&json!({ "email": email, "password": "hunter2" }))
            .await;
        response.assert_status(StatusCode::CREATED);

        response.json::<Value>()["token"]
            .as_str()
            .expect("token missing from signup response")
            .to_owned()
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = get_test_server();

        server.get("/does/not/exist").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn expense_api_requires_token() {
        let server = get_test_server();

        let response = server.get(endpoints::EXPENSES_API).await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "Invalid token" }));

        server
            .get(endpoints::SUMMARY_API)
            .authorization_bearer("not-a-real-token")
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn signup_then_log_in_gives_same_token() {
        let server = get_test_server();
        let token = sign_up(&server, "foo@bar.baz").await;

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({ "email": "foo@bar.baz", "password": "hunter2" }))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["token"], json!(token));
    }

    #[tokio::test]
    async fn create_list_and_summarize_with_token() {
        let server = get_test_server();
        let token = sign_up(&server, "foo@bar.baz").await;

        for (date, category, amount) in [
            ("2023-01-01", "Food", json!("10.00")),
            ("2023-02-01", "Travel", json!(20)),
        ] {
            server
                .post(endpoints::EXPENSES_API)
                .authorization_bearer(&token)
                .json(&json!({
                    "date": date,
                    "category": category,
                    "description": "Something",
                    "amount": amount,
                    "payment_method": "Cash",
                }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let expenses = server
            .get(endpoints::EXPENSES_API)
            .authorization_bearer(&token)
            .await
            .json::<Vec<Value>>();
        assert_eq!(expenses.len(), 2);
        assert_eq!(expenses[0]["date"], json!("2023-02-01"));

        let summary = server
            .get(endpoints::SUMMARY_API)
            .add_query_param("start_date", "2023-01-15")
            .add_query_param("end_date", "2023-12-31")
            .authorization_bearer(&token)
            .await
            .json::<Value>();
        assert_eq!(summary["overall"], json!("20.00"));

        let categories = server.get(endpoints::CATEGORIES_API).await.json::<Vec<Value>>();
        assert_eq!(categories.len(), 2);
    }

    #[tokio::test]
    async fn malformed_auth_bodies_are_bad_requests() {
        let server = get_test_server();

        let response = server
            .post(endpoints::SIGN_UP_API)
            .json(&json!({ "email": 5, "password": "x" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "Email and password required" }));

        let response = server.post(endpoints::LOG_IN_API).text("not json").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "Invalid credentials" }));
    }

    #[tokio::test]
    async fn malformed_expense_bodies_are_bad_requests() {
        let server = get_test_server();
        let token = sign_up(&server, "foo@bar.baz").await;

        let wrong_type = server
            .post(endpoints::EXPENSES_API)
            .authorization_bearer(&token)
            .json(&json!({ "date": 5, "category": "Food", "amount": "1.00" }))
            .await;
        let not_json = server
            .post(endpoints::BULK_DELETE_EXPENSES_API)
            .authorization_bearer(&token)
            .text("ids=1")
            .await;

        for response in [wrong_type, not_json] {
            response.assert_status(StatusCode::BAD_REQUEST);
            let error = response.json::<Value>()["error"]
                .as_str()
                .unwrap_or_default()
                .to_owned();
            assert!(error.starts_with("Invalid request body"), "got {error:?}");
        }
    }

    #[tokio::test]
    async fn delete_unknown_expense_is_not_found() {
        let server = get_test_server();
        let token = sign_up(&server, "foo@bar.baz").await;

        server
            .delete("/api/expenses/42")
            .authorization_bearer(&token)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn html_pages_are_public() {
        let server = get_test_server();

        for endpoint in [
            endpoints::EXPENSES_VIEW,
            endpoints::NEW_EXPENSE_VIEW,
            endpoints::SUMMARY_VIEW,
            endpoints::CATEGORIES_VIEW,
        ] {
            server.get(endpoint).await.assert_status_ok();
        }
    }

    #[tokio::test]
    async fn expenses_page_tolerates_malformed_query() {
        let server = get_test_server();

        server
            .get(endpoints::EXPENSES_VIEW)
            .add_query_param("deleted", "abc")
            .add_query_param("category", "xyz")
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn category_form_redirects_to_categories_page() {
        let server = get_test_server();

        let response = server
            .post(endpoints::CATEGORIES_VIEW)
            .form(&[("name", "Food")])
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::CATEGORIES_VIEW);
        assert!(server.get(endpoints::CATEGORIES_VIEW).await.text().contains("Food"));
    }
}
