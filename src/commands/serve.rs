use std::net::SocketAddr;

use anyhow::bail;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AuthUser;
use crate::config::Config;
use crate::controllers::pastie as controller;
use crate::db::Database;
use crate::error::ApiError;
use crate::types::api::{
    DeletedResponse, EditPastie, PastieListResponse, PastieResponse, PublicPastie,
};
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    if !app.database.connected().await {
        bail!("database is not reachable");
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], app.config.port));
    let count = app.database.count().await?;
    info!(
        "serving {count} pasties to {users} users on {addr}",
        users = app.users.len()
    );

    axum::Server::bind(&addr)
        .serve(router(app).into_make_service())
        .await?;

    Ok(())
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/pasties", get(list_pasties))
        .route("/pastie", post(create_pastie))
        .route(
            "/pastie/:id",
            get(get_pastie).put(update_pastie).delete(delete_pastie),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            app.config.limits.max_content_size,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn index(State(config): State<Config>) -> String {
    format!(
        "pasties API server v{version} on port {port}",
        version = env!("CARGO_PKG_VERSION"),
        port = config.port
    )
}

/// Ids that don't parse as integers can't name a pastie.
fn pastie_id(path: Result<Path<i64>, PathRejection>) -> crate::ApiResult<i64> {
    path.map(|Path(id)| id).map_err(|_| ApiError::NotFound)
}

async fn list_pasties(
    _user: AuthUser,
    State(config): State<Config>,
    State(db): State<Database>,
) -> crate::ApiResult<Json<PastieListResponse>> {
    let pasties = controller::list(&db)
        .await?
        .into_iter()
        .map(|pastie| PublicPastie::new(pastie, &config.base_url))
        .collect();
    Ok(Json(PastieListResponse { pasties }))
}

async fn get_pastie(
    _user: AuthUser,
    State(config): State<Config>,
    State(db): State<Database>,
    path: Result<Path<i64>, PathRejection>,
) -> crate::ApiResult<Json<PastieResponse>> {
    let pastie = controller::fetch(&db, pastie_id(path)?).await?;
    Ok(Json(PastieResponse {
        pastie: PublicPastie::new(pastie, &config.base_url),
    }))
}

async fn create_pastie(
    AuthUser(user): AuthUser,
    State(config): State<Config>,
    State(db): State<Database>,
    body: Result<Json<EditPastie>, JsonRejection>,
) -> crate::ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    let pastie = controller::create(&db, &user, body.content).await?;
    Ok((
        StatusCode::CREATED,
        Json(PastieResponse {
            pastie: PublicPastie::new(pastie, &config.base_url),
        }),
    ))
}

async fn update_pastie(
    AuthUser(user): AuthUser,
    State(config): State<Config>,
    State(db): State<Database>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<EditPastie>, JsonRejection>,
) -> crate::ApiResult<Json<PastieResponse>> {
    let id = pastie_id(path)?;
    if !db.exists(id).await? {
        return Err(ApiError::NotFound);
    }
    let Json(body) = body?;
    let pastie = controller::update(&db, &user, id, body.content).await?;
    Ok(Json(PastieResponse {
        pastie: PublicPastie::new(pastie, &config.base_url),
    }))
}

async fn delete_pastie(
    AuthUser(user): AuthUser,
    State(db): State<Database>,
    path: Result<Path<i64>, PathRejection>,
) -> crate::ApiResult<Json<DeletedResponse>> {
    controller::delete(&db, &user, pastie_id(path)?).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::headers::{Authorization, HeaderMapExt};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::config;
    use crate::db::tests::test_database;
    use crate::users::Users;

    const BASE_URL: &str = "http://pasties.test";

    async fn test_router() -> (Router, TempDir) {
        let (database, dir) = test_database().await;
        let config = Config {
            base_url: BASE_URL.to_owned(),
            port: 5000,
            database: config::Database {
                url: String::new(),
                max_connections: None,
                acquire_timeout_secs: None,
            },
            users_file: dir.path().join("users.toml"),
            limits: Default::default(),
        };
        let users = [("alice".to_owned(), "s3cret".to_owned())]
            .into_iter()
            .collect::<Users>();
        let app = App {
            config,
            database,
            users,
        };
        (router(app), dir)
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        builder.body(body).unwrap()
    }

    fn authed(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let mut request = request(method, uri, body);
        request
            .headers_mut()
            .typed_insert(Authorization::basic("alice", "s3cret"));
        request
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn index_needs_no_credentials() {
        let (router, _dir) = test_router().await;
        let response = router
            .oneshot(request(Method::GET, "/", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("pasties API server v"));
        assert!(text.ends_with("on port 5000"));
    }

    #[tokio::test]
    async fn pastie_lifecycle() {
        let (router, _dir) = test_router().await;

        let (status, body) = send(
            &router,
            authed(Method::POST, "/pastie", Some(json!({ "content": "hello" }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["pastie"]["content"], "hello");
        let id = body["pastie"]["id"].as_i64().unwrap();
        assert_eq!(body["pastie"]["url"], format!("{BASE_URL}/pastie/{id}"));
        assert!(body["pastie"].get("uid").is_none());

        let uri = format!("/pastie/{id}");
        let (status, body) = send(&router, authed(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pastie"]["content"], "hello");

        let (status, body) = send(
            &router,
            authed(Method::PUT, &uri, Some(json!({ "content": "goodbye" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pastie"]["content"], "goodbye");
        assert_eq!(body["pastie"]["id"], id);

        let (status, body) = send(&router, authed(Method::GET, "/pasties", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pasties"].as_array().unwrap().len(), 1);

        let (status, body) = send(&router, authed(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "deleted": true }));

        let (status, body) = send(&router, authed(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");

        let (status, _) = send(&router, authed(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let (router, _dir) = test_router().await;
        for content in ["a", "b", "c"] {
            let (status, _) = send(
                &router,
                authed(Method::POST, "/pastie", Some(json!({ "content": content }))),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = send(&router, authed(Method::GET, "/pasties", None)).await;
        let contents: Vec<_> = body["pasties"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["content"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(contents, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn rejects_bad_credentials() {
        let (router, _dir) = test_router().await;

        let (status, body) = send(&router, request(Method::GET, "/pasties", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");

        let mut wrong_token = request(Method::GET, "/pasties", None);
        wrong_token
            .headers_mut()
            .typed_insert(Authorization::basic("alice", "guess"));
        let (status, wrong_token_body) = send(&router, wrong_token).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut unknown_user = request(Method::GET, "/pasties", None);
        unknown_user
            .headers_mut()
            .typed_insert(Authorization::basic("mallory", "s3cret"));
        let (status, unknown_user_body) = send(&router, unknown_user).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_token_body, unknown_user_body);

        let (status, _) = send(
            &router,
            request(Method::POST, "/pastie", Some(json!({ "content": "sneaky" }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_invalid_bodies() {
        let (router, _dir) = test_router().await;

        let (status, _) = send(
            &router,
            authed(Method::POST, "/pastie", Some(json!({ "text": "hello" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&router, authed(Method::POST, "/pastie", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &router,
            authed(Method::POST, "/pastie", Some(json!({ "content": 5 }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, created) = send(
            &router,
            authed(Method::POST, "/pastie", Some(json!({ "content": "keep" }))),
        )
        .await;
        let uri = format!("/pastie/{}", created["pastie"]["id"]);

        let (status, _) = send(&router, authed(Method::PUT, &uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&router, authed(Method::GET, &uri, None)).await;
        assert_eq!(body["pastie"]["content"], "keep");
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (router, _dir) = test_router().await;

        let (status, _) = send(&router, authed(Method::GET, "/pastie/99", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &router,
            authed(Method::PUT, "/pastie/99", Some(json!({ "content": "x" }))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, authed(Method::GET, "/pastie/abc", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn put_to_unknown_id_is_not_found_before_body_check() {
        let (router, _dir) = test_router().await;

        let (status, _) = send(&router, authed(Method::PUT, "/pastie/99", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &router,
            authed(Method::PUT, "/pastie/99", Some(json!({ "text": "x" }))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
