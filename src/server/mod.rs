//! The HTTP API. Every route except `/` and `/auth/login` requires a bearer token obtained from
//! `/auth/login`.

mod bearer;
mod response;
mod routes;
mod state;

use crate::error::Res;
use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use state::AppState;

/// Builds the router. `origins` are the front-end origins allowed by CORS.
pub fn router(state: Arc<AppState>, origins: &[String]) -> Res<Router> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{o}'")))
        .collect::<Res<Vec<_>>>()?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Ok(Router::new()
        .route("/", get(routes::health))
        .route("/auth/login", post(routes::login))
        .route("/auth/me", get(routes::me))
        .route("/projects", get(routes::list_projects).post(routes::create_project))
        .route("/projects/{name}", put(routes::update_project).delete(routes::delete_project))
        .route("/cashout", post(routes::add_cashout).get(routes::list_cashout))
        .route("/cashout/summary", get(routes::cashout_summary))
        .route("/dashboard/overview", get(routes::dashboard))
        .route("/backup/spreadsheet", post(routes::backup))
        .route("/rekap", get(routes::rekap_rows).post(routes::rekap_append))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Serves `app` on `listener` until `shutdown` completes.
pub async fn run(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Res<()> {
    let address = listener.local_addr().context("Unable to read the bound address")?;
    info!("Server running on http://{address}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("The server stopped with an error")?;
    info!("Server shut down");
    Ok(())
}

/// Completes on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Unable to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use crate::dashboard::SystemClock;
    use crate::test::TestEnv;
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    struct Server {
        base: String,
        client: reqwest::Client,
        token: String,
    }

    impl Server {
        async fn start() -> Self {
            let env = TestEnv::new().await;
            let admin = env.admin().await;
            let state = AppState::new(
                env.config(),
                Arc::new(TestSheet::default()),
                admin.clone(),
                Arc::new(SystemClock),
            );
            let app = router(state, env.config().allowed_origins()).unwrap();
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            tokio::spawn(async move {
                // Keeps the temp home alive as long as the server runs.
                let _env = env;
                run(listener, app, std::future::pending()).await.unwrap();
            });

            let client = reqwest::Client::new();
            let reply: Value = client
                .post(format!("{base}/auth/login"))
                .json(&json!({"email": admin.email, "password": admin.password}))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            let token = reply["token"].as_str().unwrap().to_string();
            Self {
                base,
                client,
                token,
            }
        }

        async fn get(&self, path: &str) -> (StatusCode, Value) {
            let resp = self
                .client
                .get(format!("{}{path}", self.base))
                .bearer_auth(&self.token)
                .send()
                .await
                .unwrap();
            (resp.status(), resp.json().await.unwrap())
        }

        async fn send(
            &self,
            method: reqwest::Method,
            path: &str,
            body: Value,
        ) -> (StatusCode, Value) {
            let resp = self
                .client
                .request(method, format!("{}{path}", self.base))
                .bearer_auth(&self.token)
                .json(&body)
                .send()
                .await
                .unwrap();
            (resp.status(), resp.json().await.unwrap())
        }
    }

    #[tokio::test]
    async fn test_health_and_auth() {
        let server = Server::start().await;
        let text = reqwest::get(format!("{}/", server.base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(text.contains("running"));

        let resp = server
            .client
            .get(format!("{}/projects", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], json!(false));

        let resp = server
            .client
            .get(format!("{}/auth/me", server.base))
            .bearer_auth("not-a-token")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let (status, body) = server.get("/auth/me").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], json!("admin"));

        let (status, _) = server
            .send(
                reqwest::Method::POST,
                "/auth/login",
                json!({"email": "admin@konstruktor.com", "password": "wrong"}),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = server
            .send(reqwest::Method::POST, "/auth/login", json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cashout_end_to_end() {
        let server = Server::start().await;
        let (status, body) = server
            .send(
                reqwest::Method::POST,
                "/cashout",
                json!({
                    "projectSheet": "Renovasi Rumah Budi",
                    "date": "2025-12-01",
                    "pengeluaran": "Cat",
                    "metode": "cash",
                    "amount": "500000"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["rowIndex"], json!(9));
        assert_eq!(body["data"]["metode"], json!("cash"));
        assert_eq!(body["data"]["amount"], json!(500000.0));

        let (status, body) = server
            .get("/cashout?projectSheet=Renovasi%20Rumah%20Budi&month=2025-12")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], json!(1));
        assert_eq!(body["items"][0]["metode"], json!("cash"));
        assert_eq!(body["items"][0]["pengeluaran"], json!("Cat"));
        assert_eq!(body["items"][0]["sheetRow"], json!(9));

        let (status, body) = server
            .get("/cashout/summary?projectSheet=Renovasi%20Rumah%20Budi")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["byMonth"]["2025-12"], json!(500000.0));
        assert_eq!(body["byMonth"]["2025-11"], json!(2150000.0));
    }

    #[tokio::test]
    async fn test_cashout_errors() {
        let server = Server::start().await;
        let (status, body) = server
            .send(
                reqwest::Method::POST,
                "/cashout",
                json!({"projectSheet": "Kantor PT Maju", "date": "2025-10-30", "pengeluaran": "Lem", "amount": 1}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("full"));

        let (status, _) = server
            .send(
                reqwest::Method::POST,
                "/cashout",
                json!({"projectSheet": "Kantor PT Maju", "date": "kemarin", "pengeluaran": "Lem", "amount": 1}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = server.get("/cashout?projectSheet=Kantor%20PT%20Maju").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_projects() {
        let server = Server::start().await;
        let (status, body) = server.get("/projects").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["projects"].as_array().unwrap().len(), 3);

        let (status, _) = server
            .send(
                reqwest::Method::POST,
                "/projects",
                json!({"name": "Dapur Bu Sari", "client": "Bu Sari", "status": "Ongoing"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = server
            .send(reqwest::Method::POST, "/projects", json!({"name": "Dapur Bu Sari"}))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = server
            .send(
                reqwest::Method::PUT,
                "/projects/Dapur%20Bu%20Sari",
                json!({"progress": 55}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["project"]["progress"], json!(55.0));
        assert_eq!(body["project"]["client"], json!("Bu Sari"));

        let (status, _) = server
            .send(reqwest::Method::DELETE, "/projects/Dapur%20Bu%20Sari", json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = server
            .send(reqwest::Method::DELETE, "/projects/Dapur%20Bu%20Sari", json!({}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dashboard() {
        let server = Server::start().await;
        let (status, body) = server.get("/dashboard/overview").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scope"], json!("all"));
        assert_eq!(body["kpi"]["totalProjects"], json!(3));
        assert_eq!(body["kpi"]["expensesNote"], json!("Monitor carefully"));
        assert_eq!(body["charts"]["bar"]["labels"].as_array().unwrap().len(), 12);

        let (status, body) = server.get("/dashboard/overview?project=Nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["projects"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_backup_and_rekap() {
        let server = Server::start().await;
        // The test home has no backup folder.
        let (status, body) = server
            .send(reqwest::Method::POST, "/backup/spreadsheet", json!({"namePrefix": "x"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));

        let (status, body) = server.get("/rekap").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rowCount"], json!(3));

        let (status, body) = server
            .send(reqwest::Method::POST, "/rekap", json!({"row": ["2025-12-02", "Paku", "15000"]}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["appended"].as_array().unwrap().len(), 3);
        let (status, _) = server
            .send(reqwest::Method::POST, "/rekap", json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
