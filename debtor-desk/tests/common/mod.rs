use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use debtor_desk::config::{
    BackendSettings, ServerSettings, Settings, StagingSettings, TelemetrySettings,
};
use debtor_desk::startup::build_router;
use debtor_desk::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DEBTOR_ID: &str = "1042";
pub const BOUNDARY: &str = "debtor-desk-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub backend: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let backend = MockServer::start().await;

        let settings = Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            backend: BackendSettings {
                url: backend.uri(),
                request_timeout_secs: 5,
            },
            staging: StagingSettings::default(),
            telemetry: TelemetrySettings::default(),
        };

        let router = build_router(AppState::from_settings(&settings));
        Self { router, backend }
    }

    /// Serve the debtor with the given `(id, filename)` documents.
    pub async fn mount_debtor(&self, documents: &[(i64, &str)]) {
        let uploaded: Vec<Value> = documents
            .iter()
            .map(|(id, filename)| json!({ "id": id, "filename": filename }))
            .collect();

        Mock::given(method("GET"))
            .and(path(format!("/api/debtors/{}", DEBTOR_ID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": DEBTOR_ID,
                "full_name": "Петров Пётр Петрович",
                "lawyer": "urist1",
                "documents": { "uploaded": uploaded, "generated": [] }
            })))
            .mount(&self.backend)
            .await;
    }

    pub async fn open_view(&self) -> String {
        let (status, body) = self
            .send(Method::POST, "/api/views", Some(json!({ "debtor_id": DEBTOR_ID })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "open view failed: {}", body);
        body["view_id"]
            .as_str()
            .expect("view_id missing from snapshot")
            .to_string()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        json: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match json {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.call(request).await
    }

    /// POST `(name, bytes)` files as one multipart body under `files[]`.
    pub async fn upload(&self, view_id: &str, files: &[(&str, Vec<u8>)]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"files[]\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                    BOUNDARY, name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        self.upload_raw(view_id, body).await
    }

    /// POST `body` as-is with a multipart content type.
    pub async fn upload_raw(&self, view_id: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/views/{}/new-files", view_id))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.call(request).await
    }

    pub async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}
