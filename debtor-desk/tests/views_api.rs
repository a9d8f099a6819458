mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, DEBTOR_ID};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn group<'a>(view: &'a Value, name: &str) -> Option<&'a Value> {
    view["categories"]
        .as_array()
        .and_then(|groups| groups.iter().find(|g| g["name"] == name))
}

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get_text("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn open_view_groups_documents() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[(1, "Паспорт.pdf"), (2, "Справка 2-НДФЛ.pdf"), (3, "scan.pdf")])
        .await;

    let (status, view) = app
        .send(Method::POST, "/api/views", Some(json!({ "debtor_id": DEBTOR_ID })))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(view["debtor_id"], DEBTOR_ID);
    assert_eq!(view["pending_count"], 0);
    assert_eq!(view["commit_label"], "Применить изменения");
    assert_eq!(group(&view, "Личные документы").unwrap()["entries"][0]["id"], 1);
    assert_eq!(group(&view, "Справки о доходах").unwrap()["entries"][0]["id"], 2);
    assert_eq!(group(&view, "Другие документы").unwrap()["entries"][0]["id"], 3);
}

#[tokio::test]
async fn unknown_debtor_is_not_found() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/api/debtors/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.backend)
        .await;

    let (status, _) = app
        .send(Method::POST, "/api/views", Some(json!({ "debtor_id": "missing" })))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn backend_outage_on_open_is_bad_gateway() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/debtors/{}", DEBTOR_ID)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.backend)
        .await;

    let (status, _) = app
        .send(Method::POST, "/api/views", Some(json!({ "debtor_id": DEBTOR_ID })))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn empty_debtor_id_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .send(Method::POST, "/api/views", Some(json!({ "debtor_id": "" })))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_view_is_not_found() {
    let app = TestApp::spawn().await;
    let missing = uuid::Uuid::new_v4();

    let (status, _) = app
        .send(Method::GET, &format!("/api/views/{}", missing), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::POST, &format!("/api/views/{}/commit", missing), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn staging_edits_updates_count_without_backend_calls() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[(1, "Паспорт.pdf"), (2, "Договор.pdf")]).await;
    let view_id = app.open_view().await;

    let (status, view) = app
        .send(
            Method::POST,
            &format!("/api/views/{}/documents/2/delete", view_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["pending_count"], 1);
    assert!(group(&view, "Другие документы").is_none());

    let (status, view) = app
        .send(
            Method::PUT,
            &format!("/api/views/{}/documents/1/rename", view_id),
            Some(json!({ "filename": "Паспорт РФ.pdf" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["pending_count"], 2);
    assert_eq!(view["commit_label"], "Применить (2)");
    let passport = &group(&view, "Личные документы").unwrap()["entries"][0];
    assert_eq!(passport["filename"], "Паспорт РФ.pdf");
    assert_eq!(passport["renamed"], true);

    // Only the debtor fetch reached the backend.
    assert_eq!(app.backend.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_rename_is_unprocessable() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[(1, "Паспорт.pdf")]).await;
    let view_id = app.open_view().await;

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/views/{}/documents/1/rename", view_id),
            Some(json!({ "filename": "   " })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_document_is_not_found() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[(1, "Паспорт.pdf")]).await;
    let view_id = app.open_view().await;

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/views/{}/documents/99/delete", view_id),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_are_filtered_and_cancellable() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[]).await;
    let view_id = app.open_view().await;

    let (status, body) = app
        .upload(
            &view_id,
            &[
                ("Выписка.pdf", b"%PDF-1.4".to_vec()),
                ("photo.jpg", vec![0xff, 0xd8]),
                ("Анкета.PDF", b"%PDF-1.7".to_vec()),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["accepted"], 2);
    assert_eq!(body["outcome"]["rejected"][0]["name"], "photo.jpg");
    assert_eq!(body["outcome"]["rejected"][0]["reason"], "extension");
    let new_files = group(&body["view"], "Новые файлы").unwrap();
    assert_eq!(new_files["expanded"], true);
    assert_eq!(new_files["entries"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/views/{}/new-files/0", view_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], "Выписка.pdf");
    assert_eq!(body["view"]["pending_count"], 1);

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/views/{}/new-files/7", view_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["cancelled"].is_null());
    assert_eq!(body["view"]["pending_count"], 1);
}

#[tokio::test]
async fn truncated_upload_is_bad_request() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[]).await;
    let view_id = app.open_view().await;
    let body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"files[]\"; filename=\"a.pdf\"\r\n\r\n%PDF",
        common::BOUNDARY
    );

    let (status, body) = app.upload_raw(&view_id, body.into_bytes()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, view) = app
        .send(Method::GET, &format!("/api/views/{}", view_id), None)
        .await;
    assert_eq!(view["pending_count"], 0);
}

#[tokio::test]
async fn delete_and_rename_of_one_document_both_reach_backend() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[(2, "Договор.pdf")]).await;
    Mock::given(method("DELETE"))
        .and(path("/api/documents/2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/documents/2/rename"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such document"))
        .expect(1)
        .mount(&app.backend)
        .await;
    let view_id = app.open_view().await;

    app.send(
        Method::PUT,
        &format!("/api/views/{}/documents/2/rename", view_id),
        Some(json!({ "filename": "Договор займа.pdf" })),
    )
    .await;
    app.send(
        Method::POST,
        &format!("/api/views/{}/documents/2/delete", view_id),
        None,
    )
    .await;

    let (status, body) = app
        .send(Method::POST, &format!("/api/views/{}/commit", view_id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["level"], "success");
    assert_eq!(body["report"]["deleted"], json!([2]));
    assert_eq!(body["report"]["superseded_renames"], json!([2]));
    assert_eq!(body["report"]["failures"], json!([]));
    assert_eq!(body["view"]["pending_count"], 0);
}

#[tokio::test]
async fn commit_sends_edits_and_refreshes() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[(1, "Паспорт.pdf"), (2, "Договор.pdf")]).await;
    Mock::given(method("DELETE"))
        .and(path("/api/documents/2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/documents/1/rename"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/debtors/{}/documents", DEBTOR_ID)))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&app.backend)
        .await;
    let view_id = app.open_view().await;

    app.send(
        Method::POST,
        &format!("/api/views/{}/documents/2/delete", view_id),
        None,
    )
    .await;
    app.send(
        Method::PUT,
        &format!("/api/views/{}/documents/1/rename", view_id),
        Some(json!({ "filename": "Паспорт РФ.pdf" })),
    )
    .await;
    app.upload(&view_id, &[("Выписка.pdf", b"%PDF-1.4".to_vec())])
        .await;

    let (status, body) = app
        .send(Method::POST, &format!("/api/views/{}/commit", view_id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["level"], "success");
    assert_eq!(body["notice"]["message"], "Изменения сохранены");
    assert_eq!(body["report"]["deleted"], json!([2]));
    assert_eq!(body["report"]["uploaded"], 1);
    assert_eq!(body["refreshed"], true);
    assert_eq!(body["view"]["pending_count"], 0);
    assert_eq!(body["view"]["busy"], false);
}

#[tokio::test]
async fn failed_calls_stay_staged() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[(1, "Паспорт.pdf"), (2, "Договор.pdf")]).await;
    Mock::given(method("DELETE"))
        .and(path("/api/documents/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&app.backend)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/documents/2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("locked"))
        .mount(&app.backend)
        .await;
    let view_id = app.open_view().await;

    for id in [1, 2] {
        app.send(
            Method::POST,
            &format!("/api/views/{}/documents/{}/delete", view_id, id),
            None,
        )
        .await;
    }

    let (status, body) = app
        .send(Method::POST, &format!("/api/views/{}/commit", view_id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["level"], "error");
    assert_eq!(body["notice"]["message"], "Ошибка при сохранении: удаление");
    assert_eq!(body["report"]["deleted"], json!([1]));
    assert_eq!(body["report"]["failures"][0]["document_id"], 2);
    assert_eq!(body["view"]["pending_count"], 1);
    assert_eq!(body["view"]["commit_label"], "Применить (1)");
}

#[tokio::test]
async fn busy_view_rejects_edits_during_commit() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[(1, "Паспорт.pdf")]).await;
    Mock::given(method("POST"))
        .and(path(format!("/api/debtors/{}/documents", DEBTOR_ID)))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(500)))
        .mount(&app.backend)
        .await;
    let view_id = app.open_view().await;
    app.upload(&view_id, &[("Выписка.pdf", b"%PDF-1.4".to_vec())])
        .await;

    let router = app.router.clone();
    let commit_uri = format!("/api/views/{}/commit", view_id);
    let commit = tokio::spawn(async move {
        use tower::util::ServiceExt;
        router
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::POST)
                    .uri(commit_uri)
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    });

    let mut busy = false;
    for _ in 0..50 {
        let (_, view) = app
            .send(Method::GET, &format!("/api/views/{}", view_id), None)
            .await;
        if view["busy"] == true {
            busy = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(busy, "commit never marked the view busy");

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/views/{}/documents/1/delete", view_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(Method::POST, &format!("/api/views/{}/commit", view_id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/views/{}", view_id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(commit.await.unwrap(), StatusCode::OK);
    let (_, view) = app
        .send(Method::GET, &format!("/api/views/{}", view_id), None)
        .await;
    assert_eq!(view["busy"], false);
}

#[tokio::test]
async fn panel_renders_html() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[(1, "Паспорт.pdf")]).await;
    let view_id = app.open_view().await;
    app.upload(&view_id, &[("Выписка.pdf", b"%PDF-1.4".to_vec())])
        .await;

    let (status, html) = app
        .get_text(&format!("/api/views/{}/panel", view_id))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Новые файлы"));
    assert!(html.contains("NEW"));
    assert!(html.contains("Применить (1)"));
}

#[tokio::test]
async fn closed_view_is_gone() {
    let app = TestApp::spawn().await;
    app.mount_debtor(&[]).await;
    let view_id = app.open_view().await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/views/{}", view_id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::GET, &format!("/api/views/{}", view_id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
