mod common;

use std::io::Write as _;

use kodo::{Auth, Error, types::UploadPolicy};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header_regex, method, path},
};

fn upload_token() -> String {
    let policy = UploadPolicy::with_deadline("photos", None, 4_102_444_800);
    common::credentials().upload_token(&policy).unwrap()
}

#[tokio::test]
async fn put_sends_multipart_form_with_token() {
    let server = MockServer::start().await;
    let token = upload_token();

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header_regex(
            "content-type",
            "^multipart/form-data; boundary=[0-9a-f]{32}$",
        ))
        .and(body_string_contains(format!(
            "Content-Disposition: form-data; name=\"token\"\r\n\r\n{token}\r\n"
        )))
        .and(body_string_contains(
            "Content-Disposition: form-data; name=\"key\"\r\n\r\nhello.txt\r\n",
        ))
        .and(body_string_contains(
            "Content-Disposition: form-data; name=\"x:owner\"\r\n\r\nme\r\n",
        ))
        .and(body_string_contains(
            "name=\"file\"; filename=\"hello.txt\"\r\nContent-Type: text/plain\r\n\r\nhello world\r\n",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "hello.txt",
            "hash": "FhelloHash"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = common::mock_client(&server, Auth::Anonymous)
        .uploads()
        .put(token, "hello world")
        .key("hello.txt")
        .param("x:owner", "me")
        .param("x:blank", "")
        .mime_type("text/plain")
        .send()
        .await
        .unwrap();

    assert_eq!(out.key.as_deref(), Some("hello.txt"));
    assert_eq!(out.hash, "FhelloHash");

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(!body.contains("x:blank"));
}

#[tokio::test]
async fn put_file_guesses_mime_from_extension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(
            "filename=\"notes.json\"\r\nContent-Type: application/json\r\n\r\n{\"a\":1}",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "notes.json",
            "hash": "Fnotes"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(br#"{"a":1}"#).unwrap();

    let out = common::mock_client(&server, Auth::Anonymous)
        .uploads()
        .put_file(upload_token(), file.path())
        .key("notes.json")
        .send()
        .await
        .unwrap();
    assert_eq!(out.hash, "Fnotes");
}

#[tokio::test]
async fn rejected_upload_surfaces_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "expired token" })),
        )
        .mount(&server)
        .await;

    let err = common::mock_client(&server, Auth::Anonymous)
        .uploads()
        .put("ak:sig:policy", vec![1u8, 2, 3])
        .send()
        .await
        .unwrap_err();

    match err {
        Error::Api { code, message, .. } => {
            assert_eq!(code, 401);
            assert_eq!(message, "expired token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
