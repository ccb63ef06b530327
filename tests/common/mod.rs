#![allow(dead_code)]

use std::{
    env,
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use kodo::{Auth, Client, Credentials, Error, Hosts, Signer as _, Zone};
use url::Url;
use wiremock::MockServer;

static KEY_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub(crate) const ACCESS_KEY: &str = "test-ak";
pub(crate) const SECRET_KEY: &str = "test-sk";

pub(crate) fn credentials() -> Credentials {
    Credentials::new(ACCESS_KEY, SECRET_KEY).unwrap()
}

/// Client whose every host points at `server`.
pub(crate) fn mock_client(server: &MockServer, auth: Auth) -> Client {
    let uri = server.uri();
    Client::builder()
        .hosts(Hosts::new(&uri, &uri, &uri, &uri, &uri, &uri).unwrap())
        .auth(auth)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

pub(crate) fn signed_client(server: &MockServer) -> Client {
    mock_client(server, Auth::Static(credentials()))
}

/// `Authorization` value the test credentials produce; only the path and
/// query take part in the signature, so the host is irrelevant.
pub(crate) fn expected_authorization(
    path_and_query: &str,
    body: &[u8],
    content_type: Option<&str>,
) -> String {
    let url = Url::parse(&format!("http://signing.invalid{path_and_query}")).unwrap();
    let headers = credentials().sign(&url, body, content_type).unwrap();
    headers[http::header::AUTHORIZATION]
        .to_str()
        .unwrap()
        .to_string()
}

pub(crate) fn encoded(bucket: &str, key: &str) -> String {
    kodo::batch::encoded_entry(bucket, Some(key))
}

pub(crate) struct LiveConfig {
    pub(crate) bucket: String,
    pub(crate) zone: Zone,
    pub(crate) auth: Auth,
}

/// Reads the live-service settings; `None` skips the suite.
pub(crate) fn load_live_config() -> Result<Option<LiveConfig>, Error> {
    let Ok(bucket) = env::var("KODO_TEST_BUCKET") else {
        return Ok(None);
    };

    let zone = match env::var("KODO_TEST_ZONE") {
        Ok(zone) => zone.parse()?,
        Err(_) => Zone::Z0,
    };

    let Ok(auth) = Auth::from_env() else {
        return Ok(None);
    };

    Ok(Some(LiveConfig { bucket, zone, auth }))
}

pub(crate) fn unique_key(prefix: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let n = KEY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{now}-{n}")
}
