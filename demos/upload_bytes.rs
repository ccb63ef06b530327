use std::{env, time::Duration};

use kodo::{Auth, Client, Zone, types::UploadPolicy};

#[tokio::main]
async fn main() -> Result<(), kodo::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bucket = match env::var("KODO_TEST_BUCKET") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Set KODO_TEST_BUCKET to the target bucket.");
            return Ok(());
        }
    };

    let creds = match Auth::from_env() {
        Ok(Auth::Static(creds)) => creds,
        Ok(_) => return Ok(()),
        Err(err) => {
            eprintln!("Set QINIU_ACCESS_KEY/QINIU_SECRET_KEY: {err}");
            return Ok(());
        }
    };

    let key = "demos/hello.txt";
    let policy = UploadPolicy::new(&bucket, Some(key), Duration::from_secs(600));
    let token = creds.upload_token(&policy)?;

    let client = Client::builder()
        .zone(Zone::Z0)
        .auth(Auth::Static(creds))
        .build()?;

    let out = client
        .uploads()
        .put(token, "hello from kodo")
        .key(key)
        .param("x:source", "demo")
        .mime_type("text/plain")
        .send()
        .await?;
    println!("uploaded {:?} hash={}", out.key, out.hash);

    let info = client.buckets().stat(&bucket, key).send().await?;
    println!("{} bytes, {}", info.fsize, info.mime_type);

    Ok(())
}
