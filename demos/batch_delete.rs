use std::env;

use kodo::{Auth, Client, batch};

#[tokio::main]
async fn main() -> Result<(), kodo::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bucket = match env::var("KODO_TEST_BUCKET") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Set KODO_TEST_BUCKET and pass keys to delete as arguments.");
            return Ok(());
        }
    };
    let keys: Vec<String> = env::args().skip(1).collect();
    if keys.is_empty() {
        eprintln!("usage: batch_delete <key>...");
        return Ok(());
    }

    let auth = match Auth::from_env() {
        Ok(v) => v,
        Err(err) => {
            eprintln!("Set QINIU_ACCESS_KEY/QINIU_SECRET_KEY: {err}");
            return Ok(());
        }
    };
    let client = Client::builder().auth(auth).build()?;

    let ops = batch::build_batch_delete(&bucket, &keys);
    let results = client.buckets().batch(ops).send().await?;

    for (key, item) in keys.iter().zip(results) {
        match item.error() {
            None if item.ok() => println!("deleted {key}"),
            Some(err) => println!("{key}: {} {err}", item.code),
            None => println!("{key}: {}", item.code),
        }
    }

    Ok(())
}
