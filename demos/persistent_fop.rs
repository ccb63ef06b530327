use std::{env, time::Duration};

use kodo::{Auth, Client};

#[tokio::main]
async fn main() -> Result<(), kodo::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (bucket, key) = match (env::var("KODO_TEST_BUCKET"), env::args().nth(1)) {
        (Ok(bucket), Some(key)) => (bucket, key),
        _ => {
            eprintln!("Set KODO_TEST_BUCKET and pass a video key: persistent_fop <key>");
            return Ok(());
        }
    };

    let auth = match Auth::from_env() {
        Ok(v) => v,
        Err(err) => {
            eprintln!("Set QINIU_ACCESS_KEY/QINIU_SECRET_KEY: {err}");
            return Ok(());
        }
    };
    let client = Client::builder().auth(auth).build()?;
    let processing = client.processing();

    let id = processing
        .pfop(&bucket, &key)
        .fop("avthumb/mp4/s/640x360")
        .fop("vframe/jpg/offset/1")
        .send()
        .await?;
    println!("queued {id}");

    for _ in 0..30 {
        let status = processing.pfop_status(&id).send().await?;
        if !status.is_pending() {
            println!("{}: {}", status.code, status.desc);
            for item in status.items {
                println!("  {} -> {:?} ({})", item.cmd, item.key, item.desc);
            }
            break;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    Ok(())
}
