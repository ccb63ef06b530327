use std::env;

use kodo::{Auth, Client, Zone};

#[tokio::main]
async fn main() -> Result<(), kodo::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bucket = match env::var("KODO_TEST_BUCKET") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Set KODO_TEST_BUCKET to the bucket you want to list.");
            return Ok(());
        }
    };

    let zone: Zone = env::var("KODO_TEST_ZONE")
        .unwrap_or_else(|_| "z0".to_string())
        .parse()?;
    let auth = match Auth::from_env() {
        Ok(v) => v,
        Err(err) => {
            eprintln!("Set QINIU_ACCESS_KEY/QINIU_SECRET_KEY: {err}");
            return Ok(());
        }
    };

    let client = Client::builder().zone(zone).auth(auth).build()?;

    let mut pager = client
        .buckets()
        .list_files(&bucket)
        .delimiter("/")
        .limit(1000)
        .pager();

    let mut pages = 0u32;
    while let Some(page) = pager.next_page().await? {
        pages += 1;
        for item in page.items {
            println!(
                "{} ({} bytes, {})",
                item.key.unwrap_or_default(),
                item.fsize,
                item.mime_type
            );
        }
        for prefix in page.common_prefixes {
            println!("{prefix}");
        }

        if pages >= 3 {
            break;
        }
    }

    Ok(())
}
