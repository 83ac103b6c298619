//! Bundle remote files into one ZIP
//!
//! Usage:
//!
//! ```bash
//! cargo run --example bundle -- <output-name> <url>...
//! RUST_LOG=archive_bundler=debug cargo run --example bundle -- docs https://example.com/a.pdf
//! ```
//!
//! Writes `<output-name>.zip` to the current directory.

use archive_bundler::{ApiError, ArchiveOptions, Archiver, Config, Event};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(output_name) = args.next() else {
        eprintln!("usage: bundle <output-name> <url>...");
        std::process::exit(2);
    };
    let locations: Vec<String> = args.collect();

    let mut config = Config::default();
    config.fetch.max_concurrent_fetches = Some(8);
    let archiver = Archiver::new(config)?;

    let mut events = archiver.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Event::SourceMaterialized {
                name, size_bytes, ..
            } = event
            {
                println!("  + {} ({} bytes)", name, size_bytes);
            }
        }
    });

    match archiver
        .build_from_locations(&output_name, &locations, &ArchiveOptions::default())
        .await
    {
        Ok(bytes) => {
            let path = format!("{}.zip", output_name);
            std::fs::write(&path, &bytes)?;
            println!("wrote {} ({} bytes)", path, bytes.len());
            Ok(())
        }
        Err(e) => {
            let report: ApiError = e.into();
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
            std::process::exit(1);
        }
    }
}
