use axum::{routing::get, Router};
use bytes::Bytes;
use http_injector::config::InjectorConfig;
use http_injector::inject::{inject, InjectOptions, ServiceHandler};
use http_injector::observability::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = InjectorConfig::from_toml_str(
        r#"
        [observability]
        log_level = "debug"
        "#,
    )?;
    init_logging(&config.observability)?;

    let app = Router::new()
        .route("/", get(|| async { "Hello from a router nobody is listening for" }))
        .route("/status", get(|| async { "ok" }));
    let handler = ServiceHandler::new(app);

    for path in ["/", "/status", "/missing"] {
        let request = http::Request::builder().uri(path).body(Bytes::new())?;
        let snapshot = inject(&handler, request, InjectOptions::from_config(&config)).await?;
        println!(
            "{path} -> {} {} ({} wire bytes): {:?}",
            snapshot.status_code.as_u16(),
            snapshot.status_message,
            snapshot.raw.res.wire_bytes(),
            snapshot.payload.unwrap_or_default(),
        );
    }
    Ok(())
}
