//! Info Lambda - returns the resolved settings dump for observability.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::Settings;
use tracing_subscriber::EnvFilter;

async fn handler(settings: &Settings, _event: Request) -> Result<Response<Body>, Error> {
    let response = Response::builder()
        .status(200)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(settings.dump())?))
        .map_err(Box::new)?;

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    // settings are resolved once at process entry; any failure is fatal
    let settings = Settings::new().await?;
    tracing::info!(version = settings.version(), "settings resolved");

    let settings = &settings;
    run(service_fn(move |event: Request| async move {
        handler(settings, event).await
    }))
    .await
}
