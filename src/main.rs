use std::net::TcpListener;

use mintturf_backend::config::settings::get_config;
use mintturf_backend::telemetry::{get_subscriber, init_subscriber};
use mintturf_backend::{build_state, run};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber("mintturf-backend".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let settings = get_config().expect("failed to read configuration");
    let address = format!("{}:{}", settings.application.host, settings.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!(%address, "starting mintturf-backend");

    let state = build_state(settings).await?;
    run(listener, state)?.await
}
