//! garage server binary.
//!
//! Run with:
//!   RUST_LOG=info cargo run
//!
//! Try:
//!   curl http://localhost:8080/cars
//!   curl -X POST http://localhost:8080/cars/add \
//!        -H 'content-type: application/json' \
//!        -d '{"brand":"Audi","model":"A4","year":2019,"price":21500,"images":"a.jpg,b.jpg"}'
//!   curl 'http://localhost:8080/cars/filter?mark=Audi&fromYear=2015&toYear=2020'
//!   curl -X DELETE http://localhost:8080/cars/del/1

use garage::cars::{self, CarRepository};
use garage::{Config, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), garage::Error> {
    let path = std::env::var("GARAGE_CONFIG_FILE")
        .unwrap_or_else(|_| garage::config::DEFAULT_FILE.to_owned());
    let config = Config::load_from(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let repo = CarRepository::connect(&config.database).await?;
    repo.migrate().await?;
    info!(database = %config.database.url, "database ready");

    Server::bind(config.socket_addr()?)
        .cors(config.http.cors)
        .serve(cars::routes(repo))
        .await
}
