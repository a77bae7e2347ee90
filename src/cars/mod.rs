//! The car catalogue: records, storage and HTTP endpoints.

pub mod handlers;
pub mod model;
pub mod repository;

pub use model::{Car, CarChanges, CarFilter, NewCar, Page};
pub use repository::CarRepository;

use crate::health;
use crate::router::Router;

/// The service's route table.
///
/// Order matters: `/cars/filter` must come before `/cars/{id}`, which would
/// otherwise capture `filter` as an id.
pub fn routes(cars: CarRepository) -> Router<CarRepository> {
    Router::with_state(cars)
        .get("/",                  handlers::index)
        .get("/healthz",           health::liveness)
        .get("/readyz",            health::readiness)
        .get("/cars",              handlers::list)
        .get("/cars/filter",       handlers::filter)
        .get("/cars/{id}",         handlers::show)
        .post("/cars/add",         handlers::create)
        .post("/cars/edit/{id}",   handlers::update)
        .delete("/cars/del/{id}",  handlers::delete)
}
