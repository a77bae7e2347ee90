//! # garage
//!
//! A small JSON REST service for listing, filtering and managing car
//! records, on a minimal HTTP layer of its own.
//!
//! ## Layers
//!
//! - [`Request`] parses the query string and the body (JSON, URL-encoded or
//!   multipart) and HTML-escapes every string value before anything else
//!   sees it.
//! - [`Router`] keeps routes in registration order. `{name}` in a pattern
//!   matches exactly one path segment, and captured segments reach the
//!   handler positionally through [`PathArgs`].
//! - [`Response`] and [`Envelope`] write the `{status, message, data}` JSON
//!   every endpoint answers with.
//! - [`cars`] holds the one entity: its model, its SQLite repository and its
//!   handlers.
//! - [`Server`] runs hyper on tokio, adds CORS headers, and shuts down
//!   gracefully on SIGTERM / Ctrl-C.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use garage::cars::{self, CarRepository};
//! use garage::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), garage::Error> {
//!     let config = Config::load_from("garage")?;
//!     let repo = CarRepository::connect(&config.database).await?;
//!     repo.migrate().await?;
//!
//!     Server::bind(config.socket_addr()?)
//!         .cors(config.http.cors)
//!         .serve(cars::routes(repo))
//!         .await
//! }
//! ```
//!
//! Handlers are plain `async fn`s taking the router state, the request and
//! the captured path segments:
//!
//! ```rust,no_run
//! use garage::{Envelope, PathArgs, Request, Router};
//!
//! async fn hello(_: (), _: Request, args: PathArgs) -> Envelope<String> {
//!     Envelope::success("hello", args.get(0).unwrap_or("world").to_owned())
//! }
//!
//! let app = Router::new().get("/hello/{name}", hello);
//! ```

mod envelope;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod cars;
pub mod config;
pub mod health;
pub mod middleware;

pub use config::{Config, DatabaseConfig, HttpConfig, LoggingConfig, ServerConfig};
pub use envelope::{Envelope, Outcome};
pub use error::{ApiError, Error};
pub use handler::Handler;
pub use method::Method;
pub use request::{escape_html, Params, Request};
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use router::{PathArgs, Router};
pub use server::Server;
pub use status::Status;
