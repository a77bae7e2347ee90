//! HTTP status codes as a typed enum.
//!
//! Only the codes this service actually answers with are listed. Use
//! [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, `Envelope::respond()`.
//!
//! ```rust
//! use garage::{Response, Status};
//!
//! Response::status(Status::NoContent);
//!
//! Response::builder()
//!     .status(Status::BadRequest)
//!     .json(br#"{"status":"error"}"#.to_vec());
//! ```

/// HTTP status codes used by the service.
#[allow(clippy::enum_variant_names)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200
    Created,             // 201
    NoContent,           // 204

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    NotFound,            // 404
    MethodNotAllowed,    // 405

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
    ServiceUnavailable,  // 503
}

impl Status {
    pub fn code(self) -> u16 {
        self.into()
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::Created             => 201,
            Status::NoContent           => 204,
            Status::BadRequest          => 400,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::InternalServerError => 500,
            Status::ServiceUnavailable  => 503,
        }
    }
}
