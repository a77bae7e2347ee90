//! The `{status, message, data}` wrapper applied to every JSON answer.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;

use crate::response::{IntoResponse, Response};
use crate::status::Status;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// A response envelope.
///
/// Returning one from a handler sends it with `200 OK`; use
/// [`Envelope::respond`] for any other status.
#[derive(Debug, Serialize)]
pub struct Envelope<T = Value> {
    pub status: Outcome,
    pub message: Cow<'static, str>,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(message: impl Into<Cow<'static, str>>, data: T) -> Self {
        Self { status: Outcome::Success, message: message.into(), data }
    }

    /// Serialises the envelope with the given status code.
    pub fn respond(self, status: Status) -> Response {
        Response::builder().status(status).serialize(&self)
    }
}

impl Envelope<Value> {
    /// An error envelope. `data` is an empty list, never `null`.
    pub fn error(message: impl Into<Cow<'static, str>>) -> Self {
        Self { status: Outcome::Error, message: message.into(), data: empty() }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        self.respond(Status::Ok)
    }
}

/// The `[]` used as `data` when there is nothing to return.
pub fn empty() -> Value {
    Value::Array(Vec::new())
}
