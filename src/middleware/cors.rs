use crate::response::Response;

/// Fixed, permissive CORS policy.
#[derive(Clone, Debug)]
pub struct Cors {
    allow_origin: String,
    allow_methods: String,
    allow_headers: String,
}

impl Cors {
    /// Any origin; `GET, POST, PUT, DELETE, OPTIONS`; `Content-Type, Authorization`.
    pub fn permissive() -> Self {
        Self {
            allow_origin: "*".to_owned(),
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS".to_owned(),
            allow_headers: "Content-Type, Authorization".to_owned(),
        }
    }

    /// Adds the CORS headers to `resp`, replacing any the handler set.
    pub fn apply(&self, mut resp: Response) -> Response {
        resp.set_header("access-control-allow-origin", &self.allow_origin);
        resp.set_header("access-control-allow-methods", &self.allow_methods);
        resp.set_header("access-control-allow-headers", &self.allow_headers);
        resp
    }
}

impl Default for Cors {
    fn default() -> Self { Self::permissive() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[test]
    fn decorates_any_response() {
        let resp = Cors::permissive().apply(Response::json(b"{}".to_vec()));
        assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(resp.header("Access-Control-Allow-Methods"), Some("GET, POST, PUT, DELETE, OPTIONS"));
        assert_eq!(resp.header("Access-Control-Allow-Headers"), Some("Content-Type, Authorization"));
        assert_eq!(resp.header("content-type"), Some("application/json"));
    }

    #[test]
    fn bodiless_responses_get_headers_too() {
        let resp = Cors::permissive().apply(Response::status(Status::NoContent));
        assert_eq!(resp.status_code(), 204);
        assert!(resp.body().is_empty());
        assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
    }
}
