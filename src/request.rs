//! Incoming HTTP request type and body parsing.
//!
//! A [`Request`] is parsed once, before routing: the query string and the
//! body are decoded into parameter maps and every string value in them is
//! HTML-escaped. Handlers therefore only ever see escaped strings, whatever
//! the field means.
//!
//! Body decoding dispatches on the media type of `content-type`:
//!
//! | Media type | Decoded as |
//! |---|---|
//! | `application/json` | a JSON object (anything else yields no parameters) |
//! | `application/x-www-form-urlencoded` | URL-encoded pairs |
//! | `multipart/form-data` | text fields; file parts are skipped |
//! | anything else | no parameters |

use std::borrow::Cow;
use std::convert::Infallible;

use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::debug;

use crate::method::Method;

/// Decoded parameters: query string or body.
pub type Params = Map<String, Value>;

/// An incoming HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    query: Params,
    body: Params,
}

impl Request {
    /// Parses a request from its transport-level parts.
    ///
    /// `target` is the request target as sent on the request line
    /// (`/cars/filter?mark=bmw`).
    pub async fn parse(
        method: Method,
        target: &str,
        headers: Vec<(String, String)>,
        body: Bytes,
    ) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        let path = if path.is_empty() { "/" } else { path };

        let content_type = header_value(&headers, "content-type").unwrap_or_default();
        let body = parse_body(content_type, body).await;

        Self {
            method,
            path: path.to_owned(),
            query: escape_params(parse_urlencoded(query.as_bytes())),
            body: escape_params(body),
            headers,
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// Query-string parameters.
    pub fn query(&self) -> &Params { &self.query }

    /// Body parameters.
    pub fn input(&self) -> &Params { &self.body }

    /// Query and body parameters merged into one map; body values win.
    pub fn params(&self) -> Params {
        let mut merged = self.query.clone();
        merged.extend(self.body.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Looks a parameter up in the query string first, then in the body.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.query.get(key).or_else(|| self.body.get(key))
    }

    /// [`param`](Self::param) with a fallback.
    pub fn param_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.param(key).unwrap_or(default)
    }

    /// A scalar parameter rendered as text. `null`, arrays and objects yield
    /// `None`.
    pub fn param_str(&self, key: &str) -> Option<Cow<'_, str>> {
        self.param(key).and_then(scalar_text)
    }
}

/// Renders a scalar JSON value as text.
pub(crate) fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

// ── Body decoding ─────────────────────────────────────────────────────────────

async fn parse_body(content_type: &str, body: Bytes) -> Params {
    if body.is_empty() {
        return Params::new();
    }

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/json" => match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Params::new(),
            Err(e) => {
                debug!(error = %e, "ignoring malformed json body");
                Params::new()
            }
        },
        "application/x-www-form-urlencoded" => parse_urlencoded(&body),
        "multipart/form-data" => parse_multipart(content_type, body).await,
        _ => Params::new(),
    }
}

/// Decodes `a=1&b=2` pairs. Repeated keys: the last one wins.
fn parse_urlencoded(input: &[u8]) -> Params {
    url::form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}

/// Collects the text fields of a multipart body. Parsing stops at the first
/// malformed part; fields read up to that point are kept.
async fn parse_multipart(content_type: &str, body: Bytes) -> Params {
    let mut params = Params::new();

    let boundary = match multer::parse_boundary(content_type) {
        Ok(boundary) => boundary,
        Err(e) => {
            debug!(error = %e, "multipart body without usable boundary");
            return params;
        }
    };

    let stream = futures_util::stream::iter([Ok::<_, Infallible>(body)]);
    let mut multipart = multer::Multipart::new(stream, boundary);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "stopping at malformed multipart part");
                break;
            }
        };

        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else { continue };

        match field.text().await {
            Ok(text) => { params.insert(name, Value::String(text)); }
            Err(e) => {
                debug!(error = %e, field = %name, "unreadable multipart field");
                break;
            }
        }
    }

    params
}

// ── Escaping ──────────────────────────────────────────────────────────────────

fn escape_params(params: Params) -> Params {
    params.into_iter().map(|(k, v)| (k, escape_value(v))).collect()
}

fn escape_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_html(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(escape_value).collect()),
        Value::Object(map) => Value::Object(escape_params(map)),
        scalar => scalar,
    }
}

/// Replaces the five HTML-significant characters with entities.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(content_type: &str) -> Vec<(String, String)> {
        vec![("Content-Type".to_owned(), content_type.to_owned())]
    }

    #[tokio::test]
    async fn splits_path_and_query() {
        let req = Request::parse(Method::Get, "/cars/filter?mark=bmw&fromYear=2000", vec![], Bytes::new()).await;
        assert_eq!(req.path(), "/cars/filter");
        assert_eq!(req.query()["mark"], "bmw");
        assert_eq!(req.query()["fromYear"], "2000");
        assert!(req.input().is_empty());
    }

    #[tokio::test]
    async fn empty_target_is_root() {
        let req = Request::parse(Method::Get, "?a=1", vec![], Bytes::new()).await;
        assert_eq!(req.path(), "/");
    }

    #[tokio::test]
    async fn decodes_json_objects_and_escapes_strings() {
        let body = Bytes::from(r#"{"brand":"<b>Audi</b>","year":2020,"images":["a.jpg","x\"y"]}"#);
        let req = Request::parse(Method::Post, "/cars/add", headers("application/json"), body).await;
        assert_eq!(req.input()["brand"], "&lt;b&gt;Audi&lt;/b&gt;");
        assert_eq!(req.input()["year"], 2020);
        assert_eq!(req.input()["images"], json!(["a.jpg", "x&quot;y"]));
    }

    #[tokio::test]
    async fn json_that_is_not_an_object_yields_nothing() {
        let req = Request::parse(Method::Post, "/", headers("application/json"), Bytes::from("[1,2]")).await;
        assert!(req.input().is_empty());
        let req = Request::parse(Method::Post, "/", headers("application/json"), Bytes::from("{oops")).await;
        assert!(req.input().is_empty());
    }

    #[tokio::test]
    async fn content_type_parameters_are_ignored() {
        let req = Request::parse(
            Method::Post,
            "/",
            headers("Application/JSON; charset=utf-8"),
            Bytes::from(r#"{"model":"A4"}"#),
        ).await;
        assert_eq!(req.input()["model"], "A4");
    }

    #[tokio::test]
    async fn decodes_form_bodies() {
        let req = Request::parse(
            Method::Post,
            "/cars/add",
            headers("application/x-www-form-urlencoded"),
            Bytes::from("brand=Rolls+Royce&images=a.jpg%2Cb.jpg&note=Tom's"),
        ).await;
        assert_eq!(req.input()["brand"], "Rolls Royce");
        assert_eq!(req.input()["images"], "a.jpg,b.jpg");
        assert_eq!(req.input()["note"], "Tom&apos;s");
    }

    #[tokio::test]
    async fn decodes_multipart_text_fields_and_skips_files() {
        let body = concat!(
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"brand\"\r\n\r\n",
            "Lada\r\n",
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"photo\"; filename=\"a.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "JPEGDATA\r\n",
            "--XyZ--\r\n",
        );
        let req = Request::parse(
            Method::Post,
            "/cars/add",
            headers("multipart/form-data; boundary=XyZ"),
            Bytes::from(body),
        ).await;
        assert_eq!(req.input()["brand"], "Lada");
        assert!(req.input().get("photo").is_none());
    }

    #[tokio::test]
    async fn unknown_content_types_yield_no_body_params() {
        let req = Request::parse(Method::Post, "/", headers("text/plain"), Bytes::from("a=b")).await;
        assert!(req.input().is_empty());
        let req = Request::parse(Method::Post, "/", vec![], Bytes::from("a=b")).await;
        assert!(req.input().is_empty());
    }

    #[tokio::test]
    async fn lookup_prefers_query_but_merge_prefers_body() {
        let req = Request::parse(
            Method::Post,
            "/x?who=query",
            headers("application/json"),
            Bytes::from(r#"{"who":"body","only":"body"}"#),
        ).await;
        assert_eq!(req.param("who"), Some(&json!("query")));
        assert_eq!(req.param("only"), Some(&json!("body")));
        assert_eq!(req.params()["who"], "body");

        let fallback = json!("none");
        assert_eq!(req.param_or("missing", &fallback), &fallback);
    }

    #[tokio::test]
    async fn scalar_rendering() {
        let req = Request::parse(
            Method::Post,
            "/",
            headers("application/json"),
            Bytes::from(r#"{"n":12.5,"s":"x","z":null,"a":[1]}"#),
        ).await;
        assert_eq!(req.param_str("n").as_deref(), Some("12.5"));
        assert_eq!(req.param_str("s").as_deref(), Some("x"));
        assert_eq!(req.param_str("z"), None);
        assert_eq!(req.param_str("a"), None);
    }

    #[test]
    fn escapes_all_five_characters() {
        assert_eq!(escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&apos;s&lt;/a&gt;");
    }
}
