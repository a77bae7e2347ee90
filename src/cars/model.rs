//! Car records and the inputs that create, change and select them.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

use crate::error::ApiError;
use crate::request::{scalar_text, Params, Request};

/// Message sent when a create request lacks a required field.
pub const REQUIRED_FIELDS: &str =
    "The following fields are required: brand, model, year, price, images";

/// A stored car as sent to clients. `images` is split into its URLs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Car {
    pub id: i64,
    pub url: Option<String>,
    pub brand: String,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub price: Option<f64>,
    pub images: Vec<String>,
}

/// A `cars` row as stored: `images` is one comma-joined string.
#[derive(Debug, FromRow)]
pub(crate) struct CarRow {
    pub id: i64,
    pub url: Option<String>,
    pub brand: String,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub price: Option<f64>,
    pub images: Option<String>,
}

impl From<CarRow> for Car {
    fn from(row: CarRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            brand: row.brand,
            model: row.model,
            year: row.year,
            price: row.price,
            images: split_images(row.images.as_deref().unwrap_or_default()),
        }
    }
}

/// Splits the stored representation. Commas inside a URL cannot be told
/// apart from separators.
pub fn split_images(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    stored.split(',').map(str::to_owned).collect()
}

/// Lowercased brand with hyphens removed: `Mercedes-Benz` → `mercedesbenz`.
pub fn slug(brand: &str) -> String {
    brand.replace('-', "").trim().to_lowercase()
}

// ── NewCar ────────────────────────────────────────────────────────────────────

/// A car about to be inserted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCar {
    pub url: String,
    pub brand: String,
    pub model: String,
    pub year: i64,
    pub price: f64,
    pub images: String,
}

impl NewCar {
    /// Reads the five required fields from the request parameters.
    pub fn from_request(req: &Request) -> Result<Self, ApiError> {
        let required = |key: &str| req.param(key).filter(|v| !v.is_null());
        let (Some(brand), Some(model), Some(year), Some(price), Some(images)) = (
            required("brand"),
            required("model"),
            required("year"),
            required("price"),
            required("images"),
        ) else {
            return Err(ApiError::BadRequest(REQUIRED_FIELDS.to_owned()));
        };

        let brand = text(brand, "brand")?;
        Ok(Self {
            url: slug(&brand),
            model: text(model, "model")?,
            year: integer(year, "year")?,
            price: number(price, "price")?,
            images: join_images(images)?,
            brand,
        })
    }
}

// ── CarChanges ────────────────────────────────────────────────────────────────

/// A partial update. Only the listed columns can be changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CarChanges {
    pub url: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub price: Option<f64>,
    pub images: Option<String>,
}

impl CarChanges {
    /// Picks the known columns out of `params`; other keys are ignored.
    pub fn from_params(params: &Params) -> Result<Self, ApiError> {
        let field = |key: &str| params.get(key).filter(|v| !v.is_null());
        Ok(Self {
            url: field("url").map(|v| text(v, "url")).transpose()?,
            brand: field("brand").map(|v| text(v, "brand")).transpose()?,
            model: field("model").map(|v| text(v, "model")).transpose()?,
            year: field("year").map(|v| integer(v, "year")).transpose()?,
            price: field("price").map(|v| number(v, "price")).transpose()?,
            images: field("images").map(join_images).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── CarFilter ─────────────────────────────────────────────────────────────────

/// Optional search predicates. Each range applies only when both of its
/// bounds are present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CarFilter {
    pub mark: Option<String>,
    pub from_price: Option<f64>,
    pub to_price: Option<f64>,
    pub from_year: Option<i64>,
    pub to_year: Option<i64>,
}

impl CarFilter {
    /// Reads `mark`, `fromPrice`, `toPrice`, `fromYear`, `toYear` from the
    /// query string. Empty values count as absent.
    pub fn from_query(query: &Params) -> Result<Self, ApiError> {
        let field = |key: &str| {
            query.get(key)
                .and_then(scalar_text)
                .filter(|s| !s.trim().is_empty())
                .map(Cow::into_owned)
        };
        Ok(Self {
            mark: field("mark"),
            from_price: field("fromPrice").map(|v| parse_number(&v, "fromPrice")).transpose()?,
            to_price: field("toPrice").map(|v| parse_number(&v, "toPrice")).transpose()?,
            from_year: field("fromYear").map(|v| parse_integer(&v, "fromYear")).transpose()?,
            to_year: field("toYear").map(|v| parse_integer(&v, "toYear")).transpose()?,
        })
    }

    pub fn price_range(&self) -> Option<(f64, f64)> {
        self.from_price.zip(self.to_price)
    }

    pub fn year_range(&self) -> Option<(i64, i64)> {
        self.from_year.zip(self.to_year)
    }
}

// ── Page ──────────────────────────────────────────────────────────────────────

/// `page` / `perPage` pagination, 1-based.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    pub const DEFAULT_PER_PAGE: i64 = 10;

    /// `None` when neither parameter is present.
    pub fn from_query(query: &Params) -> Result<Option<Self>, ApiError> {
        let page = query.get("page").map(|v| positive(v, "page")).transpose()?;
        let per_page = query.get("perPage").map(|v| positive(v, "perPage")).transpose()?;
        if page.is_none() && per_page.is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            page: page.unwrap_or(1),
            per_page: per_page.unwrap_or(Self::DEFAULT_PER_PAGE),
        }))
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

// ── Field conversion ──────────────────────────────────────────────────────────

fn text(value: &Value, field: &str) -> Result<String, ApiError> {
    scalar_text(value)
        .map(|s| s.trim().to_owned())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} must be a string")))
}

fn integer(value: &Value, field: &str) -> Result<i64, ApiError> {
    match value {
        Value::Number(n) => n.as_i64()
            .ok_or_else(|| ApiError::BadRequest(format!("{field} must be an integer"))),
        other => parse_integer(&text(other, field)?, field),
    }
}

fn number(value: &Value, field: &str) -> Result<f64, ApiError> {
    match value {
        Value::Number(n) => n.as_f64()
            .ok_or_else(|| ApiError::BadRequest(format!("{field} must be a number"))),
        other => parse_number(&text(other, field)?, field),
    }
}

fn positive(value: &Value, field: &str) -> Result<i64, ApiError> {
    integer(value, field)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("{field} must be a positive integer")))
}

fn parse_integer(raw: &str, field: &str) -> Result<i64, ApiError> {
    raw.trim().parse()
        .map_err(|_| ApiError::BadRequest(format!("{field} must be an integer")))
}

fn parse_number(raw: &str, field: &str) -> Result<f64, ApiError> {
    raw.trim().parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} must be a number")))
}

/// Accepts `"a.jpg,b.jpg"` or `["a.jpg", "b.jpg"]`.
fn join_images(value: &Value) -> Result<String, ApiError> {
    match value {
        Value::Array(items) => items.iter()
            .map(|item| text(item, "images"))
            .collect::<Result<Vec<_>, _>>()
            .map(|urls| urls.join(",")),
        other => text(other, "images"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn slug_drops_hyphens_and_lowercases() {
        assert_eq!(slug("Mercedes-Benz"), "mercedesbenz");
        assert_eq!(slug(" BMW "), "bmw");
    }

    #[test]
    fn splits_stored_images() {
        assert_eq!(split_images("a.jpg,b.jpg"), vec!["a.jpg", "b.jpg"]);
        assert!(split_images("").is_empty());
    }

    #[test]
    fn changes_keep_only_known_columns() {
        let changes = CarChanges::from_params(&params(json!({
            "price": "1500.5", "color": "red", "images": ["x.jpg", "y.jpg"]
        }))).unwrap();
        assert_eq!(changes.price, Some(1500.5));
        assert_eq!(changes.images.as_deref(), Some("x.jpg,y.jpg"));
        assert!(changes.brand.is_none());

        let unknown_only = CarChanges::from_params(&params(json!({ "color": "red" }))).unwrap();
        assert!(unknown_only.is_empty());
    }

    #[test]
    fn changes_reject_malformed_numbers() {
        let err = CarChanges::from_params(&params(json!({ "year": "soon" }))).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "year must be an integer"));
    }

    #[test]
    fn filter_reads_bounds_and_ignores_blanks() {
        let filter = CarFilter::from_query(&params(json!({
            "mark": "Audi", "fromPrice": "100", "toYear": "2020", "fromYear": ""
        }))).unwrap();
        assert_eq!(filter.mark.as_deref(), Some("Audi"));
        assert_eq!(filter.from_price, Some(100.0));
        assert_eq!(filter.price_range(), None);
        assert_eq!(filter.year_range(), None);
    }

    #[test]
    fn filter_accepts_zero_bounds() {
        let filter = CarFilter::from_query(&params(json!({
            "fromPrice": "0", "toPrice": "10"
        }))).unwrap();
        assert_eq!(filter.price_range(), Some((0.0, 10.0)));
    }

    #[test]
    fn page_defaults_and_validation() {
        assert_eq!(Page::from_query(&Params::new()).unwrap(), None);

        let page = Page::from_query(&params(json!({ "page": "3" }))).unwrap().unwrap();
        assert_eq!(page, Page { page: 3, per_page: 10 });
        assert_eq!(page.offset(), 20);

        assert!(Page::from_query(&params(json!({ "perPage": "0" }))).is_err());
        assert!(Page::from_query(&params(json!({ "page": "x" }))).is_err());
    }
}
