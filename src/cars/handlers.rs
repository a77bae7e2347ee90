//! Car endpoints.
//!
//! Each handler reads its inputs from the request, calls the repository and
//! wraps the outcome in an [`Envelope`]. Client mistakes come back as
//! [`ApiError`]s; none of them is fatal to anything but the request.

use serde_json::{json, Value};
use tracing::info;

use crate::cars::model::{Car, CarChanges, CarFilter, NewCar, Page};
use crate::cars::repository::CarRepository;
use crate::envelope::{self, Envelope};
use crate::error::ApiError;
use crate::request::Request;
use crate::router::PathArgs;

type Reply<T = Value> = Result<Envelope<T>, ApiError>;

/// `GET /`, the heartbeat.
pub async fn index(_: CarRepository, _: Request, _: PathArgs) -> Envelope {
    Envelope::success("Car API is up", envelope::empty())
}

/// `GET /cars`: every car, or one page of them with `?page=&perPage=`.
pub async fn list(cars: CarRepository, req: Request, _: PathArgs) -> Reply<Vec<Car>> {
    let found = match Page::from_query(req.query())? {
        Some(page) => cars.find_page(page.offset(), page.per_page).await?,
        None => cars.find_all().await?,
    };
    Ok(Envelope::success("Cars fetched", found))
}

/// `GET /cars/{id}`
pub async fn show(cars: CarRepository, _: Request, args: PathArgs) -> Reply<Car> {
    let id = car_id(&args)?;
    match cars.find_by_id(id).await? {
        Some(car) => Ok(Envelope::success("Car fetched", car)),
        None => Err(ApiError::NotFound("Car not found".to_owned())),
    }
}

/// `GET /cars/filter?mark=&fromPrice=&toPrice=&fromYear=&toYear=`
pub async fn filter(cars: CarRepository, req: Request, _: PathArgs) -> Reply<Vec<Car>> {
    if req.query().is_empty() {
        return Err(ApiError::BadRequest(
            "No parameters used. Use at least one set of parameters: \
             fromPrice/toPrice or fromYear/toYear, and optionally mark."
                .to_owned(),
        ));
    }

    let found = cars.find_by_filters(&CarFilter::from_query(req.query())?).await?;
    if found.is_empty() {
        return Err(ApiError::NotFound("No cars found for the given parameters.".to_owned()));
    }
    Ok(Envelope::success("Request completed successfully", found))
}

/// `POST /cars/add`
pub async fn create(cars: CarRepository, req: Request, _: PathArgs) -> Reply {
    let car = NewCar::from_request(&req)?;
    let id = cars.create(&car).await?;
    info!(id, brand = %car.brand, "car created");
    Ok(Envelope::success("Car has been created", json!({ "id": id })))
}

/// `POST /cars/edit/{id}`: partial update from any known fields.
pub async fn update(cars: CarRepository, req: Request, args: PathArgs) -> Reply {
    let id = car_id(&args)?;
    let changes = CarChanges::from_params(&req.params())?;
    if changes.is_empty() {
        return Err(ApiError::BadRequest("There is no data to update".to_owned()));
    }

    let changed = cars.update(id, &changes).await?;
    info!(id, changed, "car updated");
    Ok(Envelope::success("Car has been updated", json!({ "id": id })))
}

/// `DELETE /cars/del/{id}`
pub async fn delete(cars: CarRepository, _: Request, args: PathArgs) -> Reply {
    let id = car_id(&args)?;
    if !cars.delete(id).await? {
        return Err(ApiError::BadRequest(
            "Nothing was deleted, the car may not exist".to_owned(),
        ));
    }
    info!(id, "car deleted");
    Ok(Envelope::success("Car has been deleted", envelope::empty()))
}

fn car_id(args: &PathArgs) -> Result<i64, ApiError> {
    args.require(0)?
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid car id".to_owned()))
}
