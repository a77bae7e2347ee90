//! Data access for the `cars` table.
//!
//! Every value reaches SQLite as a bound parameter, including ids.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::cars::model::{Car, CarChanges, CarFilter, CarRow, NewCar};
use crate::config::DatabaseConfig;

const COLUMNS: &str = "SELECT id, url, brand, model, year, price, images FROM cars";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cars (
        id     INTEGER PRIMARY KEY AUTOINCREMENT,
        url    TEXT,
        brand  TEXT NOT NULL,
        model  TEXT,
        year   INTEGER,
        price  REAL,
        images TEXT
    )";

#[derive(Clone, Debug)]
pub struct CarRepository {
    pool: SqlitePool,
}

impl CarRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for `config.url`, creating the database file if needed.
    ///
    /// Every connection to `:memory:` opens its own database, so those pools
    /// hold exactly one connection and never let it go.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let mut pool = SqlitePoolOptions::new().max_connections(config.max_connections.max(1));
        if config.url.contains(":memory:") || config.url.contains("mode=memory") {
            pool = pool
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }
        Ok(Self::new(pool.connect_with(options).await?))
    }

    /// Creates the `cars` table when it does not exist yet.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        info!("cars table ready");
        Ok(())
    }

    /// Round-trips a trivial query.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn find_all(&self) -> Result<Vec<Car>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CarRow>(&format!("{COLUMNS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Car::from).collect())
    }

    pub async fn find_page(&self, offset: i64, limit: i64) -> Result<Vec<Car>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CarRow>(&format!("{COLUMNS} ORDER BY id LIMIT ? OFFSET ?"))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Car::from).collect())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Car>, sqlx::Error> {
        let row = sqlx::query_as::<_, CarRow>(&format!("{COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Car::from))
    }

    /// Cars satisfying every predicate present in `filter`. A range with a
    /// single bound is not applied.
    pub async fn find_by_filters(&self, filter: &CarFilter) -> Result<Vec<Car>, sqlx::Error> {
        let mut query = QueryBuilder::<Sqlite>::new(COLUMNS);
        query.push(" WHERE 1=1");

        if let Some(mark) = &filter.mark {
            query.push(" AND brand = ").push_bind(mark.clone());
        }
        if let Some((from, to)) = filter.price_range() {
            query.push(" AND price BETWEEN ").push_bind(from).push(" AND ").push_bind(to);
        }
        if let Some((from, to)) = filter.year_range() {
            query.push(" AND year BETWEEN ").push_bind(from).push(" AND ").push_bind(to);
        }
        query.push(" ORDER BY id");

        let rows = query.build_query_as::<CarRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Car::from).collect())
    }

    /// Inserts `car` and returns its generated id.
    pub async fn create(&self, car: &NewCar) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO cars (url, brand, model, year, price, images) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&car.url)
        .bind(&car.brand)
        .bind(&car.model)
        .bind(car.year)
        .bind(car.price)
        .bind(&car.images)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Applies the present fields of `changes` to car `id`. Returns the
    /// number of rows changed; `0` for an empty change set.
    pub async fn update(&self, id: i64, changes: &CarChanges) -> Result<u64, sqlx::Error> {
        if changes.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE cars SET ");
        let mut set = query.separated(", ");
        if let Some(url) = &changes.url {
            set.push("url = ").push_bind_unseparated(url.clone());
        }
        if let Some(brand) = &changes.brand {
            set.push("brand = ").push_bind_unseparated(brand.clone());
        }
        if let Some(model) = &changes.model {
            set.push("model = ").push_bind_unseparated(model.clone());
        }
        if let Some(year) = changes.year {
            set.push("year = ").push_bind_unseparated(year);
        }
        if let Some(price) = changes.price {
            set.push("price = ").push_bind_unseparated(price);
        }
        if let Some(images) = &changes.images {
            set.push("images = ").push_bind_unseparated(images.clone());
        }
        query.push(" WHERE id = ").push_bind(id);

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Deletes car `id`. `false` when no such car existed.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cars WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
