//! Repository for the `cruise_products` table.

use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::cruise_product::{
    CreateCruiseProduct, CruiseProduct, ProductFilter, UpdateCruiseProduct,
};

const COLUMNS: &str = "id, code, title, cruise_line, ship_name, departure_port, departure_date, \
                        nights, price, cost_price, port_charge, single_supplement_bps, \
                        description, itinerary, is_active, created_at, updated_at";

/// Provides CRUD and search operations for the product catalog.
pub struct CruiseProductRepo;

impl CruiseProductRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateCruiseProduct,
    ) -> Result<CruiseProduct, sqlx::Error> {
        let query = format!(
            "INSERT INTO cruise_products
                (code, title, cruise_line, ship_name, departure_port, departure_date, nights,
                 price, cost_price, port_charge, single_supplement_bps, description, itinerary)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                     COALESCE($9, 0), COALESCE($10, 0), COALESCE($11, 5000), $12,
                     COALESCE($13, '[]'::jsonb))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CruiseProduct>(&query)
            .bind(&input.code)
            .bind(&input.title)
            .bind(&input.cruise_line)
            .bind(&input.ship_name)
            .bind(&input.departure_port)
            .bind(input.departure_date)
            .bind(input.nights)
            .bind(input.price)
            .bind(input.cost_price)
            .bind(input.port_charge)
            .bind(input.single_supplement_bps)
            .bind(&input.description)
            .bind(&input.itinerary)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CruiseProduct>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cruise_products WHERE id = $1");
        sqlx::query_as::<_, CruiseProduct>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List products by departure date.
    pub async fn list(
        pool: &PgPool,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CruiseProduct>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cruise_products
             WHERE ($1 OR is_active = true)
               AND ($2::TEXT IS NULL
                    OR title ILIKE '%' || $2 || '%'
                    OR ship_name ILIKE '%' || $2 || '%'
                    OR departure_port ILIKE '%' || $2 || '%')
               AND ($3::TEXT IS NULL OR cruise_line = $3)
               AND ($4::DATE IS NULL OR departure_date >= $4)
               AND ($5::DATE IS NULL OR departure_date <= $5)
             ORDER BY departure_date, id
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, CruiseProduct>(&query)
            .bind(filter.include_inactive)
            .bind(&filter.q)
            .bind(&filter.cruise_line)
            .bind(filter.departure_from)
            .bind(filter.departure_to)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Active products matching any of the search terms, cheapest first.
    pub async fn search_terms(
        pool: &PgPool,
        terms: &[String],
        limit: i64,
    ) -> Result<Vec<CruiseProduct>, sqlx::Error> {
        let patterns: Vec<String> = terms.iter().map(|t| format!("%{t}%")).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM cruise_products
             WHERE is_active = true
               AND departure_date >= CURRENT_DATE
               AND (cardinality($1::TEXT[]) = 0
                    OR title ILIKE ANY($1)
                    OR cruise_line ILIKE ANY($1)
                    OR ship_name ILIKE ANY($1)
                    OR departure_port ILIKE ANY($1))
             ORDER BY price, departure_date
             LIMIT $2"
        );
        sqlx::query_as::<_, CruiseProduct>(&query)
            .bind(&patterns)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Update a product. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCruiseProduct,
    ) -> Result<Option<CruiseProduct>, sqlx::Error> {
        let query = format!(
            "UPDATE cruise_products SET
                title = COALESCE($2, title),
                cruise_line = COALESCE($3, cruise_line),
                ship_name = COALESCE($4, ship_name),
                departure_port = COALESCE($5, departure_port),
                departure_date = COALESCE($6, departure_date),
                nights = COALESCE($7, nights),
                price = COALESCE($8, price),
                cost_price = COALESCE($9, cost_price),
                port_charge = COALESCE($10, port_charge),
                single_supplement_bps = COALESCE($11, single_supplement_bps),
                description = COALESCE($12, description),
                itinerary = COALESCE($13, itinerary),
                is_active = COALESCE($14, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CruiseProduct>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.cruise_line)
            .bind(&input.ship_name)
            .bind(&input.departure_port)
            .bind(input.departure_date)
            .bind(input.nights)
            .bind(input.price)
            .bind(input.cost_price)
            .bind(input.port_charge)
            .bind(input.single_supplement_bps)
            .bind(&input.description)
            .bind(&input.itinerary)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Take a product off sale. Returns `true` if it was active.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cruise_products SET is_active = false WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
