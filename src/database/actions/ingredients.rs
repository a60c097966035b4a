use crate::{
    authentication::permissions::ActionType,
    constants::INGREDIENT_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    form::{IngredientForm, Validate},
    jwt::SessionData,
    pagination::PageContext,
    schema::{Ingredient, IngredientRow, Uuid},
};

use sqlx::{Pool, Postgres};

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY name;")
        .fetch_all(&*pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    Ok(rows)
}

pub async fn fetch_ingredients(
    offset: i64,
    search: String,
    pool: &Pool<Postgres>,
) -> Result<PageContext<IngredientRow>, ApiError> {
    let rows: Vec<IngredientRow> = sqlx::query_as(
        "
        SELECT i.*, COUNT(ii) OVER()
        FROM ingredients i LEFT JOIN ingredients ii ON ii.id = i.id
        WHERE i.name ILIKE $1 ORDER BY i.name LIMIT $2 OFFSET $3
    ",
    )
    .bind(search)
    .bind(INGREDIENT_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, INGREDIENT_COUNT_PER_PAGE, offset);
    Ok(page)
}

pub async fn get_ingredient(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    Ok(row)
}

/// Lookup by ingredient identity, the (name, measurement unit) pair.
pub async fn find_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Uuid>, ApiError> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM ingredients WHERE LOWER(name) = LOWER($1) AND measurement_unit = $2",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    Ok(row.map(|r| r.0))
}

pub async fn create_ingredient(
    form: &IngredientForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Uuid, ApiError> {
    session.authenticate(ActionType::ManageIngredients)?;
    form.validate()?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(&form.name)
    .bind(&form.measurement_unit)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    match row {
        Some((id,)) => Ok(id),
        None => Err(ApiError::conflict(
            "An ingredient with this name and measurement unit already exists",
        )),
    }
}
