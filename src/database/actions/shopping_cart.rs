use chrono::Local;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    jwt::SessionData,
    pagination::PageContext,
    schema::{CartItemRow, RecipeRow, Uuid},
    shopping_list::{aggregate_cart_items, render_shopping_list, shopping_list_filename},
};

use super::recipes::get_recipe;

pub async fn is_in_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM shopping_cart WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    Ok(result.is_some())
}

pub async fn fetch_shopping_cart(
    user_id: Uuid,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, ApiError> {
    let rows: Vec<RecipeRow> = sqlx::query_as("
        SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, r.pub_date, COUNT(rr) OVER()
        FROM shopping_cart sc
        INNER JOIN recipes r ON r.id = sc.recipe_id
        LEFT JOIN recipes rr ON rr.id = r.id
        WHERE sc.user_id = $1 ORDER BY r.name LIMIT $2 OFFSET $3
    ")
        .bind(user_id)
        .bind(RECIPE_COUNT_PER_PAGE)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);

    Ok(page)
}

pub async fn add_to_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    if get_recipe(id, pool).await?.is_none() {
        return Err(ApiError::not_found("No recipe exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(user_id)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::conflict("Recipe is already in the shopping cart"));
    }

    Ok(())
}

pub async fn remove_from_shopping_cart(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::not_found("Recipe is not in the shopping cart"));
    }

    Ok(())
}

/// Every junction row reachable from the user's cart, one row per
/// (recipe, ingredient) pair; aggregation happens in memory afterwards.
pub async fn list_cart_items(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartItemRow>, ApiError> {
    let rows: Vec<CartItemRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    Ok(rows)
}

/// Builds the downloadable document. An empty cart is its own failure
/// condition, never an empty file.
pub async fn download_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(String, String), ApiError> {
    session.authenticate(ActionType::ManageOwnShoppingList)?;

    let rows = list_cart_items(session.user_id, pool).await?;
    if rows.is_empty() {
        return Err(ApiError::invalid("Your shopping cart is empty"));
    }

    let items = aggregate_cart_items(rows);
    let document = render_shopping_list(&session.username, Local::now(), &items);

    log::info!(
        "user {} downloaded a shopping list with {} item groups",
        session.user_id,
        items.len()
    );

    Ok((shopping_list_filename(&session.username), document))
}
