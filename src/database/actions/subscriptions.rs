use crate::{
    constants::SUBSCRIPTION_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    pagination::PageContext,
    schema::{AuthorRow, RecipeSummary, SubscriptionView, Uuid},
};

use sqlx::{Pool, Postgres};

use super::users::get_user_by_id;

pub async fn is_subscribed(
    subscriber_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT author_id FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2
    ",
    )
    .bind(subscriber_id)
    .bind(author_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    Ok(result.is_some())
}

/// Self-subscription is rejected before anything touches storage.
pub async fn subscribe(
    subscriber_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    if subscriber_id == author_id {
        return Err(ApiError::invalid("You cannot subscribe to yourself"));
    }

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ApiError::not_found("No user exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (subscriber_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;",
    )
    .bind(subscriber_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::conflict(
            "You are already subscribed to this author",
        ));
    }

    Ok(())
}

pub async fn unsubscribe(
    subscriber_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result =
        sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2")
            .bind(subscriber_id)
            .bind(author_id)
            .execute(pool)
            .await
            .map_err(|e| QueryError::from(e))?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::not_found("You are not subscribed to this author"));
    }

    Ok(())
}

/// Newest-first recipes for one author; `limit` of None means all.
pub async fn list_author_recipes(
    author_id: Uuid,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeSummary>, ApiError> {
    let rows: Vec<RecipeSummary> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time
        FROM recipes WHERE author_id = $1
        ORDER BY pub_date DESC LIMIT $2
    ",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    Ok(rows)
}

pub async fn count_author_recipes(author_id: Uuid, pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    Ok(row.0)
}

async fn build_subscription_view(
    author: AuthorRow,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, ApiError> {
    let recipes = list_author_recipes(author.id, recipes_limit, pool).await?;
    let recipes_amount = count_author_recipes(author.id, pool).await?;

    Ok(SubscriptionView {
        email: author.email,
        id: author.id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed: true,
        recipes,
        recipes_amount,
    })
}

/// Authors the user subscribes to, each with its recipes (optionally
/// capped at `recipes_limit`) and an on-demand recipe count.
pub async fn fetch_subscriptions(
    user_id: Uuid,
    offset: i64,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, ApiError> {
    let rows: Vec<AuthorRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, COUNT(uu) OVER()
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        LEFT JOIN users uu ON uu.id = u.id
        WHERE s.subscriber_id = $1 ORDER BY u.username LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(SUBSCRIPTION_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);

    let mut views = Vec::with_capacity(rows.len());
    for author in rows {
        views.push(build_subscription_view(author, recipes_limit, pool).await?);
    }

    let page = PageContext::from_rows(views, total_count, SUBSCRIPTION_COUNT_PER_PAGE, offset);
    Ok(page)
}

/// Author card returned after a successful subscribe call.
pub async fn get_author_view(
    author_id: Uuid,
    viewer_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Option<SubscriptionView>, ApiError> {
    let author = match get_user_by_id(pool, author_id).await? {
        Some(author) => author,
        None => return Ok(None),
    };

    let subscribed = is_subscribed(viewer_id, author_id, pool).await?;
    let recipes = list_author_recipes(author_id, recipes_limit, pool).await?;
    let recipes_amount = count_author_recipes(author_id, pool).await?;

    Ok(Some(SubscriptionView {
        email: author.email,
        id: author.id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed: subscribed,
        recipes,
        recipes_amount,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn self_subscription_is_rejected_before_storage() {
        // the lazy pool never connects; the guard must fire first
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unreachable")
            .unwrap();

        let result = subscribe(7, 7, &pool).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }
}
