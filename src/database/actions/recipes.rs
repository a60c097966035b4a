use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    form::{RecipeForm, Validate},
    jwt::SessionData,
    pagination::PageContext,
    schema::{
        Recipe, RecipeIngredientView, RecipeOrder, RecipeRow, RecipeView, UserView, Uuid,
    },
};

use sqlx::{Pool, Postgres, Transaction};

use super::{
    shopping_cart::is_in_shopping_cart, subscriptions::is_subscribed, tags::list_recipe_tags,
    users::get_user_by_id,
};

pub async fn list_recipes(pool: &Pool<Postgres>) -> Result<Vec<Recipe>, ApiError> {
    let rows: Vec<Recipe> = sqlx::query_as("SELECT * FROM recipes ORDER BY name;")
        .fetch_all(&*pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    Ok(rows)
}

pub async fn fetch_recipes(
    order: Option<RecipeOrder>,
    offset: i64,
    search: String,
    author: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, ApiError> {
    let order = order
        .map(|order| match order {
            RecipeOrder::Newest => "pub_date DESC",
            RecipeOrder::Alphabetical => "name",
        })
        .unwrap_or("name");

    let rows: Vec<RecipeRow> = match author {
        Some(author) => {
            sqlx::query_as(&format!("SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, r.pub_date, COUNT(rr) OVER() FROM recipes r LEFT JOIN recipes rr ON rr.id = r.id WHERE r.author_id = $1 AND r.name ILIKE $2 ORDER BY {order} LIMIT $3 OFFSET $4"))
                .bind(author)
                .bind(search)
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(&*pool).await.map_err(|e| QueryError::from(e))?
        }
        None => {
            sqlx::query_as(&format!("SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, r.pub_date, COUNT(rr) OVER() FROM recipes r LEFT JOIN recipes rr ON rr.id = r.id WHERE r.name ILIKE $1 ORDER BY {order} LIMIT $2 OFFSET $3"))
                .bind(search)
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(&*pool).await.map_err(|e| QueryError::from(e))?
        }
    };

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);
    Ok(page)
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    Ok(row)
}

/// Recipe resolved for mutation: missing rows are a NotFound, foreign
/// rows a Forbidden unless the session may manage all recipes.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(ApiError::forbidden())
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(ApiError::not_found("No recipe exists with specified id")),
    }
}

/// Links the tag set and inserts one junction row per ingredient entry.
/// Runs inside the caller's transaction so a bad reference rolls back
/// everything written so far.
async fn set_recipe_associations(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    form: &RecipeForm,
) -> Result<(), ApiError> {
    for tag_id in &form.tags {
        let tag: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = $1")
            .bind(tag_id)
            .fetch_optional(&mut **tr)
            .await
            .map_err(|e| QueryError::from(e))?;
        if tag.is_none() {
            return Err(ApiError::field("tags", "Tag does not exist"));
        }

        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut **tr)
            .await
            .map_err(|e| QueryError::from(e))?;
    }

    for part in &form.ingredients {
        let ingredient: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = $1")
            .bind(part.id)
            .fetch_optional(&mut **tr)
            .await
            .map_err(|e| QueryError::from(e))?;
        if ingredient.is_none() {
            return Err(ApiError::field("ingredients", "Ingredient does not exist"));
        }

        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)")
            .bind(recipe_id)
            .bind(part.id)
            .bind(part.amount)
            .execute(&mut **tr)
            .await
            .map_err(|e| QueryError::from(e))?;
    }

    Ok(())
}

/// One atomic write: the recipe row, its tag links and its ingredient
/// junction rows all land, or none of them do.
pub async fn create_recipe(
    form: &RecipeForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Uuid, ApiError> {
    session.authenticate(ActionType::CreateRecipes)?;
    form.validate()?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(&form.name)
    .bind(&form.image)
    .bind(&form.text)
    .bind(form.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(|e| QueryError::from(e))?;

    let recipe_id = recipe.0;
    set_recipe_associations(&mut tr, recipe_id, form).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("user {} created recipe {recipe_id}", session.user_id);

    Ok(recipe_id)
}

/// Full replace: scalar columns are overwritten and both association
/// sets are deleted and re-inserted from the payload, never merged.
pub async fn update_recipe(
    id: Uuid,
    form: &RecipeForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    get_recipe_mut(id, session, pool).await?;
    form.validate()?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query("UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5")
        .bind(&form.name)
        .bind(&form.image)
        .bind(&form.text)
        .bind(form.cooking_time)
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e))?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e))?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e))?;

    set_recipe_associations(&mut tr, id, form).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("user {} updated recipe {id}", session.user_id);

    Ok(())
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    get_recipe_mut(id, session, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query("DELETE FROM favorites WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e))?;

    sqlx::query("DELETE FROM shopping_cart WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e))?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e))?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e))?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(|e| QueryError::from(e))?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("user {} deleted recipe {id}", session.user_id);

    Ok(())
}

pub async fn list_recipe_ingredients(
    pool: &Pool<Postgres>,
    recipe_id: Uuid,
) -> Result<Vec<RecipeIngredientView>, ApiError> {
    let rows: Vec<RecipeIngredientView> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    Ok(rows)
}

/// Read shape with the viewer-dependent flags; all of them stay false
/// for anonymous viewers.
pub async fn fetch_recipe_view(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeView>, ApiError> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    let author = get_user_by_id(pool, recipe.author_id)
        .await?
        .ok_or_else(|| QueryError::new(format!("Recipe {id} has no author row")))?;

    let ingredients = list_recipe_ingredients(pool, id).await?;
    let tags = list_recipe_tags(pool, id).await?;

    let (is_favorited, in_cart, author_subscribed) = match viewer {
        Some(viewer_id) => (
            is_favorite(id, viewer_id, pool).await?,
            is_in_shopping_cart(id, viewer_id, pool).await?,
            is_subscribed(viewer_id, recipe.author_id, pool).await?,
        ),
        None => (false, false, false),
    };

    Ok(Some(RecipeView {
        id: recipe.id,
        author: UserView::from_user(author, author_subscribed),
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        ingredients,
        tags,
        cooking_time: recipe.cooking_time,
        is_favorited,
        is_in_shopping_cart: in_cart,
    }))
}

pub async fn is_favorite(id: Uuid, user_id: Uuid, pool: &Pool<Postgres>) -> Result<bool, ApiError> {
    let result: Option<(Uuid,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM favorites WHERE recipe_id = $1 AND user_id = $2
    ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    Ok(result.is_some())
}

pub async fn fetch_favorites(
    user_id: Uuid,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, ApiError> {
    let rows: Vec<RecipeRow> = sqlx::query_as("
        SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, r.pub_date, COUNT(rr) OVER()
        FROM favorites f
        INNER JOIN recipes r ON r.id = f.recipe_id
        LEFT JOIN recipes rr ON rr.id = r.id
        WHERE f.user_id = $1 ORDER BY r.name LIMIT $2 OFFSET $3
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

/// Duplicate additions lose at the unique constraint and surface as a
/// conflict, also under concurrent racers.
pub async fn add_to_favorites(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    if get_recipe(id, pool).await?.is_none() {
        return Err(ApiError::not_found("No recipe exists with specified id"));
    }

    let result =
        sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING;")
            .bind(user_id)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| QueryError::from(e))?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::conflict("Recipe is already in favorites"));
    }

    Ok(())
}

pub async fn remove_from_favorites(
    id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    if result.rows_affected() <= 0 {
        return Err(ApiError::not_found("Recipe is not in favorites"));
    }

    Ok(())
}
