use crate::{
    authentication::cryptography::{hash_password, verify_password},
    authentication::jwt::generate_jwt_session,
    constants::USER_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    form::{LoginForm, RegisterForm, SetPasswordForm, Validate},
    pagination::PageContext,
    schema::{User, UserRow, UserView, Uuid},
};

use sqlx::{Pool, Postgres};

use super::subscriptions::is_subscribed;

pub async fn get_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&*pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    Ok(row)
}

pub async fn fetch_users(offset: i64, pool: &Pool<Postgres>) -> Result<PageContext<UserRow>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, COUNT(uu) OVER()
        FROM users u LEFT JOIN users uu ON uu.id = u.id
        ORDER BY u.username LIMIT $1 OFFSET $2
    ",
    )
    .bind(USER_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(&*pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, USER_COUNT_PER_PAGE, offset);
    Ok(page)
}

/// User profile as seen by `viewer`. The subscription flag is false for
/// anonymous viewers and for the user's own profile.
pub async fn get_user_view(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Option<UserView>, ApiError> {
    let user = match get_user_by_id(pool, user_id).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    let subscribed = match viewer {
        Some(viewer_id) if viewer_id != user.id => is_subscribed(viewer_id, user.id, pool).await?,
        _ => false,
    };

    Ok(Some(UserView::from_user(user, subscribed)))
}

/// Creates a user; the stored password is the argon2 hash of the
/// submitted one.
pub async fn register_user(form: &RegisterForm, pool: &Pool<Postgres>) -> Result<Uuid, ApiError> {
    form.validate()?;

    let password = hash_password(&form.password).map_err(|e| QueryError::new(format!("{e}")))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(&form.email)
    .bind(&form.username)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .bind(password)
    .fetch_optional(&*pool)
    .await
    .map_err(|e| QueryError::from(e))?;

    match row {
        Some((id,)) => {
            log::info!("registered user {id} ({})", form.username);
            Ok(id)
        }
        None => Err(ApiError::conflict(
            "A user with this username or email already exists",
        )),
    }
}

/// Unknown usernames and wrong passwords are indistinguishable to the
/// caller.
pub async fn login_user(form: &LoginForm, pool: &Pool<Postgres>) -> Result<String, ApiError> {
    let user = match get_user(pool, &form.username).await? {
        Some(user) => user,
        None => return Err(ApiError::invalid("Invalid credentials")),
    };

    let authenticated = verify_password(&form.password, &user.password).unwrap_or(false);
    if !authenticated {
        log::warn!("rejected login for {}", form.username);
        return Err(ApiError::invalid("Invalid credentials"));
    }

    let session = generate_jwt_session(&user);

    Ok(session)
}

pub async fn set_password(
    user_id: Uuid,
    form: &SetPasswordForm,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    form.validate()?;

    let user = match get_user_by_id(pool, user_id).await? {
        Some(user) => user,
        None => return Err(ApiError::not_found("No user exists with specified id")),
    };

    let authenticated = verify_password(&form.current_password, &user.password).unwrap_or(false);
    if !authenticated {
        return Err(ApiError::field("current_password", "Wrong password"));
    }

    let password = hash_password(&form.new_password).map_err(|e| QueryError::new(format!("{e}")))?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(&*pool)
        .await
        .map_err(|e| QueryError::from(e))?;

    log::info!("user {user_id} changed their password");

    Ok(())
}
