pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const INGREDIENT_COUNT_PER_PAGE: i64 = 20;
pub const USER_COUNT_PER_PAGE: i64 = 10;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 10;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 1440;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Usernames that collide with fixed API routes
pub const RESERVED_USERNAMES: &[&str] = &["me", "set_password", "subscriptions", "subscribe"];

pub const SHOPPING_LIST_FILENAME_SUFFIX: &str = "_items_to_buy.txt";

pub const RECIPE_ORDERS: &[(&str, &str)] = &[
    ("newest", "Newest first"),
    ("alphabetical", "Alphabetical"),
];
