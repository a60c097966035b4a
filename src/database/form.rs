use std::collections::HashSet;

use serde::Deserialize;

use crate::constants::{
    MAX_COOKING_TIME, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT, MIN_PASSWORD_LENGTH,
    RESERVED_USERNAMES,
};

use super::error::{ApiError, ValidationErrors};
use super::schema::Uuid;

/// Checks run before any write. Implementations are pure: they either
/// pass or return the full set of field-scoped failures.
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

fn push_if_blank(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(field, "This field may not be blank");
    }
}

pub fn is_valid_hex_color(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next() == Some('#')
        && value.len() == 7
        && chars.all(|c| c.is_ascii_hexdigit())
}

pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeIngredientForm {
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeForm {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<RecipeIngredientForm>,
}

impl Validate for RecipeForm {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::new();

        push_if_blank(&mut errors, "name", &self.name);
        push_if_blank(&mut errors, "image", &self.image);
        push_if_blank(&mut errors, "text", &self.text);

        if self.cooking_time < MIN_COOKING_TIME {
            errors.push("cooking_time", "Cooking time must be at least 1 minute");
        }
        if self.cooking_time > MAX_COOKING_TIME {
            errors.push("cooking_time", "Cooking time cannot exceed one day");
        }

        if self.tags.is_empty() {
            errors.push("tags", "Select at least 1 tag");
        }

        if self.ingredients.is_empty() {
            errors.push("ingredients", "Select at least 1 ingredient");
        }
        if self
            .ingredients
            .iter()
            .any(|part| part.amount < MIN_INGREDIENT_AMOUNT)
        {
            errors.push("ingredients", "Ingredient amount must be at least 1");
        }

        let unique: HashSet<Uuid> = self.ingredients.iter().map(|part| part.id).collect();
        if unique.len() != self.ingredients.len() {
            errors.push("ingredients", "Ingredients in a recipe must be unique");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientForm {
    pub name: String,
    pub measurement_unit: String,
}

impl Validate for IngredientForm {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::new();

        push_if_blank(&mut errors, "name", &self.name);
        push_if_blank(&mut errors, "measurement_unit", &self.measurement_unit);

        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagForm {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl Validate for TagForm {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::new();

        push_if_blank(&mut errors, "name", &self.name);
        if !is_valid_hex_color(&self.color) {
            errors.push("color", "Color must be a #RRGGBB value");
        }
        if !is_valid_slug(&self.slug) {
            errors.push("slug", "Slug may contain only letters, digits, - and _");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl Validate for RegisterForm {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::new();

        push_if_blank(&mut errors, "email", &self.email);
        push_if_blank(&mut errors, "username", &self.username);
        push_if_blank(&mut errors, "first_name", &self.first_name);
        push_if_blank(&mut errors, "last_name", &self.last_name);

        if !self.email.trim().is_empty() && !self.email.contains('@') {
            errors.push("email", "Enter a valid email address");
        }
        if RESERVED_USERNAMES.contains(&self.username.to_lowercase().as_str()) {
            errors.push("username", "This username is not available");
        }
        if self.password.len() < MIN_PASSWORD_LENGTH {
            errors.push("password", "Password must be at least 8 characters long");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPasswordForm {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for SetPasswordForm {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::new();

        push_if_blank(&mut errors, "current_password", &self.current_password);
        if self.new_password.len() < MIN_PASSWORD_LENGTH {
            errors.push(
                "new_password",
                "Password must be at least 8 characters long",
            );
        }
        if !self.new_password.is_empty() && self.new_password == self.current_password {
            errors.push("new_password", "New password matches the current one");
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::error::ApiError;

    fn recipe_form() -> RecipeForm {
        RecipeForm {
            name: String::from("Pancakes"),
            image: String::from("photos/pancakes.png"),
            text: String::from("Mix and fry."),
            cooking_time: 20,
            tags: vec![1],
            ingredients: vec![
                RecipeIngredientForm { id: 1, amount: 100 },
                RecipeIngredientForm { id: 2, amount: 2 },
            ],
        }
    }

    fn validation_errors(result: Result<(), ApiError>) -> crate::error::ValidationErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn complete_recipe_form_passes() {
        assert!(recipe_form().validate().is_ok());
    }

    #[test]
    fn blank_fields_are_reported_per_field() {
        let mut form = recipe_form();
        form.name = String::from("   ");
        form.text = String::new();

        let errors = validation_errors(form.validate());
        assert!(errors.has_field("name"));
        assert!(errors.has_field("text"));
        assert!(!errors.has_field("image"));
    }

    #[test]
    fn cooking_time_bounds_are_inclusive() {
        let mut form = recipe_form();

        form.cooking_time = 1;
        assert!(form.validate().is_ok());

        form.cooking_time = 1440;
        assert!(form.validate().is_ok());

        form.cooking_time = 0;
        assert!(validation_errors(form.validate()).has_field("cooking_time"));

        form.cooking_time = 1441;
        assert!(validation_errors(form.validate()).has_field("cooking_time"));
    }

    #[test]
    fn empty_tag_list_is_rejected() {
        let mut form = recipe_form();
        form.tags.clear();

        assert!(validation_errors(form.validate()).has_field("tags"));
    }

    #[test]
    fn empty_ingredient_list_is_rejected() {
        let mut form = recipe_form();
        form.ingredients.clear();

        assert!(validation_errors(form.validate()).has_field("ingredients"));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let mut form = recipe_form();
        form.ingredients[0].amount = 0;

        assert!(validation_errors(form.validate()).has_field("ingredients"));
    }

    #[test]
    fn duplicate_ingredient_ids_are_rejected() {
        let mut form = recipe_form();
        form.ingredients[1].id = form.ingredients[0].id;

        assert!(validation_errors(form.validate()).has_field("ingredients"));
    }

    #[test]
    fn hex_colors_are_checked_strictly() {
        assert!(is_valid_hex_color("#49B64E"));
        assert!(is_valid_hex_color("#e26c2d"));
        assert!(!is_valid_hex_color("49B64E"));
        assert!(!is_valid_hex_color("#49B64"));
        assert!(!is_valid_hex_color("#49B64EF"));
        assert!(!is_valid_hex_color("#49B64G"));
    }

    #[test]
    fn slugs_allow_identifier_characters_only() {
        assert!(is_valid_slug("breakfast"));
        assert!(is_valid_slug("low-carb_2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("завтрак"));
        assert!(!is_valid_slug("hot meals"));
    }

    #[test]
    fn reserved_usernames_are_rejected() {
        let form = RegisterForm {
            email: String::from("me@example.com"),
            username: String::from("Me"),
            first_name: String::from("M"),
            last_name: String::from("E"),
            password: String::from("long-enough"),
        };

        assert!(validation_errors(form.validate()).has_field("username"));
    }

    #[test]
    fn new_password_must_differ_from_current() {
        let form = SetPasswordForm {
            current_password: String::from("old-password"),
            new_password: String::from("old-password"),
        };

        assert!(validation_errors(form.validate()).has_field("new_password"));
    }

    #[test]
    fn short_new_password_is_rejected() {
        let form = SetPasswordForm {
            current_password: String::from("old-password"),
            new_password: String::from("short"),
        };

        assert!(validation_errors(form.validate()).has_field("new_password"));
    }
}
