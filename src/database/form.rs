use serde_json::{Map, Value};

use super::{
    error::ValidationErrors,
    schema::{NewRecipe, Price, RecipeChanges},
};
use crate::{
    constants::{
        EMAIL_MAX_LENGTH, LINK_MAX_LENGTH, NAME_MAX_LENGTH, PASSWORD_MIN_LENGTH, TITLE_MAX_LENGTH,
    },
    error::{Error, HttpError},
};

pub type FormData = Map<String, Value>;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NULL: &str = "This field may not be null.";
const NOT_A_STRING: &str = "Not a valid string.";

#[derive(Clone, Copy, Debug)]
pub struct TextRule {
    pub required: bool,
    pub allow_blank: bool,
    pub trim: bool,
    pub min_length: usize,
    pub max_length: Option<usize>,
}

impl TextRule {
    pub const fn required(max_length: usize) -> Self {
        Self {
            required: true,
            allow_blank: false,
            trim: true,
            min_length: 0,
            max_length: Some(max_length),
        }
    }

    pub const fn optional(max_length: Option<usize>) -> Self {
        Self {
            required: false,
            allow_blank: true,
            trim: true,
            min_length: 0,
            max_length,
        }
    }

    pub const fn password(min_length: usize) -> Self {
        Self {
            required: true,
            allow_blank: false,
            trim: false,
            min_length,
            max_length: None,
        }
    }
}

/// Reads fields out of a JSON object, collecting a message per bad field
/// instead of stopping at the first one. In partial mode a missing field is
/// not an error, it is just absent.
pub struct Form {
    inner: FormData,
    partial: bool,
    errors: ValidationErrors,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self {
            inner: data,
            partial: false,
            errors: ValidationErrors::new(),
        }
    }

    pub fn partial(data: FormData) -> Self {
        Self {
            partial: true,
            ..Self::from_data(data)
        }
    }

    pub fn error(&mut self, key: &str, message: impl Into<String>) {
        self.errors.add(key, message);
    }

    fn missing(&mut self, key: &str, required: bool) {
        if required && !self.partial {
            self.errors.add(key, REQUIRED);
        }
    }

    pub fn get_str(&mut self, key: &str, rule: TextRule) -> Option<String> {
        let value = match self.inner.get(key) {
            Some(Value::Null) if !rule.required => return Some(String::new()),
            Some(Value::Null) => {
                self.errors.add(key, NULL);
                return None;
            }
            Some(Value::String(value)) => value.to_owned(),
            Some(Value::Number(value)) => value.to_string(),
            Some(_) => {
                self.errors.add(key, NOT_A_STRING);
                return None;
            }
            None => {
                self.missing(key, rule.required);
                return None;
            }
        };

        let value = if rule.trim {
            value.trim().to_string()
        } else {
            value
        };

        if value.is_empty() && !rule.allow_blank {
            self.errors.add(key, BLANK);
            return None;
        }

        let length = value.chars().count();
        if length < rule.min_length {
            self.errors.add(
                key,
                format!(
                    "Ensure this field has at least {} characters.",
                    rule.min_length
                ),
            );
            return None;
        }

        if let Some(max_length) = rule.max_length {
            if length > max_length {
                self.errors.add(
                    key,
                    format!("Ensure this field has no more than {max_length} characters."),
                );
                return None;
            }
        }

        Some(value)
    }

    pub fn get_number(&mut self, key: &str, min: i64) -> Option<i32> {
        let parsed = match self.inner.get(key) {
            Some(Value::Number(value)) => value.as_i64(),
            Some(Value::String(value)) => value.trim().parse::<i64>().ok(),
            Some(_) => None,
            None => {
                self.missing(key, true);
                return None;
            }
        };

        match parsed.map(i32::try_from) {
            Some(Ok(value)) if i64::from(value) >= min => Some(value),
            Some(Ok(_)) => {
                self.errors.add(
                    key,
                    format!("Ensure this value is greater than or equal to {min}."),
                );
                None
            }
            Some(Err(_)) => {
                self.errors.add(key, "Ensure this value is within the integer range.");
                None
            }
            None => {
                self.errors.add(key, "A valid integer is required.");
                None
            }
        }
    }

    pub fn get_price(&mut self, key: &str) -> Option<Price> {
        match self.inner.get(key) {
            Some(value) => match Price::try_from(value) {
                Ok(price) => Some(price),
                Err(e) => {
                    self.errors.add(key, e.to_string());
                    None
                }
            },
            None => {
                self.missing(key, true);
                None
            }
        }
    }

    /// Nested `[{"name": ...}]` lists. Always optional.
    pub fn get_names(&mut self, key: &str) -> Option<Vec<String>> {
        let items = match self.inner.get(key) {
            Some(Value::Array(items)) => items.to_owned(),
            Some(Value::Null) => {
                self.errors.add(key, NULL);
                return None;
            }
            Some(other) => {
                self.errors.add(
                    key,
                    format!(
                        "Expected a list of items but got type \"{}\".",
                        json_type(other)
                    ),
                );
                return None;
            }
            None => return None,
        };

        let mut names: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let name = item
                .get("name")
                .and_then(Value::as_str)
                .map(|name| name.trim().to_string());

            match name {
                Some(name) if name.is_empty() => {
                    self.errors.add(key, format!("name: {BLANK}"));
                }
                Some(name) if name.chars().count() > NAME_MAX_LENGTH => {
                    let message = format!(
                        "name: Ensure this field has no more than {NAME_MAX_LENGTH} characters."
                    );
                    self.errors.add(key, message);
                }
                Some(name) => {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                None => self.errors.add(key, format!("name: {REQUIRED}")),
            }
        }

        Some(names)
    }

    pub fn finish(self) -> Result<(), Error> {
        self.errors.into_result()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Lower-cases the domain part, like most mail systems treat it.
pub fn normalize_email(email: &str) -> String {
    match email.trim().rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.trim().to_string(),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && (domain.contains('.') || domain == "localhost")
        }
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct UserInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl UserInput {
    /// `partial` is PATCH semantics; otherwise every field must be present.
    pub fn parse(data: FormData, partial: bool) -> Result<Self, Error> {
        let mut form = if partial {
            Form::partial(data)
        } else {
            Form::from_data(data)
        };

        let email = form.get_str("email", TextRule::required(EMAIL_MAX_LENGTH));
        let email = match email {
            Some(email) if is_valid_email(&email) => Some(normalize_email(&email)),
            Some(_) => {
                form.error("email", "Enter a valid email address.");
                None
            }
            None => None,
        };

        let password = form.get_str("password", TextRule::password(PASSWORD_MIN_LENGTH));
        let name = form.get_str("name", TextRule::required(NAME_MAX_LENGTH));

        form.finish()?;

        Ok(Self {
            email,
            password,
            name,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn parse(data: FormData) -> Result<Self, Error> {
        let mut form = Form::from_data(data);

        let email = form.get_str("email", TextRule::required(EMAIL_MAX_LENGTH));
        let password = form.get_str("password", TextRule::password(0));

        form.finish()?;

        match (email, password) {
            (Some(email), Some(password)) => Ok(Self {
                email: normalize_email(&email),
                password,
            }),
            _ => Err(HttpError::InvalidRequest.default()),
        }
    }
}

impl NewRecipe {
    pub fn parse(data: FormData) -> Result<Self, Error> {
        let mut form = Form::from_data(data);

        let title = form.get_str("title", TextRule::required(TITLE_MAX_LENGTH));
        let time_minutes = form.get_number("time_minutes", 0);
        let price = form.get_price("price");
        let description = form.get_str("description", TextRule::optional(None));
        let link = form.get_str("link", TextRule::optional(Some(LINK_MAX_LENGTH)));
        let tags = form.get_names("tags");
        let ingredients = form.get_names("ingredients");

        form.finish()?;

        match (title, time_minutes, price) {
            (Some(title), Some(time_minutes), Some(price)) => Ok(Self {
                title,
                description: description.unwrap_or_default(),
                time_minutes,
                price,
                link: link.unwrap_or_default(),
                tags: tags.unwrap_or_default(),
                ingredients: ingredients.unwrap_or_default(),
            }),
            _ => Err(HttpError::InvalidRequest.default()),
        }
    }
}

impl RecipeChanges {
    pub fn parse(data: FormData, partial: bool) -> Result<Self, Error> {
        let mut form = if partial {
            Form::partial(data)
        } else {
            Form::from_data(data)
        };

        let changes = Self {
            title: form.get_str("title", TextRule::required(TITLE_MAX_LENGTH)),
            time_minutes: form.get_number("time_minutes", 0),
            price: form.get_price("price"),
            description: form.get_str("description", TextRule::optional(None)),
            link: form.get_str("link", TextRule::optional(Some(LINK_MAX_LENGTH))),
            tags: form.get_names("tags"),
            ingredients: form.get_names("ingredients"),
        };

        form.finish()?;

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn data(value: Value) -> FormData {
        value.as_object().cloned().unwrap()
    }

    fn field_errors(error: Error) -> Value {
        serde_json::to_value(&error.body).unwrap()
    }

    #[test]
    fn new_recipe_requires_core_fields() {
        let error = NewRecipe::parse(data(json!({ "description": "x" }))).unwrap_err();
        let body = field_errors(error);

        assert_eq!(body["title"][0], REQUIRED);
        assert_eq!(body["time_minutes"][0], REQUIRED);
        assert_eq!(body["price"][0], REQUIRED);
        assert!(body.get("description").is_none());
    }

    #[test]
    fn new_recipe_collects_nested_names() {
        let recipe = NewRecipe::parse(data(json!({
            "title": "Thai curry",
            "time_minutes": 30,
            "price": "2.50",
            "tags": [{ "name": "Thai" }, { "name": "Dinner" }, { "name": "Thai" }],
        })))
        .unwrap();

        assert_eq!(recipe.tags, vec!["Thai", "Dinner"]);
        assert!(recipe.ingredients.is_empty());
        assert_eq!(recipe.price.cents(), 250);
        assert_eq!(recipe.link, "");
    }

    #[test]
    fn bad_values_are_reported_per_field() {
        let error = NewRecipe::parse(data(json!({
            "title": "  ",
            "time_minutes": -1,
            "price": "1.999",
            "tags": "Thai",
        })))
        .unwrap_err();
        let body = field_errors(error);

        assert_eq!(body["title"][0], BLANK);
        assert_eq!(
            body["time_minutes"][0],
            "Ensure this value is greater than or equal to 0."
        );
        assert_eq!(
            body["price"][0],
            "Ensure that there are no more than 2 decimal places."
        );
        assert_eq!(
            body["tags"][0],
            "Expected a list of items but got type \"str\"."
        );
    }

    #[test]
    fn partial_changes_skip_missing_fields() {
        let changes = RecipeChanges::parse(data(json!({ "title": "New title" })), true).unwrap();

        assert_eq!(changes.title.as_deref(), Some("New title"));
        assert!(changes.price.is_none());
        assert!(changes.tags.is_none());
    }

    #[test]
    fn full_changes_require_core_fields() {
        let error = RecipeChanges::parse(data(json!({ "title": "New title" })), false).unwrap_err();
        let body = field_errors(error);

        assert_eq!(body["price"][0], REQUIRED);
        assert_eq!(body["time_minutes"][0], REQUIRED);
    }

    #[test]
    fn empty_tag_list_is_kept_as_a_clear() {
        let changes = RecipeChanges::parse(data(json!({ "tags": [] })), true).unwrap();
        assert_eq!(changes.tags, Some(vec![]));
    }

    #[test]
    fn user_input_validates_email_and_password() {
        let error = UserInput::parse(
            data(json!({ "email": "not-an-email", "password": "pw", "name": "Test" })),
            false,
        )
        .unwrap_err();
        let body = field_errors(error);

        assert_eq!(body["email"][0], "Enter a valid email address.");
        assert_eq!(
            body["password"][0],
            "Ensure this field has at least 5 characters."
        );
    }

    #[test]
    fn emails_are_normalized() {
        let user = UserInput::parse(
            data(json!({ "email": "Test@EXAMPLE.com", "password": "testpass123", "name": "Test" })),
            false,
        )
        .unwrap();

        assert_eq!(user.email.as_deref(), Some("Test@example.com"));
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("admin@localhost"));
        assert!(!is_valid_email("test@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("test example@example.com"));
        assert!(!is_valid_email("test@example."));
    }

    #[test]
    fn passwords_are_not_trimmed() {
        let credentials = Credentials::parse(data(json!({
            "email": "test@example.com",
            "password": " spaced ",
        })))
        .unwrap();

        assert_eq!(credentials.password, " spaced ");
    }
}
