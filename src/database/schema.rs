use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::constants::PRICE_MAX_CENTS;

pub type Id = i64;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    /// Argon2 hash.
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    /// Already hashed.
    pub password: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    /// Already hashed.
    pub password: Option<String>,
}

/// Tags and ingredients share one shape and differ only in where they live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub fn table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    pub fn link_table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    /// Path segment under `/api/recipe/`.
    pub fn segment(self) -> &'static str {
        self.table()
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub id: Id,
    #[serde(skip_serializing)]
    pub user_id: Id,
    pub name: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price_cents: i32,
    pub link: String,
    pub image: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedAttribute {
    pub recipe_id: Id,
    pub id: Id,
    pub user_id: Id,
    pub name: String,
}

impl From<LinkedAttribute> for Attribute {
    fn from(value: LinkedAttribute) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    /// Path relative to the media root.
    pub image: Option<String>,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

impl Recipe {
    pub fn from_row(row: RecipeRow, tags: Vec<Attribute>, ingredients: Vec<Attribute>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            time_minutes: row.time_minutes,
            price: Price::from_cents(row.price_cents),
            link: row.link,
            image: row.image,
            tags,
            ingredients,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// `None` leaves a field untouched; `Some(vec![])` clears a relation.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Price>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn attributes(&self, kind: AttributeKind) -> Option<&Vec<String>> {
        match kind {
            AttributeKind::Tag => self.tags.as_ref(),
            AttributeKind::Ingredient => self.ingredients.as_ref(),
        }
    }
}

/// Fixed-point price with two decimal places, stored as cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    Invalid,
    Negative,
    TooManyDecimals,
    TooLarge,
}

impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceError::Invalid => write!(f, "A valid number is required."),
            PriceError::Negative => write!(f, "Ensure this value is greater than or equal to 0."),
            PriceError::TooManyDecimals => {
                write!(f, "Ensure that there are no more than 2 decimal places.")
            }
            PriceError::TooLarge => {
                write!(f, "Ensure that there are no more than 5 digits in total.")
            }
        }
    }
}

impl std::error::Error for PriceError {}

impl Price {
    pub fn from_cents(cents: i32) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i32 {
        self.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return match s[1..].parse::<f64>() {
                Ok(value) if value != 0.0 => Err(PriceError::Negative),
                _ => Err(PriceError::Invalid),
            };
        }

        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };

        let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err(PriceError::Invalid);
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > 2 {
            return Err(PriceError::TooManyDecimals);
        }

        let whole = whole.trim_start_matches('0');
        if whole.len() > 3 {
            return Err(PriceError::TooLarge);
        }

        let whole: i32 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| PriceError::Invalid)?
        };
        let fraction: i32 = format!("{fraction:0<2}")
            .parse()
            .map_err(|_| PriceError::Invalid)?;

        let cents = whole * 100 + fraction;
        if cents > PRICE_MAX_CENTS {
            return Err(PriceError::TooLarge);
        }

        Ok(Self(cents))
    }
}

impl TryFrom<&Value> for Price {
    type Error = PriceError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => s.parse(),
            Value::Number(n) => n.to_string().parse(),
            _ => Err(PriceError::Invalid),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
