//! JSON shapes returned by the API.

use serde::Serialize;

use crate::{
    media::MediaStorage,
    schema::{Attribute, Id, Price, Recipe, User},
};

#[derive(Serialize, Debug)]
pub struct UserView<'a> {
    pub email: &'a str,
    pub name: &'a str,
}

impl<'a> From<&'a User> for UserView<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            email: &user.email,
            name: &user.name,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct TokenView {
    pub token: String,
}

#[derive(Serialize, Debug)]
pub struct RecipeSummary<'a> {
    pub id: Id,
    pub title: &'a str,
    pub time_minutes: i32,
    pub price: Price,
    pub link: &'a str,
    pub tags: &'a [Attribute],
    pub ingredients: &'a [Attribute],
}

impl<'a> From<&'a Recipe> for RecipeSummary<'a> {
    fn from(recipe: &'a Recipe) -> Self {
        Self {
            id: recipe.id,
            title: &recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: &recipe.link,
            tags: &recipe.tags,
            ingredients: &recipe.ingredients,
        }
    }
}

/// The list shape plus `description` and `image`.
#[derive(Serialize, Debug)]
pub struct RecipeDetail<'a> {
    #[serde(flatten)]
    pub summary: RecipeSummary<'a>,
    pub description: &'a str,
    pub image: Option<String>,
}

impl<'a> RecipeDetail<'a> {
    pub fn new(recipe: &'a Recipe, media: &MediaStorage) -> Self {
        Self {
            summary: recipe.into(),
            description: &recipe.description,
            image: recipe.image.as_deref().map(|path| media.url(path)),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct RecipeImage {
    pub id: Id,
    pub image: Option<String>,
}
