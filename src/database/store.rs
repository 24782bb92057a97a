use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::actions::{attributes, recipes, users};
use crate::{
    error::Result,
    filters::{AttributeFilter, RecipeFilter},
    schema::{
        Attribute, AttributeKind, Id, NewRecipe, NewUser, Recipe, RecipeChanges, User,
        UserChanges,
    },
};

/// Persistence seam for the API. Everything taking a `user_id` only ever
/// sees that user's records; `None`/`false` means "not yours or not there".
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn get_user(&self, id: Id) -> Result<Option<User>>;
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn update_user(&self, id: Id, changes: UserChanges) -> Result<User>;
    async fn touch_last_login(&self, id: Id) -> Result<()>;
    async fn delete_user(&self, id: Id) -> Result<bool>;

    async fn list_recipes(&self, user_id: Id, filter: &RecipeFilter) -> Result<Vec<Recipe>>;
    async fn get_recipe(&self, user_id: Id, id: Id) -> Result<Option<Recipe>>;
    async fn create_recipe(&self, user_id: Id, recipe: NewRecipe) -> Result<Recipe>;
    async fn update_recipe(
        &self,
        user_id: Id,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>>;
    /// Returns the image path being replaced.
    async fn set_recipe_image(
        &self,
        user_id: Id,
        id: Id,
        image: Option<&str>,
    ) -> Result<Option<Option<String>>>;
    async fn delete_recipe(&self, user_id: Id, id: Id) -> Result<Option<Recipe>>;

    async fn list_attributes(
        &self,
        kind: AttributeKind,
        user_id: Id,
        filter: AttributeFilter,
    ) -> Result<Vec<Attribute>>;
    async fn get_attribute(&self, kind: AttributeKind, user_id: Id, id: Id)
        -> Result<Option<Attribute>>;
    async fn create_attribute(&self, kind: AttributeKind, user_id: Id, name: &str)
        -> Result<Attribute>;
    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
        name: &str,
    ) -> Result<Option<Attribute>>;
    async fn delete_attribute(&self, kind: AttributeKind, user_id: Id, id: Id) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        users::get_user(&self.pool, email).await
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>> {
        users::get_user_by_id(&self.pool, id).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        users::register_user(&self.pool, user).await
    }

    async fn update_user(&self, id: Id, changes: UserChanges) -> Result<User> {
        users::update_user(&self.pool, id, changes).await
    }

    async fn touch_last_login(&self, id: Id) -> Result<()> {
        users::touch_last_login(&self.pool, id).await
    }

    async fn delete_user(&self, id: Id) -> Result<bool> {
        users::delete_user(&self.pool, id).await
    }

    async fn list_recipes(&self, user_id: Id, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        recipes::fetch_recipes(user_id, filter, &self.pool).await
    }

    async fn get_recipe(&self, user_id: Id, id: Id) -> Result<Option<Recipe>> {
        recipes::get_recipe(user_id, id, &self.pool).await
    }

    async fn create_recipe(&self, user_id: Id, recipe: NewRecipe) -> Result<Recipe> {
        recipes::create_recipe(user_id, recipe, &self.pool).await
    }

    async fn update_recipe(
        &self,
        user_id: Id,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>> {
        recipes::update_recipe(user_id, id, changes, &self.pool).await
    }

    async fn set_recipe_image(
        &self,
        user_id: Id,
        id: Id,
        image: Option<&str>,
    ) -> Result<Option<Option<String>>> {
        recipes::set_recipe_image(user_id, id, image, &self.pool).await
    }

    async fn delete_recipe(&self, user_id: Id, id: Id) -> Result<Option<Recipe>> {
        recipes::delete_recipe(user_id, id, &self.pool).await
    }

    async fn list_attributes(
        &self,
        kind: AttributeKind,
        user_id: Id,
        filter: AttributeFilter,
    ) -> Result<Vec<Attribute>> {
        attributes::list_attributes(kind, user_id, filter, &self.pool).await
    }

    async fn get_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
    ) -> Result<Option<Attribute>> {
        attributes::get_attribute(kind, user_id, id, &self.pool).await
    }

    async fn create_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        name: &str,
    ) -> Result<Attribute> {
        attributes::create_attribute(kind, user_id, name, &self.pool).await
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
        name: &str,
    ) -> Result<Option<Attribute>> {
        attributes::rename_attribute(kind, user_id, id, name, &self.pool).await
    }

    async fn delete_attribute(&self, kind: AttributeKind, user_id: Id, id: Id) -> Result<bool> {
        attributes::delete_attribute(kind, user_id, id, &self.pool).await
    }
}
