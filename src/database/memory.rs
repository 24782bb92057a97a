use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{actions::users::duplicate_email, store::Store};
use crate::{
    authentication::permissions::Owned,
    error::{HttpError, Result},
    filters::{AttributeFilter, RecipeFilter},
    schema::{
        Attribute, AttributeKind, Id, NewRecipe, NewUser, Recipe, RecipeChanges, RecipeRow, User,
        UserChanges,
    },
};

struct StoredRecipe {
    row: RecipeRow,
    tags: Vec<Id>,
    ingredients: Vec<Id>,
}

impl StoredRecipe {
    fn links(&self, kind: AttributeKind) -> &Vec<Id> {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }

    fn links_mut(&mut self, kind: AttributeKind) -> &mut Vec<Id> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Ingredient => &mut self.ingredients,
        }
    }
}

impl Owned for StoredRecipe {
    fn owner_id(&self) -> Id {
        self.row.user_id
    }
}

#[derive(Default)]
struct Tables {
    sequence: Id,
    users: BTreeMap<Id, User>,
    recipes: BTreeMap<Id, StoredRecipe>,
    tags: BTreeMap<Id, Attribute>,
    ingredients: BTreeMap<Id, Attribute>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.sequence += 1;
        self.sequence
    }

    fn attributes(&self, kind: AttributeKind) -> &BTreeMap<Id, Attribute> {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }

    fn attributes_mut(&mut self, kind: AttributeKind) -> &mut BTreeMap<Id, Attribute> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Ingredient => &mut self.ingredients,
        }
    }

    fn get_or_create_attribute(&mut self, kind: AttributeKind, user_id: Id, name: &str) -> Id {
        let existing = self
            .attributes(kind)
            .values()
            .find(|attribute| attribute.is_owned_by(user_id) && attribute.name == name)
            .map(|attribute| attribute.id);

        match existing {
            Some(id) => id,
            None => {
                let id = self.next_id();
                self.attributes_mut(kind).insert(
                    id,
                    Attribute {
                        id,
                        user_id,
                        name: name.to_string(),
                    },
                );
                id
            }
        }
    }

    fn resolve(&mut self, kind: AttributeKind, user_id: Id, names: &[String]) -> Vec<Id> {
        names
            .iter()
            .map(|name| self.get_or_create_attribute(kind, user_id, name))
            .collect()
    }

    fn assemble(&self, stored: &StoredRecipe) -> Recipe {
        let collect = |kind: AttributeKind| {
            let mut ids = stored.links(kind).to_owned();
            ids.sort_unstable();
            ids.iter()
                .filter_map(|id| self.attributes(kind).get(id).cloned())
                .collect::<Vec<Attribute>>()
        };

        Recipe::from_row(
            stored.row.to_owned(),
            collect(AttributeKind::Tag),
            collect(AttributeKind::Ingredient),
        )
    }

    fn recipe(&self, user_id: Id, id: Id) -> Option<&StoredRecipe> {
        self.recipes
            .get(&id)
            .filter(|stored| stored.is_owned_by(user_id))
    }
}

/// In-process [`Store`] with the same ownership and ordering rules as the
/// Postgres one. Backs the test suite and `serve --in-memory`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write();
        if tables.users.values().any(|other| other.email == user.email) {
            return Err(duplicate_email());
        }

        let id = tables.next_id();
        let user = User {
            id,
            email: user.email,
            name: user.name,
            password: user.password,
            is_active: true,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            last_login: None,
        };
        tables.users.insert(id, user.clone());

        Ok(user)
    }

    async fn update_user(&self, id: Id, changes: UserChanges) -> Result<User> {
        let mut tables = self.tables.write();
        if let Some(email) = &changes.email {
            if tables
                .users
                .values()
                .any(|other| other.id != id && &other.email == email)
            {
                return Err(duplicate_email());
            }
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| HttpError::NotFound.default())?;

        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(password) = changes.password {
            user.password = password;
        }

        Ok(user.clone())
    }

    async fn touch_last_login(&self, id: Id) -> Result<()> {
        if let Some(user) = self.tables.write().users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_user(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        tables.recipes.retain(|_, stored| !stored.is_owned_by(id));
        tables.tags.retain(|_, tag| !tag.is_owned_by(id));
        tables.ingredients.retain(|_, ingredient| !ingredient.is_owned_by(id));

        Ok(true)
    }

    async fn list_recipes(&self, user_id: Id, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        let tables = self.tables.read();

        Ok(tables
            .recipes
            .values()
            .rev()
            .filter(|stored| stored.is_owned_by(user_id))
            .filter(|stored| filter.matches(&stored.tags, &stored.ingredients))
            .map(|stored| tables.assemble(stored))
            .collect())
    }

    async fn get_recipe(&self, user_id: Id, id: Id) -> Result<Option<Recipe>> {
        let tables = self.tables.read();
        Ok(tables.recipe(user_id, id).map(|stored| tables.assemble(stored)))
    }

    async fn create_recipe(&self, user_id: Id, recipe: NewRecipe) -> Result<Recipe> {
        let mut tables = self.tables.write();

        let id = tables.next_id();
        let tags = tables.resolve(AttributeKind::Tag, user_id, &recipe.tags);
        let ingredients = tables.resolve(AttributeKind::Ingredient, user_id, &recipe.ingredients);

        let stored = StoredRecipe {
            row: RecipeRow {
                id,
                user_id,
                title: recipe.title,
                description: recipe.description,
                time_minutes: recipe.time_minutes,
                price_cents: recipe.price.cents(),
                link: recipe.link,
                image: None,
            },
            tags,
            ingredients,
        };

        let created = tables.assemble(&stored);
        tables.recipes.insert(id, stored);

        Ok(created)
    }

    async fn update_recipe(
        &self,
        user_id: Id,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>> {
        let mut tables = self.tables.write();
        if tables.recipe(user_id, id).is_none() {
            return Ok(None);
        }

        let mut links = vec![];
        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            if let Some(names) = changes.attributes(kind) {
                links.push((kind, tables.resolve(kind, user_id, names)));
            }
        }

        let Some(stored) = tables.recipes.get_mut(&id) else {
            return Ok(None);
        };

        let row = &mut stored.row;
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(time_minutes) = changes.time_minutes {
            row.time_minutes = time_minutes;
        }
        if let Some(price) = changes.price {
            row.price_cents = price.cents();
        }
        if let Some(link) = changes.link {
            row.link = link;
        }
        for (kind, ids) in links {
            *stored.links_mut(kind) = ids;
        }

        Ok(tables.recipes.get(&id).map(|stored| tables.assemble(stored)))
    }

    async fn set_recipe_image(
        &self,
        user_id: Id,
        id: Id,
        image: Option<&str>,
    ) -> Result<Option<Option<String>>> {
        let mut tables = self.tables.write();

        Ok(tables
            .recipes
            .get_mut(&id)
            .filter(|stored| stored.is_owned_by(user_id))
            .map(|stored| std::mem::replace(&mut stored.row.image, image.map(str::to_string))))
    }

    async fn delete_recipe(&self, user_id: Id, id: Id) -> Result<Option<Recipe>> {
        let mut tables = self.tables.write();
        let recipe = tables.recipe(user_id, id).map(|stored| tables.assemble(stored));

        if recipe.is_some() {
            tables.recipes.remove(&id);
        }

        Ok(recipe)
    }

    async fn list_attributes(
        &self,
        kind: AttributeKind,
        user_id: Id,
        filter: AttributeFilter,
    ) -> Result<Vec<Attribute>> {
        let tables = self.tables.read();
        let assigned = |id: Id| {
            tables
                .recipes
                .values()
                .any(|stored| stored.links(kind).contains(&id))
        };

        let mut rows: Vec<Attribute> = tables
            .attributes(kind)
            .values()
            .filter(|attribute| attribute.is_owned_by(user_id))
            .filter(|attribute| !filter.assigned_only || assigned(attribute.id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));

        Ok(rows)
    }

    async fn get_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
    ) -> Result<Option<Attribute>> {
        Ok(self
            .tables
            .read()
            .attributes(kind)
            .get(&id)
            .filter(|attribute| attribute.is_owned_by(user_id))
            .cloned())
    }

    async fn create_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        name: &str,
    ) -> Result<Attribute> {
        let mut tables = self.tables.write();
        let id = tables.next_id();
        let attribute = Attribute {
            id,
            user_id,
            name: name.to_string(),
        };
        tables.attributes_mut(kind).insert(id, attribute.clone());

        Ok(attribute)
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
        name: &str,
    ) -> Result<Option<Attribute>> {
        let mut tables = self.tables.write();

        Ok(tables
            .attributes_mut(kind)
            .get_mut(&id)
            .filter(|attribute| attribute.is_owned_by(user_id))
            .map(|attribute| {
                attribute.name = name.to_string();
                attribute.clone()
            }))
    }

    async fn delete_attribute(&self, kind: AttributeKind, user_id: Id, id: Id) -> Result<bool> {
        let mut tables = self.tables.write();
        let owned = tables
            .attributes(kind)
            .get(&id)
            .is_some_and(|attribute| attribute.is_owned_by(user_id));

        if !owned {
            return Ok(false);
        }

        tables.attributes_mut(kind).remove(&id);
        tables
            .recipes
            .values_mut()
            .for_each(|stored| stored.links_mut(kind).retain(|linked| *linked != id));

        Ok(true)
    }
}
