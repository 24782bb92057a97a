use std::collections::HashMap;

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::attributes::{list_linked_attributes, set_recipe_attributes};
use crate::{
    error::Result,
    filters::RecipeFilter,
    schema::{
        Attribute, AttributeKind, Id, LinkedAttribute, NewRecipe, Recipe, RecipeChanges,
        RecipeRow,
    },
};

const RECIPE_COLUMNS: &str =
    "r.id, r.user_id, r.title, r.description, r.time_minutes, r.price_cents, r.link, r.image";

pub async fn fetch_recipes(
    user_id: Id,
    filter: &RecipeFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.user_id = "));
    query.push_bind(user_id);

    // EXISTS rather than a join keeps one row per recipe.
    if let Some(tags) = &filter.tags {
        query
            .push(" AND EXISTS (SELECT 1 FROM recipe_tags l")
            .push(" WHERE l.recipe_id = r.id AND l.tag_id = ANY(")
            .push_bind(tags.to_owned())
            .push("))");
    }

    if let Some(ingredients) = &filter.ingredients {
        query
            .push(" AND EXISTS (SELECT 1 FROM recipe_ingredients l")
            .push(" WHERE l.recipe_id = r.id AND l.ingredient_id = ANY(")
            .push_bind(ingredients.to_owned())
            .push("))");
    }

    query.push(" ORDER BY r.id DESC");

    let mut conn = pool.acquire().await?;
    let rows: Vec<RecipeRow> = query.build_query_as().fetch_all(&mut *conn).await?;

    attach_attributes(rows, &mut *conn).await
}

pub async fn get_recipe(user_id: Id, id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>> {
    let mut conn = pool.acquire().await?;

    load_recipe(user_id, id, &mut *conn, false).await
}

/// `lock` holds the row until the surrounding transaction ends.
async fn load_recipe(
    user_id: Id,
    id: Id,
    conn: &mut PgConnection,
    lock: bool,
) -> Result<Option<Recipe>> {
    let lock = if lock { " FOR UPDATE" } else { "" };
    let row: Option<RecipeRow> = sqlx::query_as(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1 AND r.user_id = $2{lock}"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(attach_attributes(vec![row], conn).await?.pop()),
        None => Ok(None),
    }
}

pub async fn create_recipe(
    user_id: Id,
    recipe: NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<Recipe> {
    let mut tx = pool.begin().await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, description, time_minutes, price_cents, link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ",
    )
    .bind(user_id)
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.time_minutes)
    .bind(recipe.price.cents())
    .bind(&recipe.link)
    .fetch_one(&mut *tx)
    .await?;

    set_recipe_attributes(AttributeKind::Tag, user_id, id.0, &recipe.tags, &mut *tx).await?;
    set_recipe_attributes(
        AttributeKind::Ingredient,
        user_id,
        id.0,
        &recipe.ingredients,
        &mut *tx,
    )
    .await?;

    let created = load_recipe(user_id, id.0, &mut *tx, false).await?;
    tx.commit().await?;

    created.ok_or_else(|| sqlx::Error::RowNotFound.into())
}

pub async fn update_recipe(
    user_id: Id,
    id: Id,
    changes: RecipeChanges,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>> {
    let mut tx = pool.begin().await?;

    let updated: Option<(Id,)> = sqlx::query_as(
        "
        UPDATE recipes SET
        title = COALESCE($3, title),
        description = COALESCE($4, description),
        time_minutes = COALESCE($5, time_minutes),
        price_cents = COALESCE($6, price_cents),
        link = COALESCE($7, link)
        WHERE id = $1 AND user_id = $2
        RETURNING id
    ",
    )
    .bind(id)
    .bind(user_id)
    .bind(changes.title.as_ref())
    .bind(changes.description.as_ref())
    .bind(changes.time_minutes)
    .bind(changes.price.map(|price| price.cents()))
    .bind(changes.link.as_ref())
    .fetch_optional(&mut *tx)
    .await?;

    if updated.is_none() {
        return Ok(None);
    }

    for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
        if let Some(names) = changes.attributes(kind) {
            set_recipe_attributes(kind, user_id, id, names, &mut *tx).await?;
        }
    }

    let updated = load_recipe(user_id, id, &mut *tx, false).await?;
    tx.commit().await?;

    Ok(updated)
}

/// Returns the previous image path, `None` when the recipe isn't the user's.
pub async fn set_recipe_image(
    user_id: Id,
    id: Id,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Option<Option<String>>> {
    let previous: Option<(Option<String>,)> = sqlx::query_as(
        "
        UPDATE recipes r SET image = $3
        FROM recipes old
        WHERE r.id = $1 AND r.user_id = $2 AND old.id = r.id
        RETURNING old.image
    ",
    )
    .bind(id)
    .bind(user_id)
    .bind(image)
    .fetch_optional(pool)
    .await?;

    Ok(previous.map(|row| row.0))
}

/// Returns the deleted recipe so its image can be removed afterwards.
pub async fn delete_recipe(user_id: Id, id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>> {
    let mut tx = pool.begin().await?;

    let Some(recipe) = load_recipe(user_id, id, &mut *tx, true).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Some(recipe))
}

async fn attach_attributes(rows: Vec<RecipeRow>, conn: &mut PgConnection) -> Result<Vec<Recipe>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    let mut tags = group_by_recipe(list_linked_attributes(AttributeKind::Tag, &ids, conn).await?);
    let mut ingredients = group_by_recipe(
        list_linked_attributes(AttributeKind::Ingredient, &ids, conn).await?,
    );

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            Recipe::from_row(
                row,
                tags.remove(&id).unwrap_or_default(),
                ingredients.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

fn group_by_recipe(rows: Vec<LinkedAttribute>) -> HashMap<Id, Vec<Attribute>> {
    let mut hashmap: HashMap<Id, Vec<Attribute>> = HashMap::new();
    rows.into_iter()
        .for_each(|row| hashmap.entry(row.recipe_id).or_default().push(row.into()));

    hashmap
}
