use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::Result,
    filters::AttributeFilter,
    schema::{Attribute, AttributeKind, Id, LinkedAttribute},
};

pub async fn list_attributes(
    kind: AttributeKind,
    user_id: Id,
    filter: AttributeFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Attribute>> {
    let table = kind.table();
    let assigned = if filter.assigned_only {
        format!(
            "AND EXISTS (SELECT 1 FROM {} l WHERE l.{} = a.id)",
            kind.link_table(),
            kind.link_column()
        )
    } else {
        String::new()
    };

    let rows: Vec<Attribute> = sqlx::query_as(&format!(
        "
        SELECT a.id, a.user_id, a.name FROM {table} a
        WHERE a.user_id = $1 {assigned}
        ORDER BY a.name DESC, a.id DESC
    "
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_attribute(
    kind: AttributeKind,
    user_id: Id,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "SELECT id, user_id, name FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn create_attribute(
    kind: AttributeKind,
    user_id: Id,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Attribute> {
    let row: Attribute = sqlx::query_as(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
        kind.table()
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the oldest entry with this name for the user, creating it if needed.
pub async fn get_or_create_attribute(
    kind: AttributeKind,
    user_id: Id,
    name: &str,
    conn: &mut PgConnection,
) -> Result<Id> {
    let table = kind.table();
    let existing: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT id FROM {table} WHERE user_id = $1 AND name = $2 ORDER BY id LIMIT 1"
    ))
    .bind(user_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((id,)) = existing {
        return Ok(id);
    }

    let created: (Id,) = sqlx::query_as(&format!(
        "INSERT INTO {table} (user_id, name) VALUES ($1, $2) RETURNING id"
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(created.0)
}

pub async fn rename_attribute(
    kind: AttributeKind,
    user_id: Id,
    id: Id,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, user_id, name",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Link rows go with it through `ON DELETE CASCADE`.
pub async fn delete_attribute(
    kind: AttributeKind,
    user_id: Id,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_linked_attributes(
    kind: AttributeKind,
    recipe_ids: &[Id],
    conn: &mut PgConnection,
) -> Result<Vec<LinkedAttribute>> {
    let rows: Vec<LinkedAttribute> = sqlx::query_as(&format!(
        "
        SELECT l.recipe_id AS recipe_id, a.id AS id, a.user_id AS user_id, a.name AS name
        FROM {} l
        INNER JOIN {} a ON a.id = l.{}
        WHERE l.recipe_id = ANY($1)
        ORDER BY a.id
    ",
        kind.link_table(),
        kind.table(),
        kind.link_column()
    ))
    .bind(recipe_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Replaces the whole set of links for one recipe.
pub async fn set_recipe_attributes(
    kind: AttributeKind,
    user_id: Id,
    recipe_id: Id,
    names: &[String],
    conn: &mut PgConnection,
) -> Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        kind.link_table()
    ))
    .bind(recipe_id)
    .execute(&mut *conn)
    .await?;

    for name in names {
        let attribute_id = get_or_create_attribute(kind, user_id, name, conn).await?;

        sqlx::query(&format!(
            "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.link_table(),
            kind.link_column()
        ))
        .bind(recipe_id)
        .bind(attribute_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
