use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, Result},
    schema::{Id, NewUser, User, UserChanges},
};

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Creates a user; `user.password` is expected to be hashed already.
pub async fn register_user(pool: &Pool<Postgres>, user: NewUser) -> Result<User> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, name, password, is_staff, is_superuser)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO NOTHING
        RETURNING *
    ",
    )
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password)
    .bind(user.is_staff)
    .bind(user.is_superuser)
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(duplicate_email)
}

pub async fn update_user(pool: &Pool<Postgres>, user_id: Id, changes: UserChanges) -> Result<User> {
    let row: User = sqlx::query_as(
        "
        UPDATE users SET
        email = COALESCE($2, email),
        name = COALESCE($3, name),
        password = COALESCE($4, password)
        WHERE id = $1
        RETURNING *
    ",
    )
    .bind(user_id)
    .bind(changes.email)
    .bind(changes.name)
    .bind(changes.password)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => duplicate_email(),
        e => Error::from(e),
    })?;

    Ok(row)
}

pub async fn touch_last_login(pool: &Pool<Postgres>, user_id: Id) -> Result<()> {
    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Recipes, tags and ingredients go with the user through `ON DELETE CASCADE`.
pub async fn delete_user(pool: &Pool<Postgres>, user_id: Id) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub fn duplicate_email() -> Error {
    Error::field("email", "user with this email already exists.")
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;
    use crate::{
        database::actions::{
            attributes::list_attributes,
            fixtures::{recipe, user},
            recipes::create_recipe,
        },
        filters::AttributeFilter,
        schema::AttributeKind,
    };

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn emails_are_unique(pool: PgPool) {
        let first = user(&pool, "first@example.com").await;
        user(&pool, "second@example.com").await;

        let again = NewUser {
            email: String::from("first@example.com"),
            name: String::new(),
            password: String::from("hash"),
            is_staff: false,
            is_superuser: false,
        };
        assert_eq!(register_user(&pool, again).await.unwrap_err(), duplicate_email());

        let changes = UserChanges {
            email: Some(String::from("second@example.com")),
            ..Default::default()
        };
        assert_eq!(
            update_user(&pool, first, changes).await.unwrap_err(),
            duplicate_email()
        );

        let stored = get_user_by_id(&pool, first).await.unwrap().unwrap();
        assert_eq!(stored.email, "first@example.com");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn updates_keep_omitted_fields(pool: PgPool) {
        let id = user(&pool, "test@example.com").await;
        let changes = UserChanges {
            name: Some(String::from("Renamed")),
            ..Default::default()
        };

        let updated = update_user(&pool, id, changes).await.unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, "test@example.com");
        assert_eq!(updated.password, "hash");
        assert!(updated.last_login.is_none());

        touch_last_login(&pool, id).await.unwrap();
        let stored = get_user(&pool, "test@example.com").await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at Postgres"]
    async fn deleting_a_user_removes_their_records(pool: PgPool) {
        let doomed = user(&pool, "doomed@example.com").await;
        let survivor = user(&pool, "survivor@example.com").await;
        create_recipe(doomed, recipe("Curry", &["Spicy"], &["Rice"]), &pool)
            .await
            .unwrap();
        create_recipe(survivor, recipe("Salad", &["Fresh"], &[]), &pool)
            .await
            .unwrap();

        assert!(delete_user(&pool, doomed).await.unwrap());
        assert!(!delete_user(&pool, doomed).await.unwrap());
        assert!(get_user_by_id(&pool, doomed).await.unwrap().is_none());

        let recipes: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE user_id = $1")
            .bind(doomed)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(recipes.0, 0);

        let filter = AttributeFilter {
            assigned_only: false,
        };
        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            let left = list_attributes(kind, doomed, filter, &pool).await.unwrap();
            assert!(left.is_empty());
        }

        let links: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipe_tags")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links.0, 1);
    }
}
