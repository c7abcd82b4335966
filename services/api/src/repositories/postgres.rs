//! PostgreSQL recipe repository

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::RecipeRepository;
use crate::models::{Attribute, AttributeKind, NewRecipe, Recipe, RecipeChanges, RecipeFilter};

/// Tables backing one attribute kind
struct AttributeTables {
    table: &'static str,
    link_table: &'static str,
    link_column: &'static str,
}

fn tables(kind: AttributeKind) -> AttributeTables {
    match kind {
        AttributeKind::Tag => AttributeTables {
            table: "tags",
            link_table: "recipe_tags",
            link_column: "tag_id",
        },
        AttributeKind::Ingredient => AttributeTables {
            table: "ingredients",
            link_table: "recipe_ingredients",
            link_column: "ingredient_id",
        },
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: i64,
    user_id: Uuid,
    title: String,
    time_minutes: i32,
    price: Decimal,
    description: String,
    link: String,
    image: Option<String>,
}

impl RecipeRow {
    fn into_recipe(self, tags: Vec<Attribute>, ingredients: Vec<Attribute>) -> Recipe {
        Recipe {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            time_minutes: self.time_minutes,
            price: self.price,
            description: self.description,
            link: self.link,
            image: self.image,
            tags,
            ingredients,
        }
    }
}

/// Recipe repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgRecipeRepository {
    pool: PgPool,
}

impl PgRecipeRepository {
    /// Create a new recipe repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load tags or ingredients for a set of recipes, keyed by recipe ID
    async fn load_attributes(
        &self,
        kind: AttributeKind,
        recipe_ids: &[i64],
    ) -> DatabaseResult<HashMap<i64, Vec<Attribute>>> {
        let t = tables(kind);
        let sql = format!(
            r#"
            SELECT l.recipe_id, a.id, a.user_id, a.name
            FROM {link} l
            JOIN {table} a ON a.id = l.{column}
            WHERE l.recipe_id = ANY($1)
            ORDER BY a.id
            "#,
            link = t.link_table,
            table = t.table,
            column = t.link_column,
        );

        let rows = sqlx::query_as::<_, (i64, i64, Uuid, String)>(&sql)
            .bind(recipe_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        let mut attached: HashMap<i64, Vec<Attribute>> = HashMap::new();
        for (recipe_id, id, user_id, name) in rows {
            attached
                .entry(recipe_id)
                .or_default()
                .push(Attribute { id, user_id, name });
        }

        Ok(attached)
    }

    async fn hydrate(&self, rows: Vec<RecipeRow>) -> DatabaseResult<Vec<Recipe>> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut tags = self.load_attributes(AttributeKind::Tag, &ids).await?;
        let mut ingredients = self
            .load_attributes(AttributeKind::Ingredient, &ids)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                row.into_recipe(
                    tags.remove(&id).unwrap_or_default(),
                    ingredients.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }

    /// Look up each name among the owner's records, creating missing ones
    async fn resolve_attribute_ids(
        tx: &mut Transaction<'_, Postgres>,
        kind: AttributeKind,
        owner: Uuid,
        names: &[String],
    ) -> DatabaseResult<Vec<i64>> {
        let t = tables(kind);
        let select = format!(
            "SELECT id FROM {} WHERE user_id = $1 AND name = $2 ORDER BY id LIMIT 1",
            t.table
        );
        let insert = format!(
            "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id",
            t.table
        );

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let existing: Option<i64> = sqlx::query_scalar(&select)
                .bind(owner)
                .bind(name)
                .fetch_optional(&mut **tx)
                .await
                .map_err(DatabaseError::Query)?;

            let id = match existing {
                Some(id) => id,
                None => {
                    info!("Creating {} '{}' for user {}", kind.label(), name, owner);
                    sqlx::query_scalar(&insert)
                        .bind(owner)
                        .bind(name)
                        .fetch_one(&mut **tx)
                        .await
                        .map_err(DatabaseError::Query)?
                }
            };

            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        Ok(ids)
    }

    /// Replace a recipe's links of one kind with the named records
    async fn replace_links(
        tx: &mut Transaction<'_, Postgres>,
        kind: AttributeKind,
        owner: Uuid,
        recipe_id: i64,
        names: &[String],
    ) -> DatabaseResult<()> {
        let ids = Self::resolve_attribute_ids(tx, kind, owner, names).await?;
        let t = tables(kind);

        sqlx::query(&format!(
            "DELETE FROM {} WHERE recipe_id = $1",
            t.link_table
        ))
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::Query)?;

        if !ids.is_empty() {
            sqlx::query(&format!(
                r#"
                INSERT INTO {} (recipe_id, {})
                SELECT $1, UNNEST($2::BIGINT[])
                ON CONFLICT DO NOTHING
                "#,
                t.link_table, t.link_column
            ))
            .bind(recipe_id)
            .bind(ids)
            .execute(&mut **tx)
            .await
            .map_err(DatabaseError::Query)?;
        }

        Ok(())
    }

    async fn begin(&self) -> DatabaseResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(DatabaseError::Connection)
    }
}

#[async_trait]
impl RecipeRepository for PgRecipeRepository {
    async fn list_recipes(
        &self,
        owner: Uuid,
        filter: &RecipeFilter,
    ) -> DatabaseResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT r.id, r.user_id, r.title, r.time_minutes, r.price, r.description, r.link, r.image
            FROM recipes r
            WHERE r.user_id = $1
              AND ($2::BIGINT[] IS NULL OR EXISTS (
                    SELECT 1 FROM recipe_tags rt
                    WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
              AND ($3::BIGINT[] IS NULL OR EXISTS (
                    SELECT 1 FROM recipe_ingredients ri
                    WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
            ORDER BY r.id DESC
            "#,
        )
        .bind(owner)
        .bind(filter.tags.clone())
        .bind(filter.ingredients.clone())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        self.hydrate(rows).await
    }

    async fn get_recipe(&self, owner: Uuid, id: i64) -> DatabaseResult<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, user_id, title, time_minutes, price, description, link, image
            FROM recipes
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create_recipe(&self, owner: Uuid, recipe: NewRecipe) -> DatabaseResult<Recipe> {
        info!("Creating recipe '{}' for user {}", recipe.title, owner);

        let mut tx = self.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO recipes (user_id, title, time_minutes, price, description, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(&recipe.title)
        .bind(recipe.time_minutes)
        .bind(recipe.price)
        .bind(&recipe.description)
        .bind(&recipe.link)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::Query)?;

        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            Self::replace_links(&mut tx, kind, owner, id, recipe.attribute_names(kind)).await?;
        }

        tx.commit().await.map_err(DatabaseError::Query)?;

        self.get_recipe(owner, id)
            .await?
            .ok_or(DatabaseError::Query(sqlx::Error::RowNotFound))
    }

    async fn update_recipe(
        &self,
        owner: Uuid,
        id: i64,
        changes: RecipeChanges,
    ) -> DatabaseResult<Option<Recipe>> {
        let mut tx = self.begin().await?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE recipes
            SET title = COALESCE($3, title),
                time_minutes = COALESCE($4, time_minutes),
                price = COALESCE($5, price),
                description = COALESCE($6, description),
                link = COALESCE($7, link)
            WHERE id = $1 AND user_id = $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&changes.title)
        .bind(changes.time_minutes)
        .bind(changes.price)
        .bind(&changes.description)
        .bind(&changes.link)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::Query)?;

        if updated.is_none() {
            return Ok(None);
        }

        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            if let Some(names) = changes.attribute_names(kind) {
                Self::replace_links(&mut tx, kind, owner, id, names).await?;
            }
        }

        tx.commit().await.map_err(DatabaseError::Query)?;

        self.get_recipe(owner, id).await
    }

    async fn delete_recipe(&self, owner: Uuid, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_recipe_image(
        &self,
        owner: Uuid,
        id: i64,
        image: &str,
    ) -> DatabaseResult<Option<Recipe>> {
        let result = sqlx::query("UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .bind(image)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_recipe(owner, id).await
    }

    async fn list_attributes(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        assigned_only: bool,
    ) -> DatabaseResult<Vec<Attribute>> {
        let t = tables(kind);
        let sql = format!(
            r#"
            SELECT a.id, a.user_id, a.name
            FROM {table} a
            WHERE a.user_id = $1
              AND (NOT $2 OR EXISTS (
                    SELECT 1 FROM {link} l
                    JOIN recipes r ON r.id = l.recipe_id
                    WHERE l.{column} = a.id AND r.user_id = $1))
            ORDER BY a.name DESC, a.id DESC
            "#,
            table = t.table,
            link = t.link_table,
            column = t.link_column,
        );

        sqlx::query_as::<_, Attribute>(&sql)
            .bind(owner)
            .bind(assigned_only)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn get_attribute(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        id: i64,
    ) -> DatabaseResult<Option<Attribute>> {
        let sql = format!(
            "SELECT id, user_id, name FROM {} WHERE id = $1 AND user_id = $2",
            tables(kind).table
        );

        sqlx::query_as::<_, Attribute>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        id: i64,
        name: String,
    ) -> DatabaseResult<Option<Attribute>> {
        let sql = format!(
            r#"
            UPDATE {} SET name = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name
            "#,
            tables(kind).table
        );

        sqlx::query_as::<_, Attribute>(&sql)
            .bind(id)
            .bind(owner)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        id: i64,
    ) -> DatabaseResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 AND user_id = $2",
            tables(kind).table
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    //! These run against a live database and are ignored by default:
    //!
    //! `DATABASE_URL=postgresql://... cargo test -p recipe-api -- --ignored`

    use super::*;
    use common::database::{DatabaseConfig, init_pool, run_migrations};
    use std::str::FromStr;

    async fn repository() -> PgRecipeRepository {
        let config = DatabaseConfig::from_env().unwrap();
        let pool = init_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        PgRecipeRepository::new(pool)
    }

    async fn create_user(repo: &PgRecipeRepository) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, 'unused')")
            .bind(id)
            .bind(format!("{}@example.com", id.simple()))
            .execute(&repo.pool)
            .await
            .unwrap();
        id
    }

    fn new_recipe(title: &str, tags: &[&str], ingredients: &[&str]) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            time_minutes: 10,
            price: Decimal::from_str("5.50").unwrap(),
            description: String::new(),
            link: String::new(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn names(attributes: &[Attribute]) -> Vec<&str> {
        attributes.iter().map(|a| a.name.as_str()).collect()
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_existing_tag_reused_and_new_tag_created() {
        let repo = repository().await;
        let owner = create_user(&repo).await;
        let other = create_user(&repo).await;

        let curry = repo
            .create_recipe(owner, new_recipe("Curry", &["Indian"], &[]))
            .await
            .unwrap();
        repo.create_recipe(other, new_recipe("Dal", &["Indian"], &[]))
            .await
            .unwrap();
        let pongal = repo
            .create_recipe(owner, new_recipe("Pongal", &["Indian", "Breakfast"], &["Rice"]))
            .await
            .unwrap();

        let indian = pongal.tags.iter().find(|t| t.name == "Indian").unwrap();
        assert_eq!(indian.id, curry.tags[0].id);
        assert_eq!(pongal.tags.len(), 2);
        assert_eq!(names(&pongal.ingredients), vec!["Rice"]);

        let tags = repo
            .list_attributes(AttributeKind::Tag, owner, false)
            .await
            .unwrap();
        assert_eq!(names(&tags), vec!["Indian", "Breakfast"]);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_empty_list_clears_links_and_keeps_other_fields() {
        let repo = repository().await;
        let owner = create_user(&repo).await;
        let recipe = repo
            .create_recipe(owner, new_recipe("Soup", &["Lunch"], &["Leek"]))
            .await
            .unwrap();

        let changes = RecipeChanges {
            tags: Some(vec![]),
            ..RecipeChanges::default()
        };
        let updated = repo
            .update_recipe(owner, recipe.id, changes)
            .await
            .unwrap()
            .unwrap();

        assert!(updated.tags.is_empty());
        assert_eq!(names(&updated.ingredients), vec!["Leek"]);
        assert_eq!(updated.title, "Soup");
        assert_eq!(updated.price, recipe.price);

        let tags = repo
            .list_attributes(AttributeKind::Tag, owner, false)
            .await
            .unwrap();
        assert_eq!(names(&tags), vec!["Lunch"]);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_partial_update_only_touches_given_fields() {
        let repo = repository().await;
        let owner = create_user(&repo).await;
        let recipe = repo
            .create_recipe(owner, new_recipe("Original", &["Vegan"], &[]))
            .await
            .unwrap();

        let changes = RecipeChanges {
            title: Some("Renamed".to_string()),
            ..RecipeChanges::default()
        };
        let updated = repo
            .update_recipe(owner, recipe.id, changes)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.time_minutes, recipe.time_minutes);
        assert_eq!(updated.price, recipe.price);
        assert_eq!(updated.tags, recipe.tags);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_tag_filter_returns_each_recipe_once() {
        let repo = repository().await;
        let owner = create_user(&repo).await;
        let both = repo
            .create_recipe(owner, new_recipe("Both", &["Vegan", "Quick"], &["Tofu"]))
            .await
            .unwrap();
        let one = repo
            .create_recipe(owner, new_recipe("One", &["Vegan"], &[]))
            .await
            .unwrap();
        repo.create_recipe(owner, new_recipe("None", &[], &[]))
            .await
            .unwrap();

        let tag_ids: Vec<i64> = both.tags.iter().map(|t| t.id).collect();
        let filter = RecipeFilter {
            tags: Some(tag_ids.clone()),
            ingredients: None,
        };
        let ids: Vec<i64> = repo
            .list_recipes(owner, &filter)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![one.id, both.id]);

        let filter = RecipeFilter {
            tags: Some(tag_ids),
            ingredients: Some(vec![both.ingredients[0].id]),
        };
        let ids: Vec<i64> = repo
            .list_recipes(owner, &filter)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![both.id]);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_assigned_only_lists_each_attribute_once() {
        let repo = repository().await;
        let owner = create_user(&repo).await;
        for title in ["Pancakes", "Porridge"] {
            repo.create_recipe(owner, new_recipe(title, &["Breakfast"], &[]))
                .await
                .unwrap();
        }
        let spare = repo
            .create_recipe(owner, new_recipe("Spare", &["Lunch"], &[]))
            .await
            .unwrap();
        repo.delete_recipe(owner, spare.id).await.unwrap();

        let assigned = repo
            .list_attributes(AttributeKind::Tag, owner, true)
            .await
            .unwrap();
        assert_eq!(names(&assigned), vec!["Breakfast"]);

        let all = repo
            .list_attributes(AttributeKind::Tag, owner, false)
            .await
            .unwrap();
        assert_eq!(names(&all), vec!["Lunch", "Breakfast"]);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_delete_attribute_detaches_and_respects_owner() {
        let repo = repository().await;
        let owner = create_user(&repo).await;
        let intruder = create_user(&repo).await;
        let recipe = repo
            .create_recipe(owner, new_recipe("Salad", &[], &["Lettuce", "Tomato"]))
            .await
            .unwrap();
        let lettuce = recipe.ingredients[0].id;

        assert!(
            !repo
                .delete_attribute(AttributeKind::Ingredient, intruder, lettuce)
                .await
                .unwrap()
        );
        assert!(
            repo.delete_attribute(AttributeKind::Ingredient, owner, lettuce)
                .await
                .unwrap()
        );

        let reloaded = repo.get_recipe(owner, recipe.id).await.unwrap().unwrap();
        assert_eq!(names(&reloaded.ingredients), vec!["Tomato"]);
        assert!(repo.get_recipe(intruder, recipe.id).await.unwrap().is_none());
    }
}
