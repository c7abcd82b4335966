//! Repositories for recipe, tag and ingredient persistence

use async_trait::async_trait;
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{Attribute, AttributeKind, NewRecipe, Recipe, RecipeChanges, RecipeFilter};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRecipeRepository;
pub use postgres::PgRecipeRepository;

/// Owner-scoped storage for recipes and their tags and ingredients
///
/// Every operation takes the owner's ID; rows owned by anyone else behave as
/// if they did not exist. Writes that attach tags or ingredients by name reuse
/// the owner's record with that exact name (lowest ID first) or create one,
/// and apply atomically together with the recipe row.
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Recipes owned by `owner`, newest first
    async fn list_recipes(&self, owner: Uuid, filter: &RecipeFilter)
    -> DatabaseResult<Vec<Recipe>>;

    async fn get_recipe(&self, owner: Uuid, id: i64) -> DatabaseResult<Option<Recipe>>;

    async fn create_recipe(&self, owner: Uuid, recipe: NewRecipe) -> DatabaseResult<Recipe>;

    /// Apply `changes`; `None` when the recipe is missing
    async fn update_recipe(
        &self,
        owner: Uuid,
        id: i64,
        changes: RecipeChanges,
    ) -> DatabaseResult<Option<Recipe>>;

    /// Returns whether a recipe was deleted
    async fn delete_recipe(&self, owner: Uuid, id: i64) -> DatabaseResult<bool>;

    /// Store the relative path of the recipe's image
    async fn set_recipe_image(
        &self,
        owner: Uuid,
        id: i64,
        image: &str,
    ) -> DatabaseResult<Option<Recipe>>;

    /// Tags or ingredients owned by `owner`, by descending name
    ///
    /// With `assigned_only`, only those linked to at least one of the owner's
    /// recipes are returned.
    async fn list_attributes(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        assigned_only: bool,
    ) -> DatabaseResult<Vec<Attribute>>;

    async fn get_attribute(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        id: i64,
    ) -> DatabaseResult<Option<Attribute>>;

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        id: i64,
        name: String,
    ) -> DatabaseResult<Option<Attribute>>;

    /// Delete a tag or ingredient, detaching it from recipes
    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        id: i64,
    ) -> DatabaseResult<bool>;
}
