//! Domain records for recipes, tags and ingredients

pub mod attribute;
pub mod recipe;

pub use attribute::{Attribute, AttributeKind, Ingredient, Tag};
pub use recipe::{NewRecipe, Recipe, RecipeChanges, RecipeFilter};
