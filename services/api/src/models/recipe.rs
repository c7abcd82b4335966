//! Recipe records and the changes applied to them

use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

use super::attribute::{AttributeKind, Ingredient, Tag};

/// A recipe with its tags and ingredients loaded
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
    pub link: String,
    pub image: Option<String>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A validated recipe to insert
///
/// `tags` and `ingredients` are names resolved against the owner's existing
/// records at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

impl NewRecipe {
    /// Attribute names to attach for `kind`
    pub fn attribute_names(&self, kind: AttributeKind) -> &[String] {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }
}

/// Field updates for an existing recipe; `None` leaves a field unchanged
///
/// A `Some` attribute list replaces the recipe's current links, so
/// `Some(vec![])` detaches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    /// Attribute names to apply for `kind`, if any
    pub fn attribute_names(&self, kind: AttributeKind) -> Option<&[String]> {
        match kind {
            AttributeKind::Tag => self.tags.as_deref(),
            AttributeKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

/// Recipe list filters; a recipe matches a list when linked to any ID in it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}
