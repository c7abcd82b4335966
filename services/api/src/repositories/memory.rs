//! Process-local recipe repository

use async_trait::async_trait;
use common::error::DatabaseResult;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::RecipeRepository;
use crate::models::{Attribute, AttributeKind, NewRecipe, Recipe, RecipeChanges, RecipeFilter};

#[derive(Debug, Clone)]
struct RecipeRecord {
    id: i64,
    user_id: Uuid,
    title: String,
    time_minutes: i32,
    price: Decimal,
    description: String,
    link: String,
    image: Option<String>,
    tag_ids: Vec<i64>,
    ingredient_ids: Vec<i64>,
}

impl RecipeRecord {
    fn links(&self, kind: AttributeKind) -> &[i64] {
        match kind {
            AttributeKind::Tag => &self.tag_ids,
            AttributeKind::Ingredient => &self.ingredient_ids,
        }
    }

    fn links_mut(&mut self, kind: AttributeKind) -> &mut Vec<i64> {
        match kind {
            AttributeKind::Tag => &mut self.tag_ids,
            AttributeKind::Ingredient => &mut self.ingredient_ids,
        }
    }

    fn matches(&self, ids: Option<&[i64]>, kind: AttributeKind) -> bool {
        ids.is_none_or(|ids| self.links(kind).iter().any(|id| ids.contains(id)))
    }
}

#[derive(Debug, Default)]
struct Store {
    last_recipe_id: i64,
    last_tag_id: i64,
    last_ingredient_id: i64,
    recipes: BTreeMap<i64, RecipeRecord>,
    tags: BTreeMap<i64, Attribute>,
    ingredients: BTreeMap<i64, Attribute>,
}

impl Store {
    fn attributes(&self, kind: AttributeKind) -> &BTreeMap<i64, Attribute> {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }

    fn attributes_mut(&mut self, kind: AttributeKind) -> &mut BTreeMap<i64, Attribute> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Ingredient => &mut self.ingredients,
        }
    }

    fn next_attribute_id(&mut self, kind: AttributeKind) -> i64 {
        let last = match kind {
            AttributeKind::Tag => &mut self.last_tag_id,
            AttributeKind::Ingredient => &mut self.last_ingredient_id,
        };
        *last += 1;
        *last
    }

    /// Find or create the owner's records for `names`; IDs come back sorted
    fn resolve(&mut self, kind: AttributeKind, owner: Uuid, names: &[String]) -> Vec<i64> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let existing = self
                .attributes(kind)
                .values()
                .find(|a| a.user_id == owner && &a.name == name)
                .map(|a| a.id);

            let id = match existing {
                Some(id) => id,
                None => {
                    let id = self.next_attribute_id(kind);
                    self.attributes_mut(kind).insert(
                        id,
                        Attribute {
                            id,
                            user_id: owner,
                            name: name.clone(),
                        },
                    );
                    id
                }
            };
            ids.push(id);
        }

        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn load(&self, record: &RecipeRecord) -> Recipe {
        let attached = |kind: AttributeKind| -> Vec<Attribute> {
            record
                .links(kind)
                .iter()
                .filter_map(|id| self.attributes(kind).get(id).cloned())
                .collect()
        };

        Recipe {
            id: record.id,
            user_id: record.user_id,
            title: record.title.clone(),
            time_minutes: record.time_minutes,
            price: record.price,
            description: record.description.clone(),
            link: record.link.clone(),
            image: record.image.clone(),
            tags: attached(AttributeKind::Tag),
            ingredients: attached(AttributeKind::Ingredient),
        }
    }

    fn owned_recipe(&self, owner: Uuid, id: i64) -> Option<&RecipeRecord> {
        self.recipes.get(&id).filter(|r| r.user_id == owner)
    }
}

/// Recipe repository keeping rows in memory
#[derive(Debug, Default)]
pub struct InMemoryRecipeRepository {
    store: RwLock<Store>,
}

impl InMemoryRecipeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeRepository for InMemoryRecipeRepository {
    async fn list_recipes(
        &self,
        owner: Uuid,
        filter: &RecipeFilter,
    ) -> DatabaseResult<Vec<Recipe>> {
        let store = self.store.read().await;

        Ok(store
            .recipes
            .values()
            .rev()
            .filter(|r| r.user_id == owner)
            .filter(|r| r.matches(filter.tags.as_deref(), AttributeKind::Tag))
            .filter(|r| r.matches(filter.ingredients.as_deref(), AttributeKind::Ingredient))
            .map(|r| store.load(r))
            .collect())
    }

    async fn get_recipe(&self, owner: Uuid, id: i64) -> DatabaseResult<Option<Recipe>> {
        let store = self.store.read().await;
        Ok(store.owned_recipe(owner, id).map(|r| store.load(r)))
    }

    async fn create_recipe(&self, owner: Uuid, recipe: NewRecipe) -> DatabaseResult<Recipe> {
        let mut store = self.store.write().await;

        let tag_ids = store.resolve(AttributeKind::Tag, owner, &recipe.tags);
        let ingredient_ids = store.resolve(AttributeKind::Ingredient, owner, &recipe.ingredients);

        store.last_recipe_id += 1;
        let record = RecipeRecord {
            id: store.last_recipe_id,
            user_id: owner,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            description: recipe.description,
            link: recipe.link,
            image: None,
            tag_ids,
            ingredient_ids,
        };

        let created = store.load(&record);
        store.recipes.insert(record.id, record);

        Ok(created)
    }

    async fn update_recipe(
        &self,
        owner: Uuid,
        id: i64,
        changes: RecipeChanges,
    ) -> DatabaseResult<Option<Recipe>> {
        let mut store = self.store.write().await;

        if store.owned_recipe(owner, id).is_none() {
            return Ok(None);
        }

        let mut links = Vec::new();
        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            if let Some(names) = changes.attribute_names(kind) {
                links.push((kind, store.resolve(kind, owner, names)));
            }
        }

        let Some(record) = store.recipes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            record.title = title;
        }
        if let Some(time_minutes) = changes.time_minutes {
            record.time_minutes = time_minutes;
        }
        if let Some(price) = changes.price {
            record.price = price;
        }
        if let Some(description) = changes.description {
            record.description = description;
        }
        if let Some(link) = changes.link {
            record.link = link;
        }
        for (kind, ids) in links {
            *record.links_mut(kind) = ids;
        }

        Ok(store.owned_recipe(owner, id).map(|r| store.load(r)))
    }

    async fn delete_recipe(&self, owner: Uuid, id: i64) -> DatabaseResult<bool> {
        let mut store = self.store.write().await;

        if store.owned_recipe(owner, id).is_none() {
            return Ok(false);
        }
        Ok(store.recipes.remove(&id).is_some())
    }

    async fn set_recipe_image(
        &self,
        owner: Uuid,
        id: i64,
        image: &str,
    ) -> DatabaseResult<Option<Recipe>> {
        let mut store = self.store.write().await;

        match store.recipes.get_mut(&id).filter(|r| r.user_id == owner) {
            Some(record) => record.image = Some(image.to_string()),
            None => return Ok(None),
        }

        Ok(store.owned_recipe(owner, id).map(|r| store.load(r)))
    }

    async fn list_attributes(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        assigned_only: bool,
    ) -> DatabaseResult<Vec<Attribute>> {
        let store = self.store.read().await;

        let is_assigned = |id: i64| {
            store
                .recipes
                .values()
                .any(|r| r.user_id == owner && r.links(kind).contains(&id))
        };

        let mut attributes: Vec<Attribute> = store
            .attributes(kind)
            .values()
            .filter(|a| a.user_id == owner)
            .filter(|a| !assigned_only || is_assigned(a.id))
            .cloned()
            .collect();
        attributes.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));

        Ok(attributes)
    }

    async fn get_attribute(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        id: i64,
    ) -> DatabaseResult<Option<Attribute>> {
        let store = self.store.read().await;
        Ok(store
            .attributes(kind)
            .get(&id)
            .filter(|a| a.user_id == owner)
            .cloned())
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        id: i64,
        name: String,
    ) -> DatabaseResult<Option<Attribute>> {
        let mut store = self.store.write().await;

        Ok(store
            .attributes_mut(kind)
            .get_mut(&id)
            .filter(|a| a.user_id == owner)
            .map(|a| {
                a.name = name;
                a.clone()
            }))
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: Uuid,
        id: i64,
    ) -> DatabaseResult<bool> {
        let mut store = self.store.write().await;

        let owned = store
            .attributes(kind)
            .get(&id)
            .is_some_and(|a| a.user_id == owner);
        if !owned {
            return Ok(false);
        }

        store.attributes_mut(kind).remove(&id);
        for record in store.recipes.values_mut() {
            record.links_mut(kind).retain(|linked| *linked != id);
        }

        Ok(true)
    }
}
