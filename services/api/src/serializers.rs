//! Wire formats for recipes, tags and ingredients
//!
//! Request payloads are validated here and turned into model changes;
//! responses are built from loaded records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::{Attribute, NewRecipe, Recipe, RecipeChanges, RecipeFilter},
};

const MAX_CHARS: usize = 255;
const PRICE_DECIMAL_PLACES: u32 = 2;
const PRICE_MAX_DIGITS: u32 = 5;

/// Nested `{ "name": ... }` reference to a tag or ingredient
#[derive(Debug, Clone, Deserialize)]
pub struct NamedAttribute {
    pub name: String,
}

/// Recipe create/update body
///
/// Unknown keys, including `user`, are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<NamedAttribute>>,
    pub ingredients: Option<Vec<NamedAttribute>>,
}

impl RecipePayload {
    /// Validate a create request; title, time_minutes and price are required
    pub fn into_new_recipe(self) -> ApiResult<NewRecipe> {
        let changes = self.into_changes(true)?;

        Ok(NewRecipe {
            title: changes.title.unwrap_or_default(),
            time_minutes: changes.time_minutes.unwrap_or_default(),
            price: changes.price.unwrap_or_default(),
            description: changes.description.unwrap_or_default(),
            link: changes.link.unwrap_or_default(),
            tags: changes.tags.unwrap_or_default(),
            ingredients: changes.ingredients.unwrap_or_default(),
        })
    }

    /// Validate an update; `require_all` is true for PUT, which needs title, time_minutes and price
    pub fn into_changes(self, require_all: bool) -> ApiResult<RecipeChanges> {
        if require_all {
            let mut missing = Vec::new();
            if self.title.is_none() {
                missing.push("title");
            }
            if self.time_minutes.is_none() {
                missing.push("time_minutes");
            }
            if self.price.is_none() {
                missing.push("price");
            }
            if !missing.is_empty() {
                return Err(ApiError::BadRequest(format!(
                    "Missing required fields: {}",
                    missing.join(", ")
                )));
            }
        }

        if let Some(title) = &self.title {
            validate_text("title", title, false)?;
        }
        if let Some(link) = &self.link {
            validate_text("link", link, true)?;
        }
        let price = self.price.map(normalize_price).transpose()?;

        Ok(RecipeChanges {
            title: self.title,
            time_minutes: self.time_minutes,
            price,
            description: self.description,
            link: self.link,
            tags: self.tags.map(attribute_names).transpose()?,
            ingredients: self.ingredients.map(attribute_names).transpose()?,
        })
    }
}

/// Tag or ingredient update body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributePayload {
    pub name: Option<String>,
}

impl AttributePayload {
    /// Validated new name; required unless the update is partial
    pub fn into_name(self, partial: bool) -> ApiResult<Option<String>> {
        match self.name {
            Some(name) => {
                validate_text("name", &name, false)?;
                Ok(Some(name))
            }
            None if partial => Ok(None),
            None => Err(ApiError::BadRequest(
                "Missing required fields: name".to_string(),
            )),
        }
    }
}

/// Query string of the recipe list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

impl RecipeQuery {
    pub fn into_filter(self) -> ApiResult<RecipeFilter> {
        Ok(RecipeFilter {
            tags: self.tags.as_deref().map(parse_id_list).transpose()?.flatten(),
            ingredients: self
                .ingredients
                .as_deref()
                .map(parse_id_list)
                .transpose()?
                .flatten(),
        })
    }
}

/// Query string of the tag and ingredient lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeQuery {
    pub assigned_only: Option<String>,
}

impl AttributeQuery {
    /// `assigned_only` as a flag: any non-zero integer enables it
    pub fn assigned_only(&self) -> ApiResult<bool> {
        match self.assigned_only.as_deref().map(str::trim) {
            None | Some("") => Ok(false),
            Some(raw) => raw.parse::<i64>().map(|value| value != 0).map_err(|_| {
                ApiError::BadRequest(format!("assigned_only must be an integer, got '{}'", raw))
            }),
        }
    }
}

/// Parse `"1,2,3"` into IDs; blank input means no filter
pub fn parse_id_list(raw: &str) -> ApiResult<Option<Vec<i64>>> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part
            .parse::<i64>()
            .map_err(|_| ApiError::BadRequest(format!("Invalid id '{}' in filter", part)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    Ok(if ids.is_empty() { None } else { Some(ids) })
}

fn validate_text(field: &str, value: &str, allow_blank: bool) -> ApiResult<()> {
    if !allow_blank && value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} may not be blank", field)));
    }
    if value.chars().count() > MAX_CHARS {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters long",
            field, MAX_CHARS
        )));
    }
    Ok(())
}

fn attribute_names(items: Vec<NamedAttribute>) -> ApiResult<Vec<String>> {
    items
        .into_iter()
        .map(|item| {
            validate_text("name", &item.name, false)?;
            Ok(item.name)
        })
        .collect()
}

/// Check the price fits NUMERIC(5, 2) and rescale it to two places
fn normalize_price(price: Decimal) -> ApiResult<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ApiError::BadRequest("price may not be negative".to_string()));
    }
    if price.normalize().scale() > PRICE_DECIMAL_PLACES {
        return Err(ApiError::BadRequest(format!(
            "price may have at most {} decimal places",
            PRICE_DECIMAL_PLACES
        )));
    }

    let mut price = price.abs();
    price.rescale(PRICE_DECIMAL_PLACES);
    if price.mantissa() >= 10_i128.pow(PRICE_MAX_DIGITS) {
        return Err(ApiError::BadRequest(format!(
            "price may have at most {} digits",
            PRICE_MAX_DIGITS
        )));
    }

    Ok(price)
}

/// Nested tag or ingredient in responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeResponse {
    pub id: i64,
    pub name: String,
}

impl From<&Attribute> for AttributeResponse {
    fn from(attribute: &Attribute) -> Self {
        Self {
            id: attribute.id,
            name: attribute.name.clone(),
        }
    }
}

/// Recipe as shown in lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<AttributeResponse>,
    pub ingredients: Vec<AttributeResponse>,
}

impl From<&Recipe> for RecipeResponse {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link.clone(),
            tags: recipe.tags.iter().map(AttributeResponse::from).collect(),
            ingredients: recipe
                .ingredients
                .iter()
                .map(AttributeResponse::from)
                .collect(),
        }
    }
}

/// Recipe as shown on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetailResponse {
    #[serde(flatten)]
    pub recipe: RecipeResponse,
    pub description: String,
    pub image: Option<String>,
}

impl From<&Recipe> for RecipeDetailResponse {
    fn from(recipe: &Recipe) -> Self {
        Self {
            recipe: RecipeResponse::from(recipe),
            description: recipe.description.clone(),
            image: recipe.image.clone(),
        }
    }
}

/// Result of an image upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeImageResponse {
    pub id: i64,
    pub image: Option<String>,
}

impl From<&Recipe> for RecipeImageResponse {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            image: recipe.image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use uuid::Uuid;

    fn payload(value: serde_json::Value) -> RecipePayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_requires_title_time_and_price() {
        let err = payload(json!({"title": "Soup"})).into_new_recipe().unwrap_err();
        match err {
            ApiError::BadRequest(msg) => {
                assert!(msg.contains("time_minutes"));
                assert!(msg.contains("price"));
                assert!(!msg.contains("title"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_create_defaults_optional_fields() {
        let recipe = payload(json!({"title": "Soup", "time_minutes": 30, "price": "4.5"}))
            .into_new_recipe()
            .unwrap();

        assert_eq!(recipe.description, "");
        assert_eq!(recipe.link, "");
        assert!(recipe.tags.is_empty());
        assert_eq!(recipe.price.to_string(), "4.50");
    }

    #[test]
    fn test_user_field_is_ignored() {
        let changes = payload(json!({"user": Uuid::new_v4(), "title": "New"}))
            .into_changes(false)
            .unwrap();

        assert_eq!(
            changes,
            RecipeChanges {
                title: Some("New".to_string()),
                ..RecipeChanges::default()
            }
        );
    }

    #[test]
    fn test_full_update_requires_title_time_and_price() {
        let err = payload(json!({"title": "Soup"}))
            .into_changes(true)
            .unwrap_err();
        assert!(
            matches!(err, ApiError::BadRequest(ref msg) if msg == "Missing required fields: time_minutes, price")
        );

        let changes = payload(json!({"title": "Soup"}))
            .into_changes(false)
            .unwrap();
        assert_eq!(changes.title.as_deref(), Some("Soup"));
        assert_eq!(changes.price, None);
    }

    #[test]
    fn test_empty_tag_list_is_kept_as_clear() {
        let changes = payload(json!({"tags": []})).into_changes(false).unwrap();
        assert_eq!(changes.tags, Some(vec![]));
        assert_eq!(changes.ingredients, None);
    }

    #[test]
    fn test_price_validation() {
        assert!(normalize_price(Decimal::from_str("999.99").unwrap()).is_ok());
        assert!(normalize_price(Decimal::from_str("1000.00").unwrap()).is_err());
        assert!(normalize_price(Decimal::from_str("1.234").unwrap()).is_err());
        assert!(normalize_price(Decimal::from_str("-1").unwrap()).is_err());
        assert_eq!(
            normalize_price(Decimal::from_str("2.500").unwrap())
                .unwrap()
                .to_string(),
            "2.50"
        );
    }

    #[test]
    fn test_blank_title_and_long_names_rejected() {
        assert!(payload(json!({"title": "  "})).into_changes(false).is_err());
        let long = "x".repeat(256);
        assert!(payload(json!({"tags": [{"name": long}]}))
            .into_changes(false)
            .is_err());
        assert!(payload(json!({"tags": [{"name": ""}]}))
            .into_changes(false)
            .is_err());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2,3").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(parse_id_list(" 4 , 4,5").unwrap(), Some(vec![4, 5]));
        assert_eq!(parse_id_list("").unwrap(), None);
        assert_eq!(parse_id_list(",").unwrap(), None);
        assert!(parse_id_list("1,abc").is_err());
    }

    #[test]
    fn test_assigned_only_flag() {
        let query = |raw: Option<&str>| AttributeQuery {
            assigned_only: raw.map(str::to_string),
        };

        assert!(!query(None).assigned_only().unwrap());
        assert!(!query(Some("0")).assigned_only().unwrap());
        assert!(query(Some("1")).assigned_only().unwrap());
        assert!(query(Some("yes")).assigned_only().is_err());
    }

    #[test]
    fn test_attribute_payload_partial_and_full() {
        assert_eq!(AttributePayload::default().into_name(true).unwrap(), None);
        assert!(AttributePayload::default().into_name(false).is_err());
        let named = AttributePayload {
            name: Some("Vegan".to_string()),
        };
        assert_eq!(named.into_name(false).unwrap(), Some("Vegan".to_string()));
    }

    #[test]
    fn test_detail_response_shape() {
        let owner = Uuid::new_v4();
        let recipe = Recipe {
            id: 7,
            user_id: owner,
            title: "Pongal".to_string(),
            time_minutes: 20,
            price: Decimal::from_str("2.00").unwrap(),
            description: "Rice and lentils".to_string(),
            link: String::new(),
            image: None,
            tags: vec![Attribute {
                id: 1,
                user_id: owner,
                name: "Indian".to_string(),
            }],
            ingredients: vec![],
        };

        let value = serde_json::to_value(RecipeDetailResponse::from(&recipe)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 7,
                "title": "Pongal",
                "time_minutes": 20,
                "price": "2.00",
                "link": "",
                "tags": [{"id": 1, "name": "Indian"}],
                "ingredients": [],
                "description": "Rice and lentils",
                "image": null
            })
        );

        let summary = serde_json::to_value(RecipeResponse::from(&recipe)).unwrap();
        assert!(summary.get("description").is_none());
        assert!(summary.get("image").is_none());
        assert!(summary.get("user_id").is_none());
    }
}
