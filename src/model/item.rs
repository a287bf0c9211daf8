//! Inventory items and the shapes used to create and change them.
//!
//! Items enter the system as an [`ItemDraft`] (loosely typed, straight from a
//! form or a JSON payload), are sanitized into a [`NewItem`] by the store, and
//! are changed afterwards only through an [`ItemPatch`].

use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Name stored when a draft has no usable name
pub const DEFAULT_ITEM_NAME: &str = "Untitled Item";
/// Low-stock cutoff stored when a draft has no usable threshold
pub const DEFAULT_THRESHOLD: i64 = 5;
/// Swatch stored when a draft has no color
pub const DEFAULT_COLOR_CODE: &str = "#3b82f6";

/// Closed set of item categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Consumable,
    Tool,
    Equipment,
    Miscellaneous,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Consumable,
        Category::Tool,
        Category::Equipment,
        Category::Miscellaneous,
    ];

    /// Label shown to users and stored in the `category` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Consumable => "Consumable",
            Category::Tool => "Tool",
            Category::Equipment => "Equipment",
            Category::Miscellaneous => "Miscellaneous",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "consumable" => Ok(Category::Consumable),
            "tool" => Ok(Category::Tool),
            "equipment" => Ok(Category::Equipment),
            "miscellaneous" | "misc" => Ok(Category::Miscellaneous),
            other => Err(LedgerError::Validation(format!(
                "unknown category '{other}' (expected one of Consumable, Tool, Equipment, Miscellaneous)"
            ))),
        }
    }
}

/// Stock status bucket; every item is in exactly one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stocked material or tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub category: Category,
    pub quantity: i64,
    pub threshold: i64,
    pub location: String,
    pub description: String,
    pub color_code: String,
    pub tags: Vec<String>,
    pub image_ref: Option<String>,
    /// Starts at 1 and grows by one with every stored update
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Threshold is inclusive: `quantity <= threshold` is low stock.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.threshold
    }

    /// Quantities at or below zero count as out of stock.
    pub fn stock_status(&self) -> StockStatus {
        if self.quantity <= 0 {
            StockStatus::OutOfStock
        } else if self.quantity <= self.threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Raw add-item form contents.
///
/// Numbers and tags arrive as text, exactly as typed. Nothing here is trusted
/// until [`ItemDraft::sanitize`] turns it into a [`NewItem`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    pub category: Option<String>,
    pub quantity: Option<String>,
    pub threshold: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub color_code: Option<String>,
    /// Comma separated
    pub tags: String,
    pub image_ref: Option<String>,
}

impl ItemDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn quantity<T: ToString>(mut self, quantity: T) -> Self {
        self.quantity = Some(quantity.to_string());
        self
    }

    pub fn threshold<T: ToString>(mut self, threshold: T) -> Self {
        self.threshold = Some(threshold.to_string());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color_code(mut self, color_code: impl Into<String>) -> Self {
        self.color_code = Some(color_code.into());
        self
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    /// Build a draft from an untyped JSON object.
    ///
    /// Both the snake_case column names (`item_name`, `color_code`,
    /// `image_url`) and the short form keys (`name`, `qty`, `cat`, `loc`,
    /// `desc`, `color`, `img`) are accepted. Unknown keys are ignored; numbers
    /// may be JSON numbers or strings; `tags` may be a string or an array.
    pub fn from_json(value: &JsonValue) -> Result<Self, LedgerError> {
        let object = value.as_object().ok_or_else(|| {
            LedgerError::Validation("item payload must be a JSON object".to_string())
        })?;

        let field = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|key| object.get(*key))
                .find_map(json_scalar_to_string)
        };

        let tags = match object.get("tags") {
            Some(JsonValue::Array(values)) => values
                .iter()
                .filter_map(json_scalar_to_string)
                .collect::<Vec<_>>()
                .join(","),
            Some(other) => json_scalar_to_string(other).unwrap_or_default(),
            None => String::new(),
        };

        Ok(Self {
            name: field(&["name", "item_name"]).unwrap_or_default(),
            category: field(&["category", "cat"]),
            quantity: field(&["quantity", "qty"]),
            threshold: field(&["threshold"]),
            location: field(&["location", "loc"]),
            description: field(&["description", "desc"]),
            color_code: field(&["color_code", "color"]),
            tags,
            image_ref: field(&["image_ref", "image_url", "img"]),
        })
    }

    /// Apply the add-item defaults and parse the loosely typed fields.
    ///
    /// - blank name → [`DEFAULT_ITEM_NAME`]
    /// - absent or non-numeric quantity → 0, negative → 0
    /// - absent or non-numeric threshold → `default_threshold`, negative → 0
    /// - blank tags → no tags, otherwise split on `,`, trimmed, empties dropped
    /// - blank image reference → `None`
    pub fn sanitize(self, default_threshold: i64) -> Result<NewItem, LedgerError> {
        let name = match self.name.trim() {
            "" => DEFAULT_ITEM_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };

        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => Category::default(),
            Some(text) => text.parse()?,
        };

        let quantity = parse_form_int(self.quantity.as_deref()).unwrap_or(0).max(0);
        let threshold = parse_form_int(self.threshold.as_deref())
            .unwrap_or(default_threshold)
            .max(0);

        let color_code = non_blank(self.color_code).unwrap_or_else(|| DEFAULT_COLOR_CODE.to_string());

        Ok(NewItem {
            name,
            category,
            quantity,
            threshold,
            location: self.location.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            color_code,
            tags: parse_tags(&self.tags),
            image_ref: non_blank(self.image_ref),
        })
    }
}

/// A sanitized item ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub category: Category,
    pub quantity: i64,
    pub threshold: i64,
    pub location: String,
    pub description: String,
    pub color_code: String,
    pub tags: Vec<String>,
    pub image_ref: Option<String>,
}

impl NewItem {
    /// Materialize with a fresh identity, version 1
    pub fn into_item(self, id: Uuid, now: DateTime<Utc>) -> Item {
        Item {
            id,
            name: self.name,
            category: self.category,
            quantity: self.quantity,
            threshold: self.threshold,
            location: self.location,
            description: self.description,
            color_code: self.color_code,
            tags: self.tags,
            image_ref: self.image_ref,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; only declared (`Some`) fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub quantity: Option<i64>,
    pub threshold: Option<i64>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub color_code: Option<String>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` clears the image
    pub image_ref: Option<Option<String>>,
    /// Reject the update with `Conflict` unless the stored version matches
    pub expected_version: Option<i64>,
}

impl ItemPatch {
    pub fn quantity_only(quantity: i64) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    pub fn with_expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// True when no field is declared
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.quantity.is_none()
            && self.threshold.is_none()
            && self.location.is_none()
            && self.description.is_none()
            && self.color_code.is_none()
            && self.tags.is_none()
            && self.image_ref.is_none()
    }

    /// Reject declared values that break item invariants.
    ///
    /// Quantity sign is not checked here: whether negatives are clamped is a
    /// coordinator policy.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.is_empty() {
            return Err(LedgerError::Validation(
                "update declares no fields to change".to_string(),
            ));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(LedgerError::Validation("item name must not be blank".to_string()));
            }
        }
        if let Some(threshold) = self.threshold {
            if threshold < 0 {
                return Err(LedgerError::Validation(format!(
                    "threshold must be >= 0, got {threshold}"
                )));
            }
        }
        Ok(())
    }

    /// Write the declared fields into `item`. Versioning is left to the store.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.trim().to_string();
        }
        if let Some(category) = self.category {
            item.category = category;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(threshold) = self.threshold {
            item.threshold = threshold;
        }
        if let Some(location) = &self.location {
            item.location = location.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(color_code) = &self.color_code {
            item.color_code = color_code.clone();
        }
        if let Some(tags) = &self.tags {
            item.tags = tags.clone();
        }
        if let Some(image_ref) = &self.image_ref {
            item.image_ref = image_ref.clone();
        }
    }
}

/// Full replacement of the fields the edit panel exposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEdit {
    pub name: String,
    pub category: Category,
    pub quantity: i64,
    pub location: String,
    pub description: String,
    pub threshold: i64,
    pub expected_version: Option<i64>,
}

impl ItemEdit {
    /// Start an edit from the item as currently displayed
    pub fn from_item(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            category: item.category,
            quantity: item.quantity,
            location: item.location.clone(),
            description: item.description.clone(),
            threshold: item.threshold,
            expected_version: None,
        }
    }
}

impl From<ItemEdit> for ItemPatch {
    fn from(edit: ItemEdit) -> Self {
        ItemPatch {
            name: Some(edit.name),
            category: Some(edit.category),
            quantity: Some(edit.quantity),
            threshold: Some(edit.threshold),
            location: Some(edit.location),
            description: Some(edit.description),
            color_code: None,
            tags: None,
            image_ref: None,
            expected_version: edit.expected_version,
        }
    }
}

/// Parse an integer the way a number input does: whitespace ignored, leading
/// integer prefix accepted (`"12 pcs"` → 12), anything else is `None`.
pub fn parse_form_int(raw: Option<&str>) -> Option<i64> {
    let text = raw?.trim();
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => (-1, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(idx, _)| idx);
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Split a comma separated tag string; blank input yields no tags
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn json_scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
