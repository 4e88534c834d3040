//! Category and product mutations.
//!
//! Editor payloads are normalized into the multipart fields the admin API
//! expects. Images arrive from the editor either as `data:` URLs (a picked or
//! captured file) or as remote URLs; the former are uploaded as file parts,
//! the latter passed through as text.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::AdminClient;
use crate::error::AdminError;
use crate::models::{Category, Product};
use crate::pricing::{round2, DiscountEdit};
use crate::{value_id, value_str};

pub const CATEGORIES_PATH: &str = "/api/home-filters";
pub const ADD_CATEGORY_PATH: &str = "/api/admin/add-category";
pub const EDIT_CATEGORY_PATH: &str = "/api/admin/edit-category";
pub const DELETE_CATEGORY_PATH: &str = "/api/delete-category";
pub const ADD_PRODUCT_PATH: &str = "/api/admin/add-product";
pub const EDIT_PRODUCT_PATH: &str = "/api/admin/edit-product";
pub const DELETE_PRODUCT_PATH: &str = "/api/admin/delete-product";

const DEFAULT_PRODUCT_TYPE: &str = "recommendedForYouSection";
const DEFAULT_SPICE_LEVEL: &str = "None";
const DEFAULT_PREPARATION_MINUTES: i64 = 15;
const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Strip non-ASCII characters and surrounding whitespace.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii)
        .collect::<String>()
        .trim()
        .to_string()
}

/// URL slug for a product name: `"Spicy  Chicken Wrap!"` -> `"spicy-chicken-wrap"`.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    let mut slug = String::with_capacity(kept.len());
    for c in kept.chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    slug.trim().to_string()
}

/// Money as sent to the API: two decimals, half-up.
pub fn format_money(amount: Decimal) -> String {
    let mut rounded = round2(amount);
    rounded.rescale(2);
    rounded.to_string()
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Decoded `data:` URL.
    File { bytes: Vec<u8>, mime: String },
    /// Already-hosted image, passed through as text.
    Url(String),
    None,
}

impl ImagePayload {
    pub fn parse(raw: Option<&str>) -> Result<Self, AdminError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(ImagePayload::None);
        };

        if let Some(rest) = raw.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| AdminError::Validation("data URL has no payload".into()))?;
            let Some(mime) = header.strip_suffix(";base64") else {
                return Err(AdminError::Validation(
                    "only base64 data URLs are supported".into(),
                ));
            };
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = BASE64_STANDARD
                .decode(compact)
                .map_err(|e| AdminError::Validation(format!("invalid base64 image data: {e}")))?;
            let mime = if mime.is_empty() {
                "application/octet-stream".to_string()
            } else {
                mime.to_string()
            };
            return Ok(ImagePayload::File { bytes, mime });
        }

        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(ImagePayload::Url(raw.to_string()));
        }
        Ok(ImagePayload::None)
    }

    /// Add this image to `form` under `field`. Malformed images are skipped.
    fn attach(self, form: Form, field: &str, file_name: String) -> Form {
        match self {
            ImagePayload::File { bytes, mime } => {
                let size = bytes.len();
                match Part::bytes(bytes).file_name(file_name).mime_str(&mime) {
                    Ok(part) => {
                        info!(field, size, "attaching image upload");
                        form.part(field.to_string(), part)
                    }
                    Err(e) => {
                        warn!(field, mime = %mime, error = %e, "unusable image mime type, skipping");
                        form
                    }
                }
            }
            ImagePayload::Url(url) => form.text(field.to_string(), url),
            ImagePayload::None => form,
        }
    }
}

fn parse_or_skip(raw: Option<&str>, field: &str) -> ImagePayload {
    ImagePayload::parse(raw).unwrap_or_else(|e| {
        warn!(field, error = %e, "skipping image");
        ImagePayload::None
    })
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryDraft {
    pub name: String,
    pub image: Option<String>,
}

impl CategoryDraft {
    pub fn form_fields(&self, id: Option<&str>) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(id) = id {
            fields.push(("id", id.to_string()));
        }
        fields.push(("name", self.name.trim().to_string()));
        fields
    }

    fn into_form(self, id: Option<&str>) -> Form {
        let mut form = Form::new();
        for (key, value) in self.form_fields(id) {
            form = form.text(key, value);
        }
        let file_name = format!("image_{}.jpg", Utc::now().timestamp_millis());
        parse_or_skip(self.image.as_deref(), "image").attach(form, "image", file_name)
    }
}

/// Product editor payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductDraft {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub ingredients: Vec<String>,
    pub spice_level: Option<String>,
    pub preparation_time: Option<i64>,
    pub is_featured: bool,
    pub is_available: Option<bool>,
    pub status: Option<String>,
    pub average_rating: Option<Decimal>,
    pub featured_image: Option<String>,
    pub gallery_images: Vec<String>,
}

impl ProductDraft {
    /// Draft for editing an existing product. Gallery images already hosted
    /// are not re-sent.
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            slug: Some(product.slug.clone()).filter(|s| !s.is_empty()),
            description: Some(product.description.clone()).filter(|s| !s.is_empty()),
            category_id: product.category_id.clone(),
            product_type: Some(product.product_type.clone()).filter(|s| !s.is_empty()),
            price: product.price,
            sale_price: product.sale_price,
            ingredients: product.ingredients.clone(),
            spice_level: product.spice_level.clone(),
            preparation_time: product.preparation_time.map(|m| m.min(i64::MAX as u64) as i64),
            is_featured: product.is_featured,
            is_available: Some(product.is_available),
            status: Some(product.status.clone()),
            average_rating: Some(product.average_rating),
            featured_image: product.featured_image.clone(),
            gallery_images: Vec::new(),
        }
    }

    /// Take price and sale price from the editor's discount state.
    pub fn apply_discount_edit(&mut self, edit: &DiscountEdit) {
        self.price = edit.price();
        self.sale_price = edit.sale_price();
    }

    /// Text fields for the add/edit product form, with the API's defaults
    /// applied.
    pub fn form_fields(&self, id: Option<&str>) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(id) = id {
            fields.push(("id", id.to_string()));
        }

        fields.push((
            "category_id",
            self.category_id.as_deref().unwrap_or("").trim().to_string(),
        ));
        fields.push((
            "type",
            non_empty(self.product_type.as_deref()).unwrap_or(DEFAULT_PRODUCT_TYPE).to_string(),
        ));
        fields.push(("name", clean_text(&self.name)));

        let slug = match non_empty(self.slug.as_deref()) {
            Some(slug) => clean_text(slug),
            None => clean_text(&slugify(&self.name)),
        };
        fields.push(("slug", slug));
        fields.push((
            "description",
            clean_text(self.description.as_deref().unwrap_or("")),
        ));

        let price = self
            .price
            .filter(|p| !p.is_sign_negative())
            .unwrap_or(Decimal::ZERO);
        fields.push(("price", format_money(price)));
        if let Some(sale) = self.sale_price.filter(|s| *s > Decimal::ZERO) {
            fields.push(("sale_price", format_money(sale)));
        }

        let ingredients: Vec<String> = self
            .ingredients
            .iter()
            .map(|i| clean_text(i))
            .filter(|i| !i.is_empty())
            .collect();
        if !ingredients.is_empty() {
            fields.push(("ingredients", json!(ingredients).to_string()));
        }

        fields.push((
            "spice_level",
            non_empty(self.spice_level.as_deref()).unwrap_or(DEFAULT_SPICE_LEVEL).to_string(),
        ));
        let minutes = self
            .preparation_time
            .filter(|m| *m != 0)
            .unwrap_or(DEFAULT_PREPARATION_MINUTES);
        fields.push(("preparation_time", minutes.to_string()));
        fields.push(("is_featured", flag(self.is_featured)));
        fields.push(("is_available", flag(self.is_available != Some(false))));
        fields.push((
            "status",
            non_empty(self.status.as_deref()).unwrap_or("active").to_string(),
        ));

        let rating = self
            .average_rating
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, MAX_RATING);
        fields.push(("average_rating", rating.normalize().to_string()));

        fields
    }

    fn into_form(self, id: Option<&str>) -> Form {
        let mut form = Form::new();
        for (key, value) in self.form_fields(id) {
            form = form.text(key, value);
        }

        form = parse_or_skip(self.featured_image.as_deref(), "featured_image").attach(
            form,
            "featured_image",
            "featured_image.jpg".to_string(),
        );

        // Only freshly picked images are uploaded; hosted URLs stay as they are.
        for (index, image) in self.gallery_images.iter().enumerate() {
            if let image @ ImagePayload::File { .. } = parse_or_skip(Some(image), "gallery_images[]") {
                form = image.attach(form, "gallery_images[]", format!("gallery_{index}.jpg"));
            }
        }
        form
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn flag(on: bool) -> String {
    (if on { "1" } else { "0" }).to_string()
}

// ---------------------------------------------------------------------------
// API calls
// ---------------------------------------------------------------------------

impl AdminClient {
    pub async fn fetch_categories(&self) -> Result<Vec<Category>, AdminError> {
        categories_from_body(self.get_json(CATEGORIES_PATH, &[]).await?)
    }

    /// Create a category. Fields the server leaves out of its reply are
    /// filled from the draft.
    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category, AdminError> {
        let submitted = draft.clone();
        let data = self
            .post_multipart(ADD_CATEGORY_PATH, draft.into_form(None))
            .await?;
        let category = created_category(&data, &submitted);
        info!(id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// Returns the updated fields the server echoes back.
    pub async fn edit_category(&self, id: &str, draft: CategoryDraft) -> Result<Value, AdminError> {
        let data = self
            .post_multipart(EDIT_CATEGORY_PATH, draft.into_form(Some(id)))
            .await?;
        info!(id, "category updated");
        Ok(data)
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), AdminError> {
        self.delete(&format!("{DELETE_CATEGORY_PATH}/{id}")).await?;
        info!(id, "category deleted");
        Ok(())
    }

    /// Add (`id == None`) or edit a product.
    pub async fn save_product(
        &self,
        id: Option<&str>,
        draft: ProductDraft,
    ) -> Result<Value, AdminError> {
        let path = if id.is_some() {
            EDIT_PRODUCT_PATH
        } else {
            ADD_PRODUCT_PATH
        };
        let data = self.post_multipart(path, draft.into_form(id)).await?;
        info!(id = id.unwrap_or("new"), path, "product saved");
        Ok(data)
    }

    pub async fn delete_product(&self, id: &str) -> Result<(), AdminError> {
        self.post_json(DELETE_PRODUCT_PATH, &json!({ "id": id }))
            .await?;
        info!(id, "product deleted");
        Ok(())
    }
}

/// Categories come back as a bare array or as `{categories: [...]}`.
pub fn categories_from_body(body: Value) -> Result<Vec<Category>, AdminError> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("categories") {
            Some(Value::Array(rows)) => rows,
            _ => {
                warn!("category response has no categories array");
                Vec::new()
            }
        },
        other => {
            return Err(AdminError::Format(format!(
                "unexpected category response: {other}"
            )))
        }
    };
    Ok(rows.into_iter().map(Category::from).collect())
}

fn created_category(data: &Value, submitted: &CategoryDraft) -> Category {
    let name = submitted.name.trim();
    let image = submitted.image.clone().filter(|i| !i.starts_with("data:"));
    Category {
        id: value_id(data, &["id"]).unwrap_or_else(|| Utc::now().timestamp_millis().to_string()),
        name: value_str(data, &["name"])
            .or_else(|| Some(name.to_string()).filter(|n| !n.is_empty()))
            .unwrap_or_else(|| "Untitled".to_string()),
        image: value_str(data, &["image"]).or(image),
        status: value_str(data, &["status"]).unwrap_or_else(|| "Active".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Local filtering
// ---------------------------------------------------------------------------

/// Case-insensitive "any field contains" filter for collections that are
/// not searched server-side.
pub fn filter_by_term<T>(items: &[T], term: &str) -> Vec<T>
where
    T: Serialize + Clone,
{
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| match serde_json::to_value(item) {
            Ok(Value::Object(map)) => map.values().any(|v| field_text(v).contains(&needle)),
            Ok(other) => field_text(&other).contains(&needle),
            Err(_) => false,
        })
        .cloned()
        .collect()
}

fn field_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}
