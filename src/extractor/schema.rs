use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::constants::UNKNOWN_PRODUCT_ID;

/// Everything collected from one product page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub product_id: Option<String>,
    pub title: Option<String>,
    pub video_url: Option<String>,
    pub main_images: Vec<String>,
    pub detail_images: Vec<String>,
    /// Stylesheet plus the rewritten parameter block, or empty
    pub parameter_html: String,
    pub sku_variants: Vec<SkuVariant>,
    pub source_url: String,
    pub collected_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Record with every field at its default, stamped now
    #[must_use]
    pub fn empty(source_url: impl Into<String>) -> Self {
        Self {
            product_id: None,
            title: None,
            video_url: None,
            main_images: Vec::new(),
            detail_images: Vec::new(),
            parameter_html: String::new(),
            sku_variants: Vec::new(),
            source_url: source_url.into(),
            collected_at: Utc::now(),
        }
    }

    /// Product id used in paths, `"0"` when unknown
    #[must_use]
    pub fn path_id(&self) -> &str {
        self.product_id.as_deref().unwrap_or(UNKNOWN_PRODUCT_ID)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuVariant {
    /// Kept for the downstream editor's schema; never filled here
    pub sku_id: Option<String>,
    pub name_cn: String,
    /// Filled by an external translation step
    pub name_en: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<String>,
}

impl SkuVariant {
    #[must_use]
    pub fn new(name_cn: impl Into<String>, image_url: Option<String>, price: Option<String>) -> Self {
        Self {
            sku_id: None,
            name_cn: name_cn.into(),
            name_en: None,
            image_url,
            price,
        }
    }
}
