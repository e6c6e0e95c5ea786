//! Product data extraction
//!
//! [`ProductExtractor`] walks a [`crate::page::ProductPage`] through the
//! collection stages and always produces a [`ProductRecord`]; stages that
//! fail leave their field empty.

pub mod image_url;
pub mod lazy_load;
pub mod parameters;
pub mod poll;
pub mod product;
pub mod schema;
pub mod sku;

pub use image_url::{ImageUrlResolver, UrlSet};
pub use lazy_load::{LazyLoadRevealer, RevealOutcome};
pub use parameters::{ParametersDocument, parameter_html, parameters_file_name};
pub use poll::{PollError, poll_until};
pub use product::{Extraction, ExtractionStage, ProductExtractor};
pub use schema::{ProductRecord, SkuVariant};
pub use sku::{SkuVariantWalker, WalkState};
