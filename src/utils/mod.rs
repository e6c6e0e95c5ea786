pub mod constants;
pub mod string_utils;
pub mod url_utils;

pub use constants::*;
pub use string_utils::{safe_truncate_chars, sanitize_title};
pub use url_utils::{image_extension, is_product_page, is_valid_url, product_id_from_url};
