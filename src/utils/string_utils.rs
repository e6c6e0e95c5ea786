//! UTF-8-safe string helpers used for titles and file names.

use super::constants::{TITLE_MARKETPLACE_SUFFIX, TITLE_MAX_CHARS};

/// Characters that are not allowed in file names on at least one platform.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Safely truncate a string to a maximum number of CHARACTERS (not bytes).
///
/// Respects UTF-8 character boundaries and never panics on multi-byte input
/// such as CJK product titles.
///
/// # Examples
/// ```
/// # use tmall_collect::utils::string_utils::safe_truncate_chars;
/// assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
/// assert_eq!(safe_truncate_chars("天猫商品标题", 2), "天猫");
/// assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
/// ```
#[inline]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Replace every character that is illegal in a file name with `_`.
#[must_use]
pub fn replace_forbidden_filename_chars(s: &str) -> String {
    s.chars()
        .map(|c| if FORBIDDEN_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Turn a raw document title into the product title.
///
/// Forbidden characters are replaced first, then the title is cut to
/// [`TITLE_MAX_CHARS`] characters and finally the marketplace suffix is removed.
/// The order matters: a suffix that was cut in half by truncation stays.
#[must_use]
pub fn sanitize_title(raw: &str) -> String {
    let replaced = replace_forbidden_filename_chars(raw);
    safe_truncate_chars(&replaced, TITLE_MAX_CHARS).replace(TITLE_MARKETPLACE_SUFFIX, "")
}
