//! JavaScript evaluated by the live page driver
//!
//! Elements cannot be held across CDP round trips, so every element returned
//! by a query is stamped with a numeric handle attribute and addressed by it
//! afterwards. Every script returns an object: `{ v: value }` on success or
//! `{ missing: true }` when the addressed element has left the document.

/// Attribute carrying the element handle
pub const HANDLE_ATTRIBUTE: &str = "data-tc-handle";

pub const URL_SCRIPT: &str = "({ v: window.location.href })";

pub const TITLE_SCRIPT: &str = "({ v: document.title })";

/// Resolves once `document.readyState` is `complete`
pub const READY_STATE_SCRIPT: &str = "({ v: document.readyState === 'complete' && document.body !== null })";

/// Quote a Rust string as a JS string literal
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn on_element(handle: u64, body: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector('[{HANDLE_ATTRIBUTE}="{handle}"]');
            if (!el) return {{ missing: true }};
            {body}
        }})()"#
    )
}

/// Stamp and return handles of all matches of `selector` under the scope
/// (the whole document when `scope` is `None`)
pub fn select_all(scope: Option<u64>, selector: &str) -> String {
    let root = match scope {
        Some(handle) => format!("document.querySelector('[{HANDLE_ATTRIBUTE}=\"{handle}\"]')"),
        None => "document".to_string(),
    };
    let selector = js_string(selector);
    format!(
        r#"(() => {{
            const root = {root};
            if (!root) return {{ missing: true }};
            const handles = [];
            for (const el of root.querySelectorAll({selector})) {{
                if (!el.hasAttribute('{HANDLE_ATTRIBUTE}')) {{
                    window.__tcHandleSeq = (window.__tcHandleSeq || 0) + 1;
                    el.setAttribute('{HANDLE_ATTRIBUTE}', String(window.__tcHandleSeq));
                }}
                handles.push(Number(el.getAttribute('{HANDLE_ATTRIBUTE}')));
            }}
            return {{ v: handles }};
        }})()"#
    )
}

pub fn attribute(handle: u64, name: &str) -> String {
    on_element(
        handle,
        &format!("return {{ v: el.getAttribute({}) }};", js_string(name)),
    )
}

pub fn attributes(handle: u64) -> String {
    on_element(
        handle,
        &format!(
            "return {{ v: Array.from(el.attributes)
                .filter(a => a.name !== '{HANDLE_ATTRIBUTE}')
                .map(a => [a.name, a.value]) }};"
        ),
    )
}

/// The resolved `src` property, which lazy loaders often set without
/// touching the attribute
pub fn rendered_src(handle: u64) -> String {
    on_element(handle, "return { v: el.src || el.getAttribute('src') || null };")
}

pub fn text_content(handle: u64) -> String {
    on_element(handle, "return { v: el.textContent || '' };")
}

/// Outer HTML with handle attributes stripped from the copy
pub fn outer_html(handle: u64) -> String {
    on_element(
        handle,
        &format!(
            "const copy = el.cloneNode(true);
            copy.removeAttribute('{HANDLE_ATTRIBUTE}');
            copy.querySelectorAll('[{HANDLE_ATTRIBUTE}]').forEach(n => n.removeAttribute('{HANDLE_ATTRIBUTE}'));
            return {{ v: copy.outerHTML }};"
        ),
    )
}

pub fn click(handle: u64) -> String {
    on_element(handle, "el.click(); return { v: true };")
}

pub fn scroll_into_view(handle: u64) -> String {
    on_element(
        handle,
        "el.scrollIntoView({ behavior: 'smooth', block: 'center' }); return { v: true };",
    )
}

/// Fire the events common lazy loaders listen for, on the element and the
/// window, and register a one-shot intersection observer on the element
pub fn dispatch_lazy_load(handle: u64) -> String {
    on_element(
        handle,
        r"for (const type of ['scroll', 'resize', 'load']) {
            el.dispatchEvent(new Event(type, { bubbles: true }));
            window.dispatchEvent(new Event(type));
        }
        el.dispatchEvent(new CustomEvent('intersection', { bubbles: true }));
        if (window.IntersectionObserver) {
            const observer = new IntersectionObserver((entries) => {
                for (const entry of entries) {
                    if (entry.isIntersecting) {
                        observer.disconnect();
                        entry.target.dispatchEvent(new Event('load'));
                    }
                }
            });
            observer.observe(el);
        }
        return { v: true };",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_embedded_as_string_literals() {
        let script = select_all(None, r#"div[class*="valueItem"]"#);
        assert!(script.contains(r#"querySelectorAll("div[class*=\"valueItem\"]")"#));
        assert!(script.contains("const root = document;"));
    }

    #[test]
    fn scoped_queries_start_from_the_handle() {
        let script = select_all(Some(7), "img");
        assert!(script.contains(r#"document.querySelector('[data-tc-handle="7"]')"#));
    }

    #[test]
    fn element_scripts_report_missing_elements() {
        let script = attribute(3, "data-src");
        assert!(script.contains("return { missing: true }"));
        assert!(script.contains(r#"el.getAttribute("data-src")"#));
    }
}
