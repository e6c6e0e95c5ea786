//! Product parameter block and the standalone parameters document
//!
//! The live block uses hashed CSS-module classes (`infoItem--2Mx1`). The copy
//! kept in the record has them replaced by the stable names the bundled
//! stylesheet targets; any other class is dropped.

use anyhow::{Context, Result, anyhow};
use kuchiki::iter::NodeIterator;
use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;

use super::schema::ProductRecord;
use crate::utils::constants::UNKNOWN_PRODUCT_ID;

/// Styles for the rewritten parameter block and the document sections
pub const PARAMETER_STYLESHEET: &str = r"<style>
    .section-title {
        color: #11192d;
        font-size: 20px;
        font-weight: 600;
        margin-bottom: 16px;
    }

    .product-info {
        max-width: 1100px;
        margin-bottom: 15px;
        background-color: #ffffff;
        border-radius: 8px;
        box-shadow: 0 2px 8px rgba(0, 0, 0, 0.1);
        overflow: hidden;
    }

    .table-wrapper {
        display: grid;
        grid-template-columns: 1fr 1fr;
        gap: 0;
    }

    .info-item {
        display: flex;
        border-bottom: 1px solid #e8e8e8;
        min-height: 48px;
    }

    .info-item:last-child {
        border-bottom: none;
    }

    .info-item-title {
        flex: 0 0 120px;
        padding: 12px 16px;
        background-color: #f8f9fa;
        border-right: 1px solid #e8e8e8;
        font-weight: 500;
        color: #333333;
        display: flex;
        align-items: center;
        font-size: 14px;
    }

    .info-item-content {
        flex: 1;
        padding: 12px 16px;
        color: #666666;
        display: flex;
        align-items: center;
        font-size: 14px;
        line-height: 1.4;
    }

    .info-item:nth-child(odd) {
        grid-column: 1;
    }

    .info-item:nth-child(even) {
        grid-column: 2;
        border-left: 1px solid #e8e8e8;
    }

    @media (max-width: 768px) {
        .table-wrapper {
            grid-template-columns: 1fr;
        }

        .info-item:nth-child(even) {
            grid-column: 1;
            border-left: none;
        }

        .info-item-title {
            flex: 0 0 100px;
            font-size: 13px;
        }

        .info-item-content {
            font-size: 13px;
        }
    }
</style>";

const DETAIL_STACK_STYLE: &str = "display: flex; flex-direction: column;border-radius: 8px;box-shadow: 0 2px 8px rgba(0, 0, 0, 0.1);overflow: hidden;";

/// Stable class for a hashed class attribute, `None` when it is dropped
#[must_use]
pub fn mapped_class(class: &str) -> Option<&'static str> {
    if class.contains("baseDropsInfo") {
        Some("product-info")
    } else if class.contains("tableWrapper") {
        Some("table-wrapper")
    } else if class.contains("infoItemTitle") {
        Some("info-item-title")
    } else if class.contains("infoItemContent") {
        Some("info-item-content")
    } else if class.contains("infoItem") {
        Some("info-item")
    } else {
        None
    }
}

fn rewrite_classes(root: &NodeRef) {
    for element in root.inclusive_descendants().elements() {
        let mut attributes = element.attributes.borrow_mut();
        let Some(class) = attributes.get("class").map(str::to_string) else {
            continue;
        };
        match mapped_class(&class) {
            Some(stable) => {
                attributes.insert("class", stable.to_string());
            }
            None => {
                attributes.remove("class");
            }
        }
    }
}

/// Rewrite the classes of a serialized parameter block
pub fn rewrite_parameter_block(outer_html: &str) -> Result<String> {
    let document = kuchiki::parse_html().one(outer_html);
    let body = document
        .select_first("body")
        .map_err(|()| anyhow!("Parameter block did not parse into a body"))?;
    let block = body
        .as_node()
        .children()
        .find(|node| node.as_element().is_some())
        .ok_or_else(|| anyhow!("Parameter block is empty"))?;

    rewrite_classes(&block);

    let mut buffer = Vec::new();
    block
        .serialize(&mut buffer)
        .context("Failed to serialize parameter block")?;
    String::from_utf8(buffer).context("Parameter block is not valid UTF-8")
}

/// Stylesheet followed by the rewritten block, as stored in the record
pub fn parameter_html(outer_html: &str) -> Result<String> {
    Ok(format!(
        "{PARAMETER_STYLESHEET}\n{}",
        rewrite_parameter_block(outer_html)?
    ))
}

/// Inputs of the standalone parameters page
#[derive(Debug, Clone, Default)]
pub struct ParametersDocument {
    pub product_id: Option<String>,
    pub title: Option<String>,
    /// Stylesheet plus rewritten block, as stored in the record
    pub parameter_html: String,
    pub detail_image_count: usize,
}

impl From<&ProductRecord> for ParametersDocument {
    fn from(record: &ProductRecord) -> Self {
        Self {
            product_id: record.product_id.clone(),
            title: record.title.clone(),
            parameter_html: record.parameter_html.clone(),
            detail_image_count: record.detail_images.len(),
        }
    }
}

impl ParametersDocument {
    /// Self-contained HTML page with the parameter table and, when a CDN
    /// base is known, the re-hosted detail images stacked vertically.
    #[must_use]
    pub fn render(&self, detail_image_cdn: Option<&str>) -> String {
        let title = html_escape::encode_text(self.title.as_deref().unwrap_or_default());

        let graphic_details = match detail_image_cdn {
            Some(base) if self.detail_image_count > 0 => {
                let id = self.product_id.as_deref().unwrap_or(UNKNOWN_PRODUCT_ID);
                let tags: Vec<String> = (1..=self.detail_image_count)
                    .map(|i| {
                        let src = format!("{base}/{id}/detail/image-{i}.webp");
                        format!(
                            "  <img src=\"{}\">",
                            html_escape::encode_double_quoted_attribute(&src)
                        )
                    })
                    .collect();
                format!(
                    "<div style=\"{DETAIL_STACK_STYLE}\">\n{}\n</div>",
                    tags.join("\n")
                )
            }
            _ => String::new(),
        };

        format!(
            "<!DOCTYPE html>
<html>
<head>
<meta charset=\"utf-8\">
<title>{title}</title>
</head>
<body>
<p class=\"section-title\">Parameter information</p>
{params}
<p class=\"section-title\">Graphic details</p>
{graphic_details}
</body>
</html>
",
            params = self.parameter_html,
        )
    }
}

/// File name of the parameters document for a product title
#[must_use]
pub fn parameters_file_name(title: Option<&str>) -> String {
    format!("parameters-{}.html", title.unwrap_or_default())
}
