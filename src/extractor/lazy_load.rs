//! Forcing lazily rendered images to load

use crate::config::RevealPolicy;
use crate::page::ProductPage;

use super::image_url::{candidate_sources, is_valid_candidate};
use super::poll::poll_until;

/// Result of one reveal attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Revealed,
    NotRevealed,
}

/// Scrolls an image into view, nudges the lazy loader and waits for a
/// usable source.
///
/// Never fails: a reveal that times out is logged and reported as
/// [`RevealOutcome::NotRevealed`], and the caller still tries to resolve
/// whatever source the element has.
#[derive(Debug, Clone, Copy)]
pub struct LazyLoadRevealer {
    policy: RevealPolicy,
}

impl LazyLoadRevealer {
    #[must_use]
    pub fn new(policy: RevealPolicy) -> Self {
        Self { policy }
    }

    pub async fn reveal<P: ProductPage>(&self, page: &P, img: &P::Element) -> RevealOutcome {
        if let Err(e) = page.scroll_into_view(img).await {
            log::debug!("scrollIntoView failed: {e}");
        }
        tokio::time::sleep(self.policy.settle).await;

        if let Err(e) = page.dispatch_lazy_load(img).await {
            log::debug!("Lazy-load event dispatch failed: {e}");
        }

        let polled = poll_until(
            || async { has_usable_source(page, img).await.then_some(()) },
            self.policy.poll_interval,
            self.policy.max_attempts,
            self.policy.timeout,
        )
        .await;

        match polled {
            Ok(()) => RevealOutcome::Revealed,
            Err(e) => {
                log::warn!("Image did not reveal a source: {e}");
                RevealOutcome::NotRevealed
            }
        }
    }
}

async fn has_usable_source<P: ProductPage>(page: &P, img: &P::Element) -> bool {
    let rendered = page.rendered_src(img).await.ok().flatten();
    let attributes = page.attributes(img).await.unwrap_or_default();
    candidate_sources(rendered, &attributes)
        .iter()
        .any(|candidate| is_valid_candidate(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Interaction, SnapshotPage};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn reveals_data_src_after_dispatch() {
        let page = SnapshotPage::from_html(
            "https://detail.tmall.com/item.htm?id=1",
            r#"<img class="lazyload" src="x.gif" data-src="//img.alicdn.com/d1.jpg">"#,
        );
        let img = page.select_first("img").await.expect("select").expect("img");

        let outcome = LazyLoadRevealer::new(RevealPolicy::default())
            .reveal(&page, &img)
            .await;

        assert_eq!(outcome, RevealOutcome::Revealed);
        assert_eq!(
            page.interactions(),
            vec![
                Interaction::ScrollIntoView(img.clone()),
                Interaction::DispatchLazyLoad(img.clone())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_the_hard_timeout() {
        let page = SnapshotPage::from_html(
            "https://detail.tmall.com/item.htm?id=1",
            r#"<img class="lazyload" src="loading.gif">"#,
        );
        let img = page.select_first("img").await.expect("select").expect("img");
        let start = Instant::now();

        let outcome = LazyLoadRevealer::new(RevealPolicy::default())
            .reveal(&page, &img)
            .await;

        assert_eq!(outcome, RevealOutcome::NotRevealed);
        // settle, then ten polls 300ms apart
        assert_eq!(start.elapsed(), Duration::from_millis(200 + 2700));
    }
}
