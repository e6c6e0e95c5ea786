//! Deadlines for browser round trips
//!
//! CDP calls can hang forever when a tab crashes or a captcha overlay blocks
//! navigation. Every page-level operation of the live driver goes through
//! [`with_page_timeout`].

use anyhow::{Result, anyhow};
use std::future::Future;
use std::time::Duration;

/// Run `operation` with a deadline of `timeout_secs` seconds.
///
/// The operation's own error is returned unchanged; hitting the deadline
/// yields an error naming `operation_name`.
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout_secs: u64,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(Duration::from_secs(timeout_secs), operation)
        .await
        .map_err(|_| anyhow!("{operation_name} timed out after {timeout_secs}s"))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reports_the_operation_that_timed_out() {
        let result: Result<()> = with_page_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
            5,
            "open product page",
        )
        .await;

        let message = result.expect_err("deadline should fire").to_string();
        assert_eq!(message, "open product page timed out after 5s");
    }

    #[tokio::test]
    async fn passes_through_inner_errors() {
        let result: Result<u8> =
            with_page_timeout(async { Err(anyhow!("tab crashed")) }, 5, "read title").await;
        assert_eq!(result.expect_err("inner error").to_string(), "tab crashed");
    }
}
