use std::time::{Duration, Instant};

use anyhow::bail;
use thirtyfour::{By, WebDriver, WebElement};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Poll for a single element until it appears or the deadline passes.
pub async fn element(driver: &WebDriver, by: By, timeout: Duration) -> anyhow::Result<WebElement> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(found) = driver.find(by.clone()).await {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            bail!("timed out after {:?} waiting for {:?}", timeout, by);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Poll until at least one matching element is present. An empty page at the
/// deadline is reported as an error; callers decide whether that is fatal.
pub async fn all_elements(
    driver: &WebDriver,
    by: By,
    timeout: Duration,
) -> anyhow::Result<Vec<WebElement>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(found) = driver.find_all(by.clone()).await {
            if !found.is_empty() {
                return Ok(found);
            }
        }
        if Instant::now() >= deadline {
            bail!("timed out after {:?} waiting for any {:?}", timeout, by);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Poll until a previously-held element reference goes stale, the signal
/// that the old page's DOM has been torn down. Any failed read counts:
/// once navigation happens the reference cannot answer, while a healthy
/// element just keeps the poll going.
pub async fn staleness(element: &WebElement, timeout: Duration) -> anyhow::Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if element.tag_name().await.is_err() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!(
                "timed out after {:?} waiting for the previous page to unload",
                timeout
            );
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
