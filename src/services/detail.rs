use std::time::Duration;

use anyhow::Context;
use thirtyfour::{WebDriver, WindowHandle};

use crate::{
    domain::listing::ListingRecord,
    services::{extractor::field_or_default, site::SiteAdapter, wait},
};

const DETAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Window operations the expansion flow needs from the browser. Narrow on
/// purpose: the open/switch/close/restore discipline is checked against this
/// seam, with the live session behind `DriverContext`.
pub(crate) trait BrowsingContext {
    type Handle;

    async fn current_window(&self) -> anyhow::Result<Self::Handle>;
    async fn open_tab(&self) -> anyhow::Result<Self::Handle>;
    async fn focus_window(&self, handle: &Self::Handle) -> anyhow::Result<()>;
    async fn close_focused_window(&self) -> anyhow::Result<()>;
    async fn read_detail_fields(&self, url: &str)
        -> anyhow::Result<Vec<(&'static str, String)>>;
}

pub(crate) struct DriverContext<'a> {
    pub driver: &'a WebDriver,
    pub adapter: &'a dyn SiteAdapter,
}

impl BrowsingContext for DriverContext<'_> {
    type Handle = WindowHandle;

    async fn current_window(&self) -> anyhow::Result<WindowHandle> {
        self.driver
            .window()
            .await
            .context("could not identify the primary window")
    }

    async fn open_tab(&self) -> anyhow::Result<WindowHandle> {
        Ok(self.driver.new_tab().await?)
    }

    async fn focus_window(&self, handle: &WindowHandle) -> anyhow::Result<()> {
        Ok(self.driver.switch_to_window(handle.clone()).await?)
    }

    async fn close_focused_window(&self) -> anyhow::Result<()> {
        Ok(self.driver.close_window().await?)
    }

    async fn read_detail_fields(
        &self,
        url: &str,
    ) -> anyhow::Result<Vec<(&'static str, String)>> {
        self.driver
            .goto(url)
            .await
            .with_context(|| format!("could not open {}", url))?;

        let container = wait::element(self.driver, self.adapter.detail_container(), DETAIL_TIMEOUT)
            .await
            .context("detail container never appeared")?;

        let mut fields = Vec::new();
        for spec in self.adapter.detail_fields() {
            fields.push((spec.name, field_or_default(&container, &spec).await));
        }
        Ok(fields)
    }
}

/// Expand one record with the fields only visible on its own page, using a
/// secondary tab so the results page keeps its state.
///
/// Any failure while opening or reading the tab leaves the record exactly as
/// it was; the run carries on with the next record. The secondary tab is
/// closed and the primary window restored on every path — the one
/// unrecoverable case is the restore itself failing, which the page loop
/// treats as the end of the run.
pub(crate) async fn expand<C: BrowsingContext>(
    context: &C,
    record: &mut ListingRecord,
) -> anyhow::Result<()> {
    let primary = context.current_window().await?;

    let tab = match context.open_tab().await {
        Ok(tab) => tab,
        Err(e) => {
            log::warn!("Could not open a detail tab for {}: {}", record.url(), e);
            return Ok(());
        }
    };

    if let Err(e) = context.focus_window(&tab).await {
        log::warn!("Could not switch to the detail tab for {}: {}", record.url(), e);
        // The tab is already open; close it rather than leak it for the
        // rest of the run.
        if context.focus_window(&tab).await.is_ok() {
            if let Err(e) = context.close_focused_window().await {
                log::warn!("Could not close the orphan detail tab: {}", e);
            }
            context
                .focus_window(&primary)
                .await
                .context("failed to switch back to the results window")?;
        }
        return Ok(());
    }

    let fields = context.read_detail_fields(record.url()).await;

    // Restore runs regardless of how the fetch went.
    if let Err(e) = context.close_focused_window().await {
        log::warn!("Could not close the detail tab: {}", e);
    }
    context
        .focus_window(&primary)
        .await
        .context("failed to switch back to the results window")?;

    match fields {
        Ok(fields) => {
            for (name, value) in fields {
                record.set(name, value);
            }
        }
        Err(e) => log::warn!("Detail fetch failed for {}: {:#}", record.url(), e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    const PRIMARY: u32 = 0;

    struct FakeBrowser {
        focused: Cell<u32>,
        open_tabs: RefCell<Vec<u32>>,
        next_handle: Cell<u32>,
        fail_first_tab_switch: Cell<bool>,
        detail_fields: Option<Vec<(&'static str, String)>>,
    }

    impl FakeBrowser {
        fn new(detail_fields: Option<Vec<(&'static str, String)>>) -> Self {
            FakeBrowser {
                focused: Cell::new(PRIMARY),
                open_tabs: RefCell::new(vec![]),
                next_handle: Cell::new(1),
                fail_first_tab_switch: Cell::new(false),
                detail_fields,
            }
        }

        fn failing_first_switch(self) -> Self {
            self.fail_first_tab_switch.set(true);
            self
        }
    }

    impl BrowsingContext for FakeBrowser {
        type Handle = u32;

        async fn current_window(&self) -> anyhow::Result<u32> {
            Ok(self.focused.get())
        }

        async fn open_tab(&self) -> anyhow::Result<u32> {
            let handle = self.next_handle.get();
            self.next_handle.set(handle + 1);
            self.open_tabs.borrow_mut().push(handle);
            Ok(handle)
        }

        async fn focus_window(&self, handle: &u32) -> anyhow::Result<()> {
            if *handle != PRIMARY && self.fail_first_tab_switch.replace(false) {
                anyhow::bail!("window handle went away");
            }
            self.focused.set(*handle);
            Ok(())
        }

        async fn close_focused_window(&self) -> anyhow::Result<()> {
            let focused = self.focused.get();
            if focused == PRIMARY {
                anyhow::bail!("refusing to close the primary window");
            }
            self.open_tabs.borrow_mut().retain(|tab| *tab != focused);
            Ok(())
        }

        async fn read_detail_fields(
            &self,
            _url: &str,
        ) -> anyhow::Result<Vec<(&'static str, String)>> {
            self.detail_fields
                .clone()
                .ok_or_else(|| anyhow::anyhow!("detail container never appeared"))
        }
    }

    fn base_record() -> ListingRecord {
        let mut record =
            ListingRecord::new("Engineer".to_string(), "https://x.test/1".to_string());
        record.set("salary", "Not disclosed".to_string());
        record
    }

    #[tokio::test]
    async fn expansion_merges_detail_fields_and_restores_the_primary_window() {
        let browser = FakeBrowser::new(Some(vec![(
            "fullDescription",
            "Long form text".to_string(),
        )]));
        let mut record = base_record();

        expand(&browser, &mut record).await.unwrap();

        assert_eq!(record.get("fullDescription"), Some("Long form text"));
        assert_eq!(browser.focused.get(), PRIMARY);
        assert!(browser.open_tabs.borrow().is_empty());
    }

    #[tokio::test]
    async fn detail_failure_leaves_the_record_unexpanded() {
        let browser = FakeBrowser::new(None);
        let mut record = base_record();

        expand(&browser, &mut record).await.unwrap();

        assert_eq!(record.get("fullDescription"), None);
        assert_eq!(record.get("salary"), Some("Not disclosed"));
        assert_eq!(record.title(), "Engineer");
        assert_eq!(browser.focused.get(), PRIMARY);
        assert!(browser.open_tabs.borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_tab_switch_closes_the_orphan_tab() {
        let browser = FakeBrowser::new(Some(vec![(
            "fullDescription",
            "never reached".to_string(),
        )]))
        .failing_first_switch();
        let mut record = base_record();

        expand(&browser, &mut record).await.unwrap();

        assert_eq!(record.get("fullDescription"), None);
        assert!(browser.open_tabs.borrow().is_empty());
        assert_eq!(browser.focused.get(), PRIMARY);
    }
}
