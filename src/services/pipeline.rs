use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use thirtyfour::{By, WebDriver};

use crate::{
    configuration::Settings,
    domain::{
        criteria::{ExperienceFilter, SearchCriteria},
        listing::{ListingRecord, ResultSet},
    },
    services::{
        data_persistance::{self, PersistedOutput},
        detail,
        droid::Droid,
        extractor,
        site::SiteAdapter,
        wait,
    },
};

const PAGE_LOAD_SETTLE: Duration = Duration::from_secs(3);
const OVERLAY_TIMEOUT: Duration = Duration::from_secs(5);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const RESULTS_TIMEOUT: Duration = Duration::from_secs(10);
const FILTER_TIMEOUT: Duration = Duration::from_secs(10);
const LISTINGS_TIMEOUT: Duration = Duration::from_secs(10);
const STALENESS_TIMEOUT: Duration = Duration::from_secs(10);

/// The page-loop decisions, lifted out of the live session. `collect_pages`
/// drives everything page-shaped through this seam; `Pipeline` is the live
/// implementation.
pub(crate) trait PageSource {
    async fn extract_listings(&mut self) -> Vec<ListingRecord>;
    /// Returns true when the primary window was lost, which ends the run.
    async fn expand_listings(&mut self, slice: &mut [ListingRecord]) -> bool;
    /// `Ok(false)` means there is no further page.
    async fn next_page(&mut self) -> anyhow::Result<bool>;
}

/// The page loop itself: at most `page_budget` extraction passes, stopping
/// early when pagination runs out or faults, keeping every page collected
/// so far.
pub(crate) async fn collect_pages<S: PageSource>(
    source: &mut S,
    page_budget: u32,
    fetch_details: bool,
    results: &mut ResultSet,
) {
    for page in 1..=page_budget {
        log::info!("Extracting page {} of at most {}", page, page_budget);
        let mut slice = source.extract_listings().await;

        let mut window_lost = false;
        if fetch_details && !slice.is_empty() {
            window_lost = source.expand_listings(&mut slice).await;
        }

        results.extend_page(slice);

        if window_lost || page == page_budget {
            break;
        }

        match source.next_page().await {
            Ok(true) => {}
            Ok(false) => {
                log::info!("No further pages available after page {}", page);
                break;
            }
            // Pagination faults end the loop, never the data collected
            // so far.
            Err(e) => {
                log::error!("Pagination failed after page {}: {:#}", page, e);
                break;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Navigating,
    Searching,
    FilterApplied,
    ResultsReady,
    Paginating,
    DetailFetching,
    Finished,
    Failed,
}

/// Drives one browser session through search, extraction and pagination.
/// Owns the pipeline state; the result set it fills is handed back to the
/// caller for finalization on every exit path.
pub struct Pipeline<'a> {
    driver: &'a WebDriver,
    adapter: &'a dyn SiteAdapter,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    pub fn new(driver: &'a WebDriver, adapter: &'a dyn SiteAdapter) -> Self {
        Pipeline {
            driver,
            adapter,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        log::debug!("Pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run the whole pipeline. Records collected before any fault are always
    /// returned; the error slot is filled only for run-aborting faults.
    pub async fn run(&mut self, criteria: &SearchCriteria) -> (ResultSet, Option<anyhow::Error>) {
        let mut results = ResultSet::new();
        match self.drive(criteria, &mut results).await {
            Ok(()) => {
                self.transition(PipelineState::Finished);
                (results, None)
            }
            Err(e) => {
                log::error!("Pipeline failed: {:#}", e);
                self.transition(PipelineState::Failed);
                (results, Some(e))
            }
        }
    }

    async fn drive(
        &mut self,
        criteria: &SearchCriteria,
        results: &mut ResultSet,
    ) -> anyhow::Result<()> {
        self.transition(PipelineState::Navigating);
        self.open_search_page().await?;

        self.transition(PipelineState::Searching);
        self.submit_search(&criteria.keyword, criteria.location.as_deref())
            .await?;

        if let Some(filter) = &criteria.experience {
            self.apply_experience_filter(filter).await;
        }
        self.transition(PipelineState::FilterApplied);
        tokio::time::sleep(PAGE_LOAD_SETTLE).await;
        self.transition(PipelineState::ResultsReady);

        collect_pages(self, criteria.page_budget, criteria.fetch_details, results).await;

        Ok(())
    }

    async fn open_search_page(&self) -> anyhow::Result<()> {
        self.driver
            .goto(self.adapter.base_url())
            .await
            .with_context(|| format!("could not open {}", self.adapter.base_url()))?;
        tokio::time::sleep(PAGE_LOAD_SETTLE).await;

        // Landing overlay: dismissed when present, expected to be absent.
        match wait::element(self.driver, self.adapter.overlay_dismiss(), OVERLAY_TIMEOUT).await {
            Ok(overlay) => {
                if let Err(e) = overlay.click().await {
                    log::warn!("Could not dismiss the landing overlay: {}", e);
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(_) => log::debug!("No landing overlay to dismiss"),
        }

        Ok(())
    }

    async fn submit_search(&self, keyword: &str, location: Option<&str>) -> anyhow::Result<()> {
        let search_box = wait::element(self.driver, self.adapter.keyword_input(), SEARCH_TIMEOUT)
            .await
            .context("keyword input never appeared")?;
        search_box.clear().await?;
        search_box.send_keys(keyword).await?;

        if let Some(location) = location {
            if let Err(e) = self.fill_location(location).await {
                log::warn!("Searching by keyword only: {:#}", e);
            }
        }

        let submit = wait::element(self.driver, self.adapter.submit_control(), SEARCH_TIMEOUT)
            .await
            .context("search submit control never appeared")?;
        submit.click().await?;

        // Nothing downstream is possible without a results view.
        wait::element(self.driver, self.adapter.results_container(), RESULTS_TIMEOUT)
            .await
            .context("results did not load after submitting the search")?;

        Ok(())
    }

    async fn fill_location(&self, location: &str) -> anyhow::Result<()> {
        let location_box = self
            .driver
            .find(self.adapter.location_input())
            .await
            .context("location input not found")?;
        location_box.clear().await?;
        location_box.send_keys(location).await?;
        Ok(())
    }

    /// Best effort only. A filter that cannot be applied is abandoned and
    /// the search continues unfiltered.
    async fn apply_experience_filter(&self, filter: &ExperienceFilter) {
        let applied: anyhow::Result<()> = async {
            let facet =
                wait::element(self.driver, self.adapter.experience_facet(), FILTER_TIMEOUT).await?;
            facet.click().await?;
            tokio::time::sleep(Duration::from_secs(1)).await;

            let option = wait::element(
                self.driver,
                self.adapter.experience_option(filter),
                FILTER_TIMEOUT,
            )
            .await?;
            option.click().await?;
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(())
        }
        .await;

        if let Err(e) = applied {
            log::warn!(
                "Could not apply experience filter {:?}, continuing unfiltered: {:#}",
                filter,
                e
            );
            // Click elsewhere to close whatever facet control is still open.
            if let Ok(body) = self.driver.find(By::Tag("body")).await {
                let _ = body.click().await;
            }
        }
    }

    /// Expand each record in place. Returns true when the primary window
    /// could not be restored, which ends the run.
    async fn expand_records(&self, slice: &mut [ListingRecord]) -> bool {
        let context = detail::DriverContext {
            driver: self.driver,
            adapter: self.adapter,
        };
        let total = slice.len();
        for (i, record) in slice.iter_mut().enumerate() {
            log::info!("Fetching details for listing {}/{}", i + 1, total);
            if let Err(e) = detail::expand(&context, record).await {
                log::error!("Lost the primary results window, ending the run: {:#}", e);
                return true;
            }
            let pause = rand::thread_rng().gen_range(1.0..2.0);
            tokio::time::sleep(Duration::from_secs_f64(pause)).await;
        }
        false
    }

    /// Move to the next results page. `Ok(false)` means there is none.
    async fn advance(&self) -> anyhow::Result<bool> {
        let next = match self.driver.find(self.adapter.next_control()).await {
            Ok(next) => next,
            Err(_) => return Ok(false),
        };

        let classes = next.attr("class").await?.unwrap_or_default();
        if classes.contains("disabled") {
            return Ok(false);
        }

        next.scroll_into_view().await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        next.click().await?;

        // The old control going stale confirms the page turned.
        wait::staleness(&next, STALENESS_TIMEOUT)
            .await
            .context("previous page never unloaded after clicking next")?;

        let settle = rand::thread_rng().gen_range(2.0..3.0);
        tokio::time::sleep(Duration::from_secs_f64(settle)).await;

        Ok(true)
    }
}

impl PageSource for Pipeline<'_> {
    async fn extract_listings(&mut self) -> Vec<ListingRecord> {
        extractor::extract_page(self.driver, self.adapter, LISTINGS_TIMEOUT).await
    }

    async fn expand_listings(&mut self, slice: &mut [ListingRecord]) -> bool {
        self.transition(PipelineState::DetailFetching);
        let window_lost = self.expand_records(slice).await;
        self.transition(PipelineState::ResultsReady);
        window_lost
    }

    async fn next_page(&mut self) -> anyhow::Result<bool> {
        self.transition(PipelineState::Paginating);
        let advanced = self.advance().await?;
        if advanced {
            self.transition(PipelineState::ResultsReady);
        }
        Ok(advanced)
    }
}

pub struct ScrapeOutcome {
    pub records: Vec<ListingRecord>,
    pub output: PersistedOutput,
    /// Filled only for run-aborting faults (session start, results view).
    pub error: Option<String>,
}

/// One complete run: session open, pipeline, session close, finalize.
/// Finalization and session teardown happen on every exit path, so whatever
/// was collected before a fault is never lost.
pub async fn run_scrape(
    settings: &Settings,
    adapter: &dyn SiteAdapter,
    criteria: SearchCriteria,
) -> anyhow::Result<ScrapeOutcome> {
    log::info!(
        "Starting a {} run for '{}' with a budget of {} pages",
        adapter.slug(),
        criteria.keyword,
        criteria.page_budget
    );

    let droid = match Droid::open(&settings.webdriver).await {
        Ok(droid) => droid,
        Err(e) => {
            log::error!("Browser session could not be started: {:#}", e);
            let output = data_persistance::finalize(
                &ResultSet::new(),
                adapter.slug(),
                &settings.scraper.output_dir,
                None,
            )?;
            return Ok(ScrapeOutcome {
                records: vec![],
                output,
                error: Some(format!("{:#}", e)),
            });
        }
    };

    let mut pipeline = Pipeline::new(&droid.driver, adapter);
    let (results, run_error) = pipeline.run(&criteria).await;
    let final_state = pipeline.state();

    if let Err(e) = droid.close().await {
        log::error!("Browser session did not shut down cleanly: {:#}", e);
    }

    let output = data_persistance::finalize(
        &results,
        adapter.slug(),
        &settings.scraper.output_dir,
        None,
    )?;
    log::info!(
        "Run finished in state {:?} with {} records -> {}",
        final_state,
        output.record_count,
        output.path.display()
    );

    Ok(ScrapeOutcome {
        records: results.into_records(),
        output,
        error: run_error.map(|e| format!("{:#}", e)),
    })
}
