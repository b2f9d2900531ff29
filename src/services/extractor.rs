use std::time::Duration;

use thirtyfour::{By, WebDriver, WebElement};
use url::Url;

use crate::{
    domain::listing::ListingRecord,
    services::{
        site::{FieldKind, FieldSpec, SiteAdapter},
        wait,
    },
};

/// Minimal read-only view of one DOM scope (a listing card, a detail
/// container) that field extraction goes through. The live implementation
/// is a WebElement; substituting it is what lets the fallback rules be
/// exercised without a browser.
pub(crate) trait FieldScope {
    async fn text_of(&self, by: &By) -> Option<String>;
    async fn attr_of(&self, by: &By, name: &str) -> Option<String>;
    async fn chips_of(&self, by: &By, item: &By) -> Option<Vec<String>>;
}

impl FieldScope for WebElement {
    async fn text_of(&self, by: &By) -> Option<String> {
        let element = self.find(by.clone()).await.ok()?;
        element.text().await.ok()
    }

    async fn attr_of(&self, by: &By, name: &str) -> Option<String> {
        let element = self.find(by.clone()).await.ok()?;
        element.attr(name).await.ok()?
    }

    async fn chips_of(&self, by: &By, item: &By) -> Option<Vec<String>> {
        let element = self.find(by.clone()).await.ok()?;
        let chips = element.find_all(item.clone()).await.ok()?;
        let mut texts = Vec::with_capacity(chips.len());
        for chip in chips {
            if let Ok(text) = chip.text().await {
                texts.push(text);
            }
        }
        Some(texts)
    }
}

/// Extract every locatable listing on the current results page, in DOM
/// encounter order. Zero containers before the timeout is "this page yielded
/// nothing", never an error; pagination may still be attempted.
pub async fn extract_page(
    driver: &WebDriver,
    adapter: &dyn SiteAdapter,
    timeout: Duration,
) -> Vec<ListingRecord> {
    let cards = match wait::all_elements(driver, adapter.listing_containers(), timeout).await {
        Ok(cards) => cards,
        Err(e) => {
            log::warn!("No listing containers appeared: {:#}", e);
            return vec![];
        }
    };

    let mut records = Vec::with_capacity(cards.len());
    for card in &cards {
        match extract_record(card, adapter).await {
            Some(record) => records.push(record),
            // A listing without an identifiable target is not useful.
            None => log::warn!("Skipping a listing without a locatable title link"),
        }
    }

    log::info!(
        "Extracted {} of {} listings on this page",
        records.len(),
        cards.len()
    );
    records
}

async fn extract_record<S: FieldScope>(card: &S, adapter: &dyn SiteAdapter) -> Option<ListingRecord> {
    let title_link = adapter.title_link();
    let title = card.text_of(&title_link).await?.trim().to_string();
    let href = card.attr_of(&title_link, "href").await?;

    let mut record = ListingRecord::new(title, absolutize(adapter.base_url(), href.trim()));

    // Each remaining field is isolated: a missing or unreadable element
    // degrades that one field to its sentinel, never the whole record.
    for spec in adapter.listing_fields() {
        let value = field_or_default(card, &spec).await;
        record.set(spec.name, value);
    }

    Some(record)
}

/// The extract-with-fallback primitive shared with the detail fetcher:
/// a located, non-empty value, or the field's placeholder sentinel. A
/// located element whose trimmed text is blank is treated the same as a
/// missing one and renders as the sentinel, not as an empty cell.
pub(crate) async fn field_or_default<S: FieldScope>(scope: &S, spec: &FieldSpec) -> String {
    match lookup(scope, spec).await {
        Some(value) if !value.is_empty() => value,
        _ => spec.missing.to_string(),
    }
}

async fn lookup<S: FieldScope>(scope: &S, spec: &FieldSpec) -> Option<String> {
    match &spec.kind {
        FieldKind::Text => scope
            .text_of(&spec.by)
            .await
            .map(|t| t.trim().to_string()),
        FieldKind::StrippedText { prefix } => scope.text_of(&spec.by).await.map(|t| {
            let t = t.trim();
            t.strip_prefix(prefix).unwrap_or(t).trim().to_string()
        }),
        FieldKind::Chips { item } => {
            let chips = scope.chips_of(&spec.by, item).await?;
            let parts: Vec<String> = chips
                .iter()
                .map(|chip| chip.trim())
                .filter(|chip| !chip.is_empty())
                .map(str::to_string)
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
    }
}

fn absolutize(base: &str, href: &str) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    Url::parse(base)
        .ok()
        .and_then(|base| base.join(href).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| href.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        domain::listing::{NOT_DISCLOSED, NOT_SPECIFIED, NO_DESCRIPTION},
        services::site::NaukriAdapter,
    };

    #[derive(Default)]
    struct FakeCard {
        texts: HashMap<String, String>,
        attrs: HashMap<String, String>,
        chips: HashMap<String, Vec<String>>,
    }

    impl FakeCard {
        fn with_text(mut self, by: By, value: &str) -> Self {
            self.texts.insert(format!("{:?}", by), value.to_string());
            self
        }

        fn with_attr(mut self, by: By, name: &str, value: &str) -> Self {
            self.attrs
                .insert(format!("{:?} @{}", by, name), value.to_string());
            self
        }

        fn with_chips(mut self, by: By, values: &[&str]) -> Self {
            self.chips.insert(
                format!("{:?}", by),
                values.iter().map(|v| v.to_string()).collect(),
            );
            self
        }
    }

    impl FieldScope for FakeCard {
        async fn text_of(&self, by: &By) -> Option<String> {
            self.texts.get(&format!("{:?}", by)).cloned()
        }

        async fn attr_of(&self, by: &By, name: &str) -> Option<String> {
            self.attrs.get(&format!("{:?} @{}", by, name)).cloned()
        }

        async fn chips_of(&self, by: &By, _item: &By) -> Option<Vec<String>> {
            self.chips.get(&format!("{:?}", by)).cloned()
        }
    }

    fn card_with_title() -> FakeCard {
        let adapter = NaukriAdapter;
        FakeCard::default()
            .with_text(adapter.title_link(), "  Python Developer ")
            .with_attr(
                adapter.title_link(),
                "href",
                "https://www.naukri.com/job-listings-1",
            )
    }

    #[tokio::test]
    async fn missing_optional_fields_render_their_sentinels() {
        let adapter = NaukriAdapter;
        let record = extract_record(&card_with_title(), &adapter).await.unwrap();

        assert_eq!(record.title(), "Python Developer");
        assert_eq!(record.get("salary"), Some(NOT_DISCLOSED));
        assert_eq!(record.get("company"), Some(NOT_SPECIFIED));
        assert_eq!(record.get("description"), Some(NO_DESCRIPTION));

        // Uniform shape: every declared field is present even on a bare card.
        for spec in adapter.listing_fields() {
            assert!(record.get(spec.name).is_some(), "field {} absent", spec.name);
        }
    }

    #[tokio::test]
    async fn unlocatable_title_drops_the_record() {
        let adapter = NaukriAdapter;

        let no_title = FakeCard::default();
        assert!(extract_record(&no_title, &adapter).await.is_none());

        let no_href = FakeCard::default().with_text(adapter.title_link(), "Python Developer");
        assert!(extract_record(&no_href, &adapter).await.is_none());
    }

    #[tokio::test]
    async fn extracted_fields_are_trimmed() {
        let adapter = NaukriAdapter;
        let card = card_with_title().with_text(By::Css("div.row2 a.comp-name"), "  Acme Corp  ");

        let record = extract_record(&card, &adapter).await.unwrap();
        assert_eq!(record.get("company"), Some("Acme Corp"));
    }

    #[tokio::test]
    async fn blank_rendered_field_reports_the_sentinel() {
        let spec = FieldSpec {
            name: "company",
            by: By::Css("a.comp-name"),
            kind: FieldKind::Text,
            missing: NOT_SPECIFIED,
        };
        let card = FakeCard::default().with_text(By::Css("a.comp-name"), "   ");

        assert_eq!(field_or_default(&card, &spec).await, NOT_SPECIFIED);
    }

    #[tokio::test]
    async fn posted_date_label_is_stripped() {
        let spec = FieldSpec {
            name: "postedDate",
            by: By::Css(".jobDate"),
            kind: FieldKind::StrippedText { prefix: "Posted: " },
            missing: NOT_SPECIFIED,
        };
        let card = FakeCard::default().with_text(By::Css(".jobDate"), " Posted: 3 days ago ");

        assert_eq!(field_or_default(&card, &spec).await, "3 days ago");
    }

    #[tokio::test]
    async fn chips_are_joined_and_blank_chips_skipped() {
        let spec = FieldSpec {
            name: "skills",
            by: By::ClassName("tags-gt"),
            kind: FieldKind::Chips {
                item: By::ClassName("ellipsis"),
            },
            missing: NOT_SPECIFIED,
        };

        let card = FakeCard::default()
            .with_chips(By::ClassName("tags-gt"), &["Python ", " SQL", "  "]);
        assert_eq!(field_or_default(&card, &spec).await, "Python, SQL");

        let empty = FakeCard::default().with_chips(By::ClassName("tags-gt"), &[]);
        assert_eq!(field_or_default(&empty, &spec).await, NOT_SPECIFIED);
    }

    #[tokio::test]
    async fn relative_title_hrefs_resolve_against_the_site_base() {
        let adapter = NaukriAdapter;
        let card = FakeCard::default()
            .with_text(adapter.title_link(), "Python Developer")
            .with_attr(adapter.title_link(), "href", "/job-listings-1");

        let record = extract_record(&card, &adapter).await.unwrap();
        assert_eq!(record.url(), "https://www.naukri.com/job-listings-1");
    }

    #[test]
    fn absolute_hrefs_pass_through() {
        assert_eq!(
            absolutize("https://www.naukri.com", "https://www.naukri.com/job-listings-1"),
            "https://www.naukri.com/job-listings-1"
        );
    }

    #[test]
    fn relative_hrefs_resolve_against_the_site_base() {
        assert_eq!(
            absolutize("https://www.naukri.com", "/job-listings-1"),
            "https://www.naukri.com/job-listings-1"
        );
    }
}
