use thirtyfour::By;

use crate::domain::{
    criteria::ExperienceFilter,
    listing::{NOT_DISCLOSED, NOT_PROVIDED, NOT_SPECIFIED, NO_DESCRIPTION},
};

/// How one field is read out of its located element.
pub enum FieldKind {
    /// Trimmed text content.
    Text,
    /// Text content with a leading label stripped, e.g. "Posted: ".
    StrippedText { prefix: &'static str },
    /// Child chip elements, trimmed and joined with ", ".
    Chips { item: By },
}

/// Declarative locator for one record field, with the sentinel substituted
/// when the element cannot be found.
pub struct FieldSpec {
    pub name: &'static str,
    pub by: By,
    pub kind: FieldKind,
    pub missing: &'static str,
}

impl FieldSpec {
    fn text(name: &'static str, by: By, missing: &'static str) -> Self {
        FieldSpec {
            name,
            by,
            kind: FieldKind::Text,
            missing,
        }
    }
}

/// Selector set for one job board. The pipeline is site-agnostic; everything
/// markup-specific lives behind this seam.
pub trait SiteAdapter: Send + Sync {
    /// Short name used in output filenames and logs.
    fn slug(&self) -> &'static str;

    fn base_url(&self) -> &str;

    /// Landing overlay dismiss control. Its absence is expected, not an error.
    fn overlay_dismiss(&self) -> By;

    fn keyword_input(&self) -> By;
    fn location_input(&self) -> By;
    fn submit_control(&self) -> By;
    fn results_container(&self) -> By;

    fn experience_facet(&self) -> By;
    fn experience_option(&self, filter: &ExperienceFilter) -> By;

    fn listing_containers(&self) -> By;
    /// Anchor carrying both the title text and the listing href. A container
    /// where this cannot be located yields no record at all.
    fn title_link(&self) -> By;
    fn listing_fields(&self) -> Vec<FieldSpec>;

    fn next_control(&self) -> By;

    fn detail_container(&self) -> By;
    fn detail_fields(&self) -> Vec<FieldSpec>;
}

pub struct NaukriAdapter;

impl SiteAdapter for NaukriAdapter {
    fn slug(&self) -> &'static str {
        "naukri"
    }

    fn base_url(&self) -> &str {
        "https://www.naukri.com"
    }

    fn overlay_dismiss(&self) -> By {
        By::ClassName("crossIcon")
    }

    fn keyword_input(&self) -> By {
        By::ClassName("suggestor-input")
    }

    fn location_input(&self) -> By {
        By::Css(r#"[placeholder="Enter location"]"#)
    }

    fn submit_control(&self) -> By {
        By::ClassName("qsbSubmit")
    }

    fn results_container(&self) -> By {
        By::ClassName("list")
    }

    fn experience_facet(&self) -> By {
        By::XPath("//div[contains(text(), 'Experience')]")
    }

    fn experience_option(&self, filter: &ExperienceFilter) -> By {
        match filter {
            ExperienceFilter::Fresher => By::XPath("//span[contains(text(), 'Fresher')]"),
            ExperienceFilter::Years(years) => {
                By::XPath(format!("//span[contains(text(), '{} Yrs')]", years))
            }
            ExperienceFilter::Range(min, max) => {
                By::XPath(format!("//span[contains(text(), '{} - {} Yrs')]", min, max))
            }
        }
    }

    fn listing_containers(&self) -> By {
        By::ClassName("styles_job-listing-container__OCfZC")
    }

    fn title_link(&self) -> By {
        By::Css("a.title")
    }

    fn listing_fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::text("company", By::Css("div.row2 a.comp-name"), NOT_SPECIFIED),
            FieldSpec::text("location", By::Css("span.locWdth"), NOT_SPECIFIED),
            FieldSpec::text("experience", By::Css(".expwdth"), NOT_SPECIFIED),
            FieldSpec::text("salary", By::Css(".sal-wrap span span"), NOT_DISCLOSED),
            FieldSpec::text("description", By::ClassName("job-desc"), NO_DESCRIPTION),
            FieldSpec {
                name: "postedDate",
                by: By::XPath(".//span[contains(@class, 'jobDate')]"),
                kind: FieldKind::StrippedText { prefix: "Posted: " },
                missing: NOT_SPECIFIED,
            },
            FieldSpec {
                name: "skills",
                by: By::ClassName("tags-gt"),
                kind: FieldKind::Chips {
                    item: By::ClassName("ellipsis"),
                },
                missing: NOT_SPECIFIED,
            },
        ]
    }

    fn next_control(&self) -> By {
        By::XPath("//a[contains(@class, 'fright') and contains(@class, 'pagination-active')]")
    }

    fn detail_container(&self) -> By {
        By::ClassName("jd-container")
    }

    fn detail_fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::text("fullDescription", By::ClassName("job-desc"), NOT_PROVIDED),
            FieldSpec::text("role", By::ClassName("role-section"), NOT_SPECIFIED),
            FieldSpec::text("companyDetails", By::ClassName("about-company"), NOT_PROVIDED),
            FieldSpec {
                name: "requiredSkills",
                by: By::ClassName("key-skill"),
                kind: FieldKind::Chips {
                    item: By::ClassName("chip"),
                },
                missing: NOT_SPECIFIED,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experience_options_follow_the_site_grammar() {
        let adapter = NaukriAdapter;

        assert_eq!(
            format!("{:?}", adapter.experience_option(&ExperienceFilter::Fresher)),
            format!("{:?}", By::XPath("//span[contains(text(), 'Fresher')]"))
        );
        assert_eq!(
            format!("{:?}", adapter.experience_option(&ExperienceFilter::Years(2))),
            format!("{:?}", By::XPath("//span[contains(text(), '2 Yrs')]"))
        );
        assert_eq!(
            format!(
                "{:?}",
                adapter.experience_option(&ExperienceFilter::Range(2, 5))
            ),
            format!("{:?}", By::XPath("//span[contains(text(), '2 - 5 Yrs')]"))
        );
    }

    #[test]
    fn every_listing_field_carries_a_sentinel() {
        for spec in NaukriAdapter.listing_fields() {
            assert!(!spec.missing.is_empty(), "field {} has no sentinel", spec.name);
        }
        for spec in NaukriAdapter.detail_fields() {
            assert!(!spec.missing.is_empty(), "field {} has no sentinel", spec.name);
        }
    }
}
