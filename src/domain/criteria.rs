/// Experience constraint applied on the results page.
///
/// Parsed from the caller-supplied string: `"0"` is the fresher sentinel,
/// a bare integer means exact years, `"min-max"` means a range. Anything
/// else does not map to a filter option and the search runs unfiltered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperienceFilter {
    Fresher,
    Years(u32),
    Range(u32, u32),
}

impl ExperienceFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();

        if let Some((min, max)) = raw.split_once('-') {
            let min = min.trim().parse().ok()?;
            let max = max.trim().parse().ok()?;
            return Some(ExperienceFilter::Range(min, max));
        }

        if raw == "0" {
            return Some(ExperienceFilter::Fresher);
        }

        raw.parse().ok().map(ExperienceFilter::Years)
    }
}

/// One search request. Immutable once a run starts.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub keyword: String,
    pub location: Option<String>,
    pub experience: Option<ExperienceFilter>,
    pub page_budget: u32,
    pub fetch_details: bool,
}

impl SearchCriteria {
    pub fn new(
        keyword: &str,
        location: Option<String>,
        experience: Option<ExperienceFilter>,
        page_budget: u32,
        fetch_details: bool,
    ) -> Result<Self, String> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err("search keyword must not be empty".to_string());
        }
        if page_budget == 0 {
            return Err("page budget must be at least 1".to_string());
        }

        let location = location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        Ok(SearchCriteria {
            keyword: keyword.to_string(),
            location,
            experience,
            page_budget,
            fetch_details,
        })
    }
}
