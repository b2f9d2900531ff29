use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::{
    configuration::Settings,
    domain::criteria::{ExperienceFilter, SearchCriteria},
    services::{run_scrape, NaukriAdapter},
};

#[derive(Deserialize)]
struct ScrapeJobsQuery {
    keyword: String,
    location: Option<String>,
    experience: Option<String>,
    pages: Option<u32>,
    details: Option<bool>,
}

/// Trigger one scrape run and return its records inline. Partial and full
/// runs look the same here; completeness shows only in the count.
#[get("")]
pub async fn scrape_jobs(
    settings: web::Data<Settings>,
    query: web::Query<ScrapeJobsQuery>,
) -> HttpResponse {
    let experience = query.experience.as_deref().and_then(|raw| {
        let parsed = ExperienceFilter::parse(raw);
        if parsed.is_none() && !raw.trim().is_empty() {
            log::warn!(
                "Unrecognized experience filter '{}', searching unfiltered",
                raw
            );
        }
        parsed
    });

    let pages = query
        .pages
        .unwrap_or(settings.scraper.default_page_budget)
        .min(settings.scraper.max_page_budget);

    let criteria = match SearchCriteria::new(
        &query.keyword,
        query.location.clone(),
        experience,
        pages,
        query.details.unwrap_or(false),
    ) {
        Ok(criteria) => criteria,
        Err(reason) => return HttpResponse::BadRequest().body(reason),
    };

    let adapter = NaukriAdapter;
    match run_scrape(settings.get_ref(), &adapter, criteria).await {
        Ok(outcome) => {
            let failed = outcome.error.is_some();
            let body = serde_json::json!({
                "keyword": query.keyword,
                "count": outcome.output.record_count,
                "output_file": outcome.output.path,
                "jobs": outcome.records,
                "error": outcome.error,
            });
            if failed {
                HttpResponse::BadGateway().json(body)
            } else {
                HttpResponse::Ok().json(body)
            }
        }
        Err(e) => {
            log::error!("Scrape run could not be completed: {:#}", e);
            HttpResponse::InternalServerError().body(format!("{:#}", e))
        }
    }
}
