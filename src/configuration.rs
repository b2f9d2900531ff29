use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub webdriver: WebDriverSettings,
    pub scraper: ScraperSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

/// Connection and fingerprint options for the remote browser session.
#[derive(serde::Deserialize, Clone)]
pub struct WebDriverSettings {
    pub url: String,
    pub headless: bool,
    pub disable_images: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Fixed user agent; a rotating one is picked when absent.
    pub user_agent: Option<String>,
}

#[derive(serde::Deserialize, Clone)]
pub struct ScraperSettings {
    pub default_page_budget: u32,
    pub max_page_budget: u32,
    pub output_dir: String,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::new(
            "configuration.yaml",
            config::FileFormat::Yaml,
        ))
        .build()?;

    settings.try_deserialize::<Settings>()
}
