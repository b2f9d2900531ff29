use anyhow::Context;
use fake_user_agent::get_chrome_rua;
use thirtyfour::{ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};

use crate::configuration::WebDriverSettings;

/// Owns the remote browser session. Failing to open one is fatal to the
/// whole run; `close` must run on every exit path.
pub struct Droid {
    pub driver: WebDriver,
}

impl Droid {
    pub async fn open(settings: &WebDriverSettings) -> anyhow::Result<Self> {
        let mut caps = DesiredCapabilities::chrome();

        if settings.headless {
            caps.add_arg("--headless=new")?;
        }
        caps.add_arg(&format!(
            "--window-size={},{}",
            settings.window_width, settings.window_height
        ))?;
        for arg in [
            "--disable-notifications",
            "--disable-popup-blocking",
            "--disable-infobars",
            "--disable-extensions",
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
        ] {
            caps.add_arg(arg)?;
        }

        let user_agent = settings
            .user_agent
            .clone()
            .unwrap_or_else(|| get_chrome_rua().to_string());
        caps.add_arg(&format!("--user-agent={}", user_agent))?;

        if settings.disable_images {
            caps.add_experimental_option(
                "prefs",
                serde_json::json!({"profile.managed_default_content_settings.images": 2}),
            )?;
        }

        let driver = WebDriver::new(&settings.url, caps)
            .await
            .with_context(|| format!("failed to start a browser session at {}", settings.url))?;

        Ok(Droid { driver })
    }

    pub async fn close(self) -> anyhow::Result<()> {
        self.driver
            .quit()
            .await
            .context("failed to shut down the browser session")
    }
}
