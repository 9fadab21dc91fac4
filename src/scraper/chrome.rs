//! `headless_chrome` backend for the article scraper.
//!
//! Each [`ChromeLauncher::launch`] starts a dedicated Chrome process with the
//! configured viewport and user agent. [`ChromeSession`] owns the
//! [`Browser`]; dropping the session kills the process, including when a
//! step in between returned early with an error.

use super::{BrowserLauncher, BrowserSession, PageControl, ScrapeError, ScrapeOptions};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::{OsStr, OsString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";

/// XPath for the first `button`, `a` or `role=button` element whose string
/// value contains `keyword` (already lowercase), matched case-insensitively
/// inside the browser.
///
/// Returns `None` for a keyword containing both quote characters, which an
/// XPath 1.0 literal cannot express.
fn consent_xpath(keyword: &str) -> Option<String> {
    let literal = if !keyword.contains('\'') {
        format!("'{keyword}'")
    } else if !keyword.contains('"') {
        format!("\"{keyword}\"")
    } else {
        return None;
    };
    Some(format!(
        "(//*[(self::button or self::a or @role='button') and contains(translate(., '{UPPERCASE}', '{LOWERCASE}'), {literal})])[1]"
    ))
}

/// Launches one headless Chrome process per scrape.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeLauncher;

/// A live Chrome process with one tab. Dropping it kills the process.
pub struct ChromeSession {
    // Declared before `browser` so the tab handle is released first.
    tab: Arc<Tab>,
    browser: Browser,
}

impl std::fmt::Debug for ChromeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeSession")
            .field("pid", &self.browser.get_process_id())
            .finish()
    }
}

impl BrowserLauncher for ChromeLauncher {
    type Session = ChromeSession;

    #[instrument(level = "debug", skip_all)]
    fn launch(&self, options: &ScrapeOptions) -> Result<ChromeSession, ScrapeError> {
        let user_agent = OsString::from(format!("--user-agent={}", options.user_agent));
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((options.window_width, options.window_height)))
            .path(options.chrome_path.clone())
            .args(vec![OsStr::new("--disable-gpu"), user_agent.as_os_str()])
            .build()
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let browser = Browser::new(launch_options).map_err(|e| ScrapeError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;
        tab.set_default_timeout(options.navigation_timeout);
        debug!(pid = ?browser.get_process_id(), "Launched headless Chrome");

        Ok(ChromeSession { tab, browser })
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| ScrapeError::Navigation(e.to_string()))
    }

    /// One DevTools search per keyword; the match itself runs in the page.
    fn find_control(&mut self, keyword: &str) -> Result<Option<PageControl>, ScrapeError> {
        let Some(xpath) = consent_xpath(keyword) else {
            return Ok(None);
        };
        // headless_chrome reports an empty search as an error; the caller
        // skips the keyword either way.
        let elements = self
            .tab
            .find_elements_by_xpath(&xpath)
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        let Some(element) = elements.first() else {
            return Ok(None);
        };
        Ok(Some(PageControl {
            label: element.get_inner_text().unwrap_or_else(|_| keyword.to_string()),
            selector: xpath,
        }))
    }

    fn click(&mut self, control: &PageControl) -> Result<(), ScrapeError> {
        self.tab
            .find_element_by_xpath(&control.selector)
            .and_then(|element| element.click().map(|_| ()))
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }

    fn body_text(&mut self, timeout: Duration) -> Result<String, ScrapeError> {
        let body = self
            .tab
            .wait_for_element_with_custom_timeout("body", timeout)
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        body.get_inner_text()
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consent_xpath_lowercases_in_page_and_takes_first() {
        let xpath = consent_xpath("accept").unwrap();
        assert!(xpath.starts_with("(//*[(self::button or self::a or @role='button')"));
        assert!(xpath.contains(&format!("translate(., '{UPPERCASE}', '{LOWERCASE}')")));
        assert!(xpath.ends_with(", 'accept')])[1]"));
    }

    #[test]
    fn test_consent_xpath_quotes() {
        assert!(consent_xpath("i'm ok").unwrap().contains("\"i'm ok\""));
        assert!(consent_xpath("say \"yes\"").unwrap().contains("'say \"yes\"'"));
        assert_eq!(consent_xpath("it's \"fine\""), None);
    }
}
