//! Session acquisition and navigation: login, target view, sub-view tab.
//!
//! Every stage failure here aborts the current pass; the supervisor owns
//! retries between passes.

use std::time::Duration;

use scraper::{Html, Selector};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::{self, Config};
use crate::error::{AppError, Result};
use crate::page::{ActiveView, HttpPage, SelectorStrategy};

/// Path fragment identifying the login page in a URL.
const LOGIN_MARKER: &str = "login";

/// Readiness signal for the target view: first selector that matches.
const ROOT_CONTENT_SELECTOR: &str = "#content, main, body";

/// Ways of locating the "Full-Time Model Raw" tab, tried in order.
const SUBVIEW_STRATEGIES: &[SelectorStrategy] = &[
    SelectorStrategy::Id("two-tab"),
    SelectorStrategy::LabelFor("two"),
    SelectorStrategy::VisibleText("Full-Time Model Raw"),
    SelectorStrategy::Css("label.tab[id='two-tab']"),
];

/// Login form as found on the login page: the submit target plus every
/// field to echo back (credentials and any hidden CSRF-style inputs).
#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub action: String,
    pub fields: Vec<(String, String)>,
}

/// Log in and leave the session cookie in the page's cookie store.
///
/// Success is judged purely by post-submit location: the final URL no
/// longer referencing the login path. This is a heuristic, not a positive
/// signal; a changed redirect on the source flips it.
pub async fn authenticate(page: &mut HttpPage, cfg: &Config) -> Result<()> {
    page.goto(&cfg.login_url).await?;

    let form = parse_login_form(page.body(), &cfg.username, &cfg.password)
        .ok_or_else(|| AppError::Auth("login form not recognized".to_string()))?;
    let action = if form.action.is_empty() {
        cfg.login_url.clone()
    } else {
        form.action
    };

    page.submit_form(&action, &form.fields).await?;

    if login_succeeded(page.final_url()) {
        info!(url = page.final_url(), "authenticated");
        Ok(())
    } else {
        Err(AppError::Auth(
            "still on the login page after submit".to_string(),
        ))
    }
}

/// Load the target view and wait for its root content element.
pub async fn navigate(page: &mut HttpPage, cfg: &Config) -> Result<()> {
    page.goto(&cfg.fulltime_url).await?;

    let deadline = Instant::now() + Duration::from_secs(config::NAV_READY_TIMEOUT_SECS);
    loop {
        if page.exists(ROOT_CONTENT_SELECTOR).await? {
            info!(url = page.final_url(), "target view loaded");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(AppError::Navigation(
                "root content element never appeared".to_string(),
            ));
        }
        sleep(Duration::from_millis(config::POPULATE_POLL_MS)).await;
        page.refresh().await?;
    }
}

/// Activate the sub-view tab. Strategies are tried in order; the first one
/// that completes without an interaction error wins, followed by a fixed
/// settle delay for the sub-view's content.
pub async fn select_subview<V: ActiveView>(view: &mut V) -> Result<()> {
    for strategy in SUBVIEW_STRATEGIES {
        match view.activate(strategy).await {
            Ok(true) => {
                debug!(?strategy, "sub-view control activated");
                sleep(Duration::from_secs(config::SUBVIEW_SETTLE_SECS)).await;
                return Ok(());
            }
            Ok(false) => continue,
            Err(e) => {
                warn!(?strategy, "sub-view activation attempt failed: {e}");
                continue;
            }
        }
    }
    Err(AppError::Selection(format!(
        "no strategy activated the sub-view control ({} tried)",
        SUBVIEW_STRATEGIES.len()
    )))
}

/// Post-submit location heuristic.
pub fn login_succeeded(final_url: &str) -> bool {
    !final_url.to_lowercase().contains(LOGIN_MARKER)
}

/// Find the form containing an input named `username` and collect the
/// fields to submit: credentials plus every hidden input echoed verbatim.
pub fn parse_login_form(body: &str, username: &str, password: &str) -> Option<LoginForm> {
    let form_sel = Selector::parse("form").ok()?;
    let input_sel = Selector::parse("input").ok()?;
    let document = Html::parse_document(body);

    for form in document.select(&form_sel) {
        let inputs: Vec<_> = form.select(&input_sel).collect();
        if !inputs
            .iter()
            .any(|i| i.value().attr("name") == Some("username"))
        {
            continue;
        }

        let mut fields = Vec::new();
        for input in &inputs {
            let Some(name) = input.value().attr("name") else {
                continue;
            };
            match name {
                "username" => fields.push((name.to_string(), username.to_string())),
                "password" => fields.push((name.to_string(), password.to_string())),
                _ if input.value().attr("type") == Some("hidden") => {
                    let value = input.value().attr("value").unwrap_or("");
                    fields.push((name.to_string(), value.to_string()));
                }
                _ => {}
            }
        }

        let action = form.value().attr("action").unwrap_or("").to_string();
        return Some(LoginForm { action, fields });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::page::CellError;

    const LOGIN_PAGE: &str = r#"
        <html><body>
          <form action="/login" method="post">
            <input type="hidden" name="_token" value="abc123">
            <input type="text" name="username">
            <input type="password" name="password">
            <input type="submit" value="Log in">
          </form>
        </body></html>"#;

    #[test]
    fn login_form_echoes_hidden_fields() {
        let form = parse_login_form(LOGIN_PAGE, "user", "pass").unwrap();
        assert_eq!(form.action, "/login");
        assert!(form
            .fields
            .contains(&("_token".to_string(), "abc123".to_string())));
        assert!(form
            .fields
            .contains(&("username".to_string(), "user".to_string())));
        assert!(form
            .fields
            .contains(&("password".to_string(), "pass".to_string())));
    }

    #[test]
    fn page_without_credential_form_is_unrecognized() {
        let body = r#"<form action="/search"><input name="q"></form>"#;
        assert!(parse_login_form(body, "u", "p").is_none());
    }

    #[test]
    fn login_heuristic_is_purely_url_based() {
        assert!(login_succeeded("https://inplayfootballtips.co.uk/full-time"));
        assert!(!login_succeeded("https://inplayfootballtips.co.uk/login"));
        assert!(!login_succeeded("https://inplayfootballtips.co.uk/LOGIN?err=1"));
    }

    /// Fake view whose first N strategies error, then one resolves.
    struct FlakyTabs {
        failures_left: usize,
        resolves: bool,
        attempts: usize,
    }

    #[async_trait]
    impl ActiveView for FlakyTabs {
        async fn exists(&mut self, _selector: &str) -> Result<bool> {
            Ok(true)
        }
        async fn activate(&mut self, _strategy: &SelectorStrategy) -> Result<bool> {
            self.attempts += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(AppError::Selection("not interactable".to_string()));
            }
            Ok(self.resolves)
        }
        async fn refresh(&mut self) -> Result<()> {
            Ok(())
        }
        async fn row_count(&mut self, _t: &str) -> Result<usize> {
            Ok(0)
        }
        async fn cell_count(
            &mut self,
            _t: &str,
            _row: usize,
        ) -> std::result::Result<usize, CellError> {
            Err(CellError::Gone)
        }
        async fn cell_text(
            &mut self,
            _t: &str,
            _row: usize,
            _col: usize,
        ) -> std::result::Result<Option<String>, CellError> {
            Err(CellError::Gone)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subview_selection_falls_through_to_working_strategy() {
        let mut view = FlakyTabs { failures_left: 2, resolves: true, attempts: 0 };
        select_subview(&mut view).await.unwrap();
        assert_eq!(view.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn subview_selection_fails_when_nothing_resolves() {
        let mut view = FlakyTabs { failures_left: 0, resolves: false, attempts: 0 };
        let err = select_subview(&mut view).await.unwrap_err();
        assert!(matches!(err, AppError::Selection(_)));
        assert_eq!(view.attempts, SUBVIEW_STRATEGIES.len());
    }
}
