//! Transport seam between the pipeline and the source website.
//!
//! [`ActiveView`] is the contract the extractor and navigation code work
//! against: a live page whose table rows and cells are re-resolved by
//! positional index on every read, so a re-render between reads surfaces
//! as [`CellError::Stale`] rather than a crash. The shipped implementation
//! is [`HttpPage`], a cookie-holding reqwest client over the raw
//! server-rendered HTML; a rendering transport would implement the same
//! trait.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Failure modes of a live cell read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellError {
    /// The element reference was invalidated by an in-page re-render;
    /// re-resolving by index may succeed on retry.
    Stale,
    /// The row or cell no longer exists at that index.
    Gone,
}

/// A ready, authenticated page with the target view loaded.
#[async_trait]
pub trait ActiveView: Send {
    /// True when any element matches `selector` in the live view.
    async fn exists(&mut self, selector: &str) -> Result<bool>;

    /// Attempt to activate the sub-view control located by `strategy`.
    /// `Ok(false)` when the control does not resolve; `Err` on an
    /// interaction failure.
    async fn activate(&mut self, strategy: &SelectorStrategy) -> Result<bool>;

    /// Re-read the live view from the source.
    async fn refresh(&mut self) -> Result<()>;

    /// Number of data rows currently in the table at `table_selector`.
    async fn row_count(&mut self, table_selector: &str) -> Result<usize>;

    /// Number of cells in row `row`, re-resolved by index.
    async fn cell_count(
        &mut self,
        table_selector: &str,
        row: usize,
    ) -> std::result::Result<usize, CellError>;

    /// Text of one cell, re-resolved from the live view by index.
    /// `Ok(None)` is an empty cell.
    async fn cell_text(
        &mut self,
        table_selector: &str,
        row: usize,
        col: usize,
    ) -> std::result::Result<Option<String>, CellError>;
}

/// One way of locating the sub-view control. Tried in order; the first
/// strategy that resolves wins.
#[derive(Debug, Clone)]
pub enum SelectorStrategy {
    /// Element id, e.g. the tab's `id` attribute.
    Id(&'static str),
    /// `<label for="...">` pointing at the tab's radio input.
    LabelFor(&'static str),
    /// A label whose visible text contains the given fragment.
    VisibleText(&'static str),
    /// Arbitrary CSS selector.
    Css(&'static str),
}

// ---------------------------------------------------------------------------
// HTTP transport
// ---------------------------------------------------------------------------

/// Raw-HTML transport: a reqwest client with a cookie store, holding the
/// most recently fetched page. The source serves the full table in the
/// initial HTML (its tabs are CSS-state only), so snapshot reads never go
/// stale; refresh re-fetches the current URL.
pub struct HttpPage {
    client: reqwest::Client,
    url: String,
    body: String,
}

impl HttpPage {
    /// Builds a fresh session. The cookie store starts empty, so each
    /// pass re-authenticates from scratch.
    pub fn open(cfg: &Config) -> Result<Self> {
        let user_agent = if cfg.production {
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/120.0.0.0 Safari/537.36"
        } else {
            concat!("inplay-scraper/", env!("CARGO_PKG_VERSION"))
        };
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(cfg.page_timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            url: String::new(),
            body: String::new(),
        })
    }

    /// GET a URL, following redirects; stores the final location and body.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        let resp = self.client.get(url).send().await?;
        self.url = resp.url().to_string();
        self.body = resp.text().await?;
        Ok(())
    }

    /// POST a form, following redirects; stores the final location and body.
    pub async fn submit_form(&mut self, action: &str, fields: &[(String, String)]) -> Result<()> {
        let action = self.resolve(action)?;
        let resp = self.client.post(action).form(fields).send().await?;
        self.url = resp.url().to_string();
        self.body = resp.text().await?;
        Ok(())
    }

    /// Location after the last request, redirects applied.
    pub fn final_url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    fn resolve(&self, href: &str) -> Result<reqwest::Url> {
        if let Ok(absolute) = reqwest::Url::parse(href) {
            return Ok(absolute);
        }
        let base = reqwest::Url::parse(&self.url)
            .map_err(|e| AppError::Navigation(format!("invalid base url {}: {e}", self.url)))?;
        base.join(href)
            .map_err(|e| AppError::Navigation(format!("cannot resolve form action {href}: {e}")))
    }
}

#[async_trait]
impl ActiveView for HttpPage {
    async fn exists(&mut self, selector: &str) -> Result<bool> {
        Ok(matches_selector(&self.body, selector))
    }

    async fn activate(&mut self, strategy: &SelectorStrategy) -> Result<bool> {
        // The source's tabs are CSS-state only; resolving the control in
        // the current DOM is the whole interaction for a raw transport.
        Ok(strategy_matches(&self.body, strategy))
    }

    async fn refresh(&mut self) -> Result<()> {
        if self.url.is_empty() {
            return Err(AppError::Navigation("no page loaded".to_string()));
        }
        let url = self.url.clone();
        self.goto(&url).await
    }

    async fn row_count(&mut self, table_selector: &str) -> Result<usize> {
        Ok(read_rows(&self.body, table_selector).len())
    }

    async fn cell_count(
        &mut self,
        table_selector: &str,
        row: usize,
    ) -> std::result::Result<usize, CellError> {
        let rows = read_rows(&self.body, table_selector);
        rows.get(row).map(Vec::len).ok_or(CellError::Gone)
    }

    async fn cell_text(
        &mut self,
        table_selector: &str,
        row: usize,
        col: usize,
    ) -> std::result::Result<Option<String>, CellError> {
        let rows = read_rows(&self.body, table_selector);
        let cells = rows.get(row).ok_or(CellError::Gone)?;
        cells.get(col).cloned().ok_or(CellError::Gone)
    }
}

// ---------------------------------------------------------------------------
// Synchronous HTML helpers. scraper's Html is not Send, so parsing stays
// inside these helpers and never crosses an await point.
// ---------------------------------------------------------------------------

fn matches_selector(body: &str, selector: &str) -> bool {
    let Ok(sel) = Selector::parse(selector) else {
        return false;
    };
    Html::parse_document(body).select(&sel).next().is_some()
}

/// Extracts the cell texts of every `tbody tr` under the first element
/// matching `table_selector`. Cells are the rendered text of each `td`,
/// whitespace-collapsed; empty cells are `None`.
pub fn read_rows(body: &str, table_selector: &str) -> Vec<Vec<Option<String>>> {
    let Ok(table_sel) = Selector::parse(table_selector) else {
        return Vec::new();
    };
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tbody tr"), Selector::parse("td")) else {
        return Vec::new();
    };

    let document = Html::parse_document(body);
    let Some(table) = document.select(&table_sel).next() else {
        return Vec::new();
    };

    table
        .select(&row_sel)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| {
                    let text = cell
                        .text()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ");
                    if text.is_empty() {
                        None
                    } else {
                        Some(text)
                    }
                })
                .collect()
        })
        .collect()
}

fn strategy_matches(body: &str, strategy: &SelectorStrategy) -> bool {
    match strategy {
        SelectorStrategy::Id(id) => matches_selector(body, &format!("#{id}")),
        SelectorStrategy::LabelFor(target) => {
            matches_selector(body, &format!("label[for='{target}']"))
        }
        SelectorStrategy::VisibleText(fragment) => {
            let Ok(sel) = Selector::parse("label") else {
                return false;
            };
            let document = Html::parse_document(body);
            document
                .select(&sel)
                .any(|el| el.text().collect::<String>().contains(fragment))
        }
        SelectorStrategy::Css(selector) => matches_selector(body, selector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <label id="two-tab" class="tab" for="two">Full-Time Model Raw</label>
          <table id="fulltimemodelraw">
            <thead><tr><th>a</th><th>b</th></tr></thead>
            <tbody>
              <tr><td> 29/08/2025, 18:44:35 </td><td>Premier   League</td></tr>
              <tr><td></td><td>-</td></tr>
            </tbody>
          </table>
        </body></html>"#;

    #[test]
    fn reads_body_rows_with_collapsed_whitespace() {
        let rows = read_rows(PAGE, "#fulltimemodelraw");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].as_deref(), Some("29/08/2025, 18:44:35"));
        assert_eq!(rows[0][1].as_deref(), Some("Premier League"));
    }

    #[test]
    fn empty_cell_reads_as_none_but_dash_does_not() {
        // "-" normalization is the extractor's job; the transport reports
        // the literal cell text.
        let rows = read_rows(PAGE, "#fulltimemodelraw");
        assert_eq!(rows[1][0], None);
        assert_eq!(rows[1][1].as_deref(), Some("-"));
    }

    #[test]
    fn missing_table_yields_no_rows() {
        assert!(read_rows(PAGE, "#other").is_empty());
        assert!(read_rows(PAGE, "not a selector ][").is_empty());
    }

    #[test]
    fn strategies_resolve_against_tab_markup() {
        assert!(strategy_matches(PAGE, &SelectorStrategy::Id("two-tab")));
        assert!(strategy_matches(PAGE, &SelectorStrategy::LabelFor("two")));
        assert!(strategy_matches(
            PAGE,
            &SelectorStrategy::VisibleText("Full-Time Model Raw")
        ));
        assert!(strategy_matches(
            PAGE,
            &SelectorStrategy::Css("label.tab[id='two-tab']")
        ));
        assert!(!strategy_matches(PAGE, &SelectorStrategy::Id("three-tab")));
    }
}
