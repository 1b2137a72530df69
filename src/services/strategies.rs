// src/services/strategies.rs

//! Exhibit detection strategies.
//!
//! Each strategy is a pure function of the page content and its URL. It
//! collects candidate hrefs in document order and returns the first one that
//! resolves to an acceptable document URL.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::utils::normalize_document_url;

/// Compiled matchers for one exhibit designator such as `99.1`.
#[derive(Debug, Clone)]
pub struct ExhibitPattern {
    designator: String,
    cell: Regex,
    link_text: Regex,
    file_names: Vec<Regex>,
    mention: Regex,
    href: Regex,
    context_lines: usize,
}

impl ExhibitPattern {
    /// Compile matchers for a `major.minor` designator.
    pub fn new(designator: &str) -> Result<Self> {
        let designator = designator.trim();
        let (major, minor) = designator
            .split_once('.')
            .filter(|(major, minor)| is_number(major) && is_number(minor))
            .ok_or_else(|| {
                AppError::config(format!(
                    "exhibit designator '{designator}' is not of the form 99.1"
                ))
            })?;
        let minor = minor.trim_start_matches('0');
        let minor = if minor.is_empty() { "0" } else { minor };

        let cell = Regex::new(&format!(
            r"(?i)^(?:ex(?:hibit)?[\s._-]*)?{major}[._-]0?{minor}(?:[^0-9]|$)"
        ))?;
        let link_text = Regex::new(&format!(
            r"(?i)(?:^|[^0-9.]){major}[\s._-]0?{minor}(?:[^0-9]|$)"
        ))?;
        let file_names = vec![
            // ex99-1.htm, ex-99-01.htm
            Regex::new(&format!(r"(?i)ex(?:hibit)?-?{major}-0?{minor}(?:[^0-9]|$)"))?,
            // ex99_1.htm, exhibit99_1.htm
            Regex::new(&format!(r"(?i)ex(?:hibit)?-?{major}_0?{minor}(?:[^0-9]|$)"))?,
            // ex991.htm, ex9901.htm
            Regex::new(&format!(r"(?i)ex(?:hibit)?-?{major}0?{minor}(?:[^0-9]|$)"))?,
            // d812345dex991.htm, ea0201234ex99-1_acme.htm
            Regex::new(&format!(
                r"(?i)^[a-z]{{0,3}}\d{{5,}}[a-z0-9_-]*?ex-?{major}[._-]?0?{minor}(?:[^0-9]|$)"
            ))?,
        ];
        let mention = Regex::new(&format!(r"(?:^|[^0-9]){major}[\s.]0?{minor}(?:[^0-9]|$)"))?;
        let href = Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#)?;

        Ok(Self {
            designator: designator.to_string(),
            cell,
            link_text,
            file_names,
            mention,
            href,
            context_lines: 5,
        })
    }

    /// Lines scanned after a textual mention by [`Strategy::Context`].
    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn designator(&self) -> &str {
        &self.designator
    }

    fn matches_cell(&self, text: &str) -> bool {
        self.cell.is_match(&collapse_whitespace(text))
    }

    fn matches_link_text(&self, text: &str) -> bool {
        self.link_text.is_match(&collapse_whitespace(text))
    }

    fn matches_file_name(&self, href: &str) -> bool {
        let path = href.split(['?', '#']).next().unwrap_or("");
        let file_name = path.rsplit('/').next().unwrap_or("");
        self.file_names.iter().any(|re| re.is_match(file_name))
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Detection strategies in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Table row whose cell names the exhibit; nearest link in that row
    Table,
    /// Anchor whose visible text mentions the exhibit number
    LinkText,
    /// Link target following a known exhibit file naming convention
    FileName,
    /// First link within a few lines after a textual mention
    Context,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [
        Strategy::Table,
        Strategy::LinkText,
        Strategy::FileName,
        Strategy::Context,
    ];

    /// 1-based position in [`Strategy::ORDER`].
    pub fn ordinal(self) -> u8 {
        match self {
            Strategy::Table => 1,
            Strategy::LinkText => 2,
            Strategy::FileName => 3,
            Strategy::Context => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Table => "table",
            Strategy::LinkText => "link-text",
            Strategy::FileName => "file-name",
            Strategy::Context => "context",
        }
    }

    /// Run this strategy against a page fetched from `base`.
    pub fn detect(self, pattern: &ExhibitPattern, content: &str, base: &Url) -> Option<Url> {
        let hrefs = match self {
            Strategy::Table => table_hrefs(pattern, content),
            Strategy::LinkText => link_text_hrefs(pattern, content),
            Strategy::FileName => file_name_hrefs(pattern, content),
            Strategy::Context => context_hrefs(pattern, content),
        }
        .unwrap_or_default();

        hrefs
            .iter()
            .find_map(|href| normalize_document_url(base, href))
    }
}

/// Apply every strategy in order; the first match wins.
pub fn detect_first(
    pattern: &ExhibitPattern,
    content: &str,
    base: &Url,
) -> Option<(Strategy, Url)> {
    Strategy::ORDER
        .iter()
        .find_map(|s| s.detect(pattern, content, base).map(|url| (*s, url)))
}

fn cell_hrefs<'a>(
    cell: ElementRef<'a>,
    link_sel: &'a Selector,
) -> impl Iterator<Item = String> + 'a {
    cell.select(link_sel)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
}

fn table_hrefs(pattern: &ExhibitPattern, content: &str) -> Option<Vec<String>> {
    let document = Html::parse_document(content);
    let row_sel = Selector::parse("tr").ok()?;
    let cell_sel = Selector::parse("td, th").ok()?;
    let link_sel = Selector::parse("a[href]").ok()?;

    let mut hrefs = Vec::new();
    for row in document.select(&row_sel) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
        let Some(hit) = cells
            .iter()
            .position(|cell| pattern.matches_cell(&cell.text().collect::<String>()))
        else {
            continue;
        };

        // Walk outwards from the matching cell: hit, hit+1, hit-1, hit+2, ...
        for distance in 0..cells.len() {
            let after = cells.get(hit + distance);
            let before = hit
                .checked_sub(distance)
                .filter(|_| distance > 0)
                .and_then(|i| cells.get(i));
            for cell in [after, before].into_iter().flatten() {
                hrefs.extend(cell_hrefs(*cell, &link_sel));
            }
        }
    }
    Some(hrefs)
}

fn link_text_hrefs(pattern: &ExhibitPattern, content: &str) -> Option<Vec<String>> {
    let document = Html::parse_document(content);
    let link_sel = Selector::parse("a[href]").ok()?;

    Some(
        document
            .select(&link_sel)
            .filter(|a| pattern.matches_link_text(&a.text().collect::<String>()))
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect(),
    )
}

fn file_name_hrefs(pattern: &ExhibitPattern, content: &str) -> Option<Vec<String>> {
    let document = Html::parse_document(content);
    let link_sel = Selector::parse("a[href]").ok()?;

    Some(
        document
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| pattern.matches_file_name(href))
            .map(str::to_string)
            .collect(),
    )
}

fn context_hrefs(pattern: &ExhibitPattern, content: &str) -> Option<Vec<String>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut hrefs = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if !pattern.mention.is_match(line) {
            continue;
        }
        let window_end = (index + pattern.context_lines + 1).min(lines.len());
        hrefs.extend(
            lines[index..window_end]
                .iter()
                .flat_map(|l| pattern.href.captures_iter(*l))
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
        );
    }
    Some(hrefs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str =
        "https://www.sec.gov/Archives/edgar/data/1861449/000186144924000012/0001861449-24-000012-index.htm";

    fn base() -> Url {
        Url::parse(BASE).unwrap()
    }

    fn pattern() -> ExhibitPattern {
        ExhibitPattern::new("99.1").unwrap()
    }

    const INDEX_PAGE: &str = r#"
<html><body>
<table class="tableFile" summary="Document Format Files">
  <tr><th>Seq</th><th>Description</th><th>Document</th><th>Type</th><th>Size</th></tr>
  <tr>
    <td>1</td><td>8-K</td>
    <td><a href="/Archives/edgar/data/1861449/000186144924000012/bynd-20240304.htm">bynd-20240304.htm</a></td>
    <td>8-K</td><td>40123</td>
  </tr>
  <tr>
    <td>2</td><td>PRESS RELEASE</td>
    <td><a href="/ix?doc=/Archives/edgar/data/1861449/000186144924000012/pressrelease.htm">iXBRL</a>
        <a href="/Archives/edgar/data/1861449/000186144924000012/pressrelease.htm">pressrelease.htm</a></td>
    <td>EX-99.1</td><td>20456</td>
  </tr>
  <tr>
    <td>3</td><td>EXHIBIT 99.1 DRAFT</td>
    <td><a href="/Archives/edgar/data/1861449/000186144924000012/ex99-1.htm">ex99-1.htm</a></td>
    <td>EX-99.10</td><td>1024</td>
  </tr>
</table>
</body></html>
"#;

    #[test]
    fn test_designator_validation() {
        assert!(ExhibitPattern::new("99.1").is_ok());
        assert!(ExhibitPattern::new("10.01").is_ok());
        assert!(ExhibitPattern::new("99").is_err());
        assert!(ExhibitPattern::new("ex-99.1").is_err());
    }

    #[test]
    fn test_cell_variants() {
        let p = pattern();
        for text in ["EX-99.1", "ex-99_1", "Exhibit 99-1", "99.1", "EX-99.01", " EX-99.1 "] {
            assert!(p.matches_cell(text), "{text}");
        }
        for text in ["EX-99.10", "EX-99.2", "199.1", "8-K"] {
            assert!(!p.matches_cell(text), "{text}");
        }
    }

    #[test]
    fn test_file_name_conventions() {
        let p = pattern();
        for href in [
            "ex99-1.htm",
            "ex99_1.htm",
            "ex991.htm",
            "ex9901.htm",
            "exhibit99-1.pdf",
            "/Archives/edgar/data/1/2/d812345dex991.htm",
            "ea0201234ex99-1_acme.htm",
            "tm2407890d1_ex99-1.htm",
        ] {
            assert!(p.matches_file_name(href), "{href}");
        }
        for href in ["ex99-10.htm", "ex992.htm", "ex10-1.htm", "press.htm"] {
            assert!(!p.matches_file_name(href), "{href}");
        }
    }

    #[test]
    fn test_table_skips_invalid_link_and_uses_row_document() {
        let url = Strategy::Table.detect(&pattern(), INDEX_PAGE, &base()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.sec.gov/Archives/edgar/data/1861449/000186144924000012/pressrelease.htm"
        );
    }

    #[test]
    fn test_table_wins_over_file_name() {
        // Row 2 satisfies the table strategy, row 3 the file-name strategy.
        let (strategy, url) = detect_first(&pattern(), INDEX_PAGE, &base()).unwrap();
        assert_eq!(strategy, Strategy::Table);
        assert!(url.as_str().ends_with("/pressrelease.htm"));

        let by_name = Strategy::FileName.detect(&pattern(), INDEX_PAGE, &base()).unwrap();
        assert!(by_name.as_str().ends_with("/ex99-1.htm"));
    }

    #[test]
    fn test_link_text() {
        let page = r#"<p><a href="q4.htm">Exhibit 99.1 - Earnings release</a>
                      <a href="other.htm">Exhibit 99.10</a></p>"#;
        let url = Strategy::LinkText.detect(&pattern(), page, &base()).unwrap();
        assert!(url.as_str().ends_with("/000186144924000012/q4.htm"));
        assert!(Strategy::Table.detect(&pattern(), page, &base()).is_none());
    }

    #[test]
    fn test_context_window() {
        let page = "<div>Press release furnished as Exhibit 99 1</div>\n\
                    <div>see attachment</div>\n\
                    <div><a href='release.pdf'>download</a></div>\n";
        let url = Strategy::Context.detect(&pattern(), page, &base()).unwrap();
        assert!(url.as_str().ends_with("/release.pdf"));

        let short = pattern().with_context_lines(1);
        assert!(Strategy::Context.detect(&short, page, &base()).is_none());
    }

    #[test]
    fn test_context_skips_rejected_links_in_window() {
        let page = "<p>The press release is furnished as Exhibit 99.1.</p>\n\
                    <p><a href=\"#toc\">Back to top</a> <a href=\"logo.jpg\">logo</a></p>\n\
                    <p><a href=\"0001861449-24-000012-index.htm\">index</a></p>\n\
                    <p><a href=\"release.htm\">release</a></p>\n";
        let url = Strategy::Context.detect(&pattern(), page, &base()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.sec.gov/Archives/edgar/data/1861449/000186144924000012/release.htm"
        );
    }

    #[test]
    fn test_no_match() {
        let page = r#"<table><tr><td>EX-10.1</td><td><a href="ex10-1.htm">x</a></td></tr></table>"#;
        assert!(detect_first(&pattern(), page, &base()).is_none());
    }
}
