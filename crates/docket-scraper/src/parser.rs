//! Result page parsing: raw portal HTML into a normalized case record.
//!
//! The portal's markup drifts, so every field is extracted through an
//! ordered list of strategies tried until one yields text. A missing
//! field is `None`, never an error; only a page that matches no
//! recognized shape at all (maintenance notice, empty result, no
//! tables) fails the parse.

use crate::error::{Result, SearchError};
use chrono::{Datelike, NaiveDate};
use docket_core::{CaseKey, CaseRecord, OrderEntry};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Page-text fragments meaning the portal itself is down.
const UNAVAILABLE_MARKERS: &[&str] = &[
    "under maintenance",
    "service unavailable",
    "temporarily unavailable",
    "an error occurred",
];

/// Page-text fragments meaning the lookup matched nothing.
const NO_RECORD_MARKERS: &[&str] = &["no record found", "no data found", "record not found"];

/// Column-header keywords identifying an orders/judgments table.
const ORDER_TABLE_KEYWORDS: &[&str] = &["order", "judgment", "date"];

/// One way of locating a field's value in the document.
enum Strategy {
    /// Two-cell table row whose label cell contains any keyword
    LabelledCell(&'static [&'static str]),
    /// Direct CSS selector
    Css(&'static str),
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{1,4}[-/.]\d{1,2}[-/.]\d{2,4}").expect("valid regex")
    })
}

/// Parse a date in any of the formats the portal has been seen to use.
/// Unrecognized text yields `None`.
fn parse_lenient_date(text: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%d-%m-%y", "%d/%m/%y"];

    let candidate = date_regex().find(text)?.as_str();
    FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(candidate, fmt)
            .ok()
            // %Y happily accepts "23" as year 23; let the %y fallback
            // handle two-digit years instead.
            .filter(|d| d.year() >= 1900)
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: &ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Turns result pages into [`CaseRecord`]s.
pub struct ResultParser {
    base_url: String,
}

impl ResultParser {
    /// Create a parser; `base_url` anchors relative PDF links.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Parse a result page for the case identified by `key`.
    ///
    /// # Errors
    /// Returns `SearchError::Parse` if the page is a maintenance or
    /// error notice, reports no matching record, or contains no
    /// recognizable case markup.
    pub fn parse(&self, html: &str, key: &CaseKey) -> Result<CaseRecord> {
        let document = Html::parse_document(html);
        let page_text = element_text(&document.root_element()).to_lowercase();

        if UNAVAILABLE_MARKERS.iter().any(|m| page_text.contains(m)) {
            return Err(SearchError::Parse(
                "portal returned a maintenance or error page".to_string(),
            ));
        }
        if NO_RECORD_MARKERS.iter().any(|m| page_text.contains(m)) {
            return Err(SearchError::Parse(format!(
                "portal reports no record for {key}"
            )));
        }

        let labelled = collect_labelled_cells(&document);
        if labelled.is_empty() && !page_text.contains("vs") {
            return Err(SearchError::Parse(
                "page contains no recognizable case markup".to_string(),
            ));
        }

        let mut record = CaseRecord::new(key.clone());
        record.title = self.extract(
            &document,
            &labelled,
            &[
                Strategy::Css(".case-title"),
                Strategy::Css("h2"),
                Strategy::LabelledCell(&["title", "party", "parties"]),
            ],
        );
        record.petitioner = self.extract(
            &document,
            &labelled,
            &[
                Strategy::LabelledCell(&["petitioner", "appellant", "plaintiff"]),
                Strategy::Css(".petitioner"),
            ],
        );
        record.respondent = self.extract(
            &document,
            &labelled,
            &[
                Strategy::LabelledCell(&["respondent", "defendant"]),
                Strategy::Css(".respondent"),
            ],
        );
        record.filing_date = self
            .extract(
                &document,
                &labelled,
                &[Strategy::LabelledCell(&["filing", "registration"])],
            )
            .as_deref()
            .and_then(parse_lenient_date);
        record.next_hearing_date = self
            .extract(
                &document,
                &labelled,
                &[Strategy::LabelledCell(&["next date", "next hearing", "listing date"])],
            )
            .as_deref()
            .and_then(parse_lenient_date);
        record.status = self.extract(
            &document,
            &labelled,
            &[
                Strategy::LabelledCell(&["status", "stage"]),
                Strategy::Css(".case-status"),
            ],
        );
        record.bench = self.extract(
            &document,
            &labelled,
            &[Strategy::LabelledCell(&["bench", "coram", "court no", "before"])],
        );
        record.orders = self.extract_orders(&document);

        tracing::debug!(
            case = %key,
            orders = record.orders.len(),
            "parsed result page"
        );
        Ok(record)
    }

    fn extract(
        &self,
        document: &Html,
        labelled: &[(String, String)],
        strategies: &[Strategy],
    ) -> Option<String> {
        for strategy in strategies {
            let value = match strategy {
                Strategy::LabelledCell(keywords) => labelled
                    .iter()
                    .find(|(label, value)| {
                        !value.is_empty() && keywords.iter().any(|k| label.contains(k))
                    })
                    .map(|(_, value)| value.clone()),
                Strategy::Css(css) => Selector::parse(css)
                    .ok()
                    .and_then(|sel| document.select(&sel).next())
                    .map(|el| element_text(&el))
                    .filter(|text| !text.is_empty()),
            };
            if value.is_some() {
                return value;
            }
        }
        None
    }

    fn extract_orders(&self, document: &Html) -> Vec<OrderEntry> {
        let Ok(table_sel) = Selector::parse("table") else {
            return Vec::new();
        };
        let Ok(row_sel) = Selector::parse("tr") else {
            return Vec::new();
        };
        let Ok(cell_sel) = Selector::parse("td") else {
            return Vec::new();
        };
        let Ok(link_sel) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        let mut orders = Vec::new();
        for table in document.select(&table_sel) {
            if !is_orders_table(&table) {
                continue;
            }
            for row in table.select(&row_sel) {
                let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
                if cells.is_empty() {
                    continue; // header row (th only)
                }

                let description = collapse_whitespace(
                    &cells
                        .iter()
                        .map(element_text)
                        .collect::<Vec<_>>()
                        .join(" "),
                );
                let order_date = cells
                    .iter()
                    .find_map(|cell| parse_lenient_date(&element_text(cell)));
                let pdf_url = row
                    .select(&link_sel)
                    .filter_map(|a| a.value().attr("href"))
                    .find(|href| {
                        let lowered = href.to_lowercase();
                        lowered.contains(".pdf") || lowered.contains("download")
                    })
                    .map(|href| self.absolutize(href));

                // A row with neither a date nor a document is page
                // furniture, not an order.
                if order_date.is_none() && pdf_url.is_none() {
                    continue;
                }
                orders.push(OrderEntry {
                    order_date,
                    description,
                    pdf_url,
                });
            }
        }
        orders
    }

    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http") {
            return href.to_string();
        }
        match url::Url::parse(&self.base_url).and_then(|base| base.join(href)) {
            Ok(joined) => joined.to_string(),
            Err(_) => format!("{}{}", self.base_url.trim_end_matches('/'), href),
        }
    }
}

fn collect_labelled_cells(document: &Html) -> Vec<(String, String)> {
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("td, th")) else {
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for row in document.select(&row_sel) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() >= 2 {
            let label = element_text(&cells[0]).to_lowercase();
            let value = element_text(&cells[1]);
            if !label.is_empty() {
                pairs.push((label, value));
            }
        }
    }
    pairs
}

fn is_orders_table(table: &ElementRef) -> bool {
    let Ok(header_sel) = Selector::parse("th") else {
        return false;
    };
    let headers: Vec<String> = table
        .select(&header_sel)
        .map(|th| element_text(&th).to_lowercase())
        .collect();
    if headers.is_empty() {
        return false;
    }
    let matched = ORDER_TABLE_KEYWORDS
        .iter()
        .filter(|k| headers.iter().any(|h| h.contains(**k)))
        .count();
    matched >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CaseKey {
        CaseKey::new("W.P.(C)", "1234", 2023).expect("valid key")
    }

    fn parser() -> ResultParser {
        ResultParser::new("https://court.test/app/")
    }

    const RESULT_PAGE: &str = r#"
        <html><body>
        <h2 class="case-title">X vs Y</h2>
        <table>
            <tr><td>Petitioner</td><td>X</td></tr>
            <tr><td>Respondent</td><td>Y</td></tr>
            <tr><td>Date of Filing</td><td>15-01-2023</td></tr>
            <tr><td>Next Date</td><td>01/09/2023</td></tr>
            <tr><td>Status</td><td>Pending</td></tr>
            <tr><td>Coram</td><td>Hon'ble Justice A</td></tr>
        </table>
        <table>
            <tr><th>S.No.</th><th>Order Date</th><th>Order</th></tr>
            <tr><td>1</td><td>01-05-2023</td>
                <td><a href="/orders/1234_2023.pdf">Order disposing application</a></td></tr>
            <tr><td>2</td><td>20-03-2023</td><td>Interim order</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_full_result_page() {
        let record = parser().parse(RESULT_PAGE, &key()).expect("parse");

        assert_eq!(record.title.as_deref(), Some("X vs Y"));
        assert_eq!(record.petitioner.as_deref(), Some("X"));
        assert_eq!(record.respondent.as_deref(), Some("Y"));
        assert_eq!(record.filing_date, NaiveDate::from_ymd_opt(2023, 1, 15));
        assert_eq!(
            record.next_hearing_date,
            NaiveDate::from_ymd_opt(2023, 9, 1)
        );
        assert_eq!(record.status.as_deref(), Some("Pending"));
        assert_eq!(record.bench.as_deref(), Some("Hon'ble Justice A"));

        assert_eq!(record.orders.len(), 2);
        assert_eq!(
            record.orders[0].order_date,
            NaiveDate::from_ymd_opt(2023, 5, 1)
        );
        assert_eq!(
            record.orders[0].pdf_url.as_deref(),
            Some("https://court.test/orders/1234_2023.pdf")
        );
        assert_eq!(record.orders[1].pdf_url, None);
    }

    #[test]
    fn test_missing_fields_are_none() {
        let html = r#"
            <table>
                <tr><td>Petitioner</td><td>X</td></tr>
                <tr><td>Status</td><td>Disposed</td></tr>
            </table>
        "#;
        let record = parser().parse(html, &key()).expect("parse");
        assert_eq!(record.petitioner.as_deref(), Some("X"));
        assert!(record.respondent.is_none());
        assert!(record.filing_date.is_none());
        assert!(record.next_hearing_date.is_none());
        assert!(record.orders.is_empty());
    }

    #[test]
    fn test_unparseable_date_becomes_none() {
        let html = r#"
            <table>
                <tr><td>Petitioner</td><td>X</td></tr>
                <tr><td>Date of Filing</td><td>to be notified</td></tr>
            </table>
        "#;
        let record = parser().parse(html, &key()).expect("parse");
        assert!(record.filing_date.is_none());
    }

    #[test]
    fn test_maintenance_page_is_parse_error() {
        let html = "<html><body><p>The site is under maintenance.</p></body></html>";
        let result = parser().parse(html, &key());
        assert!(matches!(result, Err(SearchError::Parse(_))));
    }

    #[test]
    fn test_no_record_found_is_parse_error() {
        let html = "<html><body><table><tr><td>No record found</td><td></td></tr></table></body></html>";
        let err = parser().parse(html, &key()).expect_err("should fail");
        assert_eq!(err.kind(), "parse_error");
        assert!(err.to_string().contains("W.P.(C) 1234/2023"));
    }

    #[test]
    fn test_unrecognizable_page_is_parse_error() {
        let html = "<html><body><p>Welcome</p></body></html>";
        let result = parser().parse(html, &key());
        assert!(matches!(result, Err(SearchError::Parse(_))));
    }

    #[test]
    fn test_absolute_pdf_url_untouched() {
        let html = r#"
            <table><tr><td>Petitioner</td><td>X</td></tr></table>
            <table>
                <tr><th>Order Date</th><th>Order</th></tr>
                <tr><td>01-05-2023</td>
                    <td><a href="https://cdn.court.test/o/1.pdf">Order</a></td></tr>
            </table>
        "#;
        let record = parser().parse(html, &key()).expect("parse");
        assert_eq!(
            record.orders[0].pdf_url.as_deref(),
            Some("https://cdn.court.test/o/1.pdf")
        );
    }

    #[test]
    fn test_non_order_tables_ignored() {
        let html = r#"
            <table>
                <tr><td>Petitioner</td><td>X</td></tr>
                <tr><td>Respondent</td><td>Y</td></tr>
            </table>
        "#;
        let record = parser().parse(html, &key()).expect("parse");
        assert!(record.orders.is_empty());
    }

    #[test]
    fn test_lenient_date_formats() {
        assert_eq!(
            parse_lenient_date("01-05-2023"),
            NaiveDate::from_ymd_opt(2023, 5, 1)
        );
        assert_eq!(
            parse_lenient_date("listed on 01/05/2023 before court"),
            NaiveDate::from_ymd_opt(2023, 5, 1)
        );
        assert_eq!(
            parse_lenient_date("2023-05-01"),
            NaiveDate::from_ymd_opt(2023, 5, 1)
        );
        assert_eq!(
            parse_lenient_date("01.05.2023"),
            NaiveDate::from_ymd_opt(2023, 5, 1)
        );
        assert_eq!(
            parse_lenient_date("01-05-23"),
            NaiveDate::from_ymd_opt(2023, 5, 1)
        );
        assert_eq!(parse_lenient_date("not a date"), None);
    }
}
