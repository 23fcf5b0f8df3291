//! Plain-text table of a [`ResultSet`] for the terminal.

use crate::models::{Published, ResultSet};
use crate::utils::ellipsize;
use std::fmt::Write;

const PUBLISHED_WIDTH: usize = 16;
const STOCK_WIDTH: usize = 20;
const PUBLISHER_WIDTH: usize = 22;
const TITLE_WIDTH: usize = 80;

fn published_cell(published: &Published) -> String {
    match published {
        Published::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
        Published::Unparsed(raw) => raw.clone(),
        Published::Absent => "-".to_string(),
    }
}

/// Render one row per article, newest first. Returns an empty string for an
/// empty result set.
pub fn render_table(result: &ResultSet) -> String {
    if result.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<pw$}  {:<sw$}  {:<bw$}  {}",
        "PUBLISHED",
        "STOCK",
        "PUBLISHER",
        "TITLE",
        pw = PUBLISHED_WIDTH,
        sw = STOCK_WIDTH,
        bw = PUBLISHER_WIDTH,
    );
    let _ = writeln!(
        out,
        "{}",
        "-".repeat(PUBLISHED_WIDTH + STOCK_WIDTH + PUBLISHER_WIDTH + TITLE_WIDTH + 6)
    );

    for article in result {
        let _ = writeln!(
            out,
            "{:<pw$}  {:<sw$}  {:<bw$}  {}",
            ellipsize(&published_cell(&article.published), PUBLISHED_WIDTH),
            ellipsize(article.stock.name(), STOCK_WIDTH),
            ellipsize(article.publisher.as_deref().unwrap_or("-"), PUBLISHER_WIDTH),
            ellipsize(article.title.as_deref().unwrap_or("-"), TITLE_WIDTH),
            pw = PUBLISHED_WIDTH,
            sw = STOCK_WIDTH,
            bw = PUBLISHER_WIDTH,
        );
    }
    out
}
