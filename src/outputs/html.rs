//! HTML page for the grouped digest.
//!
//! One section per site in grouped-view order, each an ordered list of linked
//! headlines with the site's time text. Every piece of scraped text is
//! escaped before it reaches the page.

use crate::models::GroupedView;
use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::{self, Write};
use url::Url;

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2em auto;padding:0 1em;color:#222}\
h1{font-size:1.6em}h2{border-bottom:1px solid #ddd;padding-bottom:.2em}\
li{margin:.3em 0}a{color:#1a0dab;text-decoration:none}a:hover{text-decoration:underline}\
.time{color:#888;font-size:.85em;margin-left:.6em}";

/// Only http(s) targets become clickable; `javascript:`, `data:` and the like
/// are shown as plain text.
fn is_web_link(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Render the digest for `date` as a complete HTML document.
pub fn render_page(grouped: &GroupedView, date: NaiveDate) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let date = date.format("%Y-%m-%d").to_string();

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"zh-CN\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>Daily News {}</title>", date)?;
    writeln!(out, "<style>{}</style>", STYLE)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<h1>Daily News {}</h1>", date)?;

    if grouped.is_empty() {
        writeln!(out, "<p>No news collected today.</p>")?;
    }

    for group in &grouped.groups {
        writeln!(out, "<section>")?;
        writeln!(out, "<h2>{}</h2>", encode_text(&group.site))?;
        writeln!(out, "<ol>")?;
        for article in &group.articles {
            if is_web_link(&article.url) {
                write!(
                    out,
                    "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a>",
                    encode_double_quoted_attribute(&article.url),
                    encode_text(&article.title)
                )?;
            } else {
                write!(out, "<li>{}", encode_text(&article.title))?;
            }
            if !article.time.is_empty() {
                write!(out, "<span class=\"time\">{}</span>", encode_text(&article.time))?;
            }
            writeln!(out, "</li>")?;
        }
        writeln!(out, "</ol>")?;
        writeln!(out, "</section>")?;
    }

    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(out)
}
