/*
 * html.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Missiva, a mail and news compose pipeline.
 *
 * Missiva is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Missiva is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Missiva.  If not, see <http://www.gnu.org/licenses/>.
 */

//! HTML helpers for seeding compose bodies: escaping, citation tag stripping, sanitizer seam.

use crate::store::StoreError;

/// Wrapper the message renderer puts around quote markers (`&gt; `) in displayed plain text.
const CITE_TAGS_OPEN: &str = "<span class=\"moz-txt-citetags\">";
const SPAN_CLOSE: &str = "</span>";

/// Removes unsafe markup from untrusted HTML (e.g. an `html-body` mailto parameter).
pub trait HtmlSanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> Result<String, StoreError>;
}

/// Escape text for inclusion in an HTML body.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove every citation-tag span, including its content, from selection HTML.
/// Stops at the first opening tag that has no closing tag, leaving the rest untouched.
pub fn strip_cite_tags(html: &str) -> String {
    let mut out = html.to_string();
    while let Some(start) = out.find(CITE_TAGS_OPEN) {
        let Some(close) = out[start..].find(SPAN_CLOSE) else {
            break;
        };
        out.replace_range(start..start + close + SPAN_CLOSE.len(), "");
    }
    out
}
