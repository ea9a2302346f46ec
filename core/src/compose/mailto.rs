/*
 * mailto.rs
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

//! `mailto:` URL parsing (RFC 6068), plus the `html-body` extension.

use crate::compose::error::ComposeError;
use crate::compose::request::ComposeFormat;
use crate::uri::decode_component;

/// Message contents carried by a mailto URL. Values are percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailtoUrl {
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body: String,
    /// `html-body` parameter; empty when absent.
    pub html_body: String,
    pub references: String,
    pub newsgroups: String,
    /// `Html` when an `html-body` parameter was present, else `Default`.
    pub requested_format: ComposeFormat,
}

fn append_address(list: &mut String, value: &str) {
    if value.is_empty() {
        return;
    }
    if !list.is_empty() {
        list.push_str(", ");
    }
    list.push_str(value);
}

impl MailtoUrl {
    pub fn parse(url: &str) -> Result<Self, ComposeError> {
        let rest = url
            .get(..7)
            .filter(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
            .map(|_| &url[7..])
            .ok_or_else(|| ComposeError::InvalidArgument(format!("not a mailto URL: {}", url)))?;

        let (path, query) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        let mut out = MailtoUrl::default();
        append_address(&mut out.to, &decode_component(path));

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.find('=') {
                Some(i) => (&pair[..i], &pair[i + 1..]),
                None => (pair, ""),
            };
            let value = decode_component(value);
            match key.to_ascii_lowercase().as_str() {
                "to" => append_address(&mut out.to, &value),
                "cc" => append_address(&mut out.cc, &value),
                "bcc" => append_address(&mut out.bcc, &value),
                "subject" => out.subject = value,
                "body" => out.body = value,
                "html-body" => {
                    out.html_body = value;
                    out.requested_format = ComposeFormat::Html;
                }
                "references" | "in-reply-to" if out.references.is_empty() => out.references = value,
                "newsgroups" => out.newsgroups = value,
                other => tracing::debug!("ignoring mailto parameter {}", other),
            }
        }
        Ok(out)
    }
}
