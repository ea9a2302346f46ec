/*
 * html_domains.rs
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

//! One-time merge of the distributor's global HTML domain list into the user's send-format lists.
//!
//! The user's preference file records the version of the global list it has seen. When the
//! shipped default version is at least that high, the global domains not already present in the
//! user's HTML or plain-text lists are appended to the HTML list and the recorded version is
//! bumped, so the merge runs once per shipped version.

use crate::config::{
    ConfigError, PreferenceStore, PREF_GLOBAL_HTML_DOMAINS, PREF_GLOBAL_HTML_DOMAINS_VERSION, PREF_HTML_DOMAINS,
    PREF_PLAINTEXT_DOMAINS,
};

const DOMAIN_DELIMITER: char = ',';

/// Inputs of the migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDomainLists {
    /// Version recorded in the user's preferences.
    pub current_version: i32,
    /// Version shipped with the defaults.
    pub default_version: i32,
    /// Comma separated global list.
    pub global: String,
    pub user_html: String,
    pub user_plaintext: String,
}

/// Result of a migration that ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedHtmlDomains {
    pub html_domains: String,
    pub version: i32,
}

fn split_domains(list: &str) -> impl Iterator<Item = &str> {
    list.split(DOMAIN_DELIMITER).filter(|d| !d.is_empty())
}

/// Merge the global list into the user's HTML domain list. Returns None when nothing is due:
/// the user already saw this version, or the global list is empty.
pub fn merge_global_html_domains(lists: &HtmlDomainLists) -> Option<MergedHtmlDomains> {
    if lists.current_version > lists.default_version || lists.global.is_empty() {
        return None;
    }
    let mut known: Vec<String> = split_domains(&lists.user_html)
        .chain(split_domains(&lists.user_plaintext))
        .map(str::to_string)
        .collect();

    let html_domains = if known.is_empty() {
        lists.global.clone()
    } else {
        let global: String = lists.global.chars().filter(|c| !c.is_whitespace()).collect();
        let mut merged = lists.user_html.clone();
        for domain in split_domains(&global) {
            if known.iter().any(|d| d == domain) {
                continue;
            }
            if !merged.is_empty() {
                merged.push(DOMAIN_DELIMITER);
            }
            merged.push_str(domain);
            known.push(domain.to_string());
        }
        merged
    };
    Some(MergedHtmlDomains {
        html_domains,
        version: lists.current_version + 1,
    })
}

/// Run the migration against a preference store. Returns true when the preferences were updated.
pub fn migrate_html_domains(prefs: &dyn PreferenceStore) -> Result<bool, ConfigError> {
    let (Some(current_version), Some(default_version)) = (
        prefs.int_pref(PREF_GLOBAL_HTML_DOMAINS_VERSION),
        prefs.default_int_pref(PREF_GLOBAL_HTML_DOMAINS_VERSION),
    ) else {
        return Ok(false);
    };
    let lists = HtmlDomainLists {
        current_version,
        default_version,
        global: prefs.string_pref(PREF_GLOBAL_HTML_DOMAINS).unwrap_or_default(),
        user_html: prefs.string_pref(PREF_HTML_DOMAINS).unwrap_or_default(),
        user_plaintext: prefs.string_pref(PREF_PLAINTEXT_DOMAINS).unwrap_or_default(),
    };
    let Some(merged) = merge_global_html_domains(&lists) else {
        return Ok(false);
    };
    prefs.set_string_pref(PREF_HTML_DOMAINS, &merged.html_domains)?;
    prefs.set_int_pref(PREF_GLOBAL_HTML_DOMAINS_VERSION, merged.version)?;
    tracing::info!(
        "merged global HTML domains; version {} -> {}",
        current_version,
        merged.version
    );
    Ok(true)
}
