/*
 * quoting.rs
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

//! Reply quoting of the message pane selection.
//!
//! A reply quotes only the selected text (instead of the whole message) when
//! `mailnews.reply_quoting_selection` is on and the selection passes the configured gates.
//! A failed gate is not an error; the reply simply quotes the whole message.

use crate::compose::html::strip_cite_tags;
use crate::compose::request::SelectionSource;
use crate::config::{
    PreferenceStore, PREF_REPLY_QUOTING_SELECTION, PREF_REPLY_QUOTING_SELECTION_MULTI_WORD,
    PREF_REPLY_QUOTING_SELECTION_ONLY_IF,
};

/// Why the selection was not quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSkip {
    /// Selection quoting is turned off (or the preference is unset).
    Disabled,
    /// No message pane or no selection to quote.
    NoSelection,
    /// Multiple words are required and the selection has at most one.
    SingleWord,
    /// None of the required characters occur in the selection.
    MissingRequiredChar,
    /// The selection could not be serialized as HTML.
    Encoder,
}

/// Selection quoting gates, read from preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotingPolicy {
    pub enabled: bool,
    pub require_multiple_words: bool,
    /// When non-empty, the selection must contain at least one of these characters.
    pub required_chars: String,
}

impl Default for QuotingPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            require_multiple_words: true,
            required_chars: String::new(),
        }
    }
}

impl QuotingPolicy {
    pub fn from_prefs(prefs: &dyn PreferenceStore) -> Self {
        Self {
            enabled: prefs.bool_pref(PREF_REPLY_QUOTING_SELECTION).unwrap_or(false),
            require_multiple_words: prefs
                .bool_pref(PREF_REPLY_QUOTING_SELECTION_MULTI_WORD)
                .unwrap_or(true),
            required_chars: prefs
                .string_pref(PREF_REPLY_QUOTING_SELECTION_ONLY_IF)
                .unwrap_or_default(),
        }
    }

    /// Apply the word and character gates to the plain-text selection.
    pub fn check(&self, selection_text: &str) -> Result<(), QuoteSkip> {
        if !self.enabled {
            return Err(QuoteSkip::Disabled);
        }
        if self.require_multiple_words && !has_multiple_words(selection_text) {
            return Err(QuoteSkip::SingleWord);
        }
        if !self.required_chars.is_empty() && !selection_text.chars().any(|c| self.required_chars.contains(c)) {
            return Err(QuoteSkip::MissingRequiredChar);
        }
        Ok(())
    }
}

/// True when the text holds at least two words. A word is a run of alphanumeric characters, so
/// whitespace and punctuation both separate words.
pub fn has_multiple_words(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .nth(1)
        .is_some()
}

/// HTML of the selection to quote in a reply, with citation tag spans removed.
pub fn selection_html_to_quote(
    policy: &QuotingPolicy,
    selection: Option<&dyn SelectionSource>,
) -> Result<String, QuoteSkip> {
    if !policy.enabled {
        return Err(QuoteSkip::Disabled);
    }
    let selection = selection.ok_or(QuoteSkip::NoSelection)?;
    policy.check(&selection.selection_text())?;
    let html = selection.selection_html().map_err(|e| {
        tracing::warn!("could not serialize selection: {}", e);
        QuoteSkip::Encoder
    })?;
    Ok(strip_cite_tags(&html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    struct Selected {
        text: &'static str,
        html: &'static str,
    }

    impl SelectionSource for Selected {
        fn selection_text(&self) -> String {
            self.text.to_string()
        }
        fn selection_html(&self) -> Result<String, StoreError> {
            Ok(self.html.to_string())
        }
    }

    fn enabled() -> QuotingPolicy {
        QuotingPolicy {
            enabled: true,
            ..QuotingPolicy::default()
        }
    }

    #[test]
    fn multiple_words() {
        assert!(has_multiple_words("hello world"));
        assert!(has_multiple_words("  hello \t world  "));
        assert!(!has_multiple_words("hello"));
        assert!(!has_multiple_words("hello   "));
        assert!(!has_multiple_words("   "));
        assert!(!has_multiple_words(""));
        assert!(has_multiple_words("hello,world"));
        assert!(has_multiple_words("end.\u{2014}Start"));
        assert!(!has_multiple_words("hello,"));
        assert!(!has_multiple_words("...hello!?"));
    }

    #[test]
    fn disabled_policy_always_aborts() {
        let policy = QuotingPolicy {
            require_multiple_words: false,
            ..QuotingPolicy::default()
        };
        let sel = Selected {
            text: "hello world",
            html: "hello world",
        };
        assert_eq!(selection_html_to_quote(&policy, Some(&sel)), Err(QuoteSkip::Disabled));
        assert_eq!(selection_html_to_quote(&policy, None), Err(QuoteSkip::Disabled));
    }

    #[test]
    fn single_word_is_not_quoted() {
        let sel = Selected {
            text: "hello",
            html: "hello",
        };
        assert_eq!(selection_html_to_quote(&enabled(), Some(&sel)), Err(QuoteSkip::SingleWord));
    }

    #[test]
    fn required_chars_gate() {
        let policy = QuotingPolicy {
            enabled: true,
            require_multiple_words: false,
            required_chars: "?!".into(),
        };
        assert_eq!(policy.check("word"), Err(QuoteSkip::MissingRequiredChar));
        assert_eq!(policy.check("word?"), Ok(()));
    }

    #[test]
    fn no_gates_quotes_anything() {
        let policy = QuotingPolicy {
            enabled: true,
            require_multiple_words: false,
            required_chars: String::new(),
        };
        assert_eq!(policy.check(""), Ok(()));
    }

    #[test]
    fn quoted_html_has_cite_tags_removed() {
        let sel = Selected {
            text: "> hello world",
            html: "<span class=\"moz-txt-citetags\">&gt; </span>hello world",
        };
        assert_eq!(selection_html_to_quote(&enabled(), Some(&sel)).unwrap(), "hello world");
    }
}
