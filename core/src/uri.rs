/*
 * uri.rs
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

//! Message URI helpers: query flags, file → mailbox rewriting, news URI splitting.
//! Message URIs look like `mailbox-message://nobody@Local%20Folders/Inbox#42`; query terms
//! appended here are read by the retrieval service and the MIME converter.

/// Query term asking the retrieval service for the full message (all parts, not just the displayed ones).
pub const FETCH_COMPLETE_MESSAGE: &str = "fetchCompleteMessage=true";

/// Marks a URI that already addresses a message opened for display.
const MESSAGE_DISPLAY_TYPE: &str = "&type=application/x-message-display";

/// Append a query term, starting the query with `?` if the URI has none yet.
pub fn with_query_flag(uri: &str, term: &str) -> String {
    let sep = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}{}", uri, sep, term)
}

/// `file:` URI of a loaded .eml file rewritten as the equivalent `mailbox:` URI addressing part 0.
/// Returns None for any other URI.
pub fn file_to_mailbox_uri(uri: &str) -> Option<String> {
    let rest = uri.strip_prefix("file:")?;
    Some(format!("mailbox:{}&number=0", rest))
}

/// True when the URI already names a message opened for display, so it can be used as the URL directly.
pub fn is_message_display_uri(uri: &str) -> bool {
    uri.contains(MESSAGE_DISPLAY_TYPE)
}

/// Split `[s]news://host[:port]/group` into the server URL and the decoded group name.
/// Without a slash (past the first character) the whole URI is the group and the server is empty.
pub fn split_news_uri(uri: &str) -> (String, String) {
    match uri.rfind('/') {
        Some(slash) if slash > 0 => (uri[..slash].to_string(), decode_component(&uri[slash + 1..])),
        _ => (String::new(), decode_component(uri)),
    }
}

/// Percent-decode a URI component (lossy on invalid UTF-8).
pub fn decode_component(encoded: &str) -> String {
    percent_encoding::percent_decode_str(encoded).decode_utf8_lossy().into_owned()
}
