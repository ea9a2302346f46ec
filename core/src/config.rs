/*
 * config.rs
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

//! Preference storage: typed user preferences layered over a default branch.
//! User preferences persist in ~/.missiva/prefs.xml. All XML read/write uses the quick_xml
//! parser/writer; no hand parsing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use thiserror::Error;

pub const PREF_REPLY_QUOTING_SELECTION: &str = "mailnews.reply_quoting_selection";
pub const PREF_REPLY_QUOTING_SELECTION_MULTI_WORD: &str = "mailnews.reply_quoting_selection.multi_word";
pub const PREF_REPLY_QUOTING_SELECTION_ONLY_IF: &str = "mailnews.reply_quoting_selection.only_if_chars";
pub const PREF_HTML_COMPOSE: &str = "mail.html_compose";
pub const PREF_FORWARD_MESSAGE_MODE: &str = "mail.forward_message_mode";
pub const PREF_GLOBAL_HTML_DOMAINS_VERSION: &str = "mailnews.global_html_domains.version";
pub const PREF_GLOBAL_HTML_DOMAINS: &str = "mailnews.global_html_domains";
pub const PREF_HTML_DOMAINS: &str = "mailnews.html_domains";
pub const PREF_PLAINTEXT_DOMAINS: &str = "mailnews.plaintext_domains";
pub const PREF_LOG_COMPOSE_PERFORMANCE: &str = "mailnews.logComposePerformance";

/// Errors loading or saving the preferences file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
    #[error("preferences lock poisoned")]
    Poisoned,
}

/// A typed preference value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefValue {
    Bool(bool),
    Int(i32),
    Str(String),
}

impl PrefValue {
    fn type_name(&self) -> &'static str {
        match self {
            PrefValue::Bool(_) => "bool",
            PrefValue::Int(_) => "int",
            PrefValue::Str(_) => "string",
        }
    }

    fn to_text(&self) -> String {
        match self {
            PrefValue::Bool(b) => b.to_string(),
            PrefValue::Int(i) => i.to_string(),
            PrefValue::Str(s) => s.clone(),
        }
    }

    fn parse(name: &str, type_name: &str, text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            name: name.to_string(),
            value: text.to_string(),
        };
        match type_name {
            "bool" => text.trim().parse().map(PrefValue::Bool).map_err(|_| invalid()),
            "int" => text.trim().parse().map(PrefValue::Int).map_err(|_| invalid()),
            "string" => Ok(PrefValue::Str(text.to_string())),
            _ => Err(invalid()),
        }
    }
}

/// Typed preference access. Getters return the user value, else the default, else None.
pub trait PreferenceStore: Send + Sync {
    fn bool_pref(&self, name: &str) -> Option<bool>;
    fn int_pref(&self, name: &str) -> Option<i32>;
    fn string_pref(&self, name: &str) -> Option<String>;
    /// Value from the default branch only.
    fn default_int_pref(&self, name: &str) -> Option<i32>;
    fn set_int_pref(&self, name: &str, value: i32) -> Result<(), ConfigError>;
    fn set_string_pref(&self, name: &str, value: &str) -> Result<(), ConfigError>;
}

/// Preferences with a user branch (persisted) and a default branch (shipped defaults).
#[derive(Debug, Default)]
pub struct Preferences {
    user: RwLock<HashMap<String, PrefValue>>,
    defaults: HashMap<String, PrefValue>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: HashMap<String, PrefValue>) -> Self {
        Self {
            user: RwLock::new(HashMap::new()),
            defaults,
        }
    }

    /// Set a user value of any type.
    pub fn set(&self, name: &str, value: PrefValue) -> Result<(), ConfigError> {
        let mut user = self.user.write().map_err(|_| ConfigError::Poisoned)?;
        user.insert(name.to_string(), value);
        Ok(())
    }

    fn value(&self, name: &str) -> Option<PrefValue> {
        let user = self.user.read().ok()?;
        user.get(name).or_else(|| self.defaults.get(name)).cloned()
    }

    /// Load user preferences from `path`, replacing the current user branch.
    /// A missing file leaves the user branch empty.
    pub fn load(&self, path: &Path) -> Result<(), ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let loaded = if content.trim().is_empty() {
            HashMap::new()
        } else {
            parse_prefs_xml(&content)?
        };
        let mut user = self.user.write().map_err(|_| ConfigError::Poisoned)?;
        *user = loaded;
        Ok(())
    }

    /// Write the user branch to `path`, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = {
            let user = self.user.read().map_err(|_| ConfigError::Poisoned)?;
            prefs_xml_to_bytes(&user)?
        };
        fs::write(path, bytes)?;
        Ok(())
    }
}

impl PreferenceStore for Preferences {
    fn bool_pref(&self, name: &str) -> Option<bool> {
        match self.value(name) {
            Some(PrefValue::Bool(b)) => Some(b),
            _ => None,
        }
    }

    fn int_pref(&self, name: &str) -> Option<i32> {
        match self.value(name) {
            Some(PrefValue::Int(i)) => Some(i),
            _ => None,
        }
    }

    fn string_pref(&self, name: &str) -> Option<String> {
        match self.value(name) {
            Some(PrefValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    fn default_int_pref(&self, name: &str) -> Option<i32> {
        match self.defaults.get(name) {
            Some(PrefValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    fn set_int_pref(&self, name: &str, value: i32) -> Result<(), ConfigError> {
        self.set(name, PrefValue::Int(value))
    }

    fn set_string_pref(&self, name: &str, value: &str) -> Result<(), ConfigError> {
        self.set(name, PrefValue::Str(value.to_string()))
    }
}

/// Parse `<preferences><pref><name/><type/><value/></pref>...</preferences>`.
/// Text is not trimmed: string values keep leading and trailing whitespace. Whitespace between
/// elements is ignored because it is outside name/type/value.
fn parse_prefs_xml(content: &str) -> Result<HashMap<String, PrefValue>, ConfigError> {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();
    let mut out = HashMap::new();
    let mut in_pref = false;
    let mut element_name = Vec::<u8>::new();
    let mut name = String::new();
    let mut type_name = String::new();
    let mut value = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(xml_error(e)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let tag = e.name();
                let tag = tag.as_ref();
                if tag == b"pref" {
                    in_pref = true;
                    name.clear();
                    type_name.clear();
                    value.clear();
                } else if in_pref && (tag == b"name" || tag == b"type" || tag == b"value") {
                    element_name.clear();
                    element_name.extend_from_slice(tag);
                    match tag {
                        b"name" => name.clear(),
                        b"type" => type_name.clear(),
                        _ => value.clear(),
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if !in_pref || element_name.is_empty() {
                    continue;
                }
                let text = e.unescape().map_err(xml_error)?;
                match element_name.as_slice() {
                    b"name" => name.push_str(&text),
                    b"type" => type_name.push_str(&text),
                    b"value" => value.push_str(&text),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let tag = e.name();
                if tag.as_ref() == b"pref" {
                    if !name.is_empty() {
                        let parsed = PrefValue::parse(&name, &type_name, &value)?;
                        out.insert(std::mem::take(&mut name), parsed);
                    }
                    in_pref = false;
                }
                element_name.clear();
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn xml_error<E: std::fmt::Display>(e: E) -> ConfigError {
    ConfigError::Xml(e.to_string())
}

fn write_text_element<W: std::io::Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> Result<(), ConfigError> {
    writer.write_event(Event::Start(BytesStart::new(tag))).map_err(xml_error)?;
    writer.write_event(Event::Text(BytesText::new(text))).map_err(xml_error)?;
    writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)?;
    Ok(())
}

/// Build preferences XML (UTF-8). Entries are sorted by name so the file diffs cleanly.
fn prefs_xml_to_bytes(entries: &HashMap<String, PrefValue>) -> Result<Vec<u8>, ConfigError> {
    let mut out = Vec::new();
    let mut writer = Writer::new(&mut out);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("preferences")))
        .map_err(xml_error)?;
    let mut names: Vec<&String> = entries.keys().collect();
    names.sort();
    for name in names {
        let value = &entries[name];
        writer.write_event(Event::Start(BytesStart::new("pref"))).map_err(xml_error)?;
        write_text_element(&mut writer, "name", name)?;
        write_text_element(&mut writer, "type", value.type_name())?;
        write_text_element(&mut writer, "value", &value.to_text())?;
        writer.write_event(Event::End(BytesEnd::new("pref"))).map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("preferences")))
        .map_err(xml_error)?;
    Ok(out)
}
