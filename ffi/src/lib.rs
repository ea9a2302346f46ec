/*
 * lib.rs
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

//! C FFI for missiva core: logging setup, the header/body boundary extractor, template
//! references, HTML domain merging and compose command-line parsing.
//! Returned strings are newly allocated (free with missiva_free_string) unless noted.
//! All string parameters are UTF-8 NUL-terminated.

use libc::{c_char, c_int, size_t};
use missiva_core::compose::command_line::{help_info, parse_compose_args};
use missiva_core::compose::html::escape_html;
use missiva_core::compose::html_domains::{merge_global_html_domains, HtmlDomainLists};
use missiva_core::compose::{BoundaryExtractor, ComposeError, TemplateRef};
use once_cell::sync::{Lazy, OnceCell};
use std::ffi::{CStr, CString};
use std::ptr;
use tracing_subscriber::EnvFilter;

static LOGGING: OnceCell<()> = OnceCell::new();

static HELP: Lazy<CString> = Lazy::new(|| CString::new(help_info()).unwrap_or_default());

fn ptr_to_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string()) }
}

fn string_to_ptr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c) => c.into_raw(),
        Err(_) => {
            set_last_error_message("string contains NUL");
            ptr::null_mut()
        }
    }
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> = const { std::cell::RefCell::new(None) };
}

fn set_last_error_message(msg: &str) {
    let msg = CString::new(msg).unwrap_or_default();
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn set_last_error(err: &ComposeError) {
    set_last_error_message(&err.to_string());
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

/// Version string (static, do not free).
#[no_mangle]
pub extern "C" fn missiva_version() -> *const c_char {
    b"0.1.0\0".as_ptr() as *const c_char
}

/// Last error message from a failed call. Valid until next FFI call on this thread. Do not free.
#[no_mangle]
pub extern "C" fn missiva_last_error() -> *const c_char {
    LAST_ERROR.with(|e| e.borrow().as_ref().map(|s| s.as_ptr()).unwrap_or(ptr::null()))
}

/// Free a string returned by this library. No-op if ptr is NULL.
#[no_mangle]
pub unsafe extern "C" fn missiva_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

/// Install the log subscriber on stderr. RUST_LOG takes precedence; when unset, `level` is used
/// as the filter directive (e.g. "debug" or "missiva_core=trace"), and NULL means "info".
/// Returns 0 on success, -1 if already installed or the directive is invalid.
#[no_mangle]
pub unsafe extern "C" fn missiva_init_logging(level: *const c_char) -> c_int {
    if LOGGING.get().is_some() {
        return -1;
    }
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match EnvFilter::try_new(ptr_to_str(level).unwrap_or_else(|| "info".to_string())) {
            Ok(f) => f,
            Err(e) => {
                set_last_error_message(&e.to_string());
                return -1;
            }
        },
    };
    match tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
    {
        Ok(()) => {
            let _ = LOGGING.set(());
            tracing::debug!("missiva {} logging initialised", env!("CARGO_PKG_VERSION"));
            0
        }
        Err(e) => {
            set_last_error_message(&e.to_string());
            -1
        }
    }
}

/// New boundary extractor. Free with missiva_boundary_extractor_free, or consume with
/// missiva_boundary_extractor_finish.
#[no_mangle]
pub extern "C" fn missiva_boundary_extractor_new() -> *mut BoundaryExtractor {
    Box::into_raw(Box::new(BoundaryExtractor::new()))
}

/// Feed a chunk of raw message bytes. Returns 0, or -1 on NULL arguments.
#[no_mangle]
pub unsafe extern "C" fn missiva_boundary_extractor_feed(
    extractor: *mut BoundaryExtractor,
    data: *const u8,
    len: size_t,
) -> c_int {
    if extractor.is_null() || (data.is_null() && len > 0) {
        return -1;
    }
    if len > 0 {
        let chunk = std::slice::from_raw_parts(data, len);
        (*extractor).feed(chunk);
    }
    0
}

/// 1 once the header/body separator has been seen, 0 before, -1 on NULL.
#[no_mangle]
pub unsafe extern "C" fn missiva_boundary_extractor_in_body(extractor: *const BoundaryExtractor) -> c_int {
    if extractor.is_null() {
        return -1;
    }
    c_int::from((*extractor).in_body())
}

/// Consume the extractor and return the body bytes; `out_len` receives the length. Returns NULL for
/// an empty body. Free the result with missiva_free_bytes.
#[no_mangle]
pub unsafe extern "C" fn missiva_boundary_extractor_finish(
    extractor: *mut BoundaryExtractor,
    out_len: *mut size_t,
) -> *mut u8 {
    if !out_len.is_null() {
        *out_len = 0;
    }
    if extractor.is_null() {
        return ptr::null_mut();
    }
    let body = Box::from_raw(extractor).finish();
    if body.is_empty() {
        return ptr::null_mut();
    }
    if !out_len.is_null() {
        *out_len = body.len();
    }
    Box::into_raw(body.to_vec().into_boxed_slice()) as *mut u8
}

/// Free an extractor that was not finished. No-op if NULL.
#[no_mangle]
pub unsafe extern "C" fn missiva_boundary_extractor_free(extractor: *mut BoundaryExtractor) {
    if !extractor.is_null() {
        drop(Box::from_raw(extractor));
    }
}

/// Free bytes returned by missiva_boundary_extractor_finish.
#[no_mangle]
pub unsafe extern "C" fn missiva_free_bytes(data: *mut u8, len: size_t) {
    if !data.is_null() {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)));
    }
}

/// Template reference string for a message in a Templates folder.
#[no_mangle]
pub unsafe extern "C" fn missiva_template_ref_build(
    folder_uri: *const c_char,
    message_id: *const c_char,
    subject: *const c_char,
) -> *mut c_char {
    clear_last_error();
    let (Some(folder_uri), Some(message_id)) = (ptr_to_str(folder_uri), ptr_to_str(message_id)) else {
        set_last_error_message("folder URI and message id are required");
        return ptr::null_mut();
    };
    let subject = ptr_to_str(subject).unwrap_or_default();
    string_to_ptr(&TemplateRef::new(folder_uri, message_id, subject).to_string())
}

/// Parse a template reference. On success returns 0 and stores newly allocated strings in the
/// out parameters (each may be NULL to skip). Returns -1 with missiva_last_error set otherwise.
#[no_mangle]
pub unsafe extern "C" fn missiva_template_ref_parse(
    template_ref: *const c_char,
    out_folder_uri: *mut *mut c_char,
    out_message_id: *mut *mut c_char,
    out_subject: *mut *mut c_char,
) -> c_int {
    clear_last_error();
    let Some(s) = ptr_to_str(template_ref) else {
        set_last_error_message("template reference is NULL or not UTF-8");
        return -1;
    };
    let parsed = match TemplateRef::parse(&s) {
        Ok(r) => r,
        Err(e) => {
            set_last_error(&e);
            return -1;
        }
    };
    for (out, value) in [
        (out_folder_uri, &parsed.folder_uri),
        (out_message_id, &parsed.message_id),
        (out_subject, &parsed.subject),
    ] {
        if !out.is_null() {
            *out = string_to_ptr(value);
        }
    }
    0
}

/// Merge the global HTML domain list into the user's HTML domain list. Returns the new list and
/// stores the new version in `out_version`, or NULL when no merge is due.
#[no_mangle]
pub unsafe extern "C" fn missiva_merge_html_domains(
    current_version: c_int,
    default_version: c_int,
    global: *const c_char,
    user_html: *const c_char,
    user_plaintext: *const c_char,
    out_version: *mut c_int,
) -> *mut c_char {
    clear_last_error();
    let lists = HtmlDomainLists {
        current_version,
        default_version,
        global: ptr_to_str(global).unwrap_or_default(),
        user_html: ptr_to_str(user_html).unwrap_or_default(),
        user_plaintext: ptr_to_str(user_plaintext).unwrap_or_default(),
    };
    match merge_global_html_domains(&lists) {
        Some(merged) => {
            if !out_version.is_null() {
                *out_version = merged.version;
            }
            string_to_ptr(&merged.html_domains)
        }
        None => ptr::null_mut(),
    }
}

/// HTML-escaped copy of `text`.
#[no_mangle]
pub unsafe extern "C" fn missiva_escape_html(text: *const c_char) -> *mut c_char {
    clear_last_error();
    string_to_ptr(&escape_html(&ptr_to_str(text).unwrap_or_default()))
}

/// Find a compose request (`-compose`, or `-url mailto:...`) in argv. Returns the compose argument
/// (possibly empty) and the consumed index range in `out_start`/`out_end`, or NULL if there is none.
#[no_mangle]
pub unsafe extern "C" fn missiva_parse_compose_args(
    argc: c_int,
    argv: *const *const c_char,
    out_start: *mut c_int,
    out_end: *mut c_int,
) -> *mut c_char {
    clear_last_error();
    if argv.is_null() || argc <= 0 {
        return ptr::null_mut();
    }
    let args: Vec<String> = (0..argc as usize)
        .map(|i| ptr_to_str(*argv.add(i)).unwrap_or_default())
        .collect();
    let Some(command) = parse_compose_args(&args) else {
        return ptr::null_mut();
    };
    if !out_start.is_null() {
        *out_start = command.start as c_int;
    }
    if !out_end.is_null() {
        *out_end = command.end as c_int;
    }
    string_to_ptr(&command.argument)
}

/// Usage text for `-compose` (static, do not free).
#[no_mangle]
pub extern "C" fn missiva_compose_help() -> *const c_char {
    HELP.as_ptr()
}
