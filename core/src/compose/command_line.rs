/*
 * command_line.rs
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

//! `-compose` / `-url mailto:` command-line handling.

/// Argument prefixes that make a `-url` argument a compose request.
const COMPOSE_PREFIXES: &[&str] = &[
    "mailto:",
    "preselectid=",
    "to=",
    "cc=",
    "bcc=",
    "newsgroups=",
    "subject=",
    "format=",
    "body=",
    "attachment=",
    "message=",
    "from=",
];

/// A compose request found on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeCommand {
    /// Compose argument, possibly empty (`-compose` with no options).
    pub argument: String,
    /// Index of the flag in the argument list.
    pub start: usize,
    /// Index of the last argument consumed (inclusive).
    pub end: usize,
}

fn find_flag(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| {
        let name = a.strip_prefix("--").or_else(|| a.strip_prefix('-'));
        name.is_some_and(|n| n.eq_ignore_ascii_case(flag))
    })
}

fn looks_like_compose(arg: &str) -> bool {
    COMPOSE_PREFIXES.iter().any(|p| arg.starts_with(p))
}

/// Find a compose request in `args`: `-compose [options]`, or `-url` followed by a mailto-like
/// argument. Clients often pass mailto URLs unescaped, split at spaces; following arguments are
/// re-joined with spaces up to the next `-flag`.
pub fn parse_compose_args(args: &[String]) -> Option<ComposeCommand> {
    let (found, is_compose) = match find_flag(args, "compose") {
        Some(i) => (i, true),
        None => (find_flag(args, "url")?, false),
    };
    let mut end = found;
    let mut argument = String::new();
    if let Some(next) = args.get(found + 1) {
        if looks_like_compose(next) {
            argument.push_str(next);
            end += 1;
            while let Some(more) = args.get(end + 1) {
                if more.starts_with('-') {
                    break;
                }
                argument.push(' ');
                argument.push_str(more);
                end += 1;
            }
        } else if !is_compose {
            // -url with something else belongs to another handler.
            return None;
        }
    } else if !is_compose {
        return None;
    }
    Some(ComposeCommand {
        argument,
        start: found,
        end,
    })
}

/// Usage text for `-compose`.
pub fn help_info() -> &'static str {
    concat!(
        "  -compose [ <options> ] Compose a mail or news message. Options are specified\n",
        "                     as string \"option='value,...',option=value,...\" and\n",
        "                     include: from, to, cc, bcc, newsgroups, subject, body,\n",
        "                     message (file), attachment (file), format (html | text).\n",
        "                     Example: \"to=john@example.com,subject='Dinner tonight?'\"\n",
    )
}
