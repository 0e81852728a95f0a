// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of flat `NAME=value` variables into a nested mapping.
//!
//! Shared by the environment and dotenv providers. Names are lower-cased,
//! filtered through a fixed deny-list, optionally filtered and stripped by a
//! prefix, and split on a separator into a path:
//!
//! ```text
//! APP_DATABASE__MAX_CONNS=10   (prefix "APP_", separator "__")
//!   -> database.max_conns = "10"
//!   -> database.maxconns  = "10"   (compact alias)
//! ```

use crate::domain::config_value::{Map, Value};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Default separator between nesting levels in variable names.
pub const DEFAULT_SEPARATOR: &str = "__";

/// Variables that describe the user's session rather than the application.
/// They are never loaded, whatever the prefix.
static DENIED_VARIABLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "PATH",
        "HOME",
        "USER",
        "USERNAME",
        "LOGNAME",
        "SHELL",
        "PWD",
        "OLDPWD",
        "MAIL",
        "TERM",
        "LANG",
        "LC_ALL",
        "LC_CTYPE",
        "COLORTERM",
        "TMPDIR",
        "TMP",
        "TEMP",
        "SUDO_USER",
        "SUDO_UID",
        "SUDO_GID",
        "SSH_AUTH_SOCK",
        "SSH_AGENT_PID",
        "SSH_CLIENT",
        "SSH_CONNECTION",
        "SSH_TTY",
        "DISPLAY",
        "XAUTHORITY",
        "WAYLAND_DISPLAY",
        "HOSTNAME",
        "HOST",
        "COMPUTERNAME",
        "SESSION_MANAGER",
        "ZSH",
        "BASH",
        "PROMPT",
        "PS1",
        "PS2",
        "EDITOR",
        "VISUAL",
        "PAGER",
        "GITHUB_ACTION",
        "GITHUB_TOKEN",
        "CI",
    ]
    .into_iter()
    .collect()
});

/// Returns true if `name` is on the deny-list (case-insensitive).
///
/// # Examples
///
/// ```
/// use mergecfg::domain::variables::is_denied_variable;
///
/// assert!(is_denied_variable("path"));
/// assert!(is_denied_variable("GITHUB_TOKEN"));
/// assert!(!is_denied_variable("APP_PORT"));
/// ```
pub fn is_denied_variable(name: &str) -> bool {
    DENIED_VARIABLES.contains(name.trim().to_uppercase().as_str())
}

/// Builds a nested mapping from flat variables.
///
/// # Arguments
///
/// * `vars` - `(name, value)` pairs, in any order
/// * `prefix` - when non-empty, only names starting with it (case-insensitive) are
///   kept, and the prefix is removed
/// * `separator` - splits a name into path segments; empty keeps names flat
/// * `normalize_names` - also insert a compact alias with underscores removed from
///   every segment, so `MAX_CONNS` can be bound to a field named `maxconns`
///
/// Variables are processed in name order. All compact aliases are inserted before
/// all literal forms, so when an alias and a literal name collide the literal
/// value wins. A later path that runs through an earlier scalar replaces it with
/// a mapping.
pub fn normalize_variables<I, K, V>(
    vars: I,
    prefix: &str,
    separator: &str,
    normalize_names: bool,
) -> Map
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let prefix = prefix.trim().to_lowercase();

    let mut entries: Vec<(Vec<String>, String)> = Vec::new();
    for (name, value) in vars {
        let name = name.as_ref().trim().to_lowercase();
        if is_denied_variable(&name) {
            continue;
        }
        let Some(rest) = name.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let segments = split_name(rest, separator);
        if segments.iter().any(String::is_empty) {
            tracing::debug!(variable = %name, "Skipping variable with an empty path segment");
            continue;
        }
        entries.push((segments, value.into()));
    }
    entries.sort();

    let mut data = Map::new();
    if normalize_names {
        for (segments, value) in &entries {
            let compact: Vec<String> = segments.iter().map(|s| s.replace('_', "")).collect();
            if compact.iter().any(String::is_empty) {
                continue;
            }
            insert_path(&mut data, &compact, value.clone());
        }
    }
    for (segments, value) in entries {
        insert_path(&mut data, &segments, value);
    }
    data
}

fn split_name(name: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        vec![name.to_string()]
    } else {
        name.split(separator).map(str::to_string).collect()
    }
}

fn insert_path(data: &mut Map, segments: &[String], value: String) {
    let Some((leaf, containers)) = segments.split_last() else {
        return;
    };
    let mut current = data;
    for segment in containers {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Map(Map::new()));
        if !slot.is_map() {
            *slot = Value::Map(Map::new());
        }
        current = match slot {
            Value::Map(next) => next,
            _ => return,
        };
    }
    current.insert(leaf.clone(), Value::String(value));
}
