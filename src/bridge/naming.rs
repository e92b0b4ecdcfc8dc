//! Name and label derivation for exported metrics.

use std::collections::BTreeMap;

/// Appends the `_` separator to a configured prefix unless it is empty or
/// already ends with one.
pub fn normalize_prefix(prefix: &str) -> String {
    let sanitized = sanitize_metric_name(prefix);
    if sanitized.is_empty() || sanitized.ends_with('_') {
        sanitized
    } else {
        format!("{}_", sanitized)
    }
}

/// Replaces every character outside `[a-zA-Z0-9:_]` with `_`.
pub fn sanitize_metric_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Full exported name: prefix followed by the sanitized registry name.
pub fn exported_name(prefix: &str, name: &str) -> String {
    let full = format!("{}{}", prefix, sanitize_metric_name(name));
    match full.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{}", full),
        _ => full,
    }
}

/// Label names the exposition format gives a meaning of its own.
const RESERVED_LABELS: [&str; 2] = ["quantile", "le"];

fn sanitize_label_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if RESERVED_LABELS.contains(&sanitized.as_str()) || sanitized.starts_with("__") {
        return format!("scope_{}", sanitized.trim_start_matches('_'));
    }
    match sanitized.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{}", sanitized),
        _ => sanitized,
    }
}

/// Labels derived from a registry scope.
///
/// Scopes written as `key.value` pairs (`topic.orders.partition.0`) become one
/// label per pair; anything else is kept verbatim under a `scope` label.
/// Pairs with an empty value are dropped. Keys that clash with labels the
/// exporter sets itself are renamed with a `scope_` prefix.
pub fn scope_labels(scope: Option<&str>) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    let scope = match scope {
        Some(s) if !s.is_empty() => s,
        _ => return labels,
    };

    let parts: Vec<&str> = scope.split('.').collect();
    let paired = parts.len() % 2 == 0 && parts.chunks(2).all(|pair| !pair[0].is_empty());
    if paired {
        for pair in parts.chunks(2) {
            if pair[1].is_empty() {
                continue;
            }
            let key = sanitize_label_name(pair[0]);
            if labels.insert(key, pair[1].to_string()).is_some() {
                // Repeated keys make the pairing ambiguous.
                labels.clear();
                break;
            }
        }
        if !labels.is_empty() {
            return labels;
        }
    }

    labels.insert("scope".to_string(), scope.to_string());
    labels
}
