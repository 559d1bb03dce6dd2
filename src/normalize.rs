// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! URL normalization and query-string parsing for captured requests.

use std::collections::BTreeMap;

/// Normalize a raw URL into a path template.
///
/// Strips scheme, authority and query string, then replaces numeric path
/// segments with `{id}` and UUID segments with `{uuid}`. Input without a
/// scheme marker is returned unchanged, which also makes the function
/// idempotent.
pub fn normalize_url(url: &str) -> String {
    let Some(protocol) = url.rfind("://") else {
        return url.to_string();
    };

    let after_authority = &url[protocol + 3..];
    let Some(slash) = after_authority.find('/') else {
        return "/".to_string();
    };

    let mut path = &after_authority[slash..];
    if let Some(query) = path.find('?') {
        path = &path[..query];
    }

    path.split('/')
        .map(normalize_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Numeric match is checked before the UUID match; the order is contractual.
fn normalize_segment(segment: &str) -> String {
    if segment.is_empty() {
        return segment.to_string();
    }
    if segment.parse::<i64>().is_ok() {
        return "{id}".to_string();
    }
    if is_uuid_segment(segment) {
        return "{uuid}".to_string();
    }
    segment.to_string()
}

/// Check the fixed 8-4-4-4-12 hex shape, case-insensitively.
///
/// Deliberately stricter than a general UUID parser: unhyphenated or
/// URN-prefixed forms do not count as path placeholders.
pub fn is_uuid_segment(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => *b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}

/// Parse the query string of a raw URL into a multi-valued map.
///
/// Keys and values are percent-decoded, with `+` decoding to a space. A URL
/// without a query string yields an empty map.
pub fn parse_query(raw_url: &str) -> BTreeMap<String, Vec<String>> {
    let mut params = BTreeMap::new();

    let Some(start) = raw_url.find('?') else {
        return params;
    };
    let mut query = &raw_url[start + 1..];
    if let Some(fragment) = query.find('#') {
        query = &query[..fragment];
    }

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(key))
            .or_insert_with(Vec::new)
            .push(decode_component(value));
    }

    params
}

fn decode_component(component: &str) -> String {
    let bytes = component.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hi = (bytes[i + 1] as char).to_digit(16);
                let lo = (bytes[i + 2] as char).to_digit(16);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    out.push((hi * 16 + lo) as u8);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}
