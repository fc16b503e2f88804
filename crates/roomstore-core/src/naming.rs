//! Naming policy for room content: reserved names, media filename allocation,
//! extension normalisation and path helpers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Description file present in every room and subfolder.
pub const INFO_FILE: &str = "info.txt";

/// Preview image of a subfolder.
pub const THUMBNAIL_FILE: &str = "thumbnail.jpg";

/// Names never treated as media and never considered for ordinal allocation.
pub const RESERVED_NAMES: [&str; 2] = [INFO_FILE, THUMBNAIL_FILE];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// How new media filenames are generated.
///
/// Chosen by configuration; never inferred from the files already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdinalScheme {
    /// `1`, `2`, `3`, ...
    #[default]
    Numeric,
    /// `a`, `b`, ..., `z`, `aa`, `ab`, ...
    Alphabetic,
}

impl fmt::Display for OrdinalScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrdinalScheme::Numeric => f.write_str("numeric"),
            OrdinalScheme::Alphabetic => f.write_str("alphabetic"),
        }
    }
}

impl FromStr for OrdinalScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "numeric" => Ok(OrdinalScheme::Numeric),
            "alphabetic" => Ok(OrdinalScheme::Alphabetic),
            other => Err(format!(
                "unknown ordinal scheme '{}', expected 'numeric' or 'alphabetic'",
                other
            )),
        }
    }
}

/// Filename without its final extension (`"1.jpg"` -> `"1"`).
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Pick the ordinal for the next media file given the names already present.
///
/// Reserved names are ignored. Gaps are never filled.
pub fn allocate_next_ordinal<'a, I>(existing_names: I, scheme: OrdinalScheme) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let stems = existing_names
        .into_iter()
        .filter(|name| !is_reserved(name))
        .map(file_stem);

    match scheme {
        OrdinalScheme::Numeric => {
            // Compared as decimal strings so no stem is too large to count past.
            let max = stems
                .filter(|stem| !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()))
                .map(|stem| match stem.trim_start_matches('0') {
                    "" => "0",
                    digits => digits,
                })
                .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
            match max {
                Some(stem) => increment_digits(stem),
                None => "1".to_string(),
            }
        }
        OrdinalScheme::Alphabetic => {
            // Shortlex order is base-26 order for letter sequences.
            let max = stems
                .filter(|stem| !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_lowercase()))
                .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
            match max {
                Some(stem) => increment_letters(stem),
                None => "a".to_string(),
            }
        }
    }
}

/// Decimal increment on a digit string: `9` -> `10`, `199` -> `200`.
fn increment_digits(stem: &str) -> String {
    let mut digits = stem.as_bytes().to_vec();
    let mut i = digits.len();
    loop {
        if i == 0 {
            digits.insert(0, b'1');
            break;
        }
        i -= 1;
        if digits[i] == b'9' {
            digits[i] = b'0';
        } else {
            digits[i] += 1;
            break;
        }
    }
    String::from_utf8_lossy(&digits).into_owned()
}

/// Odometer increment over `a..=z`: `z` -> `aa`, `az` -> `ba`.
fn increment_letters(stem: &str) -> String {
    let mut letters = stem.as_bytes().to_vec();
    let mut i = letters.len();
    loop {
        if i == 0 {
            letters.insert(0, b'a');
            break;
        }
        i -= 1;
        if letters[i] == b'z' {
            letters[i] = b'a';
        } else {
            letters[i] += 1;
            break;
        }
    }
    String::from_utf8_lossy(&letters).into_owned()
}

/// File extension for an uploaded content type.
///
/// `image/jpeg` maps to `jpg`; every other type uses its subtype verbatim.
pub fn extension_for_content_type(content_type: &str) -> String {
    let subtype = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if subtype == "jpeg" {
        "jpg".to_string()
    } else {
        subtype.to_string()
    }
}

/// Reject names that would escape or split a path segment.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidName("name must not be empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(StoreError::InvalidName(format!(
            "'{}' must not contain path separators",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(StoreError::InvalidName(format!("'{}' is not a valid name", name)));
    }
    Ok(())
}

/// Join a store path and a segment with `/`, ignoring empty parts.
pub fn join_path(base: &str, segment: &str) -> String {
    let base = base.trim_matches('/');
    let segment = segment.trim_matches('/');
    match (base.is_empty(), segment.is_empty()) {
        (true, _) => segment.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, segment),
    }
}

/// Split a store path into its parent and last segment.
pub fn split_path(path: &str) -> (&str, &str) {
    let path = path.trim_matches('/');
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}
