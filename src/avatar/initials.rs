//! Canonical label derivation
//!
//! Turns free-form input such as `"mary-jane-watson"` into the short upper-case
//! label (`"MJW"`) that is both drawn on the avatar and used as its cache key.

/// Separator between name segments
pub const SEGMENT_SEPARATOR: char = '-';

/// Label used when the input carries no usable characters
pub const FALLBACK_LABEL: &str = "--";

/// Maximum number of initials taken from a segmented name
pub const MAX_LABEL_CHARS: usize = 3;

/// Inputs shorter than this (in characters) are used verbatim
const SHORT_INPUT_CHARS: usize = 4;

/// Derive the canonical label for `input`.
///
/// Short inputs (under four characters once trimmed) are upper-cased
/// verbatim. Longer inputs contribute the first code point of every non-empty
/// `-` separated segment, upper-cased, up to three characters. Inputs with no
/// usable character at all yield [`FALLBACK_LABEL`].
///
/// The result depends only on `input`, which is what makes it usable as a
/// cache key.
pub fn derive_label(input: &str) -> String {
    let trimmed = input.trim();

    if !trimmed.chars().any(|c| c != SEGMENT_SEPARATOR) {
        return FALLBACK_LABEL.to_string();
    }

    if trimmed.chars().count() < SHORT_INPUT_CHARS {
        return trimmed.to_uppercase();
    }

    let label: String = trimmed
        .split(SEGMENT_SEPARATOR)
        .filter_map(|segment| segment.chars().next())
        .flat_map(char::to_uppercase)
        .take(MAX_LABEL_CHARS)
        .collect();

    if label.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        label
    }
}
