//! Filesystem-safe file names derived from untrusted source URLs
//!
//! Three pure stages compose into [`url_to_safe_filename`]:
//! [`preprocess_url`] → [`extract_filename_from_url`] → [`to_safe_filename`].
//! For a URL with a path the result is deterministic, which is what makes
//! path-existence checks usable as an idempotency guard.

use std::borrow::Cow;

use tracing::warn;
use unicode_normalization::UnicodeNormalization;
use url::Url;
use uuid::Uuid;

/// Longest file name most filesystems accept
pub const MAX_FILENAME_CHARS: usize = 255;

/// Derive a safe file name from a source URL.
///
/// Returns `""` only for blank input. A URL without a usable path segment,
/// or whose last segment sanitizes to nothing, gets a host-derived name with
/// a random suffix instead.
pub fn url_to_safe_filename(url: &str) -> String {
    let Some(preprocessed) = preprocess_url(url) else {
        return String::new();
    };

    let safe = to_safe_filename(&extract_filename_from_url(&preprocessed));
    if is_usable(&safe) {
        return safe;
    }

    warn!(url, "Sanitized file name is empty, generating one from the host");
    to_safe_filename(&generated_filename(&host_of(&preprocessed)))
}

/// Strip all `;` and percent-decode. `None` for blank input.
///
/// Semicolons go first: URL parsers treat everything after one as path
/// parameters and would silently drop those segments.
pub fn preprocess_url(url: &str) -> Option<String> {
    if url.trim().is_empty() {
        return None;
    }

    let stripped = url.replace(';', "");
    Some(percent_decode(&stripped).into_owned())
}

/// Last path segment of an already decoded URL, or a host-derived unique name.
pub fn extract_filename_from_url(url: &str) -> String {
    // the url crate leaves `%` alone but escapes spaces and the like, so a
    // literal `%` must survive the single decode below
    let escaped = url.replace('%', "%25");
    let (host, path, parsed) = match Url::parse(&escaped) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or_default().to_string(),
            parsed.path().to_string(),
            true,
        ),
        Err(_) => (String::new(), url.to_string(), false),
    };

    let path = path.strip_suffix('/').unwrap_or(&path);
    let basename = path.rsplit('/').next().unwrap_or_default();

    if basename.is_empty() {
        return generated_filename(&host);
    }

    if parsed {
        percent_decode(basename).into_owned()
    } else {
        basename.to_string()
    }
}

/// Append a header-derived extension to a safe name.
///
/// The extension is sanitized like any other name part, and the stem gives up
/// characters so the result still fits in [`MAX_FILENAME_CHARS`].
pub fn append_extension(name: &str, extension: &str) -> String {
    let extension = to_safe_filename(extension);
    if !is_usable(&extension) || extension.len() >= MAX_FILENAME_CHARS {
        return name.to_string();
    }

    let room = MAX_FILENAME_CHARS - extension.len();
    let stem: String = name.chars().take(room).collect();
    format!("{}{}", stem, extension)
}

/// Reduce a raw name to `[A-Za-z0-9._-]`, capped at [`MAX_FILENAME_CHARS`].
///
/// Accented Latin letters lose their diacritics through compatibility
/// decomposition; anything else outside ASCII is dropped.
pub fn to_safe_filename(name: &str) -> String {
    let safe: String = name
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    if safe.chars().count() > MAX_FILENAME_CHARS {
        warn!(
            name = %safe,
            limit = MAX_FILENAME_CHARS,
            "Truncating file name, uniqueness is no longer guaranteed"
        );
        return safe.chars().take(MAX_FILENAME_CHARS).collect();
    }

    safe
}

fn generated_filename(host: &str) -> String {
    format!("{}__{}", host.replace('.', "_"), Uuid::new_v4())
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Dot-only names would resolve to the directory itself or its parent
fn is_usable(name: &str) -> bool {
    name.chars().any(|c| c != '.')
}

fn percent_decode(value: &str) -> Cow<'_, str> {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded,
        Err(_) => {
            let bytes = urlencoding::decode_binary(value.as_bytes());
            Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
