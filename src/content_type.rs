//! Extension and file-type inference from HTTP response headers
//!
//! `Content-Disposition` wins over `Content-Type`: an explicit filename is
//! authoritative even when it carries no extension.

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use tracing::{debug, warn};

/// Mime fragments mapped to extensions, matched by substring
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("video/mp4", ".mp4"),
    ("video/x-msvideo", ".avi"),
    ("video/x-ms-wmv", ".wmv"),
    ("audio/mpeg", ".mp3"),
    ("audio/wav", ".wav"),
    ("audio/midi", ".mid"),
    ("application/mxf", ".mxf"),
    ("text/html", ".html"),
];

/// Resolve an extension (with leading dot) from response headers, or `""`.
pub fn resolve_extension(headers: &HeaderMap) -> String {
    let content_type = header_str(headers, CONTENT_TYPE.as_str());
    let content_disposition = header_str(headers, CONTENT_DISPOSITION.as_str());
    debug!(content_type, content_disposition, "Determining extension from headers");

    if let Some(ext) = extension_from_content_disposition(content_disposition) {
        return ext;
    }

    extension_from_mime(content_type)
        .map(str::to_string)
        .unwrap_or_else(|| {
            warn!(content_type, "No supported extension found");
            String::new()
        })
}

/// Extension of the filename named in a `Content-Disposition` header.
///
/// `None` means the header names no filename; `Some("")` means it names one
/// without an extension.
pub fn extension_from_content_disposition(content_disposition: &str) -> Option<String> {
    filename_from_content_disposition(content_disposition)
        .map(|filename| split_extension(&filename).1.to_string())
}

/// Filename named by `filename=` or RFC 5987 `filename*=`
pub fn filename_from_content_disposition(content_disposition: &str) -> Option<String> {
    for param in content_disposition.split(';').map(str::trim) {
        if let Some(value) = param.strip_prefix("filename=") {
            return Some(value.replace('"', ""));
        }
        if let Some(value) = param.strip_prefix("filename*=") {
            // charset'lang'value
            let encoded = &value[value.rfind('\'')? + 1..];
            let encoded = encoded.replace('"', "");
            let decoded = urlencoding::decode(&encoded)
                .map(|decoded| decoded.into_owned())
                .unwrap_or(encoded);
            return Some(decoded);
        }
    }
    None
}

pub fn extension_from_mime(content_type: &str) -> Option<&'static str> {
    MIME_EXTENSIONS
        .iter()
        .find(|(mime, _)| content_type.contains(mime))
        .map(|(_, ext)| *ext)
}

/// Major component of a mime type (`"audio"` for `"audio/mpeg"`)
pub fn file_type_from_mime(content_type: &str) -> String {
    match content_type.parse::<mime::Mime>() {
        Ok(parsed) => parsed.type_().as_str().to_string(),
        Err(_) => match content_type.split_once('/') {
            Some((major, _)) if !major.trim().is_empty() => major.trim().to_lowercase(),
            _ => {
                warn!(content_type, "Handling unknown file type");
                "unknown".to_string()
            }
        },
    }
}

/// Mime essence without parameters (`"text/html"` for `"text/html; charset=utf-8"`)
pub fn essence(content_type: &str) -> String {
    content_type
        .parse::<mime::Mime>()
        .map(|parsed| parsed.essence_str().to_string())
        .unwrap_or_else(|_| {
            content_type
                .split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_lowercase()
        })
}

/// Split a filename into stem and extension; the extension keeps its dot.
///
/// Leading dots never start an extension, so `.bashrc` has none.
pub fn split_extension(filename: &str) -> (&str, &str) {
    let base_start = filename.rfind(['/', '\\']).map(|idx| idx + 1).unwrap_or(0);
    let base = &filename[base_start..];

    match base.rfind('.') {
        Some(dot) if base[..dot].chars().any(|c| c != '.') => {
            filename.split_at(base_start + dot)
        }
        _ => (filename, ""),
    }
}

pub fn has_extension(filename: &str) -> bool {
    !split_extension(filename).1.is_empty()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn quote(value: &str) -> String {
        urlencoding::encode(value).into_owned()
    }

    #[test]
    fn test_content_disposition_plain_filename() {
        assert_eq!(
            extension_from_content_disposition(r#"filename="example.mp4""#),
            Some(".mp4".to_string())
        );
        assert_eq!(
            extension_from_content_disposition(r#"filename="exam  ple.mp4""#),
            Some(".mp4".to_string())
        );
        assert_eq!(
            extension_from_content_disposition(r#"attachment; filename="example.mp3""#),
            Some(".mp3".to_string())
        );
        assert_eq!(
            extension_from_content_disposition(
                r#"form-data; name="example-field"; filename="example.jpg""#
            ),
            Some(".jpg".to_string())
        );
    }

    #[test]
    fn test_content_disposition_rfc5987() {
        let encoded = quote("exam%ple$.mp4");
        for header in [
            format!("filename*=UTF-8''{}", encoded),
            format!("filename*=iso-8859-1''{}", encoded),
            format!("filename*=iso-8859-1'en'{}", encoded),
            format!("filename*=iso-8859-1'en{}", encoded),
        ] {
            assert_eq!(
                extension_from_content_disposition(&header),
                Some(".mp4".to_string()),
                "header: {}",
                header
            );
        }
    }

    #[test]
    fn test_content_disposition_without_filename() {
        let encoded = quote("exam%ple$.mp4");
        assert_eq!(
            extension_from_content_disposition(&format!("filename*=iso-8859-1{}", encoded)),
            None
        );
        assert_eq!(
            extension_from_content_disposition(r#"form-data; name="example-field""#),
            None
        );
        assert_eq!(extension_from_content_disposition("dummy-video.mp4"), None);
        assert_eq!(extension_from_content_disposition("asdfasdfadsf"), None);
        assert_eq!(extension_from_content_disposition(""), None);
    }

    #[test]
    fn test_explicit_filename_without_extension_short_circuits() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"README\""),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("video/mp4"));

        assert_eq!(resolve_extension(&headers), "");
    }

    #[test]
    fn test_mime_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        assert_eq!(resolve_extension(&headers), ".html");

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-unknown"));
        assert_eq!(resolve_extension(&headers), "");

        assert_eq!(resolve_extension(&HeaderMap::new()), "");
    }

    #[test]
    fn test_mime_table() {
        assert_eq!(extension_from_mime("video/x-msvideo"), Some(".avi"));
        assert_eq!(extension_from_mime("video/x-ms-wmv"), Some(".wmv"));
        assert_eq!(extension_from_mime("audio/wav"), Some(".wav"));
        assert_eq!(extension_from_mime("audio/midi"), Some(".mid"));
        assert_eq!(extension_from_mime("application/mxf"), Some(".mxf"));
        assert_eq!(extension_from_mime("image/png"), None);
    }

    #[test]
    fn test_file_type_from_mime() {
        assert_eq!(file_type_from_mime("audio/mpeg"), "audio");
        assert_eq!(file_type_from_mime("video/mp4; codecs=avc1"), "video");
        assert_eq!(file_type_from_mime("octetstream"), "unknown");
        assert_eq!(file_type_from_mime(""), "unknown");
    }

    #[test]
    fn test_essence() {
        assert_eq!(essence("text/html; charset=utf-8"), "text/html");
        assert_eq!(essence("audio/mpeg"), "audio/mpeg");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("test.mp3"), ("test", ".mp3"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("forward"), ("forward", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("dir.d/file"), ("dir.d/file", ""));
        assert!(has_extension("file."));
        assert!(!has_extension("file"));
    }
}
