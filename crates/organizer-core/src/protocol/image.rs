//! The base64 JPEG image value accepted by the image queue endpoint.

use std::fmt;

use crate::protocol::model::SchemaViolation;

/// Data-URI prefixes the bridge accepts for captured frames.
///
/// The camera stack emits `image/jpeg`; some encoders label the same payload
/// `image/jpg`, so both spellings are valid on the wire.
pub const JPEG_DATA_URI_PREFIXES: [&str; 2] =
    ["data:image/jpeg;base64,", "data:image/jpg;base64,"];

/// A captured frame as a JPEG data URI, checked at construction.
///
/// The check is structural only: the string must start with one of the
/// [`JPEG_DATA_URI_PREFIXES`].  The base64 payload is neither decoded nor
/// size-checked here; the bridge owns that.  Holding a `Base64Image` therefore
/// means "safe to submit", not "decodes to a valid JPEG".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Image(String);

impl Base64Image {
    /// Validates `raw` against the JPEG data-URI format.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaViolation`] when the data-URI prefix is absent.
    pub fn parse(raw: &str) -> Result<Self, SchemaViolation> {
        if JPEG_DATA_URI_PREFIXES
            .iter()
            .any(|prefix| raw.starts_with(prefix))
        {
            Ok(Self(raw.to_owned()))
        } else {
            Err(SchemaViolation::at(
                "",
                "image payload must begin with a JPEG data-URI prefix",
            ))
        }
    }

    /// The full data-URI string, prefix included.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the value, returning the data-URI string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Base64Image {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Base64Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_jpeg_prefix() {
        let image = Base64Image::parse("data:image/jpeg;base64,/9j/4AAQ").expect("jpeg prefix");
        assert_eq!(image.as_str(), "data:image/jpeg;base64,/9j/4AAQ");
    }

    #[test]
    fn test_parse_accepts_jpg_prefix() {
        assert!(Base64Image::parse("data:image/jpg;base64,/9j/4AAQ").is_ok());
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        // A bare base64 payload without the data-URI header is not submittable.
        assert!(Base64Image::parse("/9j/4AAQSkZJRg==").is_err());
    }

    #[test]
    fn test_parse_rejects_other_media_types() {
        assert!(Base64Image::parse("data:image/png;base64,iVBORw0KGgo=").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_string() {
        assert!(Base64Image::parse("").is_err());
    }

    #[test]
    fn test_parse_is_case_sensitive_about_the_prefix() {
        // The wire format is exact; an uppercased scheme is not the wire format.
        assert!(Base64Image::parse("DATA:IMAGE/JPEG;BASE64,/9j/").is_err());
    }

    #[test]
    fn test_parse_does_not_inspect_the_payload() {
        // Prefix-only validation: a syntactically absurd payload still passes.
        assert!(Base64Image::parse("data:image/jpeg;base64,!!not-base64!!").is_ok());
    }
}
