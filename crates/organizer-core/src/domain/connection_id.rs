//! Session identifiers extracted from scanned QR payloads.
//!
//! The desktop encodes a session reference into its QR code as a fixed literal
//! prefix immediately followed by a version-4 UUID, with no separator:
//!
//! ```text
//! DISPLAY_ORGANIZER3fa85f64-5717-4562-b3fc-2c963f66afa6
//! ```
//!
//! A [`ConnectionId`] can only be obtained by matching that pattern, so any id
//! the rest of the client holds is valid by construction and safe to embed in
//! an endpoint path.  Scanned text that does not match is simply not a session
//! reference (a URL, a boarding pass, someone else's QR code) and yields
//! `None` rather than an error.

use std::fmt;

use uuid::Uuid;

/// Literal prefix the desktop places before the UUID in its QR payload.
// TODO: encode the app version or build SHA into the prefix once the desktop
// does the same, so mismatched builds refuse to pair.
pub const QR_CODE_PREFIX: &str = "DISPLAY_ORGANIZER";

/// Opaque identifier of one phone-to-desktop session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Extracts a connection id from a scanned QR payload using the default
    /// [`QR_CODE_PREFIX`].
    ///
    /// Returns `None` unless `code` is exactly the prefix followed by a
    /// lowercase hyphenated version-4 UUID.
    pub fn from_scanned_code(code: &str) -> Option<Self> {
        Self::from_scanned_code_with_prefix(code, QR_CODE_PREFIX)
    }

    /// Like [`ConnectionId::from_scanned_code`] but with a caller-supplied
    /// prefix, for configurations that override it.
    pub fn from_scanned_code_with_prefix(code: &str, prefix: &str) -> Option<Self> {
        let rest = code.strip_prefix(prefix)?;
        if !is_hyphenated_v4(rest) {
            return None;
        }
        // The structural check above guarantees this parse succeeds; going
        // through Uuid keeps the stored form canonical.
        Uuid::parse_str(rest).ok().map(Self)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    /// Formats as the lowercase hyphenated UUID, the form every endpoint path
    /// expects.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

/// Checks the exact wire shape: 36 bytes, lowercase hex, hyphens at the
/// canonical offsets, version nibble `4`, variant nibble in `[89ab]`.
///
/// `Uuid::parse_str` alone is too permissive here (it accepts uppercase,
/// braced, and simple forms), and the desktop emits only this shape.
fn is_hyphenated_v4(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &c)| match i {
        8 | 13 | 18 | 23 => c == b'-',
        14 => c == b'4',
        19 => matches!(c, b'8' | b'9' | b'a' | b'b'),
        _ => matches!(c, b'0'..=b'9' | b'a'..=b'f'),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
