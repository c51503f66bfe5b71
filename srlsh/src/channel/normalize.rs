//! Terminal control-sequence stripping.
//!
//! Passes run in a fixed order so that longer sequences are removed
//! before the bare-control pass can split them apart.

use std::sync::LazyLock;

use regex::bytes::Regex;

/// CSI: `ESC [`, optional `?`, numeric parameters, final letter.
/// Also covers DSR requests (`ESC[6n`) and bracketed paste (`ESC[?2004h`).
static CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)\x1b\[\??[0-9;]*[a-zA-Z]").unwrap());

/// OSC: `ESC ]` up to BEL, e.g. window title updates.
static OSC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)\x1b\][^\x07\n]*\x07").unwrap());

/// Keypad mode shorthands `ESC =` and `ESC >`.
static TWO_CHAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?-u)\x1b[=>]").unwrap());

/// Character set selection, e.g. `ESC(B`.
static CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)\x1b\([0-9;]*[a-zA-Z]").unwrap());

/// Any other control byte except `\t`, `\n` and `\r`.
static CONTROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)[\x00-\x08\x0b\x0c\x0e-\x1f\x7f]").unwrap());

/// Strip escape sequences and control bytes from raw terminal output.
///
/// Total and idempotent: the final pass leaves no `ESC` behind, so a
/// second run finds nothing to remove.
pub fn normalize(data: &[u8]) -> String {
    let mut cleaned = data.to_vec();
    for pattern in [&*CSI, &*OSC, &*TWO_CHAR, &*CHARSET, &*CONTROL] {
        if pattern.is_match(&cleaned) {
            cleaned = pattern.replace_all(&cleaned, &b""[..]).into_owned();
        }
    }
    String::from_utf8_lossy(&cleaned).into_owned()
}
