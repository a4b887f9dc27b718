//! Character classification for the selector scanner.
//!
//! A pre-computed table holds one flag byte per Latin-1 code point. Code
//! points above the table are classified by rule: every non-ASCII character
//! may appear in CSS identifiers and HTML attribute names, and none of them
//! is whitespace or punctuation.

const WHITESPACE: u16 = 1 << 0;
const ALPHA: u16 = 1 << 1;
const DIGIT: u16 = 1 << 2;
const QUOTE: u16 = 1 << 3;
/// `>`, `+`, `~`, `,`
const COMBINATOR: u16 = 1 << 4;
/// Characters that begin a simple selector: `*`, `.`, `#`, `[`, `:`
const SELECTOR_START: u16 = 1 << 5;
/// Characters allowed after the first character of a tag name.
const TAG_CHAR: u16 = 1 << 6;
/// Characters allowed in an attribute name.
const ATTRIBUTE_CHAR: u16 = 1 << 7;
/// Characters allowed in a CSS identifier after the first character.
const NAME_CHAR: u16 = 1 << 8;
/// Characters that may begin a CSS identifier.
const NAME_START: u16 = 1 << 9;
/// First characters of an attribute operator: `=`, `^`, `*`, `~`, `$`, `!`, `|`
const OPERATOR_START: u16 = 1 << 10;

const CHAR_CLASS_TABLE: [u16; 256] = {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        #[allow(clippy::cast_possible_truncation)]
        let c = i as u8;
        let mut flags = 0u16;

        // HTML whitespace: space, tab, LF, FF, CR
        if matches!(c, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r') {
            flags |= WHITESPACE;
        }

        if c.is_ascii_alphabetic() {
            flags |= ALPHA | TAG_CHAR | ATTRIBUTE_CHAR | NAME_CHAR | NAME_START;
        }

        if c.is_ascii_digit() {
            flags |= DIGIT | TAG_CHAR | ATTRIBUTE_CHAR | NAME_CHAR;
        }

        if matches!(c, b'-' | b'_') {
            flags |= TAG_CHAR | ATTRIBUTE_CHAR | NAME_CHAR | NAME_START;
        }

        if matches!(c, b':' | b'.') {
            flags |= ATTRIBUTE_CHAR;
        }

        if matches!(c, b'"' | b'\'') {
            flags |= QUOTE;
        }

        if matches!(c, b'>' | b'+' | b'~' | b',') {
            flags |= COMBINATOR;
        }

        if matches!(c, b'*' | b'.' | b'#' | b'[' | b':') {
            flags |= SELECTOR_START;
        }

        if matches!(c, b'=' | b'^' | b'*' | b'~' | b'$' | b'!' | b'|') {
            flags |= OPERATOR_START;
        }

        // Latin-1 letters and symbols are identifier characters in CSS.
        if c >= 0xA0 {
            flags |= ATTRIBUTE_CHAR | NAME_CHAR | NAME_START;
        }

        table[i] = flags;
        i += 1;
    }

    table
};

#[inline]
fn flags(c: char) -> u16 {
    match u32::from(c) {
        n @ 0..=255 => CHAR_CLASS_TABLE[n as usize],
        _ => ATTRIBUTE_CHAR | NAME_CHAR | NAME_START,
    }
}

#[inline]
fn has(c: char, flag: u16) -> bool {
    flags(c) & flag != 0
}

/// Space, tab, line feed, form feed, or carriage return.
#[inline]
#[must_use]
pub fn is_html_whitespace(c: char) -> bool {
    has(c, WHITESPACE)
}

/// ASCII letter.
#[inline]
#[must_use]
pub fn is_alpha(c: char) -> bool {
    has(c, ALPHA)
}

/// ASCII digit.
#[inline]
#[must_use]
pub fn is_digit(c: char) -> bool {
    has(c, DIGIT)
}

/// Single or double quote.
#[inline]
#[must_use]
pub fn is_quote(c: char) -> bool {
    has(c, QUOTE)
}

/// One of the explicit combinators `>`, `+`, `~` or the group separator `,`.
#[inline]
#[must_use]
pub fn is_combinator(c: char) -> bool {
    has(c, COMBINATOR)
}

/// A character that opens a non-tag simple selector.
#[inline]
#[must_use]
pub fn is_selector_start(c: char) -> bool {
    has(c, SELECTOR_START)
}

/// A character that can start an HTML tag name.
#[inline]
#[must_use]
pub fn is_tag_start(c: char) -> bool {
    has(c, ALPHA)
}

/// A character that can continue an HTML tag name.
#[inline]
#[must_use]
pub fn is_tag_char(c: char) -> bool {
    has(c, TAG_CHAR)
}

/// A character that can appear in an HTML attribute name.
#[inline]
#[must_use]
pub fn is_attribute_char(c: char) -> bool {
    has(c, ATTRIBUTE_CHAR)
}

/// A character that can start a CSS identifier.
#[inline]
#[must_use]
pub fn is_name_start(c: char) -> bool {
    has(c, NAME_START)
}

/// A character that can continue a CSS identifier.
#[inline]
#[must_use]
pub fn is_name_char(c: char) -> bool {
    has(c, NAME_CHAR)
}

/// A character that can begin an attribute operator.
#[inline]
#[must_use]
pub fn is_operator_start(c: char) -> bool {
    has(c, OPERATOR_START)
}
