// WHY: Single curated glyph table shared by both matching policies
// Index k of OPEN_QUOTES pairs with index k of CLOSE_QUOTES

/// Characters that open a quotation
pub const OPEN_QUOTES: [char; 7] = [
    '"',        // straight double (self-pairing)
    '\'',       // straight single (self-pairing)
    '\u{201C}', // “
    '\u{2018}', // ‘
    '\u{00AB}', // «
    '\u{300C}', // 「
    '\u{300E}', // 『
];

/// Characters that close a quotation, positionally paired with `OPEN_QUOTES`
pub const CLOSE_QUOTES: [char; 7] = [
    '"',
    '\'',
    '\u{201D}', // ”
    '\u{2019}', // ’
    '\u{00BB}', // »
    '\u{300D}', // 」
    '\u{300F}', // 』
];

pub fn is_open_quote(ch: char) -> bool {
    OPEN_QUOTES.contains(&ch)
}

pub fn is_close_quote(ch: char) -> bool {
    CLOSE_QUOTES.contains(&ch)
}

/// Closing partner for an opening glyph, if `open` is one
pub fn partner_of(open: char) -> Option<char> {
    OPEN_QUOTES
        .iter()
        .position(|&c| c == open)
        .map(|idx| CLOSE_QUOTES[idx])
}

/// Open and close are the same character (straight quotes)
pub fn is_self_pairing(ch: char) -> bool {
    partner_of(ch) == Some(ch)
}

/// Boundary heuristic: a close glyph only terminates a quotation when the
/// next character is whitespace, a period, a comma, or the chunk has ended.
/// Any whitespace counts, not just a space, because chunks from the viewport
/// keep their line terminator and a closer at end of line sees `\n` or `\r`.
pub fn is_closing_boundary(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(ch) => ch.is_whitespace() || ch == '.' || ch == ',',
    }
}
