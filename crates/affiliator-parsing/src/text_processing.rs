use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::ParsingConfig;

/// Clean raw extracted text before it is split into blocks.
///
/// Runs, in order: newline normalization, line-number removal, diacritic
/// repair, NFKC normalization and whitespace collapsing. The line structure
/// is kept so that page and block splitting still see `\n\n` and `\n`.
pub fn normalize_text(text: &str) -> String {
    normalize_text_with_config(text, &ParsingConfig::default())
}

/// Config-aware version of [`normalize_text`].
pub(crate) fn normalize_text_with_config(text: &str, config: &ParsingConfig) -> String {
    let mut text = text.replace("\r\n", "\n").replace('\r', "\n");
    if config.remove_line_numbers {
        text = remove_line_numbers(&text);
    }
    if config.fix_diacritics {
        text = fix_spacing_diacritics(&text);
    }
    let text: String = text.nfkc().collect();
    collapse_whitespace(&text)
}

/// Drop lines that hold only a number followed by non-word characters.
///
/// `"12"`, `"3."` and `"417 |"` are removed; `"12 Main Street"` is kept.
/// The whole line goes, newline included, so no spurious blank line is left
/// behind to be mistaken for a page break.
pub fn remove_line_numbers(text: &str) -> String {
    static LINE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\W*$").unwrap());

    text.split('\n')
        .filter(|line| !LINE_NUMBER_RE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map a spacing diacritic to its combining counterpart.
fn combining_mark(c: char) -> Option<char> {
    match c {
        '\u{00B4}' => Some('\u{0301}'), // acute
        '\u{02CB}' => Some('\u{0300}'), // grave
        '\u{00A8}' => Some('\u{0308}'), // diaeresis
        '\u{02C6}' => Some('\u{0302}'), // circumflex
        '\u{02DC}' => Some('\u{0303}'), // tilde
        '\u{00B8}' => Some('\u{0327}'), // cedilla
        '\u{02C7}' => Some('\u{030C}'), // caron
        _ => None,
    }
}

/// Re-attach spacing diacritics that PDF extraction split from their letter.
///
/// `"Jos´e"` and `"Jos ´e"` become `"José"`, `"M¨uller"` becomes `"Müller"`.
/// Only the non-ASCII spacing marks count; a backtick is left alone.
pub fn fix_spacing_diacritics(text: &str) -> String {
    static DIACRITIC_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"[ \t]?([\x{00B4}\x{02CB}\x{00A8}\x{02C6}\x{02DC}\x{00B8}\x{02C7}])[ \t]?([A-Za-z])")
            .unwrap()
    });

    DIACRITIC_RE
        .replace_all(text, |caps: &regex::Captures| {
            let mark = caps[1].chars().next().and_then(combining_mark);
            match mark {
                Some(mark) => {
                    let decomposed = format!("{}{}", &caps[2], mark);
                    decomposed.nfc().collect::<String>()
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Collapse runs of spaces and tabs inside each line and trim line ends.
///
/// A line holding only whitespace becomes a single space rather than an
/// empty line, so it never turns into a `\n\n` page break.
pub fn collapse_whitespace(text: &str) -> String {
    static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

    text.split('\n')
        .map(|line| {
            let collapsed = SPACES_RE.replace_all(line, " ");
            match collapsed.trim() {
                "" if !line.is_empty() => " ".to_string(),
                trimmed => trimmed.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
