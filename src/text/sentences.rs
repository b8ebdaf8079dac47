/// A sentence slice with its byte offset in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    pub text: &'a str,
    pub start: usize,
}

impl Sentence<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Words that end with a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "al", "etc", "vs", "cf", "fig", "figs", "eq", "eqs", "sec", "ref", "refs",
    "dr", "mr", "mrs", "ms", "prof", "no", "vol", "approx", "resp",
];

/// Split text into sentences on `.`, `!` or `?` followed by whitespace (or
/// end of text), and on blank lines. Returned slices are trimmed and keep
/// their terminal punctuation, so they are verbatim substrings of `text`.
pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let at_end = i + 1 == bytes.len();
        let boundary = match b {
            b'.' | b'!' | b'?' => {
                (at_end || bytes[i + 1].is_ascii_whitespace())
                    && !(b == b'.' && is_abbreviation(&text[start..i]))
            }
            b'\n' => !at_end && bytes[i + 1] == b'\n',
            _ => false,
        };
        if boundary {
            push_trimmed(text, start, i + 1, &mut out);
            start = i + 1;
        }
        i += 1;
    }
    push_trimmed(text, start, text.len(), &mut out);
    out
}

fn is_abbreviation(before: &str) -> bool {
    let last = before
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_lowercase();
    ABBREVIATIONS.contains(&last.as_str()) || (last.len() == 1 && last.chars().all(|c| c.is_alphabetic()))
}

fn push_trimmed<'a>(text: &'a str, start: usize, end: usize, out: &mut Vec<Sentence<'a>>) {
    let raw = &text[start..end];
    let trimmed_start = raw.len() - raw.trim_start().len();
    let body = raw.trim();
    if body.chars().any(|c| c.is_alphanumeric()) {
        out.push(Sentence {
            text: body,
            start: start + trimmed_start,
        });
    }
}
