//! MiniJinja filter registration.

use deunicode::deunicode;
use minijinja::{Environment, Value};

/// Default word count of the `excerpt` filter.
pub const DEFAULT_EXCERPT_WORDS: usize = 50;

/// Registers folio's filters on a MiniJinja environment.
///
/// | Filter | Effect |
/// |--------|--------|
/// | `nl` | appends a newline |
/// | `excerpt(n=50)` | first `n` words, tags stripped, `…` if cut |
/// | `slugify` | ASCII lowercase slug (`"Héllo World"` → `"hello-world"`) |
pub fn register_filters(env: &mut Environment<'static>) {
    // {{ "" | nl }} outputs a bare newline.
    env.add_filter("nl", |value: Value| -> String { format!("{}\n", value) });

    env.add_filter("excerpt", |value: String, words: Option<usize>| -> String {
        excerpt(&value, words.unwrap_or(DEFAULT_EXCERPT_WORDS))
    });

    env.add_filter("slugify", |value: String| -> String { slugify(&value) });
}

/// The first `words` words of `text` with markup tags removed.
pub fn excerpt(text: &str, words: usize) -> String {
    let plain = strip_tags(text);
    let mut iter = plain.split_whitespace();
    let taken: Vec<&str> = iter.by_ref().take(words).collect();
    let mut out = taken.join(" ");
    if iter.next().is_some() {
        out.push('…');
    }
    out
}

/// A URL-safe slug: transliterated, lowercase, dash-separated.
pub fn slugify(text: &str) -> String {
    let transliterated = deunicode(text).to_lowercase();
    let mut slug = String::with_capacity(transliterated.len());
    for c in transliterated.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
