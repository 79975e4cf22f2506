//! Prop and event name casing.

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `foo-bar` → `fooBar`: every `-` followed by a word character is dropped
/// and the character upper-cased.
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&next) if c == '-' && is_word(next) => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// `fooBar` → `foo-bar`: a `-` goes before every ASCII capital that follows
/// a word character, then the whole name is lower-cased.
pub fn hyphenate(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous = None;
    for c in name.chars() {
        if c.is_ascii_uppercase() && previous.is_some_and(is_word) {
            out.push('-');
        }
        out.push(c);
        previous = Some(c);
    }
    out.to_lowercase()
}

/// The key a prop is declared under: kebab-case names are camelized, names
/// that already carry capitals are kept.
pub fn prop_key(name: &str) -> String {
    if hyphenate(name) == name {
        camelize(name)
    } else {
        name.to_string()
    }
}
