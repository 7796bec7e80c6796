/// Key used when a key normalizes to nothing.
pub const EMPTY_KEY: &str = "_";

/// Map an arbitrary key into a token that is safe on the left of `=`.
///
/// Characters are lower-cased, every run of whitespace collapses into a
/// single `_`, `=` becomes `_`, and double quotes and other control
/// characters are dropped. A key that ends up empty becomes [`EMPTY_KEY`].
///
/// This never fails: logging must not be impeded by a bad key.
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut in_whitespace = false;

    for c in key.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;

        match c {
            '=' => out.push('_'),
            '"' => {}
            c if c.is_control() => {}
            c => out.extend(c.to_lowercase()),
        }
    }

    if out.is_empty() {
        EMPTY_KEY.to_string()
    } else {
        out
    }
}
