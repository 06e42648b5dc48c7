mod scanner;

use scanner::{
    State, is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    scan_ident, try_start_dollar_quote,
};

/// Positional placeholder style to emit for named markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
}

/// SQL text with named markers rewritten to positional placeholders, plus the
/// marker names in appearance order.
///
/// A name that appears more than once gets one slot per appearance; its value
/// is bound once per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTransformedSql {
    /// The rewritten SQL with `$N`/`?N` placeholders.
    pub positional_sql: String,
    /// Marker names in the order their slots appear.
    pub placeholders: Vec<String>,
}

/// Rewrite named parameter markers (`:name`) into positional placeholders.
///
/// Pure: identical input always produces identical output, so a batch can
/// transform once and reuse the result for every row. A lightweight state
/// machine skips string literals, quoted identifiers, line and block
/// comments, dollar-quoted blocks, and `::` casts.
///
/// ```rust
/// use sql_fluent::named::{PlaceholderStyle, transform_named};
///
/// let t = transform_named(
///     "UPDATE t SET v = :v WHERE id = :id",
///     PlaceholderStyle::Postgres,
/// );
/// assert_eq!(t.positional_sql, "UPDATE t SET v = $1 WHERE id = $2");
/// assert_eq!(t.placeholders, vec!["v".to_string(), "id".to_string()]);
/// ```
#[must_use]
pub fn transform_named(sql: &str, style: PlaceholderStyle) -> NamedTransformedSql {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut placeholders: Vec<String> = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;
    // start of the literal run not yet copied into `out`
    let mut copied = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => state = State::BlockComment(1),
                b'$' => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b':' => {
                    if bytes.get(idx + 1) == Some(&b':') {
                        // postgres cast, not a marker
                        idx += 2;
                        continue;
                    }
                    if let Some((end, name)) = scan_ident(bytes, idx + 1) {
                        out.push_str(&sql[copied..idx]);
                        placeholders.push(name.to_string());
                        match style {
                            PlaceholderStyle::Postgres => out.push('$'),
                            PlaceholderStyle::Sqlite => out.push('?'),
                        }
                        out.push_str(&placeholders.len().to_string());
                        idx = end;
                        copied = end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                } else if is_block_comment_end(bytes, idx) {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    let tag_len = tag.len();
                    state = State::Normal;
                    idx += tag_len;
                }
            }
        }

        idx += 1;
    }

    out.push_str(&sql[copied..]);
    NamedTransformedSql {
        positional_sql: out,
        placeholders,
    }
}
