//! The utilities module provides general capabilities, that may span the
//! routing, rendezvous, and station modules.  The utilities are centered
//! around error reporting and the `;`-separated value lists used by the
//! persisted station configuration.

pub mod errors;

/// Split a `;`-separated list into its entries.  A `\;` sequence is an
/// escaped separator and becomes part of the entry.  Empty entries are
/// dropped.
pub fn split_values(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                chars.next();
                current.push(';');
            }
            ';' => {
                if !current.is_empty() {
                    values.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        values.push(current);
    }
    values
}

/// The inverse of `split_values` - entries are joined with `;`, and any `;`
/// inside an entry is escaped.
pub fn join_values<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|value| value.as_ref().replace(';', "\\;"))
        .collect::<Vec<String>>()
        .join(";")
}
