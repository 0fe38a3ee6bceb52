//! CSV row encoding
//!
//! Rows are written the way a spreadsheet expects them: comma separated,
//! `\r\n` terminated, with quotes only around fields that need them.

/// Row terminator
pub const LINE_END: &str = "\r\n";

/// Header labels for a row of `width` fields: `value1 .. value<width>`
pub fn header_labels(width: usize) -> Vec<String> {
    (1..=width).map(|i| format!("value{}", i)).collect()
}

/// Quote a field if it holds a delimiter, quote or line break
fn escape_field(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains(&[',', '"', '\r', '\n'][..]) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}

/// Encode one row including its terminator
pub fn encode_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str(LINE_END);
    line
}
