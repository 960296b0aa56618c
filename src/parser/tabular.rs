use crate::error::ParseError;

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Header-keyed view over comma separated text.
///
/// Only the header is parsed eagerly; data rows are split on demand and
/// [`Table::rows`] can be called any number of times.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    headers: Vec<String>,
    lines: Vec<&'a str>,
}

/// One data row aligned to the header by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'t> {
    headers: &'t [String],
    values: Vec<String>,
}

pub fn parse(text: &str) -> Result<Table<'_>, ParseError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let header_line = lines.next().ok_or(ParseError::MissingHeader)?;
    let headers = split_fields(header_line);
    Ok(Table {
        headers,
        lines: lines.collect(),
    })
}

impl<'a> Table<'a> {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|header| header == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.lines.iter().map(move |line| {
            let mut values = split_fields(line);
            values.resize(self.headers.len(), String::new());
            Row {
                headers: &self.headers,
                values,
            }
        })
    }
}

impl<'t> Row<'t> {
    /// Value for `column`, or `None` when the header has no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|header| header == column)
            .map(|index| self.values[index].as_str())
    }

    /// Like [`Row::get`] but treats blank values as missing.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|value| !value.is_empty())
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Splits one line on commas that are not inside a quoted span. Quote
/// characters only toggle the quoted state and never reach the output;
/// doubled quotes are not treated as an escape.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in line.chars() {
        if ch == QUOTE {
            in_quotes = !in_quotes;
        } else if ch == DELIMITER && !in_quotes {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    fields.push(current.trim().to_string());
    fields
}
