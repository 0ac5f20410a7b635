/// Emulated Prepared Statements
///
/// An emulated statement is parsed once into literal SQL fragments separated
/// by positional placeholders. Each execution renders a complete SQL text
/// by inlining the quoted parameter values, so the native client only ever
/// sees literal SQL.
///
/// Placeholders follow SQLite numbering: `?NNN` binds parameter `NNN`, and a
/// bare `?` takes the number after the largest one assigned so far. Named
/// parameters (`:name`, `@name`, `$name`) cannot be bound positionally and
/// are rejected.

use crate::core::db::quoter::Quoter;
use rusqlite::types::Value;

/// Largest parameter number SQLite accepts by default
const MAX_PARAMETER_NUMBER: usize = 32766;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Sql(String),
    /// 1-based parameter number
    Placeholder(usize),
}

/// A client-side prepared statement template.
#[derive(Debug, Clone, PartialEq)]
pub struct EmulatedStatement {
    segments: Vec<Segment>,
    placeholders: usize,
}

impl EmulatedStatement {
    /// Splits `sql` on placeholders.
    ///
    /// Placeholder characters inside string literals, quoted identifiers and
    /// comments are kept as SQL text.
    pub fn parse(sql: &str) -> rusqlite::Result<Self> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut placeholders = 0;
        let mut chars = sql.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '?' => {
                    let mut digits = String::new();
                    while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                        digits.push(digit);
                    }
                    let number = if digits.is_empty() {
                        placeholders + 1
                    } else {
                        match digits.parse::<usize>() {
                            Ok(n) if (1..=MAX_PARAMETER_NUMBER).contains(&n) => n,
                            _ => {
                                let name = format!("?{}", digits);
                                return Err(rusqlite::Error::InvalidParameterName(name));
                            }
                        }
                    };
                    if !current.is_empty() {
                        segments.push(Segment::Sql(std::mem::take(&mut current)));
                    }
                    segments.push(Segment::Placeholder(number));
                    placeholders = placeholders.max(number);
                }
                ':' | '@' | '$'
                    if chars.peek().is_some_and(|next| is_identifier_char(*next))
                        && !current.chars().last().is_some_and(is_identifier_char) =>
                {
                    let mut name = String::from(c);
                    while let Some(inner) = chars.next_if(|next| is_identifier_char(*next)) {
                        name.push(inner);
                    }
                    return Err(rusqlite::Error::InvalidParameterName(name));
                }
                '\'' | '"' | '`' | '[' => {
                    let close = if c == '[' { ']' } else { c };
                    current.push(c);
                    // doubled quotes re-enter the loop as an empty quoted run
                    for inner in chars.by_ref() {
                        current.push(inner);
                        if inner == close {
                            break;
                        }
                    }
                }
                '-' if chars.peek() == Some(&'-') => {
                    current.push(c);
                    for inner in chars.by_ref() {
                        current.push(inner);
                        if inner == '\n' {
                            break;
                        }
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    current.push(c);
                    let mut previous = '\0';
                    // the opening '*' cannot also close the comment
                    for (consumed, inner) in chars.by_ref().enumerate() {
                        current.push(inner);
                        if previous == '*' && inner == '/' && consumed >= 2 {
                            break;
                        }
                        previous = inner;
                    }
                }
                _ => current.push(c),
            }
        }
        if !current.is_empty() {
            segments.push(Segment::Sql(current));
        }

        Ok(EmulatedStatement {
            segments,
            placeholders,
        })
    }

    /// Number of parameters the template expects: its largest placeholder number.
    pub fn placeholder_count(&self) -> usize {
        self.placeholders
    }

    /// Renders the template with `params` inlined through `quoter`.
    pub fn render(&self, params: &[Value], quoter: &dyn Quoter) -> rusqlite::Result<String> {
        if params.len() != self.placeholders {
            return Err(rusqlite::Error::InvalidParameterCount(
                params.len(),
                self.placeholders,
            ));
        }

        let mut sql = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Sql(text) => sql.push_str(text),
                Segment::Placeholder(number) => {
                    if let Some(value) = params.get(number - 1) {
                        sql.push_str(&quoter.quote_value(value));
                    }
                }
            }
        }
        Ok(sql)
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
