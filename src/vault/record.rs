//! Credential records and their delimited-line encoding.
//!
//! Each record is one logical line of three comma-separated fields:
//!
//! ```text
//! service,username,encrypted_password\r\n
//! ```
//!
//! A field containing a comma, a double quote, or a line break is wrapped
//! in double quotes, with embedded quotes doubled (`"` -> `""`).  A quoted
//! field may therefore span several physical lines.  Field 3 is base64 and
//! never needs quoting.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{self, BufRead};

/// Field separator.
const DELIMITER: char = ',';

/// Quote character used to escape fields.
const QUOTE: char = '"';

/// Record terminator written after every record.
const TERMINATOR: &str = "\r\n";

/// Number of fields in a well-formed record.
const FIELD_COUNT: usize = 3;

/// A single credential as stored on disk.
///
/// `service` and `username` are plaintext; `encrypted_password` is the
/// base64 text of an encrypted envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub service: String,
    pub username: String,
    pub encrypted_password: String,
}

impl CredentialRecord {
    /// Serialize this record as one terminated line.
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(
            self.service.len() + self.username.len() + self.encrypted_password.len() + 8,
        );
        line.push_str(&quote_field(&self.service));
        line.push(DELIMITER);
        line.push_str(&quote_field(&self.username));
        line.push(DELIMITER);
        line.push_str(&quote_field(&self.encrypted_password));
        line.push_str(TERMINATOR);
        line
    }

    /// Case-insensitive comparison of the service name.
    pub fn matches_service(&self, service_name: &str) -> bool {
        self.service.to_lowercase() == service_name.to_lowercase()
    }
}

/// Quote a field only when it contains a special character.
fn quote_field(value: &str) -> Cow<'_, str> {
    let needs_quotes = value
        .chars()
        .any(|c| c == DELIMITER || c == QUOTE || c == '\r' || c == '\n');
    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push(QUOTE);
    for c in value.chars() {
        if c == QUOTE {
            quoted.push(QUOTE);
        }
        quoted.push(c);
    }
    quoted.push(QUOTE);
    Cow::Owned(quoted)
}

/// One logical record read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A well-formed record starting on `line`.
    Record { line: usize, record: CredentialRecord },
    /// A record starting on `line` that could not be parsed.
    Malformed { line: usize, reason: String },
}

/// Streaming reader over the records of a store file.
///
/// Yields one `Entry` per logical record, in file order.  Blank lines are
/// skipped.  I/O errors are passed through to the caller.
///
/// A record that spans several physical lines but fails to parse is
/// reported as malformed on its first line only; reading resumes on the
/// line after it, so one stray quote cannot hide the records behind it.
pub struct RecordReader<R> {
    inner: R,
    line: usize,
    replay: VecDeque<(usize, Vec<u8>)>,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            replay: VecDeque::new(),
        }
    }

    /// Next physical line and its 1-based number, or `None` at EOF.
    fn next_physical_line(&mut self) -> io::Result<Option<(usize, Vec<u8>)>> {
        if let Some(pending) = self.replay.pop_front() {
            return Ok(Some(pending));
        }
        let mut buf = Vec::new();
        if self.inner.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        Ok(Some((self.line, buf)))
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == b'\r' || b == b'\n')
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = io::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        // Skip blank lines until the start of a record.
        let (start, first) = loop {
            match self.next_physical_line() {
                Ok(None) => return None,
                Ok(Some((line, bytes))) if !is_blank(&bytes) => break (line, bytes),
                Ok(Some(_)) => {}
                Err(e) => return Some(Err(e)),
            }
        };

        let mut parser = FieldParser::default();
        let mut complete = match std::str::from_utf8(&first) {
            Ok(text) => parser.feed(text),
            Err(_) => {
                return Some(Ok(Entry::Malformed {
                    line: start,
                    reason: "invalid UTF-8".into(),
                }))
            }
        };

        // A quoted field may continue onto the next physical line.
        let mut continuation = Vec::new();
        while !complete {
            match self.next_physical_line() {
                Ok(Some((line, bytes))) => {
                    let fed = std::str::from_utf8(&bytes).map(|text| parser.feed(text));
                    continuation.push((line, bytes));
                    match fed {
                        Ok(done) => complete = done,
                        Err(_) => {
                            parser.fail("invalid UTF-8");
                            break;
                        }
                    }
                }
                Ok(None) => {
                    parser.fail("unterminated quoted field");
                    break;
                }
                Err(e) => return Some(Err(e)),
            }
        }

        let reason = match parser.finish() {
            Ok(mut fields) if fields.len() == FIELD_COUNT => {
                let encrypted_password = fields.pop().unwrap_or_default();
                let username = fields.pop().unwrap_or_default();
                let service = fields.pop().unwrap_or_default();
                return Some(Ok(Entry::Record {
                    line: start,
                    record: CredentialRecord {
                        service,
                        username,
                        encrypted_password,
                    },
                }));
            }
            Ok(fields) => format!("expected {FIELD_COUNT} fields, got {}", fields.len()),
            Err(reason) => reason,
        };

        // Hand the swallowed lines back to be read as records of their own.
        for pending in continuation.into_iter().rev() {
            self.replay.push_front(pending);
        }

        Some(Ok(Entry::Malformed {
            line: start,
            reason,
        }))
    }
}

/// Incremental parser for one logical record.
#[derive(Default)]
struct FieldParser {
    fields: Vec<String>,
    field: String,
    in_quotes: bool,
    after_quote: bool,
    error: Option<String>,
}

impl FieldParser {
    /// Feed one physical line (including its terminator).
    ///
    /// Returns `true` once the record is complete, `false` if a quoted
    /// field is still open and more input is needed.
    fn feed(&mut self, text: &str) -> bool {
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if self.in_quotes {
                if c == QUOTE {
                    if chars.peek() == Some(&QUOTE) {
                        chars.next();
                        self.field.push(QUOTE);
                    } else {
                        self.in_quotes = false;
                        self.after_quote = true;
                    }
                } else {
                    self.field.push(c);
                }
                continue;
            }

            match c {
                DELIMITER => {
                    self.fields.push(std::mem::take(&mut self.field));
                    self.after_quote = false;
                }
                '\r' | '\n' => return true,
                QUOTE if self.field.is_empty() && !self.after_quote => self.in_quotes = true,
                _ => {
                    if self.after_quote && self.error.is_none() {
                        self.error = Some("unexpected character after closing quote".into());
                    }
                    self.field.push(c);
                }
            }
        }
        !self.in_quotes
    }

    /// Mark the record as unparsable, keeping the first reason recorded.
    fn fail(&mut self, reason: &str) {
        if self.error.is_none() {
            self.error = Some(reason.into());
        }
    }

    fn finish(mut self) -> std::result::Result<Vec<String>, String> {
        if let Some(reason) = self.error {
            return Err(reason);
        }
        self.fields.push(self.field);
        Ok(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(service: &str, username: &str, pw: &str) -> CredentialRecord {
        CredentialRecord {
            service: service.into(),
            username: username.into(),
            encrypted_password: pw.into(),
        }
    }

    fn read_all(input: &str) -> Vec<Entry> {
        read_bytes(input.as_bytes())
    }

    fn read_bytes(input: &[u8]) -> Vec<Entry> {
        RecordReader::new(input)
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn plain_fields_are_not_quoted() {
        assert_eq!(
            record("Netflix", "a@b.com", "QUJD").to_line(),
            "Netflix,a@b.com,QUJD\r\n"
        );
    }

    #[test]
    fn special_fields_are_quoted_and_escaped() {
        assert_eq!(
            record("Acme, Inc.", "say \"hi\"", "QUJD").to_line(),
            "\"Acme, Inc.\",\"say \"\"hi\"\"\",QUJD\r\n"
        );
    }

    #[test]
    fn reads_quoted_fields_back() {
        let rec = record("Acme, Inc.", "user,name", "QUJD");
        let entries = read_all(&rec.to_line());
        assert_eq!(
            entries,
            vec![Entry::Record {
                line: 1,
                record: rec
            }]
        );
    }

    #[test]
    fn quoted_field_may_span_lines() {
        let rec = record("multi\nline", "u\r\nv", "QUJD");
        let mut input = rec.to_line();
        input.push_str("next,user,QUJD\n");

        let entries = read_all(&input);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            Entry::Record {
                line: 1,
                record: rec
            }
        );
        assert!(matches!(&entries[1], Entry::Record { line: 4, record } if record.service == "next"));
    }

    #[test]
    fn accepts_lf_terminators_and_skips_blank_lines() {
        let entries = read_all("a,b,c\n\n\r\nd,e,f");
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[1], Entry::Record { line: 4, record } if record.service == "d"));
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        let entries = read_all("only,two\na,b,c,d\n");
        assert!(matches!(&entries[0], Entry::Malformed { line: 1, .. }));
        assert!(matches!(&entries[1], Entry::Malformed { line: 2, .. }));
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        let entries = read_all("\"open,b,c\n");
        assert_eq!(
            entries,
            vec![Entry::Malformed {
                line: 1,
                reason: "unterminated quoted field".into()
            }]
        );
    }

    #[test]
    fn unterminated_quote_does_not_swallow_later_lines() {
        let entries = read_all("a,b,c\r\n\"broken,u,x\r\nd,e,f\r\n");
        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], Entry::Record { line: 1, .. }));
        assert_eq!(
            entries[1],
            Entry::Malformed {
                line: 2,
                reason: "unterminated quoted field".into()
            }
        );
        assert!(matches!(&entries[2], Entry::Record { line: 3, record } if record.service == "d"));
    }

    #[test]
    fn stray_quote_before_multiline_record_is_isolated() {
        let rec = record("multi\nline", "u", "QUJD");
        let mut input = String::from("\"stray\n");
        input.push_str(&rec.to_line());

        let entries = read_all(&input);
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0], Entry::Malformed { line: 1, .. }));
        assert_eq!(
            entries[1],
            Entry::Record {
                line: 2,
                record: rec
            }
        );
    }

    #[test]
    fn invalid_utf8_line_is_malformed() {
        let entries = read_bytes(b"bad\xff\xfe,line,x\r\na,b,c\r\n");
        assert_eq!(
            entries[0],
            Entry::Malformed {
                line: 1,
                reason: "invalid UTF-8".into()
            }
        );
        assert!(matches!(&entries[1], Entry::Record { line: 2, record } if record.service == "a"));
    }

    #[test]
    fn garbage_after_closing_quote_is_malformed() {
        let entries = read_all("\"a\"x,b,c\n");
        assert!(matches!(&entries[0], Entry::Malformed { .. }));
    }

    #[test]
    fn empty_fields_are_kept() {
        let entries = read_all(",,\n");
        assert_eq!(
            entries,
            vec![Entry::Record {
                line: 1,
                record: record("", "", "")
            }]
        );
    }

    #[test]
    fn service_match_ignores_case() {
        let rec = record("Netflix", "u", "p");
        assert!(rec.matches_service("netflix"));
        assert!(rec.matches_service("NETFLIX"));
        assert!(!rec.matches_service("netflix2"));
    }
}
