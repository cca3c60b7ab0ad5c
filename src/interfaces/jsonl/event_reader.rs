use crate::application::events::Event;
use crate::error::{PaymentError, Result};
use std::io::{BufRead, BufReader, Read};

/// Reads boundary events from a JSON-lines source.
///
/// One event per line, tagged by `op`. Blank lines and `#` comment lines are
/// skipped; a malformed line surfaces as an error without ending the stream,
/// so large files can be processed lazily and partially.
pub struct EventReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Returns an iterator that lazily reads and deserializes events.
    pub fn events(self) -> impl Iterator<Item = Result<Event>> {
        self.reader
            .lines()
            .filter(|line| match line {
                Ok(text) => {
                    let trimmed = text.trim();
                    !trimmed.is_empty() && !trimmed.starts_with('#')
                }
                Err(_) => true,
            })
            .map(|line| {
                let text = line?;
                serde_json::from_str(&text).map_err(PaymentError::from)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = concat!(
            "# seed\n",
            r#"{"op":"course","id":"rust-101","title":"Rust","price":"100.00","duration_minutes":600}"#,
            "\n\n",
            r#"{"op":"approve","tx":1,"admin":"admin-1"}"#,
            "\n",
        );
        let reader = EventReader::new(data.as_bytes());
        let results: Vec<Result<Event>> = reader.events().collect();

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0].as_ref().unwrap(), Event::Course { .. }));
        assert!(matches!(
            results[1].as_ref().unwrap(),
            Event::Approve { tx: 1, .. }
        ));
    }

    #[test]
    fn test_reader_malformed_line_keeps_stream_alive() {
        let data = concat!(
            r#"{"op":"unknown-op"}"#,
            "\n",
            r#"{"op":"approve","tx":7,"admin":"admin-1"}"#,
            "\n",
        );
        let reader = EventReader::new(data.as_bytes());
        let results: Vec<Result<Event>> = reader.events().collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(matches!(
            results[1].as_ref().unwrap(),
            Event::Approve { tx: 7, .. }
        ));
    }
}
