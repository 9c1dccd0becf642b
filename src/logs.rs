//! Console log extraction

use std::io::Read;
use tracing::{info, warn};

use crate::error::Result;

/// Split the full console log into lines.
///
/// Trailing empty lines are dropped, but an empty log still yields one
/// empty line. With `max_lines` set only the last `max_lines` lines are
/// kept; `Some(0)` is treated as unbounded so the result is never empty.
pub fn extract_run_logs(
    build_number: u64,
    mut reader: impl Read,
    max_lines: Option<usize>,
) -> Result<Vec<String>> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    let full_log = String::from_utf8_lossy(&raw);

    let mut lines = split_lines(&full_log);

    if let Some(max) = max_lines.filter(|&max| max > 0) {
        if lines.len() > max {
            let dropped = lines.len() - max;
            lines.drain(..dropped);
            warn!(
                "[#{}] Log exceeds {} lines, dropped the first {}",
                build_number, max, dropped
            );
        }
    }

    info!("[#{}] Total log lines captured : {}", build_number, lines.len());
    Ok(lines)
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut lines: Vec<String> = text.split('\n').map(String::from).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn extract(text: &str) -> Vec<String> {
        extract_run_logs(1, text.as_bytes(), None).unwrap()
    }

    #[test]
    fn splits_on_newline() {
        assert_eq!(extract("a\nb\nc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_log_is_one_empty_line() {
        assert_eq!(extract(""), vec![""]);
    }

    #[test]
    fn trailing_newlines_are_dropped_inner_blank_lines_kept() {
        assert_eq!(extract("a\n\nb\n\n"), vec!["a", "", "b"]);
        assert!(extract("\n\n").is_empty());
    }

    #[test]
    fn carriage_returns_are_preserved() {
        assert_eq!(extract("a\r\nb"), vec!["a\r", "b"]);
    }

    #[test]
    fn keeps_the_tail_when_bounded() {
        let lines = extract_run_logs(1, "1\n2\n3\n4".as_bytes(), Some(2)).unwrap();
        assert_eq!(lines, vec!["3", "4"]);
    }

    #[test]
    fn zero_bound_is_unbounded() {
        let lines = extract_run_logs(1, "1\n2".as_bytes(), Some(0)).unwrap();
        assert_eq!(lines, vec!["1", "2"]);
        assert_eq!(extract_run_logs(1, "".as_bytes(), Some(0)).unwrap(), vec![""]);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("log gone"))
        }
    }

    #[test]
    fn reader_errors_propagate() {
        assert!(extract_run_logs(1, FailingReader, None).is_err());
    }
}
