//! Text sample protocol shared by every program in the chain.
//!
//! Samples travel as floating point numbers (plain or scientific notation)
//! separated by whitespace, and are written back one per line with six
//! fractional digits, so `transmitter | channel | receiver` composes in a
//! shell.

use crate::error::{PipelineError, Result};
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Iterator over the samples of a text stream
#[derive(Debug)]
pub struct SampleReader<R> {
    reader: R,
    line: usize,
    buf: String,
    pending: VecDeque<String>,
    finished: bool,
}

impl<R: BufRead> SampleReader<R> {
    /// Create a reader over a buffered text stream
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Line number of the most recently read line (1-based, 0 before any read)
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for SampleReader<R> {
    type Item = Result<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(parse_sample(&token, self.line));
            }
            if self.finished {
                return None;
            }

            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    self.line += 1;
                    self.pending
                        .extend(self.buf.split_whitespace().map(str::to_owned));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

/// Parse one whitespace-free token
pub fn parse_sample(token: &str, line: usize) -> Result<f32> {
    token.parse::<f32>().map_err(|_| PipelineError::ParseError {
        line,
        token: token.to_string(),
    })
}

/// Write one sample as a line
pub fn write_sample<W: Write>(writer: &mut W, sample: f32) -> Result<()> {
    writeln!(writer, "{sample:.6}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(text: &str) -> Vec<Result<f32>> {
        SampleReader::new(Cursor::new(text.as_bytes())).collect()
    }

    #[test]
    fn test_reads_one_per_line() {
        let samples: Vec<f32> = read_all("1.0\n-2.5\n3\n")
            .into_iter()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples, vec![1.0, -2.5, 3.0]);
    }

    #[test]
    fn test_reads_scientific_and_mixed_whitespace() {
        let samples: Vec<f32> = read_all("  1.5e2 -2E-1\t\n\n4.000000")
            .into_iter()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples, vec![150.0, -0.2, 4.0]);
    }

    #[test]
    fn test_empty_stream() {
        assert!(read_all("").is_empty());
        assert!(read_all("\n  \n").is_empty());
    }

    #[test]
    fn test_bad_token_reports_line() {
        let results = read_all("1.0\n2.0 oops\n");
        assert_eq!(results.len(), 3);
        match &results[2] {
            Err(PipelineError::ParseError { line, token }) => {
                assert_eq!(*line, 2);
                assert_eq!(token, "oops");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_write_six_decimals() {
        let mut out = Vec::new();
        write_sample(&mut out, 1.0).unwrap();
        write_sample(&mut out, -0.25).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1.000000\n-0.250000\n");
    }
}
