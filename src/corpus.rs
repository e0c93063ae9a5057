//! Line-buffered corpus stream
//!
//! One sentence per line, words separated by whitespace. Only the current
//! line is held in memory; word tokens borrow from it. Lines are read as raw
//! bytes, and invalid UTF-8 is replaced with U+FFFD, so such words score as
//! OOVs instead of failing the run.

use crate::Result;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::str::SplitWhitespace;

/// Sentence-by-sentence reader over a text source
pub struct CorpusReader<R> {
    reader: R,
    bytes: Vec<u8>,
    line: String,
    num_words: u64,
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            bytes: Vec::new(),
            line: String::new(),
            num_words: 0,
        }
    }

    /// Advance to the next line; `None` at end of input
    pub fn next_sentence(&mut self) -> Result<Option<Sentence<'_>>> {
        self.bytes.clear();
        if self.reader.read_until(b'\n', &mut self.bytes)? == 0 {
            return Ok(None);
        }

        self.line.clear();
        self.line.push_str(&String::from_utf8_lossy(&self.bytes));
        let line = self.line.trim_end_matches(['\n', '\r']);
        Ok(Some(Sentence {
            words: line.split_whitespace(),
            num_words: &mut self.num_words,
        }))
    }

    /// Words handed out so far; the corpus token count once exhausted
    pub fn num_words(&self) -> u64 {
        self.num_words
    }
}

impl CorpusReader<Box<dyn BufRead>> {
    /// Open a corpus file, or stdin for `-`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            Box::new(BufReader::new(File::open(path)?))
        };
        Ok(Self::new(reader))
    }
}

/// Words of the current line, in order
pub struct Sentence<'a> {
    words: SplitWhitespace<'a>,
    num_words: &'a mut u64,
}

impl<'a> Iterator for Sentence<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let word = self.words.next()?;
        *self.num_words += 1;
        Some(word)
    }
}
