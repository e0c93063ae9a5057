//! ARPA reader for ALICE-Score
//!
//! Parses the standard ARPA backoff n-gram text format into per-order tables.
//!
//! ```text
//! \data\
//! ngram 1=3
//! ngram 2=1
//!
//! \1-grams:
//! -1.0    <unk>
//! -0.5    the    -0.3
//! -0.7    cat
//!
//! \2-grams:
//! -0.2    the cat
//!
//! \end\
//! ```

use crate::{ALICEScoreError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::io::BufRead;

/// Unknown word token
pub const UNK: &str = "<unk>";

/// Sentence start token
pub const BOS: &str = "<s>";

/// log10 probability given to `<unk>` when the ARPA file does not list it
pub const DEFAULT_UNK_LOG10_PROB: f32 = -100.0;

/// A single n-gram line
#[derive(Debug, Clone, PartialEq)]
pub struct ArpaEntry {
    /// Words, oldest first
    pub words: Vec<String>,
    /// log10 P(last word | preceding words)
    pub log10_prob: f32,
    /// log10 backoff weight (0 when absent)
    pub backoff: f32,
}

/// Parsed ARPA model
#[derive(Debug, Clone, Default)]
pub struct ArpaModel {
    /// `orders[n - 1]` holds the n-grams
    pub orders: Vec<Vec<ArpaEntry>>,
}

impl ArpaModel {
    /// Highest n-gram order
    pub fn order(&self) -> usize {
        self.orders.len()
    }

    /// Unigram entries, in file order
    pub fn unigrams(&self) -> &[ArpaEntry] {
        self.orders.first().map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Total number of n-grams over all orders
    pub fn ngram_count(&self) -> u64 {
        self.orders.iter().map(|o| o.len() as u64).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Data,
    NGrams(usize),
    End,
}

/// ARPA text reader
pub struct ArpaReader {
    count_line: Regex,
    section_line: Regex,
}

impl ArpaReader {
    /// Create a new reader
    pub fn new() -> Self {
        Self {
            count_line: Regex::new(r"^ngram\s+(\d+)\s*=\s*(\d+)$").expect("static regex"),
            section_line: Regex::new(r"^\\(\d+)-grams:$").expect("static regex"),
        }
    }

    /// Read an ARPA model
    pub fn read<R: BufRead>(&self, reader: R) -> Result<ArpaModel> {
        let mut section = Section::Preamble;
        let mut declared: Vec<u64> = Vec::new();
        let mut orders: Vec<Vec<ArpaEntry>> = Vec::new();
        // n-grams of the current section
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut line_no = 0;

        for line in reader.lines() {
            line_no += 1;
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if trimmed == "\\data\\" {
                if section != Section::Preamble {
                    return Err(arpa_error(line_no, "unexpected \\data\\ marker"));
                }
                section = Section::Data;
                continue;
            }

            if trimmed == "\\end\\" {
                if section == Section::Preamble || section == Section::End {
                    return Err(arpa_error(line_no, "unexpected \\end\\ marker"));
                }
                section = Section::End;
                continue;
            }

            if let Some(caps) = self.section_line.captures(trimmed) {
                let n: usize = caps[1]
                    .parse()
                    .map_err(|_| arpa_error(line_no, "invalid n-gram order"))?;
                if section == Section::Preamble || section == Section::End {
                    return Err(arpa_error(line_no, "n-gram section outside of model body"));
                }
                if n != orders.len() + 1 {
                    return Err(arpa_error(
                        line_no,
                        &format!("expected \\{}-grams: section, found \\{}-grams:", orders.len() + 1, n),
                    ));
                }
                let Some(&count) = declared.get(n - 1) else {
                    return Err(arpa_error(line_no, &format!("no count declared for order {}", n)));
                };
                orders.push(Vec::with_capacity(count as usize));
                seen.clear();
                section = Section::NGrams(n);
                continue;
            }

            match section {
                // Anything before \data\ is free-form commentary
                Section::Preamble => {}
                Section::Data => {
                    let caps = self
                        .count_line
                        .captures(trimmed)
                        .ok_or_else(|| arpa_error(line_no, "expected 'ngram N=count'"))?;
                    let n: usize = caps[1]
                        .parse()
                        .map_err(|_| arpa_error(line_no, "invalid n-gram order"))?;
                    let count: u64 = caps[2]
                        .parse()
                        .map_err(|_| arpa_error(line_no, "invalid n-gram count"))?;
                    if n != declared.len() + 1 {
                        return Err(arpa_error(line_no, "n-gram counts must be declared in order"));
                    }
                    declared.push(count);
                }
                Section::NGrams(n) => {
                    let entry = parse_entry(trimmed, n, line_no)?;
                    if !seen.insert(entry.words.clone()) {
                        return Err(arpa_error(
                            line_no,
                            &format!("duplicate {}-gram '{}'", n, entry.words.join(" ")),
                        ));
                    }
                    orders[n - 1].push(entry);
                }
                Section::End => {
                    return Err(arpa_error(line_no, "content after \\end\\ marker"));
                }
            }
        }

        if section != Section::End {
            return Err(arpa_error(line_no, "missing \\end\\ marker"));
        }
        if declared.is_empty() {
            return Err(arpa_error(line_no, "no n-gram counts declared"));
        }
        if orders.len() != declared.len() {
            return Err(arpa_error(
                line_no,
                &format!("declared {} orders but found {} sections", declared.len(), orders.len()),
            ));
        }
        for (i, (entries, &count)) in orders.iter().zip(&declared).enumerate() {
            if entries.len() as u64 != count {
                return Err(arpa_error(
                    line_no,
                    &format!("declared {} {}-grams but found {}", count, i + 1, entries.len()),
                ));
            }
        }

        let mut model = ArpaModel { orders };
        ensure_unk(&mut model);
        log::debug!(
            "Read ARPA model: order {}, {} n-grams",
            model.order(),
            model.ngram_count()
        );
        Ok(model)
    }
}

impl Default for ArpaReader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_entry(line: &str, n: usize, line_no: usize) -> Result<ArpaEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != n + 1 && fields.len() != n + 2 {
        return Err(arpa_error(
            line_no,
            &format!("expected {} words for a {}-gram, got {} fields", n, n, fields.len()),
        ));
    }

    let log10_prob: f32 = fields[0]
        .parse()
        .map_err(|_| arpa_error(line_no, &format!("invalid probability '{}'", fields[0])))?;
    let backoff: f32 = match fields.get(n + 1) {
        Some(field) => field
            .parse()
            .map_err(|_| arpa_error(line_no, &format!("invalid backoff '{}'", field)))?,
        None => 0.0,
    };

    Ok(ArpaEntry {
        words: fields[1..=n].iter().map(|w| w.to_string()).collect(),
        log10_prob,
        backoff,
    })
}

fn ensure_unk(model: &mut ArpaModel) {
    let Some(unigrams) = model.orders.first_mut() else {
        return;
    };
    if !unigrams.iter().any(|e| e.words[0] == UNK) {
        log::warn!(
            "ARPA model has no {} unigram, using log10 probability {}",
            UNK,
            DEFAULT_UNK_LOG10_PROB
        );
        unigrams.push(ArpaEntry {
            words: vec![UNK.to_string()],
            log10_prob: DEFAULT_UNK_LOG10_PROB,
            backoff: 0.0,
        });
    }
}

fn arpa_error(line: usize, message: &str) -> ALICEScoreError {
    ALICEScoreError::Arpa {
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIGRAM_ARPA: &str = "This preamble is ignored.

\\data\\
ngram 1=4
ngram 2=2

\\1-grams:
-1.0\t<unk>
-0.5\t<s>\t-0.2
-0.6\tthe\t-0.3
-0.9\tcat

\\2-grams:
-0.1\t<s> the
-0.2\tthe cat

\\end\\
";

    #[test]
    fn test_read_bigram_model() {
        let model = ArpaReader::new().read(BIGRAM_ARPA.as_bytes()).unwrap();

        assert_eq!(model.order(), 2);
        assert_eq!(model.ngram_count(), 6);
        assert_eq!(model.unigrams().len(), 4);

        let the = &model.unigrams()[2];
        assert_eq!(the.words, vec!["the"]);
        assert_eq!(the.log10_prob, -0.6);
        assert_eq!(the.backoff, -0.3);

        let bigram = &model.orders[1][1];
        assert_eq!(bigram.words, vec!["the", "cat"]);
        assert_eq!(bigram.log10_prob, -0.2);
        assert_eq!(bigram.backoff, 0.0);
    }

    #[test]
    fn test_space_separated_fields() {
        let arpa = "\\data\\\nngram 1=2\n\\1-grams:\n-1.5 <unk>\n-0.25 a -0.5\n\\end\\\n";
        let model = ArpaReader::new().read(arpa.as_bytes()).unwrap();
        assert_eq!(model.unigrams()[1].backoff, -0.5);
    }

    #[test]
    fn test_missing_unk_is_added() {
        let arpa = "\\data\\\nngram 1=1\n\\1-grams:\n-0.5\ta\n\\end\\\n";
        let model = ArpaReader::new().read(arpa.as_bytes()).unwrap();

        assert_eq!(model.unigrams().len(), 2);
        let unk = &model.unigrams()[1];
        assert_eq!(unk.words, vec![UNK]);
        assert_eq!(unk.log10_prob, DEFAULT_UNK_LOG10_PROB);
    }

    #[test]
    fn test_count_mismatch() {
        let arpa = "\\data\\\nngram 1=3\n\\1-grams:\n-0.5\ta\n\\end\\\n";
        let err = ArpaReader::new().read(arpa.as_bytes()).unwrap_err();
        assert!(matches!(err, ALICEScoreError::Arpa { line: 5, .. }));
    }

    #[test]
    fn test_bad_probability_reports_line() {
        let arpa = "\\data\\\nngram 1=1\n\n\\1-grams:\nabc\ta\n\\end\\\n";
        match ArpaReader::new().read(arpa.as_bytes()) {
            Err(ALICEScoreError::Arpa { line, message }) => {
                assert_eq!(line, 5);
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_word_count() {
        let arpa = "\\data\\\nngram 1=1\nngram 2=1\n\\1-grams:\n-0.5\ta\n\\2-grams:\n-0.1\ta\n\\end\\\n";
        let err = ArpaReader::new().read(arpa.as_bytes()).unwrap_err();
        assert!(matches!(err, ALICEScoreError::Arpa { line: 7, .. }));
    }

    #[test]
    fn test_duplicate_ngram_rejected() {
        let arpa = "\\data\\\nngram 1=2\nngram 2=2\n\\1-grams:\n-0.5\ta\n-0.7\tb\n\\2-grams:\n-0.1\ta b\n-0.9\ta  b\n\\end\\\n";
        match ArpaReader::new().read(arpa.as_bytes()) {
            Err(ALICEScoreError::Arpa { line, message }) => {
                assert_eq!(line, 9);
                assert!(message.contains("duplicate 2-gram 'a b'"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_unigram_rejected() {
        let arpa = "\\data\\\nngram 1=2\n\\1-grams:\n-0.5\ta\n-0.7\ta\n\\end\\\n";
        let err = ArpaReader::new().read(arpa.as_bytes()).unwrap_err();
        assert!(matches!(err, ALICEScoreError::Arpa { line: 5, .. }));
    }

    #[test]
    fn test_same_words_in_different_orders() {
        let arpa = "\\data\\\nngram 1=1\nngram 2=1\n\\1-grams:\n-0.5\ta\n\\2-grams:\n-0.1\ta a\n\\end\\\n";
        let model = ArpaReader::new().read(arpa.as_bytes()).unwrap();
        assert_eq!(model.orders[1][0].words, vec!["a", "a"]);
    }

    #[test]
    fn test_sections_out_of_order() {
        let arpa = "\\data\\\nngram 1=1\nngram 2=1\n\\2-grams:\n-0.1\ta a\n\\end\\\n";
        let err = ArpaReader::new().read(arpa.as_bytes()).unwrap_err();
        assert!(matches!(err, ALICEScoreError::Arpa { line: 4, .. }));
    }

    #[test]
    fn test_missing_end() {
        let arpa = "\\data\\\nngram 1=1\n\\1-grams:\n-0.5\ta\n";
        let err = ArpaReader::new().read(arpa.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing \\end\\"));
    }

    #[test]
    fn test_content_after_end() {
        let arpa = "\\data\\\nngram 1=1\n\\1-grams:\n-0.5\ta\n\\end\\\n-0.5\tb\n";
        let err = ArpaReader::new().read(arpa.as_bytes()).unwrap_err();
        assert!(matches!(err, ALICEScoreError::Arpa { line: 6, .. }));
    }

    #[test]
    fn test_empty_input() {
        let err = ArpaReader::new().read("".as_bytes()).unwrap_err();
        assert!(matches!(err, ALICEScoreError::Arpa { .. }));
    }
}
