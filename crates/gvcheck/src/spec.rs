//! Line-oriented test-spec parser.
//!
//! A spec file is a sequence of paragraphs: a test name line, an input-graph
//! line, and a block of subtest lines terminated by a blank line. Blank lines
//! and `#` comments are skipped when looking for the name and graph lines.
//! Inside a subtest block a comment line is skipped but a blank line is the
//! terminator.

use std::io::BufRead;

/// One named regression scenario: an input graph and its rendering requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Test {
    pub name: String,
    /// Graph specification: `=` (fixture named after the test), inline
    /// `graph`/`digraph` source, or an explicit `.gv` fixture filename.
    pub graph: String,
    pub subtests: Vec<Subtest>,
}

/// One concrete (layout engine, output format, extra flags) combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtest {
    /// Layout engine selector; empty means the tool's default.
    pub engine: String,
    /// Output-format token, possibly with a colon-separated suffix chain
    /// (e.g. `png:gd:cairo`). Never empty.
    pub format: String,
    pub flags: Vec<String>,
}

impl Subtest {
    /// Splits a subtest line on single spaces into `engine format [flag...]`.
    ///
    /// Returns `None` for structurally malformed lines (fewer than two
    /// fields, or an empty format token).
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split(' ');
        let engine = fields.next()?.to_string();
        let format = fields.next()?.to_string();
        if format.is_empty() {
            return None;
        }
        Some(Self {
            engine,
            format,
            flags: fields.map(str::to_string).collect(),
        })
    }
}

/// Single forward pass over a spec stream, yielding one `Test` per paragraph.
#[derive(Debug)]
pub struct SpecReader<R> {
    input: R,
}

impl<R: BufRead> SpecReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Reads one line, trimmed. `None` at end of stream.
    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim().to_string()))
    }

    /// Skips blank lines and `#` comments; returns the next real line.
    fn skip_lines(&mut self) -> std::io::Result<Option<String>> {
        while let Some(line) = self.read_line()? {
            if !line.is_empty() && !line.starts_with('#') {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    /// Reads subtest lines until a blank line or end of stream. Comment lines
    /// inside the block are skipped, not terminating.
    fn read_subtests(&mut self, test_name: &str) -> std::io::Result<Vec<Subtest>> {
        let mut subtests = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.is_empty() {
                break;
            }
            if line.starts_with('#') {
                continue;
            }
            match Subtest::parse(&line) {
                Some(subtest) => subtests.push(subtest),
                None => {
                    eprintln!("Malformed subtest line in test {test_name} - ignoring: {line}");
                }
            }
        }
        Ok(subtests)
    }

    /// Parses the next test paragraph. `Ok(None)` is a clean end of stream.
    pub fn next_test(&mut self) -> std::io::Result<Option<Test>> {
        let Some(name) = self.skip_lines()? else {
            return Ok(None);
        };
        let Some(graph) = self.skip_lines()? else {
            return Ok(None);
        };
        let subtests = self.read_subtests(&name)?;
        Ok(Some(Test {
            name,
            graph,
            subtests,
        }))
    }
}

impl<R: BufRead> Iterator for SpecReader<R> {
    type Item = std::io::Result<Test>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_test().transpose()
    }
}
