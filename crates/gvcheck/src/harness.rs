//! The run aggregator: drives parser, runner and comparator across every
//! test and subtest, accumulating the counters that become the exit status.
//!
//! Execution is strictly sequential in file order: output-name
//! disambiguation depends on per-test counters, and the scratch input file
//! is reused across tests.

use crate::compare::{self, FormatFamily};
use crate::config::{RunMode, Settings};
use crate::error::{Error, Result};
use crate::naming::OutputNamer;
use crate::report::HtmlReport;
use crate::runner::Invocation;
use crate::skip::{self, SkipContext};
use crate::spec::{SpecReader, Subtest, Test};
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Counters for one driver run. `crashes + diffs` is the exit status;
/// `inconclusive` tracks skipped executions and comparisons and is reported
/// but never failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub total: u32,
    pub crashes: u32,
    pub diffs: u32,
    pub inconclusive: u32,
}

impl RunCounts {
    pub fn exit_status(&self) -> i32 {
        let failures = u64::from(self.crashes) + u64::from(self.diffs);
        i32::try_from(failures).unwrap_or(i32::MAX)
    }
}

/// Scratch file for inline graph sources, named after the process id and
/// removed on drop so no scratch files leak on any exit path.
#[derive(Debug)]
struct ScratchInput {
    path: PathBuf,
    written: bool,
}

impl ScratchInput {
    fn new() -> Self {
        Self {
            path: PathBuf::from(format!("tmp{}.gv", std::process::id())),
            written: false,
        }
    }

    fn write(&mut self, contents: &str) -> Result<&Path> {
        fs::write(&self.path, contents).map_err(|source| Error::WriteFile {
            path: self.path.display().to_string(),
            source,
        })?;
        self.written = true;
        Ok(&self.path)
    }
}

impl Drop for ScratchInput {
    fn drop(&mut self) {
        if self.written {
            let _ = fs::remove_file(&self.path);
        }
    }
}

pub struct Harness<'a> {
    settings: &'a Settings,
    counts: RunCounts,
    namer: OutputNamer,
    report: HtmlReport,
    scratch: ScratchInput,
}

impl<'a> Harness<'a> {
    /// Creates the output directory and prepares (clears) the HTML report
    /// directory.
    pub fn new(settings: &'a Settings) -> Result<Self> {
        fs::create_dir_all(&settings.out_dir).map_err(|source| Error::CreateDir {
            path: settings.out_dir.display().to_string(),
            source,
        })?;
        let report = HtmlReport::prepare(&settings.html_dir)?;
        Ok(Self {
            settings,
            counts: RunCounts::default(),
            namer: OutputNamer::new(),
            report,
            scratch: ScratchInput::new(),
        })
    }

    /// Runs every test in the spec file, in order.
    pub fn run(&mut self) -> Result<RunCounts> {
        let path = self.settings.testfile.clone();
        let file = fs::File::open(&path).map_err(|source| Error::SpecRead {
            path: path.display().to_string(),
            source,
        })?;
        let mut reader = SpecReader::new(BufReader::new(file));
        loop {
            let next = reader.next_test().map_err(|source| Error::SpecRead {
                path: path.display().to_string(),
                source,
            })?;
            let Some(test) = next else {
                break;
            };
            self.run_test(&test)?;
        }
        Ok(self.counts)
    }

    /// Prints the one-line summary and returns the final counters.
    pub fn finish(self) -> RunCounts {
        let c = self.counts;
        match self.settings.mode {
            RunMode::Noop => eprintln!("No. tests: {}", c.total),
            RunMode::Generate => {
                eprintln!("No. tests: {} Layout failures: {}", c.total, c.crashes);
            }
            RunMode::Compare => {
                if c.inconclusive > 0 {
                    eprintln!(
                        "No. tests: {} Layout failures: {} Changes: {} Inconclusive: {}",
                        c.total, c.crashes, c.diffs, c.inconclusive
                    );
                } else {
                    eprintln!(
                        "No. tests: {} Layout failures: {} Changes: {}",
                        c.total, c.crashes, c.diffs
                    );
                }
            }
        }
        c
    }

    pub fn counts(&self) -> RunCounts {
        self.counts
    }

    /// Resolves a test's graph specification to an input file. `None` means
    /// the specification was unrecognized: reported and skipped, never fatal.
    fn resolve_input(&mut self, test: &Test) -> Result<Option<PathBuf>> {
        let graph = test.graph.as_str();
        if graph == "=" {
            return Ok(Some(
                self.settings.graphs_dir.join(format!("{}.gv", test.name)),
            ));
        }
        if graph.starts_with("graph") || graph.starts_with("digraph") {
            return Ok(Some(self.scratch.write(graph)?.to_path_buf()));
        }
        if Path::new(graph).extension().is_some_and(|e| e == "gv") {
            return Ok(Some(self.settings.graphs_dir.join(graph)));
        }
        eprintln!("Unknown graph spec, test {} - ignoring", test.name);
        Ok(None)
    }

    fn run_test(&mut self, test: &Test) -> Result<()> {
        // A test without subtests produces nothing and counts nothing.
        if test.subtests.is_empty() {
            return Ok(());
        }
        let Some(input) = self.resolve_input(test)? else {
            return Ok(());
        };
        self.namer.reset();
        for (index, subtest) in test.subtests.iter().enumerate() {
            self.run_subtest(test, index, subtest, &input)?;
        }
        Ok(())
    }

    fn run_subtest(
        &mut self,
        test: &Test,
        index: usize,
        subtest: &Subtest,
        input: &Path,
    ) -> Result<()> {
        let settings = self.settings;
        self.counts.total += 1;

        let outfile = self
            .namer
            .name(&test.name, &subtest.engine, &subtest.format);
        let out_path = settings.out_dir.join(&outfile);
        let invocation = Invocation::build(
            &settings.dot,
            &subtest.engine,
            &subtest.format,
            &subtest.flags,
            &out_path,
            input,
        );

        if settings.verbose {
            println!("{}", invocation.command_line());
        }
        if settings.mode == RunMode::Noop {
            return Ok(());
        }

        let exec_skip = {
            let ctx = self.skip_context(test, subtest);
            skip::first_match(skip::EXEC_SKIPS, &ctx)
        };
        if let Some(rule) = exec_skip {
            eprintln!("Skipping test {}:{index} : {}", test.name, rule.reason);
            self.counts.inconclusive += 1;
            return Ok(());
        }

        let outcome = invocation.run()?;
        if !outcome.stderr.is_empty() {
            println!("{}", outcome.stderr);
        }

        if outcome.crashed {
            self.counts.crashes += 1;
            eprintln!("Test {}:{index} : == Layout failed ==", test.name);
            eprintln!("  {}", invocation.command_line());
            return Ok(());
        }
        if settings.mode == RunMode::Generate {
            return Ok(());
        }

        let ref_path = settings.ref_dir.join(&outfile);
        if !ref_path.exists() {
            eprintln!(
                "Test {}:{index} : == No file {} for comparison ==",
                test.name,
                ref_path.display()
            );
            return Ok(());
        }

        self.compare_outputs(test, index, subtest, &outfile, &out_path, &ref_path)
    }

    fn compare_outputs(
        &mut self,
        test: &Test,
        index: usize,
        subtest: &Subtest,
        outfile: &str,
        out_path: &Path,
        ref_path: &Path,
    ) -> Result<()> {
        let settings = self.settings;
        let compare_skip = {
            let ctx = self.skip_context(test, subtest);
            skip::first_match(skip::COMPARE_SKIPS, &ctx)
        };
        if let Some(rule) = compare_skip {
            let base = subtest.format.split(':').next().unwrap_or(&subtest.format);
            eprintln!(
                "Warning: Skipping {base} output comparison for test {}:{index} : format {} because {}",
                test.name, subtest.format, rule.reason
            );
            self.counts.inconclusive += 1;
            return Ok(());
        }

        let equivalent = match FormatFamily::from_format(&subtest.format) {
            FormatFamily::PostScript => compare::postscript_equivalent(out_path, ref_path)?,
            FormatFamily::Svg => compare::svg_equivalent(out_path, ref_path)?,
            FormatFamily::PlainText => compare::text_equivalent(out_path, ref_path)?,
            FormatFamily::Raster => {
                let Some(diffimg) = settings.diffimg.as_ref() else {
                    eprintln!(
                        "Warning: Skipping image comparison for test {}:{index} : no pixel-diff tool available",
                        test.name
                    );
                    self.counts.inconclusive += 1;
                    return Ok(());
                };
                compare::raster_equivalent(diffimg, out_path, ref_path, &self.report, outfile)?
            }
        };

        if equivalent {
            if settings.verbose {
                eprintln!("Test {}:{index} : == OK == {outfile}", test.name);
            }
        } else {
            self.counts.diffs += 1;
            eprintln!("Test {}:{index} : == Failed == {outfile}", test.name);
        }
        Ok(())
    }

    fn skip_context<'t>(&'t self, test: &'t Test, subtest: &'t Subtest) -> SkipContext<'t> {
        SkipContext {
            test_name: &test.name,
            format: &subtest.format,
            base_format: subtest
                .format
                .split(':')
                .next()
                .unwrap_or(&subtest.format),
            flags: &subtest.flags,
            build: &self.settings.build,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildContext, Platform};

    fn noop_settings(dir: &Path, testfile: &Path) -> Settings {
        Settings {
            mode: RunMode::Noop,
            verbose: false,
            testfile: testfile.to_path_buf(),
            graphs_dir: dir.join("graphs"),
            out_dir: dir.join("ndata"),
            ref_dir: dir.join("refs"),
            html_dir: dir.join("nhtml"),
            // Never spawned in noop mode; a nonexistent path proves it.
            dot: dir.join("no-such-dot"),
            diffimg: None,
            build: BuildContext {
                platform: Platform::Linux,
                build_system: None,
                configuration: None,
            },
        }
    }

    #[test]
    fn noop_counts_subtests_without_invoking_anything() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let testfile = tmp.path().join("tests.txt");
        fs::write(
            &testfile,
            "a\n=\ndot gv\ndot ps\n\nb\n=\n\nc\n=\ndot svg\n",
        )
        .expect("write spec");

        let settings = noop_settings(tmp.path(), &testfile);
        let mut harness = Harness::new(&settings).expect("harness");
        let counts = harness.run().expect("run");
        assert_eq!(counts.total, 3);
        assert_eq!(counts.crashes, 0);
        assert_eq!(counts.diffs, 0);

        // No artifacts: the output directory exists but stays empty.
        assert!(
            fs::read_dir(&settings.out_dir)
                .expect("read_dir")
                .next()
                .is_none()
        );
    }

    #[test]
    fn unrecognized_graph_spec_skips_the_test_and_continues() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let testfile = tmp.path().join("tests.txt");
        fs::write(
            &testfile,
            "bad\nnot-a-graph-spec\ndot svg\n\ngood\n=\ndot gv\n",
        )
        .expect("write spec");

        let settings = noop_settings(tmp.path(), &testfile);
        let mut harness = Harness::new(&settings).expect("harness");
        let counts = harness.run().expect("run");
        assert_eq!(counts.total, 1);
    }

    #[test]
    fn exit_status_is_crashes_plus_diffs() {
        let counts = RunCounts {
            total: 10,
            crashes: 2,
            diffs: 3,
            inconclusive: 4,
        };
        assert_eq!(counts.exit_status(), 5);
        assert_eq!(RunCounts::default().exit_status(), 0);
    }
}
