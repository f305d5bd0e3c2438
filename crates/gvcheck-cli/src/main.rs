use gvcheck::config::{find_on_path, is_executable};
use gvcheck::{BuildContext, Harness, Platform, RunCounts, RunMode, Settings};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(&'static str),
    #[error("{0}")]
    Environment(String),
    #[error(transparent)]
    Driver(#[from] gvcheck::Error),
}

#[derive(Debug, Default)]
struct Args {
    generate: bool,
    verbose: bool,
    noop: bool,
    testfile: Option<String>,
}

fn usage() -> &'static str {
    "gvcheck-cli\n\
\n\
USAGE:\n\
  gvcheck-cli [-g] [-v] [-n] [testfile]\n\
\n\
FLAGS:\n\
  -g  generate reference data instead of comparing\n\
  -v  verbose: print each command line and OK notices\n\
  -n  noop: only count and print subtests (implies -v)\n\
\n\
ENVIRONMENT:\n\
  REFDIR   reference-output directory (OS-specific default if unset)\n\
  DOT      tool under test (default: first `dot` on the search path)\n\
  DIFFIMG  pixel-diff tool (default: first `diffimg` on the search path)\n\
\n\
NOTES:\n\
  - The default testfile is fixtures/tests.txt; input graphs are looked up\n\
    in the graphs/ directory next to the testfile.\n\
  - The exit status is the number of layout failures plus the number of\n\
    changed outputs.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();
    for a in argv.iter().skip(1) {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "-g" => args.generate = true,
            "-v" => args.verbose = true,
            "-n" => args.noop = true,
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.testfile.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.testfile = Some(path.to_string());
            }
        }
    }
    Ok(args)
}

fn env_path(name: &str) -> Option<PathBuf> {
    let value = std::env::var_os(name)?;
    if value.is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}

fn resolve_settings(args: &Args) -> Result<Settings, CliError> {
    let build = BuildContext::from_env();

    let ref_dir = match env_path("REFDIR") {
        Some(dir) => dir,
        None => {
            if build.platform == Platform::Other {
                eprintln!("Unrecognized system \"{}\"", std::env::consts::OS);
            }
            PathBuf::from(build.platform.default_ref_dir())
        }
    };

    let mode = if args.noop {
        RunMode::Noop
    } else if args.generate {
        RunMode::Generate
    } else {
        RunMode::Compare
    };
    // Noop prints what it would run, so it is always verbose.
    let verbose = args.verbose || args.noop;

    let testfile = match &args.testfile {
        Some(f) => {
            let path = PathBuf::from(f);
            if !path.exists() {
                return Err(CliError::Environment(format!(
                    "Test file {f} does not exist"
                )));
            }
            path
        }
        None => PathBuf::from("fixtures/tests.txt"),
    };
    let graphs_dir = testfile
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .join("graphs");

    let out_dir = match mode {
        // Generated output becomes the new reference corpus.
        RunMode::Generate => ref_dir.clone(),
        RunMode::Compare | RunMode::Noop => PathBuf::from("ndata"),
    };
    if mode == RunMode::Compare && !ref_dir.is_dir() {
        return Err(CliError::Environment(format!(
            "Test data directory {} does not exist",
            ref_dir.display()
        )));
    }

    let dot = match env_path("DOT").or_else(|| find_on_path("dot")) {
        Some(path) => path,
        None => {
            return Err(CliError::Environment(
                "Could not find a value for DOT".to_string(),
            ));
        }
    };
    if !is_executable(&dot) {
        return Err(CliError::Environment(format!(
            "{} program is not executable",
            dot.display()
        )));
    }

    let diffimg = if mode == RunMode::Generate {
        None
    } else {
        match env_path("DIFFIMG").or_else(|| find_on_path("diffimg")) {
            Some(path) => {
                if !is_executable(&path) {
                    return Err(CliError::Environment(format!(
                        "{} program is not executable",
                        path.display()
                    )));
                }
                Some(path)
            }
            None => {
                let exempt = build.platform == Platform::Windows && build.build_system_is("cmake");
                if !exempt {
                    return Err(CliError::Environment(
                        "Could not find a value for DIFFIMG".to_string(),
                    ));
                }
                // Raster comparisons will be skipped as inconclusive.
                eprintln!("Could not find a value for DIFFIMG");
                None
            }
        }
    };

    Ok(Settings {
        mode,
        verbose,
        testfile,
        graphs_dir,
        out_dir,
        ref_dir,
        html_dir: PathBuf::from("nhtml"),
        dot,
        diffimg,
        build,
    })
}

fn run(args: &Args) -> Result<RunCounts, CliError> {
    let settings = resolve_settings(args)?;
    let mut harness = Harness::new(&settings)?;
    harness.run()?;
    Ok(harness.finish())
}

fn main() {
    let argv: Vec<String> = std::env::args().collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(&args) {
        Ok(counts) => std::process::exit(counts.exit_status()),
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
