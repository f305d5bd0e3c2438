//! Output-filename generation.
//!
//! Reference fixtures are named by this exact scheme, so it must be
//! reproduced bit-for-bit for comparisons to find their counterpart.

use std::collections::BTreeMap;

/// Generates collision-free output filenames within one test.
///
/// Repeats of the same (engine, format) pair are disambiguated with a
/// numeric suffix: the first occurrence gets none, the Nth gets `N - 1`...
/// counted per key. The map must be reset at every test boundary so that
/// identical pairs in different tests produce identical base filenames.
#[derive(Debug, Default)]
pub struct OutputNamer {
    counters: BTreeMap<String, u32>,
}

impl OutputNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the per-test occurrence map. Call at each test boundary.
    pub fn reset(&mut self) {
        self.counters.clear();
    }

    /// `{test}_{engine}{suffix}{disambiguator}.{base}`, where `suffix` is the
    /// format's colon-suffix chain joined with `_` (e.g. `png:gd:cairo` gives
    /// suffix `_gd_cairo` and base `png`).
    pub fn name(&mut self, test_name: &str, engine: &str, format: &str) -> String {
        let mut components = format.split(':');
        let base = components.next().unwrap_or(format);
        let rest: Vec<&str> = components.collect();
        let suffix = if rest.is_empty() {
            String::new()
        } else {
            format!("_{}", rest.join("_"))
        };

        let key = format!("{engine}{suffix}{base}");
        let counter = self.counters.entry(key).or_insert(0);
        let disambiguator = if *counter == 0 {
            *counter = 1;
            String::new()
        } else {
            let d = counter.to_string();
            *counter += 1;
            d
        };

        format!("{test_name}_{engine}{suffix}{disambiguator}.{base}")
    }
}
