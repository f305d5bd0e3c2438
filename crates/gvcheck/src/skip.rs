//! Known-bad (format, platform, build-variant) combinations.
//!
//! These encode fragile CI-environment knowledge as data: each table is an
//! ordered list of `(predicate, reason)` entries consulted once per subtest,
//! before invocation (`EXEC_SKIPS`) or before comparison (`COMPARE_SKIPS`).
//! Adding or retiring an entry never touches the driver's control flow.

use crate::config::{BuildContext, Platform};

/// Everything a skip predicate may look at.
#[derive(Debug)]
pub struct SkipContext<'a> {
    pub test_name: &'a str,
    /// Full format token, e.g. `png:gd`.
    pub format: &'a str,
    /// Format token before the first colon.
    pub base_format: &'a str,
    pub flags: &'a [String],
    pub build: &'a BuildContext,
}

pub struct SkipRule {
    pub reason: &'static str,
    applies: fn(&SkipContext<'_>) -> bool,
}

impl SkipRule {
    pub fn matches(&self, ctx: &SkipContext<'_>) -> bool {
        (self.applies)(ctx)
    }
}

impl std::fmt::Debug for SkipRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipRule")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Returns the first rule matching `ctx`, in table order.
pub fn first_match<'r>(rules: &'r [SkipRule], ctx: &SkipContext<'_>) -> Option<&'r SkipRule> {
    rules.iter().find(|rule| rule.matches(ctx))
}

/// Combinations skipped before the tool under test is invoked.
pub static EXEC_SKIPS: &[SkipRule] = &[
    SkipRule {
        reason: "format png:gd is not supported by CMake builds (#1786)",
        applies: |ctx| ctx.build.build_system_is("cmake") && ctx.format == "png:gd",
    },
    SkipRule {
        reason: "flag -Goverlap=false fails with Windows MSBuild builds that are not \
                 built with the triangulation library (#1269)",
        applies: |ctx| {
            ctx.build.platform == Platform::Windows
                && ctx.build.build_system_is("msbuild")
                && ctx.flags.iter().any(|f| f == "-Goverlap=false")
        },
    },
    SkipRule {
        reason: "the user_shapes shapefile fails with Windows MSBuild Debug builds (#1787)",
        applies: |ctx| {
            ctx.build.platform == Platform::Windows
                && ctx.build.build_system_is("msbuild")
                && ctx.build.configuration_is("Debug")
                && ctx.test_name == "user_shapes"
        },
    },
    SkipRule {
        reason: "PostScript shapefiles fail with Windows builds (#1790)",
        applies: |ctx| {
            ctx.build.platform == Platform::Windows && ctx.test_name == "ps_user_shapes"
        },
    },
];

/// Combinations whose output is produced but not compared.
pub static COMPARE_SKIPS: &[SkipRule] = &[
    SkipRule {
        reason: "the order of clusters in gv or ps output is not stable on Windows (#1789)",
        applies: |ctx| {
            ctx.build.platform == Platform::Windows
                && matches!(ctx.base_format, "ps" | "gv")
                && matches!(ctx.test_name, "clusters" | "compound" | "rootlabel")
        },
    },
    SkipRule {
        reason: "CMake builds on Windows do not contain the diffimg utility (#1788)",
        applies: |ctx| {
            ctx.build.platform == Platform::Windows
                && ctx.build.build_system_is("cmake")
                && ctx.base_format == "png"
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn build(platform: Platform, build_system: Option<&str>, configuration: Option<&str>) -> BuildContext {
        BuildContext {
            platform,
            build_system: build_system.map(str::to_string),
            configuration: configuration.map(str::to_string),
        }
    }

    fn ctx<'a>(
        test_name: &'a str,
        format: &'a str,
        flags: &'a [String],
        build: &'a BuildContext,
    ) -> SkipContext<'a> {
        SkipContext {
            test_name,
            format,
            base_format: format.split(':').next().unwrap_or(format),
            flags,
            build,
        }
    }

    #[test]
    fn cmake_builds_skip_png_gd() {
        let cmake = build(Platform::Linux, Some("cmake"), None);
        let hit = first_match(EXEC_SKIPS, &ctx("shapes", "png:gd", &[], &cmake));
        assert!(hit.is_some_and(|r| r.reason.contains("#1786")));

        let plain = build(Platform::Linux, None, None);
        assert!(first_match(EXEC_SKIPS, &ctx("shapes", "png:gd", &[], &plain)).is_none());
        assert!(first_match(EXEC_SKIPS, &ctx("shapes", "png", &[], &cmake)).is_none());
    }

    #[test]
    fn msbuild_overlap_flag_is_windows_only() {
        let flags = vec!["-Goverlap=false".to_string()];
        let win = build(Platform::Windows, Some("msbuild"), None);
        let hit = first_match(EXEC_SKIPS, &ctx("longflatedge", "ps", &flags, &win));
        assert!(hit.is_some_and(|r| r.reason.contains("#1269")));

        let linux = build(Platform::Linux, Some("msbuild"), None);
        assert!(first_match(EXEC_SKIPS, &ctx("longflatedge", "ps", &flags, &linux)).is_none());
    }

    #[test]
    fn user_shapes_skip_requires_debug_configuration() {
        let debug = build(Platform::Windows, Some("msbuild"), Some("Debug"));
        assert!(first_match(EXEC_SKIPS, &ctx("user_shapes", "png", &[], &debug)).is_some());

        let release = build(Platform::Windows, Some("msbuild"), Some("Release"));
        assert!(first_match(EXEC_SKIPS, &ctx("user_shapes", "png", &[], &release)).is_none());
    }

    #[test]
    fn ps_user_shapes_skips_on_any_windows_build() {
        let win = build(Platform::Windows, None, None);
        assert!(first_match(EXEC_SKIPS, &ctx("ps_user_shapes", "ps", &[], &win)).is_some());
    }

    #[test]
    fn cluster_order_comparison_skip() {
        let win = build(Platform::Windows, None, None);
        for name in ["clusters", "compound", "rootlabel"] {
            assert!(first_match(COMPARE_SKIPS, &ctx(name, "ps", &[], &win)).is_some());
            assert!(first_match(COMPARE_SKIPS, &ctx(name, "gv", &[], &win)).is_some());
            assert!(first_match(COMPARE_SKIPS, &ctx(name, "svg", &[], &win)).is_none());
        }
        let linux = build(Platform::Linux, None, None);
        assert!(first_match(COMPARE_SKIPS, &ctx("clusters", "ps", &[], &linux)).is_none());
    }

    #[test]
    fn cmake_windows_png_comparison_skip_uses_base_format() {
        let win_cmake = build(Platform::Windows, Some("cmake"), None);
        assert!(first_match(COMPARE_SKIPS, &ctx("shapes", "png:gd", &[], &win_cmake)).is_some());
        assert!(first_match(COMPARE_SKIPS, &ctx("shapes", "svg", &[], &win_cmake)).is_none());
    }
}
