// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Looking up where test functions are defined.
//!
//! Positions are cosmetic. The lookup is a line-based scan for `func` declarations in a package's
//! test files, not a parse, and a missing entry simply means the position is unknown.

use crate::{aggregator::TestStatus, errors::PositionLookupError};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::LazyLock};
use tracing::{debug, warn};

/// The location of a test function in its source file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePosition {
    /// The file name, without its directory.
    pub file_name: String,

    /// The 1-based line number.
    pub line: usize,

    /// The 1-based column number.
    pub column: usize,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.line, self.column)
    }
}

/// Function name to position, for one package.
pub type PackagePositions = BTreeMap<String, SourcePosition>;

/// Package to positions.
pub type PositionMap = BTreeMap<String, PackagePositions>;

/// Supplies source positions for the test functions in a package.
pub trait PositionResolver {
    /// Looks up the positions of every function in the package's test files.
    fn resolve(&self, package: &str) -> Result<PackagePositions, PositionLookupError>;
}

/// What to do when looking up positions for a package fails.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum PositionErrorPolicy {
    /// Abort the run.
    Fail,

    /// Log a warning and leave positions for that package unknown.
    #[default]
    Warn,
}

/// Resolves positions using `go list`.
#[derive(Clone, Debug)]
pub struct GoListResolver {
    go: String,
    cwd: Option<Utf8PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListPackage {
    dir: Utf8PathBuf,
    #[serde(default)]
    test_go_files: Vec<String>,
}

impl GoListResolver {
    /// Creates a resolver that runs `go` from `PATH` in the current directory.
    pub fn new() -> Self {
        Self {
            go: "go".to_owned(),
            cwd: None,
        }
    }

    /// Uses a different `go` binary.
    pub fn with_go(mut self, go: impl Into<String>) -> Self {
        self.go = go.into();
        self
    }

    /// Runs `go list` from `cwd`.
    pub fn with_cwd(mut self, cwd: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    fn list(&self, package: &str) -> Result<GoListPackage, PositionLookupError> {
        let args = ["list", "-json", package];
        let command = format!("{} {}", self.go, args.join(" "));

        let mut expression = duct::cmd(self.go.as_str(), args)
            .stdin_null()
            .stdout_capture()
            .stderr_capture()
            .unchecked();
        if let Some(cwd) = &self.cwd {
            expression = expression.dir(cwd.as_std_path());
        }

        let output = expression.run().map_err(|err| PositionLookupError::Exec {
            package: package.to_owned(),
            command: command.clone(),
            err,
        })?;
        if !output.status.success() {
            return Err(PositionLookupError::CommandFailed {
                package: package.to_owned(),
                command,
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|err| PositionLookupError::Parse {
            package: package.to_owned(),
            err,
        })
    }
}

impl Default for GoListResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionResolver for GoListResolver {
    fn resolve(&self, package: &str) -> Result<PackagePositions, PositionLookupError> {
        let listing = self.list(package)?;
        let mut positions = PackagePositions::new();
        for file in &listing.test_go_files {
            let path = listing.dir.join(file);
            let source =
                std::fs::read_to_string(&path).map_err(|err| PositionLookupError::ReadSource {
                    package: package.to_owned(),
                    path: path.clone(),
                    err,
                })?;
            scan_functions(&path, &source, &mut positions);
        }
        debug!(
            "found {} functions in {} test files of {package}",
            positions.len(),
            listing.test_go_files.len(),
        );
        Ok(positions)
    }
}

static FUNC_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^func\s+(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*[\[(]")
        .expect("function declaration regex is valid")
});

/// Records the position of every top-level function declared in `source`.
///
/// Later declarations of the same name overwrite earlier ones.
pub fn scan_functions(path: &Utf8Path, source: &str, positions: &mut PackagePositions) {
    let file_name = path.file_name().unwrap_or(path.as_str());
    for (idx, line) in source.lines().enumerate() {
        if let Some(captures) = FUNC_DECL.captures(line) {
            positions.insert(
                captures[1].to_owned(),
                SourcePosition {
                    file_name: file_name.to_owned(),
                    line: idx + 1,
                    column: 1,
                },
            );
        }
    }
}

/// Looks up positions for each package in order, one at a time.
pub fn resolve_positions<'a>(
    resolver: &dyn PositionResolver,
    packages: impl IntoIterator<Item = &'a str>,
    policy: PositionErrorPolicy,
) -> Result<PositionMap, PositionLookupError> {
    let mut map = PositionMap::new();
    for package in packages {
        match resolver.resolve(package) {
            Ok(positions) => {
                map.insert(package.to_owned(), positions);
            }
            Err(err) => match policy {
                PositionErrorPolicy::Fail => return Err(err),
                PositionErrorPolicy::Warn => {
                    warn!("source positions unknown for package {package}: {err}");
                }
            },
        }
    }
    Ok(map)
}

/// Fills in [`TestStatus::position`] from `positions`.
///
/// Subtests get the position of their top-level function.
pub fn apply_positions<'a>(
    tests: impl IntoIterator<Item = &'a mut TestStatus>,
    positions: &PositionMap,
) {
    for status in tests {
        status.position = positions
            .get(&status.package)
            .and_then(|package| package.get(status.function_name()))
            .cloned();
    }
}
