// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test identities and name normalization.

use serde::Serialize;
use std::{borrow::Cow, fmt};

/// The default marker segment that test fixtures insert into the names of parallel subtests.
pub const DEFAULT_PARALLEL_MARKER: &str = "__parallel__";

/// Normalizes test names by removing the parallel-subtest marker segment.
///
/// Some test fixtures run each subtest twice, once sequentially and once in parallel, and tag the
/// parallel run with a synthetic path segment: `TestFoo/__parallel__/Case`. Removing that segment
/// collapses both runs onto the same identity (`TestFoo/Case`).
///
/// Only whole segments are removed, and never the first one, so a top-level test that happens to
/// be named like the marker is left alone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestNameFilter {
    marker: String,
}

impl TestNameFilter {
    /// Creates a new filter for the given marker.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Returns the marker this filter removes.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Normalizes a test name.
    pub fn filter<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if self.marker.is_empty() {
            return Cow::Borrowed(name);
        }

        let mut segments = name.split('/');
        let Some(first) = segments.next() else {
            return Cow::Borrowed(name);
        };
        if !segments.clone().any(|segment| segment == self.marker) {
            return Cow::Borrowed(name);
        }

        let mut filtered = String::with_capacity(name.len());
        filtered.push_str(first);
        for segment in segments.filter(|segment| *segment != self.marker) {
            filtered.push('/');
            filtered.push_str(segment);
        }
        Cow::Owned(filtered)
    }
}

impl Default for TestNameFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLEL_MARKER)
    }
}

/// The unique key of a test: its package and its normalized name.
///
/// Ordering is by package, then name.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TestId {
    /// The package import path.
    pub package: String,

    /// The normalized test name. Subtests are separated from their parents by `/`.
    pub name: String,
}

impl TestId {
    /// Creates a new identity.
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Returns true if this is a subtest.
    pub fn is_subtest(&self) -> bool {
        self.name.contains('/')
    }

    /// Returns the name of the top-level test function this test belongs to.
    pub fn function_name(&self) -> &str {
        function_name(&self.name)
    }

    /// Returns true if `other` is nested (at any depth) under this test.
    pub fn is_ancestor_of(&self, other: &TestId) -> bool {
        self.package == other.package
            && other
                .name
                .strip_prefix(self.name.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// Returns the top-level function of a (possibly titled) test name.
///
/// `TestFoo/Case` and `TestFoo(login flow)` both map to `TestFoo`.
pub(crate) fn function_name(name: &str) -> &str {
    let top = name.split('/').next().unwrap_or(name);
    match top.find('(') {
        Some(idx) => &top[..idx],
        None => top,
    }
}
