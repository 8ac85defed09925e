// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for go-test-report.
//!
//! The embedded [default config](ReportConfig::DEFAULT_CONFIG) is always loaded first. A repository
//! can override any of its keys in [`.config/go-test-report.toml`](ReportConfig::CONFIG_PATH), or
//! a different file can be passed in explicitly. Command-line flags are applied on top by the
//! caller.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, IndicatorSizeParseError},
    grouping::{GroupSize, GroupingKind},
    position::PositionErrorPolicy,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use itertools::Itertools;
use serde::Deserialize;
use std::{collections::BTreeSet, fmt, str::FromStr};
use tracing::warn;

/// Overall configuration for go-test-report.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    config_file: Utf8PathBuf,
    inner: ReportConfigDeserialize,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportConfigDeserialize {
    report: ReportSettings,
    events: EventSettings,
    positions: PositionSettings,
}

impl ReportConfig {
    /// The default location of the config relative to the directory go-test-report is run from.
    pub const CONFIG_PATH: &'static str = ".config/go-test-report.toml";

    /// The default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from `config_file`, or if not specified from [`Self::CONFIG_PATH`] under
    /// `dir` if it exists, layered on top of the default config.
    pub fn from_sources(
        dir: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (inner, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            warn!(
                "ignoring unknown configuration keys in {config_file}: {}",
                unknown.iter().join(", "),
            );
        }

        Ok(Self { config_file, inner })
    }

    /// Returns the default config.
    pub fn default_config() -> Self {
        let (inner, _) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");
        Self {
            config_file: Utf8PathBuf::from("<default config>"),
            inner,
        }
    }

    /// Returns the path the repository config was (or would have been) read from.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the `[report]` settings.
    pub fn report(&self) -> &ReportSettings {
        &self.inner.report
    }

    /// Returns the `[events]` settings.
    pub fn events(&self) -> &EventSettings {
        &self.inner.events
    }

    /// Returns the `[positions]` settings.
    pub fn positions(&self) -> &PositionSettings {
        &self.inner.positions
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ReportConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ReportConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // serde_path_to_error already names the key.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// The `[report]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportSettings {
    /// The report title.
    pub title: String,

    /// The size of each group indicator.
    pub indicator_size: IndicatorSize,

    /// The number of tests per group in fixed-size grouping.
    pub group_size: GroupSize,

    /// How tests are grouped.
    pub grouping: GroupingKind,

    /// The HTML report file.
    pub output: Utf8PathBuf,

    /// An optional JUnit XML file.
    #[serde(default)]
    pub junit: Option<Utf8PathBuf>,
}

/// The `[events]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EventSettings {
    /// The path segment marking parallel subtests.
    pub parallel_marker: String,
}

/// The `[positions]` section.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PositionSettings {
    /// Whether to look up source positions.
    pub enabled: bool,

    /// What to do when a lookup fails.
    pub on_error: PositionErrorPolicy,
}

/// The pixel size of a group indicator in the report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndicatorSize {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,
}

impl IndicatorSize {
    /// Returns the width as a CSS length.
    pub fn css_width(&self) -> String {
        format!("{}px", self.width)
    }

    /// Returns the height as a CSS length.
    pub fn css_height(&self) -> String {
        format!("{}px", self.height)
    }
}

impl FromStr for IndicatorSize {
    type Err = IndicatorSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let parse = |component: &str| {
            component
                .parse::<u32>()
                .map_err(|err| IndicatorSizeParseError::new(s, format!("`{component}`: {err}")))
        };

        if lower.matches('x').count() > 1 {
            return Err(IndicatorSizeParseError::new(
                s,
                "only one `x` is allowed when specifying width and height",
            ));
        }
        match lower.split_once('x') {
            Some((width, height)) => Ok(Self {
                width: parse(width)?,
                height: parse(height)?,
            }),
            None => {
                let size = parse(&lower)?;
                Ok(Self {
                    width: size,
                    height: size,
                })
            }
        }
    }
}

impl fmt::Display for IndicatorSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == self.height {
            write!(f, "{}", self.width)
        } else {
            write!(f, "{}x{}", self.width, self.height)
        }
    }
}

impl<'de> Deserialize<'de> for IndicatorSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = IndicatorSize;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an integer or a string of the form \"<width>x<height>\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match u32::try_from(v) {
                    Ok(size) => Ok(IndicatorSize {
                        width: size,
                        height: size,
                    }),
                    Err(_) => Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Signed(v),
                        &self,
                    )),
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match u32::try_from(v) {
                    Ok(size) => Ok(IndicatorSize {
                        width: size,
                        height: size,
                    }),
                    Err(_) => Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Unsigned(v),
                        &self,
                    )),
                }
            }
        }

        deserializer.deserialize_any(V)
    }
}
