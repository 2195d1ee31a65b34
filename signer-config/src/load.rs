use std::io;
use std::path::{Path, PathBuf};

use rust_cli_config::{ConfigError, File};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory holding the configuration layers, relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Extensions tried, in order, for every layer.
const LAYER_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Environment variables starting with `APP_` override file values.
const ENV_PREFIX: &str = "APP";

/// `APP_SIGNER__CHEAP_LATENCY_MS` sets `signer.cheap_latency_ms`.
const ENV_KEY_SEPARATOR: &str = "__";

/// `APP_PIPELINE__INPUTS=0,1,2` sets `pipeline.inputs`.
const ENV_LIST_SEPARATOR: &str = ",";

/// Configuration structure loadable through [`load_config`].
pub trait Config: DeserializeOwned {
    /// Keys whose environment overrides are split into lists.
    const ENV_LIST_KEYS: &'static [&'static str];
}

/// A file-backed configuration layer.
#[derive(Debug, Clone, Copy)]
enum Layer {
    Base,
    Environment(Environment),
}

impl Layer {
    fn file_stem(self) -> &'static str {
        match self {
            Layer::Base => "base",
            Layer::Environment(environment) => environment.as_str(),
        }
    }

    /// Finds the first existing file for this layer in `directory`.
    fn locate(self, directory: &Path) -> Result<PathBuf, LoadConfigError> {
        let candidates: Vec<PathBuf> = LAYER_EXTENSIONS
            .iter()
            .map(|extension| directory.join(format!("{}.{extension}", self.file_stem())))
            .collect();

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Ok(path.clone()),
            None => Err(LoadConfigError::MissingLayer {
                layer: self.file_stem(),
                directory: directory.to_path_buf(),
                candidates,
            }),
        }
    }

    /// Parses this layer on its own so a syntax error names the offending file.
    fn read(self, directory: &Path) -> Result<rust_cli_config::Config, LoadConfigError> {
        let path = self.locate(directory)?;

        rust_cli_config::Config::builder()
            .add_source(File::from(path.as_path()))
            .build()
            .map_err(|source| LoadConfigError::InvalidLayer {
                layer: self.file_stem(),
                path,
                source,
            })
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    #[error("configuration directory `{0}` does not exist")]
    MissingDirectory(PathBuf),

    #[error("no `{layer}` configuration file in `{}` (tried {})", .directory.display(), display_paths(.candidates))]
    MissingLayer {
        layer: &'static str,
        directory: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("invalid `{layer}` configuration file `{}`: {source}", .path.display())]
    InvalidLayer {
        layer: &'static str,
        path: PathBuf,
        source: ConfigError,
    },

    #[error("failed to merge configuration: {0}")]
    Merge(#[source] ConfigError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Loads `T` from `./configuration` for the environment named by `APP_ENVIRONMENT`.
pub fn load_config<T: Config>() -> Result<T, LoadConfigError> {
    let directory = std::env::current_dir()
        .map_err(LoadConfigError::CurrentDir)?
        .join(CONFIGURATION_DIR);

    load_config_from(&directory, Environment::load()?)
}

/// Loads `T` from `directory`.
///
/// The base layer, then the `environment` layer, then `APP_` environment variables, each
/// overriding the previous one. Both file layers must exist.
pub fn load_config_from<T: Config>(
    directory: &Path,
    environment: Environment,
) -> Result<T, LoadConfigError> {
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingDirectory(directory.to_path_buf()));
    }

    let base = Layer::Base.read(directory)?;
    let overrides = Layer::Environment(environment).read(directory)?;

    let mut env_overrides = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_KEY_SEPARATOR)
        .try_parsing(true);
    // With a list separator but no keys, every variable would be split.
    if !T::ENV_LIST_KEYS.is_empty() {
        env_overrides = T::ENV_LIST_KEYS
            .iter()
            .fold(env_overrides.list_separator(ENV_LIST_SEPARATOR), |source, key| {
                source.with_list_parse_key(key)
            });
    }

    rust_cli_config::Config::builder()
        .add_source(base)
        .add_source(overrides)
        .add_source(env_overrides)
        .build()
        .and_then(|settings| settings.try_deserialize::<T>())
        .map_err(LoadConfigError::Merge)
}
