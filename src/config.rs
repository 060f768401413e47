use clap::Parser;
use std::path::Path;

mod commandline;
mod defaults;
mod file;
mod primitives;

use commandline::{Args, Output};
use config::Config;
use defaults::Defaults;

pub(crate) use commandline::Operation;
pub(crate) use file::{ApiKey, ConfigFile as Configuration, Media, Repo, Sled, Tracing};
pub(crate) use primitives::{Filesystem, LogFormat, ObjectStorage, Store};

/// The resolved tubely configuration along with the operation requested on the commandline
pub struct TubelyConfiguration {
    pub(crate) config: Configuration,
    pub(crate) operation: Operation,
}

fn layered(
    config_file: Option<&Path>,
    overrides: Option<config::Config>,
) -> color_eyre::Result<Configuration> {
    let config = Config::builder().add_source(config::Config::try_from(&Defaults::default())?);

    let config = if let Some(config_file) = config_file {
        config.add_source(config::File::from(config_file))
    } else {
        config
    };

    let config = config.add_source(
        config::Environment::with_prefix("TUBELY")
            .separator("__")
            .try_parsing(true),
    );

    let config = if let Some(overrides) = overrides {
        config.add_source(overrides)
    } else {
        config
    };

    Ok(config.build()?.try_deserialize()?)
}

pub(crate) fn configure() -> color_eyre::Result<TubelyConfiguration> {
    let Output {
        config_format,
        operation,
        save_to,
        config_file,
    } = Args::parse().into_output();

    let config = layered(
        config_file.as_deref(),
        Some(config::Config::try_from(&config_format)?),
    )?;

    if let Some(save_to) = save_to {
        let output = toml::to_string_pretty(&config)?;
        std::fs::write(save_to, output)?;
    }

    Ok(TubelyConfiguration { config, operation })
}
