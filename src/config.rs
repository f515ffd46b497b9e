use std::path::Path;

use clap::Parser;

mod commandline;
mod defaults;
mod file;
mod primitives;

use commandline::{Args, Output};
use config::Config;
use defaults::Defaults;

pub(crate) use file::{ConfigFile as Configuration, Repo, Sled, Store, Tracing};
pub(crate) use primitives::LogFormat;

#[cfg(test)]
pub(crate) use primitives::UrlStyle;

pub(crate) fn configure_without_clap<P: AsRef<Path>, T: serde::Serialize, Q: AsRef<Path>>(
    source: T,
    config_file: Option<P>,
    save_to: Option<Q>,
) -> color_eyre::Result<Configuration> {
    let config = Config::builder().add_source(config::Config::try_from(&Defaults::default())?);

    let config = if let Some(config_file) = config_file {
        config.add_source(config::File::from(config_file.as_ref()))
    } else {
        config
    };

    let built = config
        .add_source(config::Environment::with_prefix("TUBELY").separator("__"))
        .add_source(config::Config::try_from(&source)?)
        .build()?;

    let config: Configuration = built.try_deserialize()?;

    if let Some(save_to) = save_to {
        let output = toml::to_string_pretty(&config)?;
        std::fs::write(save_to, output)?;
    }

    Ok(config)
}

pub(crate) fn configure() -> color_eyre::Result<Configuration> {
    let Output {
        config_format,
        save_to,
        config_file,
    } = Args::parse().into_output();

    configure_without_clap(config_format, config_file, save_to)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{configure_without_clap, Repo, UrlStyle};

    #[test]
    fn defaults_deserialize() {
        let config =
            configure_without_clap(serde_json::json!({}), None::<PathBuf>, None::<PathBuf>)
                .expect("Built configuration");

        assert_eq!(config.store.url_style, UrlStyle::Signed);
        assert_eq!(config.store.signature_duration, 3600);
        assert_eq!(config.media.video_limit(), 1024 * 1024 * 1024);
        assert_eq!(config.media.image_limit(), 10 * 1024 * 1024);
        assert_eq!(config.server.user_header, "X-Authenticated-User");
        assert!(config.metrics.prometheus_address.is_none());
        assert!(matches!(config.repo, Repo::Sled(_)));
    }

    #[test]
    fn source_overrides_defaults() {
        let config = configure_without_clap(
            serde_json::json!({
                "store": {
                    "bucket_name": "my-videos",
                    "url_style": "direct",
                    "region": "eu-west-1",
                },
                "media": { "process_timeout": 5 },
            }),
            None::<PathBuf>,
            None::<PathBuf>,
        )
        .expect("Built configuration");

        assert_eq!(config.store.bucket_name, "my-videos");
        assert_eq!(config.media.process_timeout, 5);
        assert!(matches!(
            config.store.playback(),
            Ok(crate::blob_address::Playback::Direct { region }) if region == "eu-west-1"
        ));
    }

    #[test]
    fn save_to_writes_toml() {
        let dir = tempfile::tempdir().expect("Created tempdir");
        let save_to = dir.path().join("tubely.toml");

        configure_without_clap(
            serde_json::json!({ "server": { "api_key": "secret" } }),
            None::<PathBuf>,
            Some(&save_to),
        )
        .expect("Built configuration");

        let saved = std::fs::read_to_string(&save_to).expect("Read saved config");
        assert!(saved.contains("api_key = \"secret\""));

        let reloaded =
            configure_without_clap(serde_json::json!({}), Some(&save_to), None::<PathBuf>)
                .expect("Reloaded configuration");
        assert_eq!(reloaded.server.api_key.as_deref(), Some("secret"));
    }
}
