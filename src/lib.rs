pub mod api;
pub mod config;
pub mod core_state;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServerConfig};
use crate::core_state::CoreState;
use crate::pipeline::{ArtifactSet, DiseaseTable, PipelineError};

/// Anything that stops the service from coming up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("artifacts: {0}")]
    Artifacts(#[from] PipelineError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// Load everything, then serve until Ctrl-C.
///
/// Artifacts are loaded before the listener is bound, so the service never
/// accepts traffic without a complete model set.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        artifacts = %config.artifact_dir.display(),
        "configuration loaded"
    );

    let artifacts = ArtifactSet::load(&config.artifact_dir)?;
    let diseases = DiseaseTable::load(&config.disease_table)?;
    let core = Arc::new(CoreState::new(artifacts, diseases));

    api::serve_until_ctrl_c(core, &config).await?;
    Ok(())
}
