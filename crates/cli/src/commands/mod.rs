//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_workload;
pub use validate::run_validate;

use std::path::Path;

use contracts::BufferSettings;

use crate::error::{CliError, Result};

/// Load and validate settings from a file that must exist
fn load_settings(path: &Path) -> Result<BufferSettings> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}
