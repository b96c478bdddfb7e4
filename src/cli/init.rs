use std::path::Path;

use crate::error::{Result, TallyError};
use crate::settings::{save_settings, settings_path, Settings};

pub fn run(config: Option<&Path>, force: bool) -> Result<()> {
    let path = config.map(Path::to_path_buf).unwrap_or_else(settings_path);
    if path.exists() && !force {
        return Err(TallyError::Settings(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    save_settings(&path, &Settings::default())?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}
