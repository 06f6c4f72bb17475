//! Delete downloaded temp clips.

use std::path::PathBuf;

use clipreel_assembly_engine::reclaim_temp_dir;
use clipreel_common::config::AppConfig;

pub fn run(config: &AppConfig, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = dir.unwrap_or_else(|| config.paths.temp_dir.clone());
    let report = reclaim_temp_dir(&dir);

    if report.missing {
        anyhow::bail!("Directory does not exist: {}", dir.display());
    }
    println!("Deleted {} file(s) from {}", report.deleted, dir.display());
    if !report.is_success() {
        anyhow::bail!("{} file(s) could not be deleted", report.failed);
    }
    Ok(())
}
