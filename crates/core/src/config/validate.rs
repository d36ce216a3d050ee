use crate::fs::{same_filesystem, FsRouter};

use super::{types::Config, ConfigError};

/// Validate configuration consistency:
/// - exactly one of `remove_after_copy` / `directories.complete`
/// - exactly one of `directories.destination` / `scripts.destination`
/// - inbound, work, error (and complete) on one filesystem
/// - destination and staging on one filesystem
/// - all configured directories pairwise distinct
/// - at least one worker
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let dirs = &config.directories;

    if config.transfer.workers == 0 {
        return Err(ConfigError::ValidationError(
            "transfer.workers must be at least 1".to_string(),
        ));
    }

    if config.transfer.remove_after_copy && dirs.complete.is_some() {
        return Err(ConfigError::ValidationError(
            "transfer.remove_after_copy and directories.complete are mutually exclusive".to_string(),
        ));
    }
    if !config.transfer.remove_after_copy && dirs.complete.is_none() {
        return Err(ConfigError::ValidationError(
            "either transfer.remove_after_copy or directories.complete must be set".to_string(),
        ));
    }

    match (&dirs.destination, &config.scripts.destination) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::ValidationError(
                "directories.destination and scripts.destination are mutually exclusive"
                    .to_string(),
            ))
        }
        (None, None) => {
            return Err(ConfigError::ValidationError(
                "either directories.destination or scripts.destination must be set".to_string(),
            ))
        }
        _ => {}
    }

    let mut source_side = vec![("work", &dirs.work), ("error", &dirs.error)];
    if let Some(complete) = &dirs.complete {
        source_side.push(("complete", complete));
    }
    for (name, uri) in source_side {
        if !same_filesystem(&dirs.inbound, uri) {
            return Err(ConfigError::ValidationError(format!(
                "directories.{name} ({uri}) must share a filesystem with directories.inbound ({})",
                dirs.inbound
            )));
        }
    }
    if let Some(destination) = &dirs.destination {
        if !same_filesystem(destination, &dirs.staging) {
            return Err(ConfigError::ValidationError(format!(
                "directories.staging ({}) must share a filesystem with directories.destination ({destination})",
                dirs.staging
            )));
        }
    }

    let mut configured: Vec<String> = [&dirs.inbound, &dirs.work, &dirs.error, &dirs.staging]
        .iter()
        .map(|u| u.to_string())
        .collect();
    configured.extend(dirs.complete.iter().map(|u| u.to_string()));
    configured.extend(dirs.destination.iter().map(|u| u.to_string()));
    let mut sorted = configured.clone();
    sorted.sort();
    sorted.dedup();
    if sorted.len() != configured.len() {
        return Err(ConfigError::ValidationError(
            "configured directories must be pairwise distinct".to_string(),
        ));
    }

    Ok(())
}

/// Prepare the directory layout: inbound must already exist as a
/// directory; work, error, staging and complete are created if absent.
pub async fn prepare_directories(config: &Config, router: &FsRouter) -> Result<(), ConfigError> {
    let dirs = &config.directories;

    let fs = router
        .resolve(&dirs.inbound)
        .map_err(|e| ConfigError::DirectorySetup(e.to_string()))?;
    match fs.stat(&dirs.inbound).await {
        Ok(meta) if meta.is_dir => {}
        Ok(_) => {
            return Err(ConfigError::DirectorySetup(format!(
                "directories.inbound ({}) is not a directory",
                dirs.inbound
            )))
        }
        Err(e) => {
            return Err(ConfigError::DirectorySetup(format!(
                "directories.inbound ({}) is not accessible: {e}",
                dirs.inbound
            )))
        }
    }

    let mut created = vec![&dirs.work, &dirs.error, &dirs.staging];
    created.extend(dirs.complete.iter());
    for dir in created {
        let fs = router
            .resolve(dir)
            .map_err(|e| ConfigError::DirectorySetup(e.to_string()))?;
        fs.mkdir_all(dir)
            .await
            .map_err(|e| ConfigError::DirectorySetup(format!("cannot create {dir}: {e}")))?;
    }
    Ok(())
}
