//! Tracked resource list

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{SchedulerError, SchedulerResult};
use crate::models::Resource;

/// On-disk shape of the tracked sites file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitesFile {
    #[serde(default)]
    pub sites: Vec<String>,
}

/// Read the tracked list, dropping blank entries and exact duplicates
pub fn load_sites(path: &Path) -> SchedulerResult<Vec<Resource>> {
    let content = std::fs::read_to_string(path).map_err(|e| SchedulerError::SitesUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let file: SitesFile =
        serde_json::from_str(&content).map_err(|e| SchedulerError::SitesMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut resources: Vec<Resource> = Vec::with_capacity(file.sites.len());
    for site in &file.sites {
        let resource = Resource::new(site);
        if !resource.as_str().is_empty() && !resources.contains(&resource) {
            resources.push(resource);
        }
    }
    Ok(resources)
}
