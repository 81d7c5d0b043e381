//! Loading the scraper's JSON artifact into the profile store.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::domain::profile::NewProfile;
use crate::processing::{EngineError, IngestStats};
use crate::repository::ProfileWriter;

/// One entry of the scraped dataset artifact.
#[derive(Debug, Deserialize)]
pub struct DatasetProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub office: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub areas: Vec<String>,
}

fn dataset_error(path: &Path, reason: impl ToString) -> EngineError {
    EngineError::Dataset {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Read and parse the dataset artifact at `path`.
pub fn load_dataset(path: &Path) -> Result<Vec<DatasetProfile>, EngineError> {
    let raw = fs::read_to_string(path).map_err(|e| dataset_error(path, e))?;
    serde_json::from_str(&raw).map_err(|e| dataset_error(path, e))
}

/// Drop a website link that does not parse as an absolute URL.
fn validate_website(
    profile_id: &str,
    website: Option<String>,
    stats: &mut IngestStats,
) -> Option<String> {
    let website = website?;
    match Url::parse(&website) {
        Ok(_) => Some(website),
        Err(e) => {
            stats.dropped_invalid_website += 1;
            log::warn!("Dropping invalid website {website:?} for profile {profile_id}: {e}");
            None
        }
    }
}

/// Convert dataset entries into insertable profiles, applying skip rules.
///
/// Entries with an empty description carry no matching signal and are
/// skipped; duplicate ids violate the stable-identifier invariant and the
/// first occurrence wins.
pub fn prepare_profiles(entries: Vec<DatasetProfile>) -> (Vec<NewProfile>, IngestStats) {
    let mut stats = IngestStats {
        read: entries.len(),
        ..Default::default()
    };
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut profiles = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.description.trim().is_empty() {
            stats.skipped_empty_description += 1;
            log::warn!("Skipping profile {} with empty description", entry.id);
            continue;
        }
        if !seen_ids.insert(entry.id.clone()) {
            stats.skipped_duplicate_id += 1;
            log::warn!("Skipping duplicate profile id {}", entry.id);
            continue;
        }

        let website = validate_website(&entry.id, entry.website, &mut stats);

        profiles.push(NewProfile {
            id: entry.id,
            name: entry.name,
            title: entry.title,
            email: entry.email,
            website,
            office: entry.office,
            description: entry.description.trim().to_string(),
            areas: entry.areas,
        });
    }

    stats.ingested = profiles.len();
    (profiles, stats)
}

/// Replace the stored profile set with the dataset at `path`.
pub fn ingest_dataset<R>(path: &Path, repo: &R) -> Result<IngestStats, EngineError>
where
    R: ProfileWriter,
{
    let entries = load_dataset(path)?;
    let (profiles, stats) = prepare_profiles(entries);
    repo.replace_profiles(&profiles)?;
    Ok(stats)
}
