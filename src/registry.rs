use std::{collections::BTreeMap, sync::RwLock};

use crate::error::{Error, Result};

/// Outcome of probing the job registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobLookup {
    Found(String),
    NotFound,
}

/// Source of truth for which jobs (hunts) exist.
///
/// An `Err` means the registry could not answer, which callers must keep
/// apart from [`JobLookup::NotFound`].
pub trait JobRegistry: Send + Sync {
    fn resolve_job(&self, job_id: &str) -> Result<JobLookup>;
}

/// Whether a raw query string has the shape of a hunt id: `H:` followed by
/// 6 to 16 hex digits.
///
/// ```
/// use fleetseek::registry::looks_like_hunt_id;
///
/// assert!(looks_like_hunt_id("H:12345678"));
/// assert!(looks_like_hunt_id("H:1a2B3c4D"));
/// assert!(!looks_like_hunt_id("H:xyz"));
/// assert!(!looks_like_hunt_id("host:H:12345678"));
/// ```
pub fn looks_like_hunt_id(raw: &str) -> bool {
    raw.strip_prefix("H:").is_some_and(|rest| {
        (6..=16).contains(&rest.len())
            && rest.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// Job registry held in memory, mostly for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryJobRegistry {
    jobs: RwLock<BTreeMap<String, String>>,
}

impl MemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job_id: &str, description: &str) -> Result<()> {
        self.jobs
            .write()
            .map_err(|_| Error::Poisoned("job registry"))?
            .insert(job_id.to_string(), description.to_string());
        Ok(())
    }

    pub fn remove(&self, job_id: &str) -> Result<bool> {
        Ok(self
            .jobs
            .write()
            .map_err(|_| Error::Poisoned("job registry"))?
            .remove(job_id)
            .is_some())
    }
}

impl JobRegistry for MemoryJobRegistry {
    fn resolve_job(&self, job_id: &str) -> Result<JobLookup> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| Error::Registry("job registry lock poisoned".into()))?;
        Ok(match jobs.get_key_value(job_id) {
            Some((id, _)) => JobLookup::Found(id.clone()),
            None => JobLookup::NotFound,
        })
    }
}
