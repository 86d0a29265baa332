use std::{collections::BTreeSet, fmt, str::FromStr, sync::Arc};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    client::ClientRecord,
    error::{Error, Result},
    fleet_db::FleetDb,
    index::ClientIndex,
    query,
    registry::{self, JobLookup, JobRegistry},
    snapshot::ClientSource,
    tokenizer::Category,
};

/// What a search box query resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The query named an existing job; show that instead of clients.
    Job(String),
    Clients(BTreeSet<String>),
}

/// How to treat a job registry that cannot answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistryPolicy {
    /// Log the failure and run the client search anyway.
    #[default]
    FailClosed,
    /// Return the registry error to the caller.
    Propagate,
}

impl RegistryPolicy {
    pub const SETTING_KEY: &'static str = "registry_policy";

    pub fn as_str(self) -> &'static str {
        match self {
            RegistryPolicy::FailClosed => "fail-closed",
            RegistryPolicy::Propagate => "propagate",
        }
    }
}

impl FromStr for RegistryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fail-closed" => Ok(RegistryPolicy::FailClosed),
            "propagate" => Ok(RegistryPolicy::Propagate),
            other => Err(Error::Config(format!(
                "unknown registry policy '{other}' (expected fail-closed or propagate)"
            ))),
        }
    }
}

impl fmt::Display for RegistryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type JobPattern = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Single entry point for client search: job lookup first, then the index.
pub struct SearchService {
    index: ClientIndex,
    registry: Arc<dyn JobRegistry>,
    job_pattern: JobPattern,
    policy: RegistryPolicy,
}

impl SearchService {
    /// An empty index backed by `registry`, using the default hunt id shape.
    pub fn new(registry: Arc<dyn JobRegistry>) -> Self {
        Self {
            index: ClientIndex::new(),
            registry,
            job_pattern: Box::new(registry::looks_like_hunt_id),
            policy: RegistryPolicy::default(),
        }
    }

    /// Seed the index from a full snapshot.
    pub fn from_source<S: ClientSource + ?Sized>(
        source: &S,
        registry: Arc<dyn JobRegistry>,
    ) -> Result<Self> {
        let service = Self::new(registry);
        service.rebuild(source)?;
        Ok(service)
    }

    /// Decide which raw strings are worth probing the registry with.
    pub fn with_job_pattern<F>(mut self, pattern: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.job_pattern = Box::new(pattern);
        self
    }

    pub fn with_policy(mut self, policy: RegistryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RegistryPolicy {
        self.policy
    }

    pub fn index(&self) -> &ClientIndex {
        &self.index
    }

    /// Replace the whole index with one built from `source`. This also
    /// resets the label vocabulary.
    pub fn rebuild<S: ClientSource + ?Sized>(&self, source: &S) -> Result<()> {
        let records = source.clients()?;
        self.index.replace_with(ClientIndex::build(&records))
    }

    pub fn add_client(&self, record: &ClientRecord) -> Result<()> {
        self.index.add_client(record)
    }

    pub fn remove_client(&self, client_id: &str) -> Result<bool> {
        self.index.remove_client(client_id)
    }

    /// Resolve a search box query.
    ///
    /// A string that names an existing job always resolves to that job,
    /// even when it also matches client tokens.
    pub fn search(&self, raw: &str) -> Result<SearchOutcome> {
        let raw = raw.trim();

        if (self.job_pattern)(raw) {
            match self.registry.resolve_job(raw) {
                Ok(JobLookup::Found(job_id)) => {
                    debug!(%job_id, "query resolved to job");
                    return Ok(SearchOutcome::Job(job_id));
                }
                Ok(JobLookup::NotFound) => {
                    debug!(query = raw, "no such job, searching clients");
                }
                Err(e) => match self.policy {
                    RegistryPolicy::FailClosed => {
                        warn!(query = raw, error = %e, "job registry lookup failed, searching clients");
                    }
                    RegistryPolicy::Propagate => return Err(e),
                },
            }
        }

        let parsed = query::parse(raw);
        let ids = self.index.lookup_all(&parsed)?;
        debug!(query = %parsed, matches = ids.len(), "client search");
        Ok(SearchOutcome::Clients(ids))
    }

    /// Label completions for the word being typed, rendered as
    /// `label:<value>`.
    ///
    /// Only the last whitespace-separated word counts, and a leading
    /// `label:` on it (in any case) is ignored. Nothing is offered for an empty word.
    pub fn complete_label(&self, raw: &str) -> Result<Vec<String>> {
        if raw.ends_with(char::is_whitespace) {
            return Ok(Vec::new());
        }
        let word = raw.split_whitespace().next_back().unwrap_or("");
        let prefix = match word.split_once(':') {
            Some((head, rest))
                if Category::from_query_prefix(head) == Some(Category::Label) =>
            {
                rest
            }
            _ => word,
        };
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .index
            .label_prefix_matches(prefix)?
            .into_iter()
            .map(|label| format!("label:{label}"))
            .collect())
    }
}

impl fmt::Debug for SearchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchService")
            .field("index", &self.index)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Build a service over the clients and hunts stored in `db`, honouring the
/// `registry_policy` setting.
pub fn open_service(db: &Arc<FleetDb>) -> Result<SearchService> {
    let policy: RegistryPolicy = db
        .get_setting_or(
            RegistryPolicy::SETTING_KEY,
            RegistryPolicy::default().as_str(),
        )?
        .parse()?;
    let registry: Arc<dyn JobRegistry> = db.clone();
    let service = SearchService::from_source(db.as_ref(), registry)?
        .with_policy(policy);
    Ok(service)
}

/// Display row for one matching client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub client_id: String,
    pub hostname: String,
    pub fqdn: String,
    pub labels: Vec<String>,
}

impl From<ClientRecord> for ClientSummary {
    fn from(record: ClientRecord) -> Self {
        Self {
            client_id: record.client_id,
            hostname: record.hostname,
            fqdn: record.fqdn,
            labels: record.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

/// Search outcome joined with stored client details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    pub query: String,
    pub kind: &'static str,
    pub job_id: Option<String>,
    pub result_count: usize,
    pub clients: Vec<ClientSummary>,
}

/// Join an outcome with the records in `db`. Ids without a stored record
/// are still reported, with empty details.
pub fn build_report(
    query: &str,
    outcome: SearchOutcome,
    db: &FleetDb,
) -> Result<SearchReport> {
    match outcome {
        SearchOutcome::Job(job_id) => Ok(SearchReport {
            query: query.to_string(),
            kind: "job",
            job_id: Some(job_id),
            result_count: 0,
            clients: Vec::new(),
        }),
        SearchOutcome::Clients(ids) => {
            let mut clients = Vec::with_capacity(ids.len());
            for id in ids {
                let record = db
                    .get_client(&id)?
                    .unwrap_or_else(|| ClientRecord::new(&id));
                clients.push(ClientSummary::from(record));
            }
            Ok(SearchReport {
                query: query.to_string(),
                kind: "clients",
                job_id: None,
                result_count: clients.len(),
                clients,
            })
        }
    }
}

/// Format a report for human-readable terminal output.
pub fn format_human(report: &SearchReport) {
    if let Some(job_id) = &report.job_id {
        println!("Hunt {job_id}");
        return;
    }

    if report.clients.is_empty() {
        println!("No clients found.");
        return;
    }

    for c in &report.clients {
        print!("{}\t{}", c.client_id, c.hostname);
        if !c.fqdn.is_empty() && c.fqdn != c.hostname {
            print!("\t{}", c.fqdn);
        }
        if !c.labels.is_empty() {
            print!("\t[{}]", c.labels.join(", "));
        }
        println!();
    }
    println!("\n{} client(s)", report.clients.len());
}

/// Format a report as JSON output.
pub fn format_json(report: &SearchReport) -> Result<()> {
    println!("{}", serde_json::to_string(report)?);
    Ok(())
}
