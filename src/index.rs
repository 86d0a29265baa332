use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    ops::Bound,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    client::ClientRecord,
    error::{Error, Result},
    query::{Query, Scope, Term},
    tokenizer::{self, Category, Token},
    vocabulary::LabelVocabulary,
};

#[derive(Debug, Default)]
struct IndexState {
    postings: BTreeMap<Token, BTreeSet<String>>,
    /// Tokens each client contributed on its last update.
    by_client: HashMap<String, Vec<Token>>,
    labels: LabelVocabulary,
}

impl IndexState {
    fn insert(&mut self, client_id: &str, tokens: Vec<Token>) {
        self.unlink(client_id);

        for token in &tokens {
            if token.category == Category::Label {
                self.labels.insert(&token.value);
            }
            self.postings
                .entry(token.clone())
                .or_default()
                .insert(client_id.to_string());
        }
        self.by_client.insert(client_id.to_string(), tokens);
    }

    fn unlink(&mut self, client_id: &str) -> bool {
        let Some(previous) = self.by_client.remove(client_id) else {
            return false;
        };
        for token in previous {
            if let Some(ids) = self.postings.get_mut(&token) {
                ids.remove(client_id);
                if ids.is_empty() {
                    self.postings.remove(&token);
                }
            }
        }
        true
    }

    fn exact(&self, category: Category, value: String) -> BTreeSet<String> {
        self.postings
            .get(&Token { category, value })
            .cloned()
            .unwrap_or_default()
    }

    /// `value` itself plus every host token of the form `value.<suffix>`.
    fn host_prefix(&self, value: String) -> BTreeSet<String> {
        let start = Token {
            category: Category::Host,
            value,
        };
        let prefix = start.value.as_str();

        let mut result = BTreeSet::new();
        for (token, ids) in self
            .postings
            .range::<Token, _>((Bound::Included(&start), Bound::Unbounded))
            .take_while(|(t, _)| {
                t.category == Category::Host && t.value.starts_with(prefix)
            })
        {
            let rest = &token.value[prefix.len()..];
            if rest.is_empty() || rest.starts_with('.') {
                result.extend(ids.iter().cloned());
            }
        }
        result
    }

    fn lookup(&self, term: &Term) -> BTreeSet<String> {
        match term.scope {
            Scope::Category(category) => {
                let Some(value) = category.normalize(&term.literal) else {
                    return BTreeSet::new();
                };
                if category == Category::Host {
                    self.host_prefix(value)
                } else {
                    self.exact(category, value)
                }
            }
            Scope::Default => Category::default_scope()
                .filter_map(|category| {
                    category
                        .normalize(&term.literal)
                        .map(|value| self.exact(category, value))
                })
                .flatten()
                .collect(),
        }
    }

    fn universe(&self) -> BTreeSet<String> {
        self.by_client.keys().cloned().collect()
    }
}

/// Inverted index from client attribute tokens to client identifiers.
///
/// All state sits behind one lock: an update holds the write lock for the
/// whole client, so readers never see half of a client's tokens.
#[derive(Debug, Default)]
pub struct ClientIndex {
    state: RwLock<IndexState>,
}

impl ClientIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a full snapshot. Records are tokenized in
    /// parallel; a later record with a repeated id replaces the earlier one.
    /// Records with a blank id are skipped.
    pub fn build(records: &[ClientRecord]) -> Self {
        let tokenized: Vec<(&str, Vec<Token>)> = records
            .par_iter()
            .filter(|r| {
                let valid = r.validate().is_ok();
                if !valid {
                    warn!(client_id = ?r.client_id, "skipping client with blank id");
                }
                valid
            })
            .map(|r| (r.client_id.as_str(), tokenizer::tokenize(r)))
            .collect();

        let mut state = IndexState::default();
        for (client_id, tokens) in tokenized {
            state.insert(client_id, tokens);
        }
        debug!(
            clients = state.by_client.len(),
            tokens = state.postings.len(),
            "built client index"
        );

        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexState>> {
        self.state.read().map_err(|_| Error::Poisoned("client index"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexState>> {
        self.state.write().map_err(|_| Error::Poisoned("client index"))
    }

    /// Index `record`, replacing whatever the same client contributed before.
    pub fn add_client(&self, record: &ClientRecord) -> Result<()> {
        record.validate()?;
        let tokens = tokenizer::tokenize(record);
        let count = tokens.len();
        self.write()?.insert(&record.client_id, tokens);
        debug!(client_id = %record.client_id, tokens = count, "indexed client");
        Ok(())
    }

    /// Drop a client and all of its postings. Its labels stay in the
    /// vocabulary.
    pub fn remove_client(&self, client_id: &str) -> Result<bool> {
        let removed = self.write()?.unlink(client_id);
        if removed {
            debug!(client_id, "removed client from index");
        }
        Ok(removed)
    }

    /// Swap in the contents of `other`, e.g. after a full rebuild.
    pub fn replace_with(&self, other: ClientIndex) -> Result<()> {
        let fresh = other
            .state
            .into_inner()
            .map_err(|_| Error::Poisoned("client index"))?;
        *self.write()? = fresh;
        Ok(())
    }

    pub fn lookup(&self, term: &Term) -> Result<BTreeSet<String>> {
        Ok(self.read()?.lookup(term))
    }

    /// Intersect the matches of every term. An empty query matches every
    /// indexed client.
    pub fn lookup_all(&self, query: &Query) -> Result<BTreeSet<String>> {
        let state = self.read()?;

        let mut terms = query.terms.iter();
        let Some(first) = terms.next() else {
            return Ok(state.universe());
        };

        let mut result = state.lookup(first);
        for term in terms {
            if result.is_empty() {
                break;
            }
            let matches = state.lookup(term);
            result.retain(|id| matches.contains(id));
        }
        Ok(result)
    }

    /// Known labels starting with `prefix`, sorted.
    pub fn label_prefix_matches(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.read()?.labels.prefix_matches(prefix))
    }

    pub fn contains_client(&self, client_id: &str) -> Result<bool> {
        Ok(self.read()?.by_client.contains_key(client_id))
    }

    pub fn tokens_for(&self, client_id: &str) -> Result<Vec<Token>> {
        Ok(self
            .read()?
            .by_client
            .get(client_id)
            .cloned()
            .unwrap_or_default())
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let state = self.read()?;
        Ok(IndexStats {
            clients: state.by_client.len(),
            tokens: state.postings.len(),
            labels: state.labels.len(),
        })
    }
}

/// Sizes reported by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub clients: usize,
    pub tokens: usize,
    pub labels: usize,
}
