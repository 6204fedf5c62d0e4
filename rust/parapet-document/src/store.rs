use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use crate::{Document, DocumentId, FieldPath, ResolverError, Team, TeamDirectory, TeamId, Value};

/// A trivial host store where documents and teams are kept in memory and
/// never persisted. Implements [`TeamDirectory`] and reference population.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<DocumentId, Document>>>,
    teams: Arc<RwLock<HashMap<TeamId, Team>>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document.
    pub async fn insert_document(&self, document: Document) {
        let mut documents = self.documents.write().await;
        documents.insert(document.id().clone(), document);
    }

    /// Fetch a copy of the document with identity `id`.
    pub async fn document(&self, id: &DocumentId) -> Option<Document> {
        let documents = self.documents.read().await;
        documents.get(id).cloned()
    }

    /// Insert or replace a team.
    pub async fn insert_team(&self, team: Team) {
        let mut teams = self.teams.write().await;
        teams.insert(team.id.clone(), team);
    }

    /// Return a copy of `document` in which the bare references stored at
    /// `paths` (single references or arrays of them) are replaced by the
    /// referenced documents. References to unknown documents stay bare.
    pub async fn populate(&self, document: &Document, paths: &[&str]) -> Document {
        let documents = self.documents.read().await;
        let mut populated = document.clone();

        let resolve = |value: &mut Value| {
            let Value::Link(id) = &*value else {
                return;
            };
            match documents.get(id) {
                Some(target) => *value = Value::Document(Box::new(target.clone())),
                None => tracing::trace!(%id, "Reference target is not stored"),
            }
        };

        for path in paths {
            match populated.get_mut(&FieldPath::from(*path)) {
                Some(Value::Array(items)) => items.iter_mut().for_each(resolve),
                Some(value) => resolve(value),
                None => {}
            }
        }

        populated
    }
}

#[async_trait]
impl TeamDirectory for MemoryStore {
    async fn team(&self, id: &TeamId) -> Result<Team, ResolverError> {
        let teams = self.teams.read().await;
        teams
            .get(id)
            .cloned()
            .ok_or_else(|| ResolverError::UnknownTeam(id.clone()))
    }
}
