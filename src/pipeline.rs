//! The tagging pipeline and its transaction boundary
//!
//! `Pipeline` is an immutable handle over the NLP engine, the vocabulary
//! index, and the classifier. `TagService` owns the store, keeps the current
//! pipeline behind a lock so it can be rebuilt, and is the only place where a
//! note's writes are committed or rolled back.

use crate::graph::{GraphWriter, NoteId, OwnerId, TaggedNode};
use crate::nlp::{Document, NlpEngine, NlpError};
use crate::resolve::{MentionResolver, ResolvedMention};
use crate::storage::{GraphCursor, SqliteStore, StorageError, VocabularyStore};
use crate::taxonomy::Label;
use crate::vocabulary::{VocabularyError, VocabularyIndex, VocabularySources};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Conditions a tagging call can fail with.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("tagging pipeline not ready: {0}")]
    NotReady(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("analysis failed: {0}")]
    Analysis(#[from] NlpError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Whether the vocabulary index was built.
#[derive(Debug, Clone)]
pub enum Readiness {
    Ready(VocabularyIndex),
    NotReady(String),
}

/// Immutable tagging handle shared across requests.
pub struct Pipeline {
    nlp: Arc<dyn NlpEngine>,
    resolver: MentionResolver,
    readiness: Readiness,
}

impl Pipeline {
    pub fn new(nlp: Arc<dyn NlpEngine>, resolver: MentionResolver, readiness: Readiness) -> Self {
        Self { nlp, resolver, readiness }
    }

    /// A ready pipeline over an already built index.
    pub fn with_index(nlp: Arc<dyn NlpEngine>, index: VocabularyIndex) -> Self {
        Self::new(nlp, MentionResolver::default(), Readiness::Ready(index))
    }

    /// Build the vocabulary from `store`, failing if any source is unreadable.
    pub fn build(
        nlp: Arc<dyn NlpEngine>,
        store: &dyn VocabularyStore,
        sources: &VocabularySources,
    ) -> Result<Self, VocabularyError> {
        let index = VocabularyIndex::build(store, sources)?;
        Ok(Self::with_index(nlp, index))
    }

    /// Build the vocabulary; a failure yields a not-ready pipeline.
    pub fn initialize(
        nlp: Arc<dyn NlpEngine>,
        store: &dyn VocabularyStore,
        sources: &VocabularySources,
    ) -> Self {
        match Self::build(nlp.clone(), store, sources) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                warn!(error = %e, "vocabulary build failed; tagging disabled until rebuilt");
                Self::new(nlp, MentionResolver::default(), Readiness::NotReady(e.to_string()))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.readiness, Readiness::Ready(_))
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn engine_name(&self) -> &str {
        self.nlp.name()
    }

    fn index(&self) -> Result<&VocabularyIndex, TagError> {
        match &self.readiness {
            Readiness::Ready(index) => Ok(index),
            Readiness::NotReady(reason) => Err(TagError::NotReady(reason.clone())),
        }
    }

    pub fn analyze(&self, text: &str) -> Result<Document, TagError> {
        Ok(self.nlp.analyze(text)?)
    }

    /// Resolve the mentions of an analyzed document.
    pub fn resolve(&self, document: &Document) -> Result<Vec<ResolvedMention>, TagError> {
        let index = self.index()?;
        Ok(self.resolver.resolve(document, index))
    }

    /// Resolve and write one document through `cursor`. Never commits.
    pub fn tag_document<C: GraphCursor + ?Sized>(
        &self,
        document: &Document,
        note_id: NoteId,
        owner: OwnerId,
        cursor: &mut C,
    ) -> Result<Vec<TaggedNode>, TagError> {
        let mentions = self.resolve(document)?;
        debug!(note_id, owner, mentions = mentions.len(), "mentions resolved");
        let tagged = GraphWriter::new(note_id, owner).write(&mentions, cursor)?;
        Ok(tagged)
    }

    pub fn status(&self) -> VocabularyStatus {
        match &self.readiness {
            Readiness::Ready(index) => VocabularyStatus {
                ready: true,
                terms: Some(index.len()),
                labels: index.label_counts().clone(),
                reason: None,
            },
            Readiness::NotReady(reason) => VocabularyStatus {
                ready: false,
                terms: None,
                labels: BTreeMap::new(),
                reason: Some(reason.clone()),
            },
        }
    }
}

/// Serializable view of the vocabulary state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyStatus {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<usize>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<Label, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A validated request to tag one note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRequest {
    pub text: String,
    pub note_id: NoteId,
    pub owner_id: OwnerId,
    /// Pre-analyzed document from an external engine; must carry `text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

impl TagRequest {
    pub fn new(text: impl Into<String>, note_id: NoteId, owner_id: OwnerId) -> Self {
        Self {
            text: text.into(),
            note_id,
            owner_id,
            document: None,
        }
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// Validate a loosely-typed JSON body.
    ///
    /// Ids may be numbers or numeric strings; `user_id` is accepted for
    /// `owner_id`.
    pub fn from_json(body: &Value) -> Result<Self, TagError> {
        let object = body
            .as_object()
            .ok_or_else(|| TagError::InvalidRequest("request body must be a JSON object".into()))?;

        let text = match object.get("text") {
            Some(Value::String(text)) if !text.is_empty() => text.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(TagError::InvalidRequest("missing text".into()))
            }
            Some(_) => return Err(TagError::InvalidRequest("text must be a string".into())),
        };

        let note_id = integer_field(object.get("note_id"), "note_id")?;
        let owner_field = object.get("owner_id").or_else(|| object.get("user_id"));
        let owner_id = integer_field(owner_field, "owner_id")?;
        if owner_id <= 0 {
            return Err(TagError::InvalidRequest("owner_id must be positive".into()));
        }

        let document = match object.get("document") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<Document>(value.clone())
                    .map_err(|e| TagError::InvalidRequest(format!("invalid document: {}", e)))?,
            ),
        };

        let request = Self { text, note_id, owner_id, document };
        request.validate()?;
        Ok(request)
    }

    /// Check the attached document, if any, against the text.
    pub fn validate(&self) -> Result<(), TagError> {
        if self.text.is_empty() {
            return Err(TagError::InvalidRequest("missing text".into()));
        }
        if let Some(document) = &self.document {
            if document.text != self.text {
                return Err(TagError::InvalidRequest("document text does not match text".into()));
            }
            document
                .validate()
                .map_err(|e| TagError::InvalidRequest(e.to_string()))?;
        }
        Ok(())
    }
}

fn integer_field(value: Option<&Value>, name: &str) -> Result<i64, TagError> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        None | Some(Value::Null) => {
            return Err(TagError::InvalidRequest(format!("missing {}", name)))
        }
        Some(_) => None,
    };
    parsed.ok_or_else(|| TagError::InvalidRequest(format!("{} must be an integer", name)))
}

/// Owns the store and the current pipeline.
pub struct TagService {
    store: Arc<SqliteStore>,
    nlp: Arc<dyn NlpEngine>,
    sources: VocabularySources,
    pipeline: RwLock<Arc<Pipeline>>,
}

impl TagService {
    /// Build the vocabulary and start serving; a failed build leaves the
    /// service not ready rather than failing construction.
    pub fn new(
        store: Arc<SqliteStore>,
        nlp: Arc<dyn NlpEngine>,
        sources: VocabularySources,
    ) -> Self {
        let pipeline = Pipeline::initialize(nlp.clone(), store.as_ref(), &sources);
        Self {
            store,
            nlp,
            sources,
            pipeline: RwLock::new(Arc::new(pipeline)),
        }
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    pub fn sources(&self) -> &VocabularySources {
        &self.sources
    }

    /// The current pipeline handle.
    pub fn pipeline(&self) -> Result<Arc<Pipeline>, TagError> {
        self.pipeline
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| TagError::Storage(StorageError::LockPoisoned))
    }

    pub fn status(&self) -> Result<VocabularyStatus, TagError> {
        Ok(self.pipeline()?.status())
    }

    /// Rebuild the vocabulary from the store.
    ///
    /// The new handle replaces the current one only when the build succeeds.
    pub fn rebuild(&self) -> Result<VocabularyStatus, TagError> {
        let pipeline = Pipeline::build(self.nlp.clone(), self.store.as_ref(), &self.sources)
            .map_err(|e| {
                warn!(error = %e, "vocabulary rebuild failed");
                TagError::NotReady(e.to_string())
            })?;
        let status = pipeline.status();

        let mut current = self
            .pipeline
            .write()
            .map_err(|_| TagError::Storage(StorageError::LockPoisoned))?;
        *current = Arc::new(pipeline);
        info!(terms = status.terms.unwrap_or(0), "vocabulary rebuilt");
        Ok(status)
    }

    /// Tag one note inside a single transaction.
    pub fn tag(&self, request: &TagRequest) -> Result<Vec<TaggedNode>, TagError> {
        request.validate()?;
        let pipeline = self.pipeline()?;
        if let Readiness::NotReady(reason) = pipeline.readiness() {
            warn!(note_id = request.note_id, "tag request refused: vocabulary not ready");
            return Err(TagError::NotReady(reason.clone()));
        }

        let document = match &request.document {
            Some(document) => document.clone(),
            None => pipeline.analyze(&request.text)?,
        };

        let (note_id, owner) = (request.note_id, request.owner_id);
        let result = self
            .store
            .with_transaction(|cursor| pipeline.tag_document(&document, note_id, owner, cursor));

        if let Err(e) = &result {
            warn!(note_id, owner, error = %e, "tagging rolled back");
        }
        result
    }
}
