use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

use crate::{
    AclEntry, Action, Component, DocumentError, DocumentId, FieldPath, Record, Schema, TeamId,
    Value,
};

/// A document as supplied by the host store: an identity, the schema of its
/// type, its stored fields and its embedded ACL entries.
///
/// Callers are expected to serialize writes per document identity; the type
/// itself performs no locking.
#[derive(Clone)]
pub struct Document {
    id: DocumentId,
    schema: Arc<Schema>,
    fields: Record,
    acl: Vec<AclEntry>,
}

impl Document {
    /// An empty document with the given identity.
    pub fn new(id: impl Into<DocumentId>, schema: Arc<Schema>) -> Self {
        Self {
            id: id.into(),
            schema,
            fields: Record::new(),
            acl: Vec::new(),
        }
    }

    /// An empty document with a freshly generated identity.
    pub fn create(schema: Arc<Schema>) -> Self {
        Self::new(DocumentId::generate(), schema)
    }

    /// Set a top-level field, returning the document.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Append an ACL entry granting `component` for `action` to the members
    /// of `team`, returning the document.
    pub fn grant(
        mut self,
        team: impl Into<TeamId>,
        action: impl Into<Action>,
        component: impl Into<Component>,
    ) -> Self {
        self.acl.push(AclEntry {
            team: team.into(),
            action: action.into(),
            component: component.into(),
        });
        self
    }

    /// Identity of this document.
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Schema of this document's type.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Stored top-level fields.
    pub fn fields(&self) -> &Record {
        &self.fields
    }

    /// Embedded ACL entries.
    pub fn acl(&self) -> &[AclEntry] {
        &self.acl
    }

    /// Mutable access to the embedded ACL entries.
    pub fn acl_mut(&mut self) -> &mut Vec<AclEntry> {
        &mut self.acl
    }

    /// Read the value stored at `path`.
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let (parents, last) = path.split_last()?;
        let mut current = &self.fields;
        for segment in parents {
            current = current.get(segment)?.as_object()?;
        }
        current.get(last)
    }

    /// Mutably borrow the value stored at `path`.
    pub fn get_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        let (parents, last) = path.split_last()?;
        let mut current = &mut self.fields;
        for segment in parents {
            current = match current.get_mut(segment)? {
                Value::Object(record) => record,
                _ => return None,
            };
        }
        current.get_mut(last)
    }

    /// Store `value` at `path`, creating intermediate objects as needed.
    /// Intermediate slots holding `null` are replaced by objects. Assigning
    /// [`Value::Unset`] removes the field.
    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), DocumentError> {
        let Some((parents, last)) = path.split_last() else {
            return Err(DocumentError::RootAssignment);
        };

        if value.is_unset() {
            self.unset(path);
            return Ok(());
        }

        let mut current = &mut self.fields;
        for (index, segment) in parents.iter().enumerate() {
            let slot = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Record::new()));
            if slot.is_unset() || matches!(slot, Value::Null) {
                *slot = Value::Object(Record::new());
            }
            current = match slot {
                Value::Object(record) => record,
                _ => {
                    return Err(DocumentError::NotAnObject(FieldPath::from(
                        parents[..=index].join("."),
                    )));
                }
            };
        }
        current.insert(last.to_owned(), value);
        Ok(())
    }

    /// Remove the value stored at `path`, returning it.
    pub fn unset(&mut self, path: &FieldPath) -> Option<Value> {
        let (parents, last) = path.split_last()?;
        let mut current = &mut self.fields;
        for segment in parents {
            current = match current.get_mut(segment)? {
                Value::Object(record) => record,
                _ => return None,
            };
        }
        current.shift_remove(last)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && (Arc::ptr_eq(&self.schema, &other.schema)
                || self.schema.name() == other.schema.name())
            && self.fields == other.fields
            && self.acl == other.acl
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("schema", &self.schema.name())
            .field("fields", &self.fields)
            .field("acl", &self.acl)
            .finish()
    }
}
