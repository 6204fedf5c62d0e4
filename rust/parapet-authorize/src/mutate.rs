//! Write path: validate untrusted input against a schema and the writer's
//! components, then commit it atomically.
//!
//! Validation never touches the target document. It produces a flat list of
//! [`Assignment`]s that is applied to a staged copy; the live document is
//! replaced only once every assignment has been applied.

use futures::{
    FutureExt,
    future::{BoxFuture, try_join_all},
};
use parapet_document::{
    Action, ComponentSet, ComponentSpec, Document, FieldPath, Fields, Principal,
    Schema, SchemaNode, TeamDirectory, Value,
};

use crate::{AuthorizeError, ComponentResolver};

/// How validated input is applied to a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Assign the paths present in the input; leave every other path as is.
    #[default]
    Merge,
    /// Clear every path the writer may write before assigning the input.
    /// Subdocument arrays are never cleared.
    Overwrite,
}

/// A single validated write.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Assignment {
    pub path: FieldPath,
    pub value: Value,
}

/// Checks input against a schema on behalf of a writer holding
/// `components` on `document`.
#[derive(Clone, Copy)]
pub(crate) struct Validator<'s> {
    document: &'s Document,
    components: &'s ComponentSet,
}

impl<'s> Validator<'s> {
    pub fn new(document: &'s Document, components: &'s ComponentSet) -> Self {
        Self {
            document,
            components,
        }
    }

    /// Validate `input`, which must be an object, against `fields`. Paths of
    /// the produced assignments and errors are prefixed with `path`.
    pub fn validate(
        self,
        fields: &'s Fields,
        input: &'s Value,
        path: FieldPath,
    ) -> BoxFuture<'s, Result<Vec<Assignment>, AuthorizeError>> {
        async move {
            let Value::Object(entries) = input else {
                return Err(AuthorizeError::violation(&path, "expected a plain object"));
            };

            let validated = try_join_all(entries.iter().map(|(name, value)| {
                let path = path.child(name);
                async move {
                    let Some(node) = fields.get(name) else {
                        return Err(AuthorizeError::violation(&path, "unknown field"));
                    };
                    self.validate_entry(node, value, path).await
                }
            }))
            .await?;

            Ok(validated.into_iter().flatten().collect())
        }
        .boxed()
    }

    fn validate_entry(
        self,
        node: &'s SchemaNode,
        value: &'s Value,
        path: FieldPath,
    ) -> BoxFuture<'s, Result<Vec<Assignment>, AuthorizeError>> {
        async move {
            let value = match node {
                SchemaNode::Object(children) => {
                    return self.validate(children, value, path).await;
                }
                SchemaNode::Leaf(spec) => {
                    self.permit(spec, &path).await?;
                    if !(value.is_primitive() || value.is_unset()) {
                        return Err(AuthorizeError::violation(&path, "expected a primitive value"));
                    }
                    value.clone()
                }
                SchemaNode::Reference(spec) => {
                    self.permit(spec, &path).await?;
                    match value {
                        Value::Unset => Value::Unset,
                        other => reference(other).ok_or_else(|| {
                            AuthorizeError::violation(
                                &path,
                                "references are assigned by id, not by document",
                            )
                        })?,
                    }
                }
                SchemaNode::Array(element) => match element.as_ref() {
                    SchemaNode::Leaf(spec) => {
                        self.permit(spec, &path).await?;
                        match value {
                            Value::Unset | Value::Null => value.clone(),
                            Value::Array(items) if items.iter().all(Value::is_primitive) => {
                                value.clone()
                            }
                            _ => {
                                return Err(AuthorizeError::violation(
                                    &path,
                                    "expected an array of primitive values",
                                ));
                            }
                        }
                    }
                    SchemaNode::Reference(spec) => {
                        self.permit(spec, &path).await?;
                        match value {
                            Value::Unset | Value::Null => value.clone(),
                            Value::Array(items) => items
                                .iter()
                                .map(reference)
                                .collect::<Option<Vec<_>>>()
                                .map(Value::Array)
                                .ok_or_else(|| {
                                    AuthorizeError::violation(&path, "expected an array of ids")
                                })?,
                            _ => {
                                return Err(AuthorizeError::violation(
                                    &path,
                                    "expected an array of ids",
                                ));
                            }
                        }
                    }
                    SchemaNode::Subdocument(_) => {
                        return Err(AuthorizeError::violation(
                            &path,
                            "subdocument arrays are modified one element at a time",
                        ));
                    }
                    _ => {
                        return Err(AuthorizeError::violation(
                            &path,
                            "arrays of this kind cannot be assigned",
                        ));
                    }
                },
                SchemaNode::Subdocument(_) => {
                    return Err(AuthorizeError::violation(
                        &path,
                        "subdocuments cannot be assigned directly",
                    ));
                }
                SchemaNode::Virtual(_) => {
                    return Err(AuthorizeError::violation(&path, "virtual fields are read-only"));
                }
            };

            Ok(vec![Assignment { path, value }])
        }
        .boxed()
    }

    async fn permit(&self, spec: &ComponentSpec, path: &FieldPath) -> Result<(), AuthorizeError> {
        if spec.permits(self.document, self.components).await? {
            Ok(())
        } else {
            tracing::debug!(id = %self.document.id(), %path, "Write denied");
            Err(AuthorizeError::PermissionDenied(path.clone()))
        }
    }

    /// Every assignable path of `schema` the writer may write.
    pub async fn writable_paths(self, schema: &Schema) -> Result<Vec<FieldPath>, AuthorizeError> {
        let candidates = schema
            .terminal_paths()
            .into_iter()
            .filter_map(|(path, node)| {
                let spec = match node {
                    SchemaNode::Leaf(spec) | SchemaNode::Reference(spec) => spec,
                    SchemaNode::Array(element) => match element.as_ref() {
                        SchemaNode::Leaf(spec) | SchemaNode::Reference(spec) => spec,
                        _ => return None,
                    },
                    _ => return None,
                };
                Some((path, spec))
            });

        let permitted = try_join_all(candidates.map(|(path, spec)| async move {
            let permitted = spec.permits(self.document, self.components).await?;
            Ok::<_, AuthorizeError>(permitted.then_some(path))
        }))
        .await?;

        Ok(permitted.into_iter().flatten().collect())
    }
}

/// Normalize a reference assignment to a bare link.
fn reference(value: &Value) -> Option<Value> {
    match value {
        Value::String(id) => Some(Value::link(id.as_str())),
        Value::Link(_) | Value::Null => Some(value.clone()),
        _ => None,
    }
}

/// Apply `resets` and then `assignments` to a copy of `document`.
pub(crate) fn apply(
    document: &Document,
    resets: &[FieldPath],
    assignments: Vec<Assignment>,
) -> Result<Document, AuthorizeError> {
    let mut staged = document.clone();
    for path in resets {
        staged.unset(path);
    }
    for Assignment { path, value } in assignments {
        staged
            .set(&path, value)
            .map_err(|error| AuthorizeError::violation(&path, error.to_string()))?;
    }
    Ok(staged)
}

/// Validates and commits whole-document writes.
pub struct DocumentMutator<'a, D: ?Sized> {
    resolver: ComponentResolver<'a, D>,
}

impl<'a, D> DocumentMutator<'a, D>
where
    D: TeamDirectory + ?Sized,
{
    /// A mutator resolving write components with `resolver`.
    pub fn new(resolver: ComponentResolver<'a, D>) -> Self {
        Self { resolver }
    }

    /// Write `input` into `document` on behalf of `principal`.
    ///
    /// Either every path of `input` is written or, on error, `document` is
    /// left exactly as it was.
    pub async fn write(
        &self,
        document: &mut Document,
        principal: &Principal,
        input: &Value,
        mode: WriteMode,
    ) -> Result<(), AuthorizeError> {
        let components = self
            .resolver
            .resolve(document, principal, &Action::write())
            .await?;

        let staged = {
            let current: &Document = document;
            let validator = Validator::new(current, &components);
            let schema = current.schema();

            let (assignments, resets) = tokio::try_join!(
                validator.validate(schema.fields(), input, FieldPath::root()),
                async {
                    match mode {
                        WriteMode::Merge => Ok(Vec::new()),
                        WriteMode::Overwrite => validator.writable_paths(schema).await,
                    }
                }
            )?;

            apply(current, &resets, assignments)?
        };

        tracing::debug!(id = %staged.id(), %principal, ?mode, "Committing write");
        *document = staged;
        Ok(())
    }
}
