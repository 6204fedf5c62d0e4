//! Read path: redact a document down to the sub-tree a principal may see.
//!
//! Every document (the root, each populated reference and each subdocument
//! element) is projected as a root of its own: its components are resolved
//! for the `read` action and every field is kept only when the component
//! guarding it is among them. Denial is expressed by omission; an object
//! with no surviving children is omitted as well.
//!
//! Sibling fields and array elements are projected concurrently and joined
//! in source order. Reference cycles are broken with an identity-keyed
//! [`CycleGuard`]: a document already on the current path is represented by
//! its bare identity. Subdocument elements are projected with the guard of
//! the path that reached them rather than a fresh one, so an element that
//! embeds a document already on the path is cut off as well.

use futures::{
    FutureExt,
    future::{BoxFuture, try_join_all},
};
use parapet_document::{
    Action, ComponentSet, ComponentSpec, Document, DocumentId, Fields, Principal, Record,
    ResolverError, SchemaNode, TeamDirectory, Value,
};
use serde_json::{Map, Value as Json};

use crate::{ComponentResolver, CycleGuard, Settings};

/// Everything a field projection needs to know about the document it
/// belongs to.
#[derive(Clone, Copy)]
struct Scope<'s> {
    document: &'s Document,
    principal: &'s Principal,
    components: &'s ComponentSet,
    visited: &'s CycleGuard<DocumentId>,
}

impl Scope<'_> {
    async fn permits(&self, spec: &ComponentSpec) -> Result<bool, ResolverError> {
        spec.permits(self.document, self.components).await
    }
}

/// Projects documents into the JSON tree a principal may read.
pub struct DocumentProjector<'a, D: ?Sized> {
    resolver: ComponentResolver<'a, D>,
    settings: &'a Settings,
}

impl<'a, D> DocumentProjector<'a, D>
where
    D: TeamDirectory + ?Sized,
{
    /// A projector resolving components with `resolver`.
    pub fn new(resolver: ComponentResolver<'a, D>, settings: &'a Settings) -> Self {
        Self { resolver, settings }
    }

    /// The readable part of `document` for `principal`, or `None` when
    /// nothing is readable.
    pub async fn project(
        &self,
        document: &Document,
        principal: &Principal,
    ) -> Result<Option<Json>, ResolverError> {
        self.project_root(document, principal, CycleGuard::new())
            .await
    }

    /// Project `document` as an independent root on a path that has already
    /// visited the documents in `visited`.
    pub fn project_root<'s>(
        &'s self,
        document: &'s Document,
        principal: &'s Principal,
        visited: CycleGuard<DocumentId>,
    ) -> BoxFuture<'s, Result<Option<Json>, ResolverError>> {
        async move {
            if visited.contains(document.id()) {
                tracing::trace!(id = %document.id(), "Reference cycle, projecting identity only");
                return Ok(Some(Json::String(document.id().to_string())));
            }
            let visited = visited.with(document.id().clone());

            let components = self
                .resolver
                .resolve(document, principal, &Action::read())
                .await?;
            let scope = Scope {
                document,
                principal,
                components: &components,
                visited: &visited,
            };

            let Some(fields) = self
                .project_fields(scope, document.schema().fields(), document.fields())
                .await?
            else {
                return Ok(None);
            };

            let mut projection = Map::new();
            projection.insert(
                self.settings.identity_field.clone(),
                Json::String(document.id().to_string()),
            );
            projection.extend(fields);
            Ok(Some(Json::Object(projection)))
        }
        .boxed()
    }

    fn project_fields<'s>(
        &'s self,
        scope: Scope<'s>,
        schema: &'s Fields,
        data: &'s Record,
    ) -> BoxFuture<'s, Result<Option<Map<String, Json>>, ResolverError>> {
        async move {
            let projected = try_join_all(schema.iter().map(|(name, node)| async move {
                let value = self.project_node(scope, node, data.get(name)).await?;
                Ok::<_, ResolverError>(value.map(|value| (name.clone(), value)))
            }))
            .await?;

            let fields: Map<String, Json> = projected.into_iter().flatten().collect();
            Ok((!fields.is_empty()).then_some(fields))
        }
        .boxed()
    }

    fn project_node<'s>(
        &'s self,
        scope: Scope<'s>,
        node: &'s SchemaNode,
        value: Option<&'s Value>,
    ) -> BoxFuture<'s, Result<Option<Json>, ResolverError>> {
        async move {
            // Virtual fields are never stored; their value is derived from
            // the document on every read.
            if let SchemaNode::Virtual(field) = node {
                if !scope.permits(&field.spec).await? {
                    return Ok(None);
                }
                return Ok(primitive(&field.compute(scope.document)));
            }
            let Some(value) = value else {
                return Ok(None);
            };

            match node {
                SchemaNode::Object(children) => match value {
                    Value::Object(record) => Ok(self
                        .project_fields(scope, children, record)
                        .await?
                        .map(Json::Object)),
                    _ => Ok(None),
                },
                SchemaNode::Leaf(spec) => {
                    if !scope.permits(spec).await? {
                        return Ok(None);
                    }
                    Ok(primitive(value))
                }
                SchemaNode::Reference(spec) => {
                    if !scope.permits(spec).await? {
                        return Ok(None);
                    }
                    self.project_reference(scope, value).await
                }
                SchemaNode::Subdocument(_) => match value {
                    Value::Document(element) => {
                        self.project_root(element, scope.principal, scope.visited.clone())
                            .await
                    }
                    _ => Ok(None),
                },
                SchemaNode::Virtual(_) => Ok(None),
                SchemaNode::Array(element) => {
                    let Value::Array(items) = value else {
                        return Ok(None);
                    };
                    self.project_array(scope, element, items).await
                }
            }
        }
        .boxed()
    }

    async fn project_array<'s>(
        &'s self,
        scope: Scope<'s>,
        element: &'s SchemaNode,
        items: &'s [Value],
    ) -> Result<Option<Json>, ResolverError> {
        let projected: Vec<Option<Json>> = match element {
            // One guard covers every element.
            SchemaNode::Leaf(spec) => {
                if !scope.permits(spec).await? {
                    return Ok(None);
                }
                items.iter().map(primitive).collect()
            }
            SchemaNode::Reference(spec) => {
                if !scope.permits(spec).await? {
                    return Ok(None);
                }
                try_join_all(
                    items
                        .iter()
                        .map(|item| self.project_reference(scope, item)),
                )
                .await?
            }
            _ => {
                try_join_all(
                    items
                        .iter()
                        .map(|item| self.project_node(scope, element, Some(item))),
                )
                .await?
            }
        };

        let kept: Vec<Json> = projected.into_iter().flatten().collect();
        Ok((!kept.is_empty()).then_some(Json::Array(kept)))
    }

    async fn project_reference<'s>(
        &'s self,
        scope: Scope<'s>,
        value: &'s Value,
    ) -> Result<Option<Json>, ResolverError> {
        match value {
            Value::Document(target) => {
                self.project_root(target, scope.principal, scope.visited.clone())
                    .await
            }
            other => Ok(primitive(other)),
        }
    }
}

fn primitive(value: &Value) -> Option<Json> {
    let json = value.to_primitive_json();
    if json.is_none() {
        tracing::debug!(?value, "Skipping non-primitive value in a primitive position");
    }
    json
}
