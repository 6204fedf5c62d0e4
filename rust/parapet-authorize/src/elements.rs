use parapet_document::{
    Action, Document, DocumentId, Embedded, FieldPath, Principal, TeamDirectory, Value,
};

use crate::{
    AuthorizeError, ComponentResolver,
    mutate::{Validator, apply},
};

/// Element-wise access to a subdocument array of a document.
///
/// Adding and removing elements requires the array's own component on the
/// enclosing document. Element content is validated against the element
/// schema, with the element itself as the document components are resolved
/// for. Every operation leaves the array untouched when it fails.
pub struct Elements<'a, D: ?Sized> {
    resolver: ComponentResolver<'a, D>,
    document: &'a mut Document,
    path: FieldPath,
    embedded: Embedded,
}

impl<'a, D> Elements<'a, D>
where
    D: TeamDirectory + ?Sized,
{
    /// Access the subdocument array at `path` of `document`.
    pub fn new(
        resolver: ComponentResolver<'a, D>,
        document: &'a mut Document,
        path: FieldPath,
    ) -> Result<Self, AuthorizeError> {
        let node = document
            .schema()
            .node(&path)
            .ok_or_else(|| AuthorizeError::violation(&path, "unknown field"))?;
        let embedded = node.embedded().cloned().ok_or_else(|| {
            AuthorizeError::violation(
                &path,
                format!("expected a subdocument array, found {:?}", node.kind()),
            )
        })?;

        Ok(Self {
            resolver,
            document,
            path,
            embedded,
        })
    }

    /// Path of the array.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Identities of the elements in array order.
    pub fn ids(&self) -> Vec<DocumentId> {
        self.items()
            .iter()
            .filter_map(Value::as_document)
            .map(|element| element.id().clone())
            .collect()
    }

    /// The element with identity `id`.
    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.locate(id).ok().map(|(_, element)| element)
    }

    /// Append a new element built from `input` and return its identity.
    pub async fn push(
        &mut self,
        principal: &Principal,
        input: &Value,
    ) -> Result<DocumentId, AuthorizeError> {
        self.gate(principal).await?;

        let element = Document::create(self.embedded.schema.clone());
        let element = self
            .stage(&element, principal, input, self.path.clone())
            .await?;
        let id = element.id().clone();

        self.items_mut()?.push(Value::Document(Box::new(element)));
        tracing::debug!(path = %self.path, %id, %principal, "Pushed element");
        Ok(id)
    }

    /// Remove the element with identity `id` and return it.
    pub async fn remove(
        &mut self,
        principal: &Principal,
        id: &DocumentId,
    ) -> Result<Document, AuthorizeError> {
        self.gate(principal).await?;
        let (position, _) = self.locate(id)?;

        match self.items_mut()?.remove(position) {
            Value::Document(element) => {
                tracing::debug!(path = %self.path, %id, %principal, "Removed element");
                Ok(*element)
            }
            _ => Err(self.not_found(id)),
        }
    }

    /// Merge `input` into the element with identity `id`.
    pub async fn set(
        &mut self,
        principal: &Principal,
        id: &DocumentId,
        input: &Value,
    ) -> Result<(), AuthorizeError> {
        let (position, element) = self.locate(id)?;
        self.gate(principal).await?;

        let staged = self
            .stage(element, principal, input, self.path.child(id.as_str()))
            .await?;

        if let Some(slot) = self.items_mut()?.get_mut(position) {
            *slot = Value::Document(Box::new(staged));
        }
        tracing::debug!(path = %self.path, %id, %principal, "Updated element");
        Ok(())
    }

    async fn gate(&self, principal: &Principal) -> Result<(), AuthorizeError> {
        let components = self
            .resolver
            .resolve(&*self.document, principal, &Action::write())
            .await?;

        if self.embedded.spec.permits(&*self.document, &components).await? {
            Ok(())
        } else {
            tracing::debug!(id = %self.document.id(), path = %self.path, %principal, "Element change denied");
            Err(AuthorizeError::PermissionDenied(self.path.clone()))
        }
    }

    /// Validate `input` against the element schema and apply it to a copy of
    /// `element`. Errors are reported under `scope`.
    async fn stage(
        &self,
        element: &Document,
        principal: &Principal,
        input: &Value,
        scope: FieldPath,
    ) -> Result<Document, AuthorizeError> {
        let components = self
            .resolver
            .resolve(element, principal, &Action::write())
            .await?;

        let assignments = Validator::new(element, &components)
            .validate(element.schema().fields(), input, FieldPath::root())
            .await
            .map_err(|error| error.within(&scope))?;

        apply(element, &[], assignments).map_err(|error| error.within(&scope))
    }

    fn items(&self) -> &[Value] {
        self.document
            .get(&self.path)
            .and_then(Value::as_array)
            .unwrap_or_default()
    }

    fn items_mut(&mut self) -> Result<&mut Vec<Value>, AuthorizeError> {
        if self.document.get(&self.path).is_none() {
            self.document
                .set(&self.path, Value::Array(Vec::new()))
                .map_err(|error| AuthorizeError::violation(&self.path, error.to_string()))?;
        }

        match self.document.get_mut(&self.path) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(AuthorizeError::violation(&self.path, "expected an array")),
        }
    }

    fn locate(&self, id: &DocumentId) -> Result<(usize, &Document), AuthorizeError> {
        self.items()
            .iter()
            .enumerate()
            .find_map(|(position, item)| {
                item.as_document()
                    .filter(|element| element.id() == id)
                    .map(|element| (position, element))
            })
            .ok_or_else(|| self.not_found(id))
    }

    fn not_found(&self, id: &DocumentId) -> AuthorizeError {
        AuthorizeError::NotFound {
            path: self.path.clone(),
            id: id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Policies, Policy};
    use async_trait::async_trait;
    use parapet_document::{
        Component, ComponentFn, ComponentSpec, MemoryStore, ResolverError, Schema, SchemaNode,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use testresult::TestResult;

    fn tag() -> Arc<Schema> {
        Schema::build("Tag")
            .field("name", SchemaNode::leaf("tagging"))
            .field("secret", SchemaNode::hidden())
            .finish()
    }

    fn post() -> Document {
        let schema = Schema::build("Post")
            .field("title", SchemaNode::leaf("content"))
            .field("tags", SchemaNode::subdocuments(tag(), "tagging"))
            .finish();
        Document::new("post", schema).with("title", "Hello")
    }

    fn policies(post: &[&str], tag: &[&str]) -> Policies {
        let mut policies = Policies::new();
        policies.insert(
            "Post",
            Policy::new().with_defaults("write", post.iter().copied()),
        );
        policies.insert(
            "Tag",
            Policy::new().with_defaults("write", tag.iter().copied()),
        );
        policies
    }

    #[tokio::test]
    async fn it_pushes_and_removes_elements() -> TestResult {
        let store = MemoryStore::new();
        let policies = policies(&["tagging"], &["tagging"]);
        let mut document = post();
        let before = document.clone();
        let principal = Principal::from("luke");

        let mut tags = Elements::new(
            ComponentResolver::new(&store, &policies),
            &mut document,
            "tags".into(),
        )?;
        let id = tags.push(&principal, &json!({ "name": "x" }).into()).await?;

        assert_eq!(tags.ids(), vec![id.clone()]);
        assert_eq!(
            tags.get(&id).and_then(|tag| tag.get(&"name".into())),
            Some(&Value::from("x"))
        );

        let removed = tags.remove(&principal, &id).await?;

        assert_eq!(removed.id(), &id);
        assert!(tags.is_empty());
        assert_eq!(
            document.get(&"tags".into()),
            Some(&Value::Array(Vec::new()))
        );
        assert_eq!(document.get(&"title".into()), before.get(&"title".into()));
        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_pushes_with_unauthorized_content() -> TestResult {
        let store = MemoryStore::new();
        let policies = policies(&["tagging"], &["tagging"]);
        let mut document = post();
        let principal = Principal::from("luke");

        let mut tags = Elements::new(
            ComponentResolver::new(&store, &policies),
            &mut document,
            "tags".into(),
        )?;
        tags.push(&principal, &json!({ "name": "kept" }).into())
            .await?;

        let result = tags
            .push(&principal, &json!({ "name": "x", "secret": "y" }).into())
            .await;

        assert_eq!(
            result,
            Err(AuthorizeError::PermissionDenied("tags.secret".into()))
        );
        assert_eq!(tags.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_gates_pushes_on_the_enclosing_document() -> TestResult {
        let store = MemoryStore::new();
        let policies = policies(&[], &["tagging"]);
        let mut document = post();
        let before = document.clone();

        let mut tags = Elements::new(
            ComponentResolver::new(&store, &policies),
            &mut document,
            "tags".into(),
        )?;
        let result = tags
            .push(&"luke".into(), &json!({ "name": "x" }).into())
            .await;

        assert_eq!(result, Err(AuthorizeError::PermissionDenied("tags".into())));
        assert_eq!(document, before);
        Ok(())
    }

    #[tokio::test]
    async fn it_updates_elements_in_place() -> TestResult {
        let store = MemoryStore::new();
        let policies = policies(&["tagging"], &["tagging"]);
        let mut document = post();
        let principal = Principal::from("luke");

        let mut tags = Elements::new(
            ComponentResolver::new(&store, &policies),
            &mut document,
            "tags".into(),
        )?;
        let first = tags.push(&principal, &json!({ "name": "a" }).into()).await?;
        let second = tags.push(&principal, &json!({ "name": "b" }).into()).await?;

        tags.set(&principal, &first, &json!({ "name": "c" }).into())
            .await?;

        assert_eq!(tags.ids(), vec![first.clone(), second.clone()]);
        assert_eq!(
            tags.get(&first).and_then(|tag| tag.get(&"name".into())),
            Some(&Value::from("c"))
        );
        assert_eq!(
            tags.get(&second).and_then(|tag| tag.get(&"name".into())),
            Some(&Value::from("b"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_reports_missing_elements() -> TestResult {
        let store = MemoryStore::new();
        let policies = policies(&["tagging"], &["tagging"]);
        let mut document = post();
        let principal = Principal::from("luke");
        let missing = DocumentId::from("missing");

        let mut tags = Elements::new(
            ComponentResolver::new(&store, &policies),
            &mut document,
            "tags".into(),
        )?;

        let expected = AuthorizeError::NotFound {
            path: "tags".into(),
            id: missing.clone(),
        };
        assert_eq!(
            tags.remove(&principal, &missing).await,
            Err(expected.clone())
        );
        assert_eq!(
            tags.set(&principal, &missing, &json!({ "name": "x" }).into())
                .await,
            Err(expected)
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_gates_updates_on_the_enclosing_document() -> TestResult {
        let store = MemoryStore::new();
        let open = policies(&["tagging"], &["tagging"]);
        let closed = policies(&[], &["tagging"]);
        let mut document = post();
        let principal = Principal::from("luke");

        let id = Elements::new(
            ComponentResolver::new(&store, &open),
            &mut document,
            "tags".into(),
        )?
        .push(&principal, &json!({ "name": "a" }).into())
        .await?;

        let result = Elements::new(
            ComponentResolver::new(&store, &closed),
            &mut document,
            "tags".into(),
        )?
        .set(&principal, &id, &json!({ "name": "b" }).into())
        .await;

        assert_eq!(result, Err(AuthorizeError::PermissionDenied("tags".into())));
        Ok(())
    }

    #[tokio::test]
    async fn it_resolves_element_components_against_the_element() -> TestResult {
        let store = MemoryStore::new();
        let policies = policies(&["tagging"], &["tagging"]);
        let principal = Principal::from("luke");

        let schema = Schema::build("Tag")
            .field(
                "name",
                SchemaNode::leaf(ComponentSpec::computed(|tag: &Document| {
                    let locked = tag.get(&"locked".into()) == Some(&Value::Bool(true));
                    Some(Component::from(if locked { "curation" } else { "tagging" }))
                })),
            )
            .field("locked", SchemaNode::leaf("curation"))
            .finish();
        let post = Schema::build("Post")
            .field("tags", SchemaNode::subdocuments(schema.clone(), "tagging"))
            .finish();
        let mut document = Document::new("post", post).with(
            "tags",
            vec![
                Document::new("t1", schema.clone())
                    .with("name", "pinned")
                    .with("locked", true),
                Document::new("t2", schema)
                    .with("name", "draft")
                    .with("locked", false),
            ],
        );

        let mut tags = Elements::new(
            ComponentResolver::new(&store, &policies),
            &mut document,
            "tags".into(),
        )?;

        let locked = tags
            .set(&principal, &"t1".into(), &json!({ "name": "x" }).into())
            .await;
        tags.set(&principal, &"t2".into(), &json!({ "name": "final" }).into())
            .await?;

        assert_eq!(
            locked,
            Err(AuthorizeError::PermissionDenied("tags.t1.name".into()))
        );
        assert_eq!(
            tags.get(&"t1".into()).and_then(|tag| tag.get(&"name".into())),
            Some(&Value::from("pinned"))
        );
        assert_eq!(
            tags.get(&"t2".into()).and_then(|tag| tag.get(&"name".into())),
            Some(&Value::from("final"))
        );
        Ok(())
    }

    /// A component lookup that always fails.
    struct Unreachable;

    #[async_trait]
    impl ComponentFn for Unreachable {
        async fn component(&self, _document: &Document) -> Result<Option<Component>, ResolverError> {
            Err(ResolverError::Component("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn it_fails_pushes_when_a_computed_component_fails() -> TestResult {
        let store = MemoryStore::new();
        let policies = policies(&["tagging"], &["tagging"]);
        let schema = Schema::build("Tag")
            .field("name", SchemaNode::leaf(ComponentSpec::computed(Unreachable)))
            .finish();
        let post = Schema::build("Post")
            .field("tags", SchemaNode::subdocuments(schema, "tagging"))
            .finish();
        let mut document = Document::new("post", post);
        let before = document.clone();

        let result = Elements::new(
            ComponentResolver::new(&store, &policies),
            &mut document,
            "tags".into(),
        )?
        .push(&"luke".into(), &json!({ "name": "x" }).into())
        .await;

        assert_eq!(
            result,
            Err(AuthorizeError::Resolver(ResolverError::Component(
                "unreachable".into()
            )))
        );
        assert_eq!(document, before);
        Ok(())
    }

    #[test]
    fn it_only_opens_subdocument_arrays() {
        let store = MemoryStore::new();
        let policies = Policies::new();
        let mut document = post();

        let result = Elements::new(
            ComponentResolver::new(&store, &policies),
            &mut document,
            "title".into(),
        );

        assert!(matches!(
            result,
            Err(AuthorizeError::SchemaViolation { .. })
        ));
    }
}
