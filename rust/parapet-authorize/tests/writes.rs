//! Write-path behavior through the [`Authorizer`] facade: whole-document
//! writes, element operations on subdocument arrays and team-based grants.

use parapet_authorize::{AuthorizeError, Authorizer, Policy, WriteMode};
use parapet_document::{
    Action, ComponentSet, Document, MemoryStore, Principal, ResolverError, Schema, SchemaNode,
    Team, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use testresult::TestResult;

fn tag_schema() -> Arc<Schema> {
    Schema::build("Tag")
        .field("name", SchemaNode::leaf("tagging"))
        .field("secret", SchemaNode::hidden())
        .finish()
}

fn page() -> Document {
    let schema = Schema::build("Page")
        .field("name", SchemaNode::leaf("info"))
        .field("secret", SchemaNode::hidden())
        .field(
            "nested",
            SchemaNode::object([
                ("a", SchemaNode::leaf("info")),
                ("b", SchemaNode::leaf("admin")),
            ]),
        )
        .field("tags", SchemaNode::subdocuments(tag_schema(), "tagging"))
        .finish();

    Document::new("page", schema)
        .with("name", "Home")
        .with("secret", "hunter2")
        .with("nested", Value::object([("a", 0), ("b", 0)]))
        .with("tags", Vec::<Value>::new())
        .grant("editors", "write", "info")
        .grant("editors", "write", "tagging")
}

async fn authorizer() -> Authorizer<MemoryStore> {
    let store = MemoryStore::new();
    store.insert_team(Team::new("admins").user("zoe")).await;
    store
        .insert_team(Team::new("editors").user("hal").team("admins"))
        .await;

    Authorizer::new(store)
        .with_policy("Page", Policy::new().with_defaults("read", ["info"]))
        .with_policy("Tag", Policy::new().with_defaults("write", ["tagging"]))
}

#[tokio::test]
async fn it_expands_nested_teams_into_their_members() -> TestResult {
    let authorizer = authorizer().await;

    let members = authorizer.expand_users(&"editors".into()).await?;

    assert_eq!(
        members.into_iter().collect::<Vec<_>>(),
        vec![Principal::from("hal"), Principal::from("zoe")]
    );
    Ok(())
}

#[tokio::test]
async fn it_grants_components_through_nested_teams() -> TestResult {
    let authorizer = authorizer().await;
    let page = page();

    let components = authorizer
        .resolve_components(&page, &"zoe".into(), &Action::write())
        .await?;

    assert_eq!(components, ComponentSet::from_iter(["info", "tagging"]));
    Ok(())
}

#[tokio::test]
async fn it_omits_documents_nothing_of_which_is_readable() -> TestResult {
    let authorizer = Authorizer::new(MemoryStore::new());

    let projection = authorizer.project(&page(), &"nobody".into()).await?;

    assert_eq!(projection, None);
    Ok(())
}

#[tokio::test]
async fn it_projects_the_identity_with_readable_fields() -> TestResult {
    let authorizer = authorizer().await;

    let projection = authorizer.project(&page(), &"nobody".into()).await?;

    assert_eq!(
        projection,
        Some(json!({ "_id": "page", "name": "Home", "nested": { "a": 0 } }))
    );
    Ok(())
}

#[tokio::test]
async fn it_denies_writes_to_unguarded_fields() -> TestResult {
    let authorizer = authorizer().await;
    let mut page = page();
    let before = page.clone();

    let result = authorizer
        .authorize_write(
            &mut page,
            &"hal".into(),
            &json!({ "secret": "x" }).into(),
            WriteMode::Merge,
        )
        .await;

    assert_eq!(result, Err(AuthorizeError::PermissionDenied("secret".into())));
    assert_eq!(page, before);
    assert_eq!(page.get(&"secret".into()), Some(&Value::from("hunter2")));
    Ok(())
}

#[tokio::test]
async fn it_denies_writes_to_outsiders() -> TestResult {
    let authorizer = authorizer().await;
    let mut page = page();
    let before = page.clone();

    let result = authorizer
        .authorize_write(
            &mut page,
            &"mallory".into(),
            &json!({ "name": "Pwned" }).into(),
            WriteMode::Merge,
        )
        .await;

    assert_eq!(result, Err(AuthorizeError::PermissionDenied("name".into())));
    assert_eq!(page, before);
    Ok(())
}

#[tokio::test]
async fn it_merges_nested_input_path_by_path() -> TestResult {
    let authorizer = authorizer().await;
    let mut page = page();

    authorizer
        .authorize_write(
            &mut page,
            &"hal".into(),
            &json!({ "nested": { "a": 1 } }).into(),
            WriteMode::Merge,
        )
        .await?;

    assert_eq!(page.get(&"nested.a".into()), Some(&Value::from(1)));
    assert_eq!(page.get(&"nested.b".into()), Some(&Value::from(0)));
    assert_eq!(page.get(&"name".into()), Some(&Value::from("Home")));
    Ok(())
}

#[tokio::test]
async fn it_leaves_the_document_untouched_when_a_nested_path_fails() -> TestResult {
    let authorizer = authorizer().await;
    let mut page = page();
    let before = page.clone();

    let result = authorizer
        .authorize_write(
            &mut page,
            &"hal".into(),
            &json!({ "name": "New", "nested": { "a": 1, "b": 1 } }).into(),
            WriteMode::Merge,
        )
        .await;

    assert_eq!(
        result,
        Err(AuthorizeError::PermissionDenied("nested.b".into()))
    );
    assert_eq!(page, before);
    Ok(())
}

#[tokio::test]
async fn it_rejects_direct_writes_to_subdocument_arrays() -> TestResult {
    let authorizer = authorizer().await;
    let mut page = page();
    let before = page.clone();

    let result = authorizer
        .authorize_write(
            &mut page,
            &"hal".into(),
            &json!({ "tags": [{ "name": "x" }] }).into(),
            WriteMode::Merge,
        )
        .await;

    assert!(matches!(
        result,
        Err(AuthorizeError::SchemaViolation { ref path, .. }) if path.to_string() == "tags"
    ));
    assert_eq!(page, before);
    Ok(())
}

#[tokio::test]
async fn it_overwrites_every_writable_path() -> TestResult {
    let authorizer = authorizer().await;
    let mut page = page();
    let tagged = authorizer
        .elements(&mut page, "tags")?
        .push(&"hal".into(), &json!({ "name": "kept" }).into())
        .await?;

    authorizer
        .authorize_write(
            &mut page,
            &"hal".into(),
            &json!({ "name": "Fresh" }).into(),
            WriteMode::Overwrite,
        )
        .await?;

    assert_eq!(page.get(&"name".into()), Some(&Value::from("Fresh")));
    assert_eq!(page.get(&"nested.a".into()), None);
    assert_eq!(page.get(&"nested.b".into()), Some(&Value::from(0)));
    assert_eq!(page.get(&"secret".into()), Some(&Value::from("hunter2")));
    assert_eq!(authorizer.elements(&mut page, "tags")?.ids(), vec![tagged]);
    Ok(())
}

#[tokio::test]
async fn it_rejects_pushes_with_unauthorized_content() -> TestResult {
    let authorizer = authorizer().await;
    let mut page = page();
    let before = page.clone();

    let result = authorizer
        .elements(&mut page, "tags")?
        .push(&"hal".into(), &json!({ "name": "x", "secret": "y" }).into())
        .await;

    assert_eq!(
        result,
        Err(AuthorizeError::PermissionDenied("tags.secret".into()))
    );
    assert_eq!(authorizer.elements(&mut page, "tags")?.len(), 0);
    assert_eq!(page, before);
    Ok(())
}

#[tokio::test]
async fn it_restores_the_array_when_a_pushed_element_is_removed() -> TestResult {
    let authorizer = authorizer().await;
    let mut page = page();
    let principal = Principal::from("zoe");

    authorizer
        .elements(&mut page, "tags")?
        .push(&principal, &json!({ "name": "first" }).into())
        .await?;
    let before = page.clone();

    let mut tags = authorizer.elements(&mut page, "tags")?;
    let id = tags
        .push(&principal, &json!({ "name": "second" }).into())
        .await?;
    assert_eq!(tags.len(), 2);
    tags.remove(&principal, &id).await?;

    assert_eq!(page, before);
    Ok(())
}

#[tokio::test]
async fn it_updates_a_single_element() -> TestResult {
    let authorizer = authorizer().await;
    let mut page = page();
    let principal = Principal::from("hal");

    let mut tags = authorizer.elements(&mut page, "tags")?;
    let id = tags
        .push(&principal, &json!({ "name": "draft" }).into())
        .await?;
    tags.set(&principal, &id, &json!({ "name": "final" }).into())
        .await?;

    let missing = tags
        .set(&principal, &"nope".into(), &json!({ "name": "x" }).into())
        .await;

    assert_eq!(
        missing,
        Err(AuthorizeError::NotFound {
            path: "tags".into(),
            id: "nope".into(),
        })
    );
    assert_eq!(
        tags.get(&id).and_then(|tag| tag.get(&"name".into())),
        Some(&Value::from("final"))
    );
    Ok(())
}

#[tokio::test]
async fn it_fails_writes_when_a_team_cannot_be_resolved() -> TestResult {
    let authorizer = Authorizer::new(MemoryStore::new());
    let mut page = page();
    let before = page.clone();

    let result = authorizer
        .authorize_write(
            &mut page,
            &"hal".into(),
            &json!({ "name": "x" }).into(),
            WriteMode::Merge,
        )
        .await;

    assert_eq!(
        result,
        Err(AuthorizeError::Resolver(ResolverError::UnknownTeam(
            "editors".into()
        )))
    );
    assert_eq!(page, before);
    Ok(())
}
