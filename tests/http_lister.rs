//! `HttpLister` against a local mock of the storage API

mod common;

use common::fixtures::{files_tree, id, mount};
use common::mock_api::{listing_body, MockApi};
use crater_files::services::listing::{
    DirectoryLister, HttpLister, ListingManager, ListingScope,
};
use crater_files::view::file_tree::ApplyResult;
use std::io;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn lister(api: &MockApi, scope: ListingScope, token: Option<&str>) -> HttpLister {
    HttpLister::new(&api.base_url, scope, token.map(str::to_string), TIMEOUT).unwrap()
}

#[tokio::test]
async fn test_root_listing_sends_bearer_token() {
    let body = listing_body(
        r#"[{"name": "q-lab1", "isdir": true, "size": 3, "modifytime": "2024-05-01T08:00:00Z"},
            {"name": "public", "isdir": true, "size": 0, "modifytime": "2024-05-01T08:00:00Z"}]"#,
    );
    let api = MockApi::start(&[("/api/v1/ss/files/", 200, body.as_str())]);

    let entries = lister(&api, ListingScope::Files, Some("t0ken"))
        .list_directory("")
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "q-lab1");
    assert!(entries[0].is_dir);
    assert_eq!(entries[0].size, 3);

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer t0ken"));
}

#[tokio::test]
async fn test_mistyped_entry_fields_read_as_zero() {
    let body = listing_body(
        r#"[{"name": "q-lab1", "isdir": true, "size": -1},
            {"name": "public", "isdir": "true", "size": 2}]"#,
    );
    let api = MockApi::start(&[("/api/v1/ss/files/", 200, body.as_str())]);

    let mut tree = files_tree();
    mount(&mut tree, &lister(&api, ListingScope::Files, None)).await;

    assert_eq!(tree.top_level().len(), 2);
    assert!(!tree.get_node(&id("q-lab1")).unwrap().has_children());
    let public = tree.get_node(&id("public")).unwrap();
    assert!(!public.is_dir());
    assert!(tree.expand(&id("public")).is_none());
}

#[tokio::test]
async fn test_scope_routes_and_nested_paths() {
    let body = listing_body(r#"[{"name": "train.csv", "isdir": false, "size": 10}]"#);
    let api = MockApi::start(&[
        ("/api/v1/ss/admin/files/admin-public/data", 200, body.as_str()),
        ("/api/v1/ss/rwfiles/q-lab1/my%20data", 200, body.as_str()),
    ]);

    let admin = lister(&api, ListingScope::Admin, None);
    assert_eq!(admin.list_directory("/admin-public/data").await.unwrap().len(), 1);

    let rw = lister(&api, ListingScope::RwFiles, None);
    assert_eq!(rw.list_directory("q-lab1/my data").await.unwrap().len(), 1);

    let requests = api.requests();
    assert!(requests.iter().all(|r| r.authorization.is_none()));
    assert_eq!(
        api.urls(),
        vec![
            "/api/v1/ss/admin/files/admin-public/data".to_string(),
            "/api/v1/ss/rwfiles/q-lab1/my%20data".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_null_data_is_empty_listing() {
    let api = MockApi::start(&[(
        "/api/v1/ss/files/u-alice",
        200,
        r#"{"code": 0, "data": null, "msg": "success"}"#,
    )]);

    let entries = lister(&api, ListingScope::Files, None)
        .list_directory("u-alice")
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_status_codes_map_to_error_kinds() {
    let api = MockApi::start(&[
        (
            "/api/v1/ss/files/secret",
            403,
            r#"{"code": 403, "data": null, "msg": "forbidden"}"#,
        ),
        ("/api/v1/ss/files/broken", 200, "<html>oops</html>"),
    ]);
    let lister = lister(&api, ListingScope::Files, None);

    let err = lister.list_directory("missing").await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
    assert!(err.to_string().contains("no such directory"));

    let err = lister.list_directory("secret").await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

    let err = lister.list_directory("broken").await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}

#[tokio::test]
async fn test_tree_over_http() {
    let root = listing_body(
        r#"[{"name": "q-lab1", "isdir": true, "size": 2}, {"name": "public", "isdir": true, "size": 0}]"#,
    );
    let lab = listing_body(
        r#"[{"name": "b.txt", "isdir": false, "size": 5}, {"name": "a", "isdir": true, "size": 0}]"#,
    );
    let api = MockApi::start(&[
        ("/api/v1/ss/files/", 200, root.as_str()),
        ("/api/v1/ss/files/q-lab1", 200, lab.as_str()),
    ]);
    let manager = ListingManager::with_cache_capacity(
        Arc::new(lister(&api, ListingScope::Files, Some("t0ken"))),
        8,
    );

    let mut tree = files_tree();
    mount(&mut tree, &manager).await;
    let outcome = tree.expand(&id("q-lab1")).unwrap().run(&manager).await;
    assert_eq!(tree.apply(outcome), ApplyResult::Applied);

    let children: Vec<_> = tree
        .get_node(&id("q-lab1"))
        .unwrap()
        .children()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(children, vec!["a", "b.txt"]);

    // Collapse and re-expand is served from the tree, not the network
    tree.collapse(&id("q-lab1"));
    assert!(tree.expand(&id("q-lab1")).is_none());
    assert_eq!(api.urls(), vec!["/api/v1/ss/files/", "/api/v1/ss/files/q-lab1"]);
}

#[tokio::test]
async fn test_connection_refused_is_an_error() {
    let port = {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        server.server_addr().to_ip().unwrap().port()
    };
    let lister = HttpLister::new(
        &format!("http://127.0.0.1:{}/api/v1", port),
        ListingScope::Files,
        None,
        TIMEOUT,
    )
    .unwrap();

    assert!(lister.list_directory("").await.is_err());
}

#[test]
fn test_rejects_non_http_base_url() {
    let err = HttpLister::new("ftp://storage.example", ListingScope::Files, None, TIMEOUT)
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
}
