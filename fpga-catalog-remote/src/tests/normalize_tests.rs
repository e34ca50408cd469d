use super::*;

use serde_json::json;

use crate::test_support::FakeRemote;

const HASH: &str = "a3f1c2d4e5b6a7980112233445566778899aabbccddeeff00112233445566778";

fn cancel(_: &str, _: &RemoteError) -> RetryDecision {
    RetryDecision::Cancel
}

fn nes_core() -> Value {
    json!({
        "name": "NES",
        "uniqueName": "nes",
        "systems": "nes",
        "releases": [{
            "version": "1.0",
            "files": [{ "url": "nes.rbf", "size": 4, "sha256": HASH, "type": "mister.core.rbf" }]
        }]
    })
}

fn mixed_catalog() -> FakeRemote {
    FakeRemote::new()
        .doc(
            "https://example.com/catalog.json",
            json!({
                "name": "Example",
                "uniqueName": "example",
                "version": "3",
                "cores": { "url": "cores/index.json", "version": "2" },
                "systems": {
                    "nes": { "name": "NES", "uniqueName": "nes" },
                    "snes": "systems/snes.json"
                },
                "releases": "releases.json"
            }),
        )
        .doc(
            "https://example.com/cores/index.json",
            json!({ "nes": { "url": "nes.json", "version": 7 } }),
        )
        .doc("https://example.com/cores/nes.json", nes_core())
        .doc(
            "https://example.com/systems/snes.json",
            json!({ "name": "SNES", "uniqueName": "snes" }),
        )
        .doc(
            "https://example.com/releases.json",
            json!({ "1fpga": "1fpga/releases.json" }),
        )
        .doc(
            "https://example.com/1fpga/releases.json",
            json!([{ "version": "0.2", "files": [] }, { "version": "0.3", "files": [] }]),
        )
}

#[tokio::test]
async fn resolves_every_reference_form() {
    let remote = mixed_catalog();
    let mut prompt = cancel;
    let outcome = fetch_and_normalize_catalog(&remote, &mut prompt, "https://example.com/catalog.json")
        .await
        .unwrap();
    let catalog = outcome.completed().unwrap();

    assert_eq!(catalog.url.as_deref(), Some("https://example.com/catalog.json"));
    assert_eq!(catalog.unique_name, "example");

    // Reference object: provenance carries the declared version.
    let cores = catalog.cores.as_ref().unwrap();
    assert_eq!(cores.url.as_deref(), Some("https://example.com/cores/index.json"));
    assert_eq!(cores.version.as_deref(), Some("2"));

    // Entries resolve against their container's URL; numeric versions are kept.
    let nes = catalog.core("nes").unwrap();
    assert_eq!(nes.url.as_deref(), Some("https://example.com/cores/nes.json"));
    assert_eq!(nes.version.as_deref(), Some("7"));

    // Inline values are tagged with their parent's URL.
    let systems = catalog.systems.as_ref().unwrap();
    assert_eq!(systems.url.as_deref(), Some("https://example.com/catalog.json"));
    assert_eq!(
        catalog.system("nes").unwrap().url.as_deref(),
        Some("https://example.com/catalog.json")
    );
    assert_eq!(
        catalog.system("snes").unwrap().url.as_deref(),
        Some("https://example.com/systems/snes.json")
    );

    // Release lists keep the provenance of the list on every release.
    let releases = catalog.releases_of("1fpga").unwrap();
    assert_eq!(releases.len(), 2);
    assert!(
        releases
            .iter()
            .all(|r| r.url.as_deref() == Some("https://example.com/1fpga/releases.json"))
    );
}

#[tokio::test]
async fn snapshot_survives_serialization() {
    let remote = mixed_catalog();
    let mut prompt = cancel;
    let catalog = fetch_and_normalize_catalog(&remote, &mut prompt, "https://example.com/catalog.json")
        .await
        .unwrap()
        .completed()
        .unwrap();

    let json = serde_json::to_string(&catalog).unwrap();
    let back: NormalizedCatalog = serde_json::from_str(&json).unwrap();
    assert_eq!(back, catalog);
}

#[tokio::test]
async fn key_must_match_unique_name() {
    let remote = FakeRemote::new().doc(
        "https://example.com/catalog.json",
        json!({
            "name": "Bad",
            "uniqueName": "bad",
            "version": 1,
            "systems": { "nes": { "name": "SNES", "uniqueName": "snes" } }
        }),
    );
    let mut prompt = cancel;
    let err = fetch_and_normalize_catalog(&remote, &mut prompt, "https://example.com/catalog.json")
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Validation(_)));
    // Validation failures never trigger a fallback.
    assert_eq!(remote.requests(), ["https://example.com/catalog.json"]);
}

#[tokio::test]
async fn schemeless_url_falls_back_to_catalog_json() {
    let remote = FakeRemote::new().doc(
        "https://example.com/catalog.json",
        json!({ "name": "Example", "uniqueName": "example", "version": 1 }),
    );
    let mut prompt = cancel;
    let outcome = fetch_and_normalize_catalog(&remote, &mut prompt, "example.com")
        .await
        .unwrap();
    assert!(outcome.completed().is_some());
    assert_eq!(
        remote.requests(),
        ["https://example.com/", "https://example.com/catalog.json"]
    );
}

#[tokio::test]
async fn http_falls_back_to_https() {
    let remote = FakeRemote::new().doc(
        "https://example.com/1fpga/catalog.json",
        json!({ "name": "Example", "uniqueName": "example", "version": 1 }),
    );
    let mut prompt = cancel;
    let outcome = fetch_and_normalize_catalog(&remote, &mut prompt, "http://example.com/1fpga/")
        .await
        .unwrap();
    assert!(outcome.completed().is_some());
    assert_eq!(
        remote.requests(),
        [
            "http://example.com/1fpga/",
            "http://example.com/1fpga/catalog.json",
            "https://example.com/1fpga/catalog.json",
        ]
    );
}

#[tokio::test]
async fn exhausted_fallbacks_propagate_the_error() {
    let remote = FakeRemote::new();
    let mut prompt = cancel;
    let err = fetch_and_normalize_catalog(&remote, &mut prompt, "https://example.com/catalog.json")
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 404, .. }));
}

#[tokio::test]
async fn nested_failures_ask_the_prompt() {
    let remote = mixed_catalog().failing("https://example.com/cores/nes.json", 2);
    let mut asked = Vec::new();
    let mut prompt = |url: &str, _: &RemoteError| {
        asked.push(url.to_string());
        RetryDecision::Retry
    };
    let outcome = fetch_and_normalize_catalog(&remote, &mut prompt, "https://example.com/catalog.json")
        .await
        .unwrap();
    assert!(outcome.completed().is_some());
    assert_eq!(asked.len(), 2);
}

#[tokio::test]
async fn cancelling_a_nested_fetch_cancels_everything() {
    let remote = mixed_catalog().failing("https://example.com/systems/snes.json", 1);
    let mut prompt = cancel;
    let outcome = fetch_and_normalize_catalog(&remote, &mut prompt, "https://example.com/catalog.json")
        .await
        .unwrap();
    assert!(outcome.is_cancelled());
    // No fallback URL is tried after a cancellation.
    assert!(
        !remote
            .requests()
            .iter()
            .any(|r| r.ends_with("catalog.json/catalog.json"))
    );
}

#[tokio::test]
async fn non_conforming_inline_value_is_rejected() {
    let remote = FakeRemote::new().doc(
        "https://example.com/catalog.json",
        json!({ "name": "Example", "uniqueName": "example", "version": 1, "cores": { "nes": 42 } }),
    );
    let mut prompt = cancel;
    let err = fetch_and_normalize_catalog(&remote, &mut prompt, "https://example.com/catalog.json")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
}

#[test]
fn fallback_order() {
    let url = Url::parse("http://example.com/x").unwrap();
    let first = fallback_url(&url).unwrap();
    assert_eq!(first.as_str(), "http://example.com/x/catalog.json");
    let second = fallback_url(&first).unwrap();
    assert_eq!(second.as_str(), "https://example.com/x/catalog.json");
    assert!(fallback_url(&second).is_none());
}

#[tokio::test]
async fn catalog_without_version_is_rejected() {
    let remote = FakeRemote::new().doc(
        "https://example.com/catalog.json",
        json!({ "name": "Example", "uniqueName": "example", "cores": {} }),
    );
    let mut prompt = cancel;
    let err = fetch_and_normalize_catalog(&remote, &mut prompt, "https://example.com/catalog.json")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    assert_eq!(remote.requests(), ["https://example.com/catalog.json"]);
}
