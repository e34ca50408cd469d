use super::*;

use std::collections::BTreeMap;

fn release(version: &str) -> NormalizedRelease {
    Normalized::bare(Release {
        files: vec![],
        version: Some(Version::from(version)),
        tags: vec![],
    })
}

fn core(name: &str, ref_version: Option<&str>) -> NormalizedCore {
    Normalized::new(
        Core {
            name: name.to_uppercase(),
            unique_name: name.to_string(),
            description: None,
            releases: vec![],
            systems: SystemRefs::One(name.to_string()),
            tags: vec![],
        },
        Some(format!("https://example.com/cores/{name}.json")),
        ref_version.map(str::to_string),
    )
}

fn system(name: &str, ref_version: Option<&str>) -> NormalizedSystem {
    Normalized::new(
        System {
            name: name.to_uppercase(),
            unique_name: name.to_string(),
            description: None,
            db: None,
            games_db: None,
        },
        Some(format!("https://example.com/systems/{name}.json")),
        ref_version.map(str::to_string),
    )
}

fn catalog(
    version: &str,
    cores: Vec<NormalizedCore>,
    systems: Vec<NormalizedSystem>,
    releases: Vec<(&str, Vec<NormalizedRelease>)>,
) -> NormalizedCatalog {
    let cores: BTreeMap<_, _> = cores
        .into_iter()
        .map(|c| (c.unique_name.clone(), c))
        .collect();
    let systems: BTreeMap<_, _> = systems
        .into_iter()
        .map(|s| (s.unique_name.clone(), s))
        .collect();
    let releases: BTreeMap<_, _> = releases
        .into_iter()
        .map(|(name, list)| (name.to_string(), list))
        .collect();
    Normalized::new(
        CatalogSnapshot {
            name: "Test".into(),
            unique_name: "test".into(),
            version: Version::from(version),
            cores: Some(Normalized::new(
                cores,
                Some(format!("https://example.com/{version}/cores.json")),
                None,
            )),
            systems: Some(Normalized::new(
                systems,
                Some("https://example.com/systems.json".into()),
                None,
            )),
            releases: Some(Normalized::new(
                releases,
                Some("https://example.com/releases.json".into()),
                None,
            )),
        },
        Some("https://example.com/catalog.json".into()),
        None,
    )
}

#[test]
fn no_latest_means_nothing_to_update() {
    let current = catalog("1", vec![core("nes", Some("1"))], vec![], vec![]);
    let result = diff(&current, None);
    assert!(result.is_empty());
    assert_eq!(result.unique_name, "test");
    assert!(result.cores.as_ref().is_some_and(|c| c.is_empty()));
}

#[test]
fn diff_against_itself_is_empty() {
    let c = catalog(
        "3",
        vec![core("nes", Some("2"))],
        vec![system("nes", Some("1"))],
        vec![("1fpga", vec![release("1.0")])],
    );
    let result = diff(&c, Some(&c));
    assert!(result.is_empty());
    assert!(result.cores.as_ref().is_some_and(|x| x.is_empty()));
    assert!(result.systems.as_ref().is_some_and(|x| x.is_empty()));
    assert!(result.releases.as_ref().is_some_and(|x| x.is_empty()));
    assert_eq!(result.unique_name, c.unique_name);
    assert_eq!(result.value.version, c.value.version);
}

#[test]
fn older_or_equal_latest_yields_empty_containers() {
    let current = catalog("2", vec![core("nes", Some("1"))], vec![], vec![]);
    let latest = catalog("2", vec![core("nes", Some("5"))], vec![], vec![]);
    assert!(diff(&current, Some(&latest)).is_empty());

    let older = catalog("1", vec![core("nes", Some("5"))], vec![], vec![]);
    let result = diff(&current, Some(&older));
    assert!(result.is_empty());
    assert_eq!(result.value.version, Version::from("1"));
}

#[test]
fn only_strictly_newer_entries_are_kept() {
    let current = catalog(
        "1",
        vec![core("nes", Some("1.0")), core("snes", Some("2.0"))],
        vec![system("nes", Some("1"))],
        vec![],
    );
    let latest = catalog(
        "2",
        vec![core("nes", Some("1.1")), core("snes", Some("2.0"))],
        vec![system("nes", Some("1"))],
        vec![],
    );
    let result = diff(&current, Some(&latest));
    let cores = result.cores.as_ref().unwrap();
    assert_eq!(cores.keys().collect::<Vec<_>>(), ["nes"]);
    assert!(result.systems.as_ref().unwrap().is_empty());
}

#[test]
fn entries_missing_from_current_are_always_new() {
    let current = catalog("1", vec![], vec![], vec![]);
    let latest = catalog(
        "2",
        vec![core("gba", None)],
        vec![system("gba", None)],
        vec![],
    );
    let result = diff(&current, Some(&latest));
    assert!(result.core("gba").is_some());
    assert!(result.system("gba").is_some());
}

#[test]
fn release_lists_compare_their_latest_release() {
    let current = catalog(
        "1",
        vec![],
        vec![],
        vec![
            ("1fpga", vec![release("0.1"), release("0.2")]),
            ("tools", vec![release("3.0")]),
        ],
    );
    let latest = catalog(
        "2",
        vec![],
        vec![],
        vec![
            ("1fpga", vec![release("0.2"), release("0.3")]),
            ("tools", vec![release("3.0"), release("2.9")]),
        ],
    );
    let result = diff(&current, Some(&latest));
    assert_eq!(result.releases_of("1fpga").map(<[_]>::len), Some(2));
    assert!(result.releases_of("tools").is_none());
}

#[test]
fn container_provenance_comes_from_latest() {
    let current = catalog("1", vec![], vec![], vec![]);
    let latest = catalog("2", vec![core("nes", None)], vec![], vec![]);
    let result = diff(&current, Some(&latest));
    assert_eq!(
        result.cores.as_ref().unwrap().url.as_deref(),
        Some("https://example.com/2/cores.json")
    );
    assert_eq!(result.url, latest.url);
}

#[test]
fn applying_everything_promotes_latest() {
    let current = catalog("1", vec![core("nes", Some("1"))], vec![], vec![]);
    let latest = catalog(
        "2",
        vec![core("nes", Some("2"))],
        vec![system("nes", None)],
        vec![],
    );
    let applied = AppliedEntries {
        cores: ["nes".to_string()].into(),
        systems: ["nes".to_string()].into(),
        releases: Default::default(),
    };
    let folded = merge_applied(&current, &latest, &applied);
    assert_eq!(folded.current, latest);
    assert!(folded.pending.is_none());
}

#[test]
fn partial_apply_keeps_the_rest_pending() {
    let current = catalog(
        "1",
        vec![core("nes", Some("1")), core("snes", Some("1"))],
        vec![],
        vec![],
    );
    let latest = catalog(
        "2",
        vec![core("nes", Some("2")), core("snes", Some("2"))],
        vec![],
        vec![],
    );
    let applied = AppliedEntries {
        cores: ["nes".to_string()].into(),
        ..Default::default()
    };
    let folded = merge_applied(&current, &latest, &applied);

    assert_eq!(folded.pending.as_ref(), Some(&latest));
    assert_eq!(folded.current.value.version, Version::from("1"));
    assert_eq!(
        folded.current.core("nes").and_then(|c| c.version.clone()),
        Some("2".to_string())
    );

    let remaining = diff(&folded.current, folded.pending.as_ref());
    assert_eq!(
        remaining.cores.as_ref().unwrap().keys().collect::<Vec<_>>(),
        ["snes"]
    );
}
