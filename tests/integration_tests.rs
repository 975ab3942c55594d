// Integration tests for upgrade-planner
//
// These tests drive the public API end to end from JSON documents:
// - repository mapping load + target repository resolution
// - package event decompression + transaction planning
// - whole-pipeline plan assembly

use serde_json::{Value, json};
use std::collections::BTreeSet;

use upgrade_planner::{
    Architecture, Channel, DefaultFamilies, Diagnostic, InstalledPackage, ModuleStream,
    PackageEventCatalog, Release, RepositoryCatalog, RepositoryResolver, SystemFacts,
    UpgradeContext, UpgradeError, load_catalogs, plan, plan_upgrade,
};

fn repo(repoid: &str, major: &str, channel: &str, rhui: &str) -> Value {
    json!({
        "repoid": repoid, "arch": "x86_64", "major_version": major,
        "repo_type": "rpm", "channel": channel, "rhui": rhui
    })
}

fn repomap() -> Value {
    json!({
        "version_format": "1.0.0",
        "repositories": [
            { "pesid": "rhel8-base", "entries": [
                repo("rhel-8-for-x86_64-baseos-rpms", "8", "ga", ""),
                repo("rhel-8-for-x86_64-baseos-rhui-rpms", "8", "ga", "aws"),
            ]},
            { "pesid": "rhel8-appstream", "entries": [
                repo("rhel-8-for-x86_64-appstream-rpms", "8", "ga", ""),
            ]},
            { "pesid": "rhel9-baseos", "entries": [
                repo("rhel-9-for-x86_64-baseos-rpms", "9", "ga", ""),
                repo("rhel-9-for-x86_64-baseos-eus-rpms", "9", "eus", ""),
                repo("rhel-9-for-x86_64-baseos-rhui-rpms", "9", "ga", "aws"),
            ]},
            { "pesid": "rhel9-appstream", "entries": [
                repo("rhel-9-for-x86_64-appstream-rpms", "9", "ga", ""),
                repo("rhel-9-for-x86_64-appstream-beta-rpms", "9", "beta", ""),
            ]},
            { "pesid": "rhel9-crb", "entries": [
                repo("codeready-builder-for-rhel-9-x86_64-rpms", "9", "ga", ""),
            ]},
        ],
        "mapping": [
            { "source_major_version": "8", "target_major_version": "9", "entries": [
                { "source": "rhel8-base", "target": ["rhel9-baseos", "rhel9-appstream"] },
                { "source": "rhel8-appstream", "target": ["rhel9-appstream"] },
            ]},
        ],
    })
}

fn release(major: u32, minor: u32) -> Value {
    json!({ "major_version": major, "minor_version": minor })
}

fn events_document() -> Value {
    json!({ "packageinfo": [
        {
            "id": 10, "action": 4,
            "in_packageset": { "package": [
                { "name": "pkgOld", "repository": "rhel8-base", "modulestreams": [null] }
            ]},
            "out_packageset": { "package": [
                { "name": "pkgNew1", "repository": "rhel9-baseos", "modulestreams": [null] },
                { "name": "pkgNew2", "repository": "rhel9-crb", "modulestreams": [null] }
            ]},
            "initial_release": release(8, 10), "release": release(9, 0),
            "architectures": []
        },
        {
            "id": 11, "action": 1,
            "in_packageset": { "package": [
                { "name": "s390utils-extra", "repository": "rhel8-base", "modulestreams": [null] }
            ]},
            "out_packageset": null,
            "initial_release": release(8, 10), "release": release(9, 0),
            "architectures": ["s390x"]
        },
        {
            "id": 12, "action": 3,
            "in_packageset": { "package": [
                { "name": "postgresql", "repository": "rhel8-appstream",
                  "modulestreams": [ { "name": "postgresql", "stream": "12" },
                                     { "name": "postgresql", "stream": "13" } ] }
            ]},
            "out_packageset": { "package": [
                { "name": "postgresql", "repository": "rhel9-appstream",
                  "modulestreams": [ { "name": "postgresql", "stream": "15" } ] },
                { "name": "postgresql16", "repository": "rhel9-appstream",
                  "modulestreams": [ { "name": "postgresql", "stream": "16" } ] }
            ]},
            "initial_release": release(8, 10), "release": release(9, 2),
            "architectures": [],
            "modulestream_maps": [
                { "in_modulestream": { "name": "postgresql", "stream": "12" },
                  "out_modulestream": { "name": "postgresql", "stream": "15" } },
                { "in_modulestream": { "name": "postgresql", "stream": "13" },
                  "out_modulestream": { "name": "postgresql", "stream": "16" } }
            ]
        },
        {
            "id": 13, "action": 1,
            "in_packageset": { "package": [
                { "name": "python2", "repository": "rhel8-appstream", "modulestreams": [null] }
            ]},
            "out_packageset": null,
            "initial_release": release(8, 10), "release": release(9, 6),
            "architectures": []
        }
    ]})
}

fn catalogs() -> (RepositoryCatalog, PackageEventCatalog) {
    (
        RepositoryCatalog::load(&repomap(), DefaultFamilies::default()).unwrap(),
        PackageEventCatalog::parse(&events_document()).unwrap(),
    )
}

fn context() -> UpgradeContext {
    UpgradeContext::new(Release::new(8, 10), Release::new(9, 4), Architecture::X86_64)
}

#[test]
fn test_mapping_targets_are_backed_by_records() {
    let (repositories, _) = catalogs();
    let mapping = repositories.mapping_for("8", "9").unwrap();
    for entry in &mapping {
        let mut sorted = entry.targets.clone();
        sorted.sort();
        assert_eq!(entry.targets, sorted);
        for target in &entry.targets {
            assert!(!repositories.families_at(target, "9").is_empty());
        }
    }
    assert!(repositories.mapping_for("9", "10").is_none());
}

#[test]
fn test_base_maps_to_ga_baseos() {
    let (repositories, _) = catalogs();
    let ctx = context();
    let resolver = RepositoryResolver::new(&repositories, &ctx);

    let source = resolver
        .resolve_by_repoid("rhel-8-for-x86_64-baseos-rpms", "8", "")
        .unwrap();
    assert_eq!(source.channel, Channel::Ga);
    assert_eq!(
        repositories.targets_of(&source.pesid, "8", "9"),
        vec!["rhel9-appstream", "rhel9-baseos"]
    );

    let chosen = resolver.resolve_equivalent(source, "rhel9-baseos").unwrap();
    assert_eq!(chosen.repoid, "rhel-9-for-x86_64-baseos-rpms");
    assert_eq!(chosen.channel, Channel::Ga);

    // same inputs, same answer
    let again = resolver.resolve_equivalent(source, "rhel9-baseos").unwrap();
    assert_eq!(chosen, again);
}

#[test]
fn test_cloud_system_stays_on_its_mirror() {
    let (repositories, _) = catalogs();
    let ctx = context().with_cloud_provider("aws");
    let resolver = RepositoryResolver::new(&repositories, &ctx);

    let plan = resolver.plan_target_repos(&["rhel-8-for-x86_64-baseos-rhui-rpms"]);
    assert_eq!(
        plan.targets["rhel9-baseos"].as_ref().unwrap().repoid,
        "rhel-9-for-x86_64-baseos-rhui-rpms"
    );
    assert_eq!(plan.unresolved(), vec!["rhel9-appstream"]);
    assert_eq!(
        plan.diagnostics,
        vec![Diagnostic::MissingTargetRepository {
            pesid: "rhel9-appstream".into()
        }]
    );
}

#[test]
fn test_split_event_plan() {
    let (_, events) = catalogs();
    let installed: BTreeSet<String> = ["pkgOld".to_string()].into_iter().collect();
    let transaction = plan(events.events(), &installed);

    assert_eq!(
        transaction.to_remove.iter().collect::<Vec<_>>(),
        vec!["pkgOld"]
    );
    assert_eq!(
        transaction.to_install.iter().collect::<Vec<_>>(),
        vec!["pkgNew1", "pkgNew2"]
    );
}

#[test]
fn test_module_streams_decompress_into_separate_events() {
    let (_, events) = catalogs();
    let postgres: Vec<_> = events.events().iter().filter(|e| e.id == 12).collect();
    assert_eq!(postgres.len(), 2);

    let streams = |e: &upgrade_planner::PackageEvent, inputs: bool| -> Vec<String> {
        let pkgs = if inputs { &e.in_packages } else { &e.out_packages };
        pkgs.iter()
            .map(|p| p.modulestream.as_ref().unwrap().to_string())
            .collect()
    };
    assert_eq!(streams(postgres[0], true), vec!["postgresql:12"]);
    assert_eq!(streams(postgres[0], false), vec!["postgresql:15"]);
    assert_eq!(streams(postgres[1], true), vec!["postgresql:13"]);
    assert_eq!(streams(postgres[1], false), vec!["postgresql:16"]);
}

#[test]
fn test_full_upgrade_plan() {
    let (repositories, events) = catalogs();
    let ctx = context();
    let facts = SystemFacts {
        enabled_repoids: vec![
            "rhel-8-for-x86_64-baseos-rpms".into(),
            "rhel-8-for-x86_64-appstream-rpms".into(),
            "epel-8".into(),
        ],
        installed: [
            InstalledPackage::new("pkgOld"),
            InstalledPackage::new("postgresql").with_stream(ModuleStream::new("postgresql", "13")),
            InstalledPackage::new("python2"),
        ]
        .into_iter()
        .collect(),
    };

    let upgrade = plan_upgrade(&repositories, &events, &ctx, &facts);

    // python2 removal lands in 9.6, outside the 8.10 -> 9.4 window
    assert_eq!(
        upgrade.transaction.to_remove.iter().collect::<Vec<_>>(),
        vec!["pkgOld", "postgresql"]
    );
    assert_eq!(
        upgrade.transaction.to_install.iter().collect::<Vec<_>>(),
        vec!["pkgNew1", "pkgNew2", "postgresql16"]
    );
    assert_eq!(
        upgrade.target_repoids(),
        vec![
            "codeready-builder-for-rhel-9-x86_64-rpms",
            "rhel-9-for-x86_64-appstream-rpms",
            "rhel-9-for-x86_64-baseos-rpms",
        ]
    );
    assert!(upgrade.diagnostics.contains(&Diagnostic::UnknownSourceRepository {
        repoid: "epel-8".into()
    }));
    assert!(upgrade.diagnostics.contains(&Diagnostic::ForeignArchitectureEvent {
        event_id: 11,
        architecture: Architecture::X86_64
    }));

    let json = serde_json::to_value(&upgrade).unwrap();
    assert_eq!(json["source"], "8.10");
    assert_eq!(json["target"], "9.4");
    assert_eq!(json["transaction"]["to_remove"], json!(["pkgOld", "postgresql"]));
}

#[test]
fn test_facts_deserialize_from_json() {
    let facts: SystemFacts = serde_json::from_value(json!({
        "enabled_repoids": ["rhel-8-for-x86_64-baseos-rpms"],
        "installed": [
            { "name": "bash" },
            { "name": "nodejs", "modulestream": { "name": "nodejs", "stream": "18" } }
        ]
    }))
    .unwrap();
    assert_eq!(facts.installed.len(), 2);
    assert!(facts.installed.contains(&InstalledPackage::new("bash")));
}

#[test]
fn test_load_catalogs_checks_upgrade_path() {
    let repomap_text = repomap().to_string();
    let events_text = events_document().to_string();

    let (repositories, events) = load_catalogs(&repomap_text, &events_text, &context()).unwrap();
    assert!(repositories.mapping_for("8", "9").is_some());
    assert_eq!(events.len(), 5);

    let ctx = UpgradeContext::new(Release::new(7, 9), Release::new(8, 10), Architecture::X86_64);
    let err = load_catalogs(&repomap_text, &events_text, &ctx).unwrap_err();
    assert!(matches!(err, UpgradeError::Context(_)));

    let err = load_catalogs("{}", &events_text, &context()).unwrap_err();
    assert!(matches!(err, UpgradeError::Config(_)));

    let err = load_catalogs(&repomap_text, r#"{"packageinfo": 3}"#, &context()).unwrap_err();
    assert!(matches!(err, UpgradeError::Parse(_)));
}

#[test]
fn test_foreign_arch_events_outside_window_are_not_reported() {
    let repositories = RepositoryCatalog::load(&repomap(), DefaultFamilies::default()).unwrap();
    let events = PackageEventCatalog::parse(&json!({ "packageinfo": [
        {
            "id": 99, "action": 1,
            "in_packageset": { "package": [
                { "name": "s390utils-old", "repository": "rhel7-base", "modulestreams": [null] }
            ]},
            "out_packageset": null,
            "initial_release": release(7, 9), "release": release(8, 0),
            "architectures": ["s390x"]
        },
        {
            "id": 100, "action": 1,
            "in_packageset": { "package": [
                { "name": "s390utils-extra", "repository": "rhel8-base", "modulestreams": [null] }
            ]},
            "out_packageset": null,
            "initial_release": release(8, 10), "release": release(9, 2),
            "architectures": ["s390x"]
        }
    ]}))
    .unwrap();

    let upgrade = plan_upgrade(&repositories, &events, &context(), &SystemFacts::default());
    assert_eq!(
        upgrade.diagnostics,
        vec![Diagnostic::ForeignArchitectureEvent {
            event_id: 100,
            architecture: Architecture::X86_64
        }]
    );
    assert!(upgrade.transaction.is_empty());
}

#[test]
fn test_facts_parse_errors_are_typed() {
    let text = r#"{ "enabled_repoids": ["rhel-8-for-x86_64-baseos-rpms"] }"#;
    let facts = SystemFacts::from_json_str(text).unwrap();
    assert_eq!(facts.enabled_repoids.len(), 1);
    assert!(facts.installed.is_empty());

    let err = SystemFacts::from_json_str(r#"{ "installed": "bash" }"#).unwrap_err();
    assert!(matches!(err, UpgradeError::Json(_)));
}
