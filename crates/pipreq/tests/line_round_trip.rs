//! Parsing and rendering of requirement lines and structured entries.

mod common;

use pipreq::formatter::placeholder_name;
use pipreq::{
    LineOptions, LineParser, Requirement, RequirementCache, RequirementError, parse_entries_table,
};
use pipreq_core::VcsKind;
use std::collections::HashSet;

fn render(req: &Requirement) -> String {
    req.as_line(&LineOptions::default())
}

fn assert_round_trip(line: &str) {
    let req = Requirement::from_line(line).unwrap();
    let rendered = render(&req);
    let reparsed = Requirement::from_line(&rendered).unwrap();
    assert_eq!(reparsed, req, "round trip changed {line}");
    assert_eq!(render(&reparsed), rendered, "rendering of {line} is not idempotent");
}

#[test]
fn test_editable_vcs_line() {
    common::init_tracing();
    let req =
        Requirement::from_line("-e git+https://example.com/x.git@abc123#egg=x[extra1,extra2]")
            .unwrap();

    assert!(req.editable());
    assert!(req.is_vcs());
    assert_eq!(req.name(), "x");
    assert_eq!(req.extras().to_vec(), vec!["extra1", "extra2"]);

    let pipreq::RequirementVariant::Vcs(vcs) = req.variant() else {
        panic!("expected a VCS requirement");
    };
    assert_eq!(vcs.vcs(), VcsKind::Git);
    assert_eq!(vcs.declared_ref(), Some("abc123"));
    assert!(vcs.resolved_commit().is_none());

    assert_eq!(
        req.as_line(&LineOptions::default().without_hashes()),
        "-e git+https://example.com/x.git@abc123#egg=x[extra1,extra2]"
    );
}

#[test]
fn test_named_with_specifiers() {
    let req = Requirement::from_line("requests>=2.0,<3").unwrap();
    assert!(req.is_named());
    assert_eq!(req.name(), "requests");
    assert!(req.extras().is_empty());
    assert_eq!(
        req.specifiers().unwrap().as_pairs(),
        vec![(">=", "2.0"), ("<", "3")]
    );
}

#[test]
fn test_arbitrary_equality_pin() {
    let req = Requirement::from_line("legacy-tool===1.0-custom").unwrap();
    assert_eq!(req.version().as_deref(), Some("1.0-custom"));
    insta::assert_snapshot!(render(&req), @"legacy-tool===1.0-custom");
}

#[test]
fn test_round_trips() {
    for line in [
        "requests",
        "requests[socks,security]>=2.0,<3",
        "pywin32==306 ; sys_platform == 'win32'",
        "six==1.16.0 --hash=sha256:1e61c37477a1626458e36f7b1d82aa5c9b094fa4802892072e49de9c60c4c926",
        "git+https://github.com/psf/requests.git@v2.31.0#egg=requests",
        "-e hg+https://hg.example.com/repo@default#egg=repo&subdirectory=src",
        "git+git@github.com:sarugaku/vistir.git@v0.4#egg=vistir",
        "https://example.com/pkg-1.0.tar.gz#egg=pkg[extra]",
        "https://files.example.com/six-1.16.0-py2.py3-none-any.whl",
        "pkg[extra] @ https://example.com/pkg-1.0.tar.gz ; python_version >= '3.8'",
        r#"pkg ; platform_version == "it's""#,
    ] {
        assert_round_trip(line);
    }
}

#[test]
fn test_marker_value_with_apostrophe_keeps_double_quotes() {
    let req = Requirement::from_line(r#"pkg ; platform_version == "it's""#).unwrap();
    insta::assert_snapshot!(render(&req), @r#"pkg ; platform_version == "it's""#);

    let (_, entry) = req.as_structured_entry();
    assert_eq!(entry.markers.as_deref(), Some(r#"platform_version == "it's""#));
}

#[test]
fn test_comment_and_whitespace_are_dropped() {
    let req = Requirement::from_line("  requests>=2.0   # pinned for py2").unwrap();
    assert_eq!(render(&req), "requests>=2.0");
}

#[test]
fn test_missing_identity() {
    let err = Requirement::from_line("git+https://example.com/repo.git").unwrap_err();
    assert!(matches!(err, RequirementError::MissingIdentity { .. }));
    assert!(err.to_string().contains("#egg"));
}

#[test]
fn test_invalid_markers_rejected() {
    let err = Requirement::from_line("requests ; python_version >>> '3'").unwrap_err();
    assert!(matches!(err, RequirementError::InvalidMarkers { .. }));
}

#[test]
fn test_unbalanced_brackets_rejected() {
    let err = Requirement::from_line("requests[socks").unwrap_err();
    assert!(matches!(err, RequirementError::Parse { .. }));
}

#[test]
fn test_placeholders_are_distinct() {
    let first = "https://example.com/one/archive/master.zip";
    let second = "https://example.com/two/archive/master.zip";
    let a = Requirement::from_line(first).unwrap();
    let b = Requirement::from_line(second).unwrap();

    assert_eq!(a.name(), placeholder_name(first));
    assert_eq!(a.name().len(), 7);
    assert_ne!(a.name(), b.name());
    assert_ne!(a, b);

    let source = a.variant().source().unwrap();
    assert!(source.is_placeholder());
}

#[test]
fn test_equal_requirements_hash_equal() {
    let lines = [
        "Requests[socks,security]>=2.0",
        "requests[security,socks]>=2.0",
        "pkg @ https://example.com/pkg-1.0.tar.gz",
        "https://example.com/pkg-1.0.tar.gz#egg=pkg",
    ];
    let set: HashSet<Requirement> = lines
        .iter()
        .map(|line| Requirement::from_line(line).unwrap())
        .collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn test_local_path_requires_build_descriptor() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("empty-dir")).unwrap();
    let parser = LineParser::with_base_dir(root.path());

    let err = Requirement::parse_with(&parser, "./empty-dir").unwrap_err();
    assert!(matches!(err, RequirementError::Parse { .. }));

    common::legacy_project(root.path(), "local-pkg");
    let req = Requirement::parse_with(&parser, "local-pkg[dev]").unwrap();
    assert!(req.is_file_or_url());
    assert!(req.is_local());
    assert_eq!(render(&req), "./local-pkg[dev]");
}

#[test]
fn test_cache_reuses_parsed_requirement() {
    let mut cache = RequirementCache::with_capacity(2);
    let line = "git+https://example.com/tool.git@v1#egg=tool";

    let first = Requirement::from_line_cached(line, &mut cache).unwrap();
    let second = Requirement::from_line_cached(line, &mut cache).unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);

    assert!(Requirement::from_line_cached("git+https://example.com/x.git", &mut cache).is_err());
    assert_eq!(cache.len(), 1);

    Requirement::from_line_cached("a", &mut cache).unwrap();
    Requirement::from_line_cached("b", &mut cache).unwrap();
    assert!(cache.len() <= 2);
}

#[test]
fn test_entries_from_pipfile() {
    let pipfile = r#"
[packages]
requests = "*"
flask = { version = ">=3.0", extras = ["dotenv", "async"], markers = "python_version >= '3.8'" }
tool = { git = "https://example.com/tool.git", ref = "v1.2", editable = true, extras = ["cli"] }
pywin32 = { version = "==306", sys_platform = "win32" }
archive = { file = "https://example.com/archive-2.0.tar.gz" }
"#;
    let entries = parse_entries_table(pipfile, "packages").unwrap();
    let lines: Vec<String> = entries
        .iter()
        .map(|(name, entry)| render(&Requirement::from_structured_entry(name, entry).unwrap()))
        .collect();

    assert_eq!(
        lines,
        vec![
            "requests",
            "flask[async,dotenv]>=3.0 ; python_version >= '3.8'",
            "-e git+https://example.com/tool.git@v1.2#egg=tool[cli]",
            "pywin32==306 ; sys_platform == 'win32'",
            "https://example.com/archive-2.0.tar.gz#egg=archive",
        ]
    );
}

#[test]
fn test_entry_and_line_agree() {
    let pipfile = r#"
[packages]
tool = { git = "https://example.com/tool.git", ref = "v1.2", editable = true, extras = ["cli"] }
"#;
    let entries = parse_entries_table(pipfile, "packages").unwrap();
    let (name, entry) = &entries[0];
    let from_entry = Requirement::from_structured_entry(name, entry).unwrap();
    let from_line =
        Requirement::from_line("-e git+https://example.com/tool.git@v1.2#egg=tool[cli]").unwrap();
    assert_eq!(from_entry, from_line);

    let (_, rendered) = from_line.as_structured_entry();
    insta::assert_snapshot!(
        rendered.to_item().to_string().trim(),
        @r#"{ git = "https://example.com/tool.git", ref = "v1.2", editable = true, extras = ["cli"] }"#
    );
}

#[test]
fn test_entry_key_case_does_not_affect_equality() {
    let entries = parse_entries_table("[packages]\nRequests = \">=2.0\"\n", "packages").unwrap();
    let (name, entry) = &entries[0];
    let from_entry = Requirement::from_structured_entry(name, entry).unwrap();

    assert_eq!(from_entry.name(), "Requests");
    assert_eq!(from_entry, Requirement::from_line("requests>=2.0").unwrap());
    assert_eq!(render(&from_entry), "requests>=2.0");
}

#[test]
fn test_path_entry_round_trips_through_base_dir() {
    let root = tempfile::tempdir().unwrap();
    common::legacy_project(root.path(), "local-pkg");
    let parser = LineParser::with_base_dir(root.path());

    let req = Requirement::parse_with(&parser, "-e ./local-pkg[dev]").unwrap();
    let (name, entry) = req.as_structured_entry();
    assert_eq!(entry.path.as_deref(), Some("./local-pkg"));
    assert!(entry.editable);

    let rebuilt = Requirement::from_structured_entry_with(&parser, &name, &entry).unwrap();
    assert_eq!(rebuilt, req);
    assert_eq!(render(&rebuilt), "-e ./local-pkg[dev]");
}

#[test]
fn test_ambiguous_entry() {
    let pipfile = r#"
[packages]
tool = { path = "./tool", git = "https://example.com/tool.git" }
"#;
    let entries = parse_entries_table(pipfile, "packages").unwrap();
    let (name, entry) = &entries[0];
    let err = Requirement::from_structured_entry(name, entry).unwrap_err();
    let RequirementError::AmbiguousSource { keys, .. } = err else {
        panic!("expected AmbiguousSource, got {err:?}");
    };
    assert_eq!(keys, vec!["path", "git"]);
}

#[test]
fn test_merge_markers_keeps_clauses_once() {
    let mut req = Requirement::from_line("pywin32 ; os_name == 'nt'").unwrap();
    req.merge_markers("os_name == \"nt\" or sys_platform == 'cygwin'")
        .unwrap();
    assert_eq!(
        render(&req),
        "pywin32 ; os_name == 'nt' or sys_platform == 'cygwin'"
    );
}
