use std::path::PathBuf;

use chemparse::config::{ArtifactNaming, Config, ExitStatusPolicy, normalize_working_dir};
use chemparse::error::ParserError;

#[test]
fn defaults_match_historical_behavior_where_safe() {
    let config = Config::default();
    assert_eq!(config.working_dir, "/tmp");
    assert_eq!(config.interpreter, "python");
    assert_eq!(config.timeout_secs, 600);
    assert_eq!(config.exit_status, ExitStatusPolicy::Strict);
    assert_eq!(config.artifact_naming, ArtifactNaming::PerInvocation);
    assert_eq!(config.script_override_dir, PathBuf::from("../parser-scripts"));
    assert!(!config.embed_molecule_image);
    assert_eq!(config.max_concurrent, 4);
    assert!(config.parsers.is_empty());
    assert!(
        config
            .bundled_script_dirs
            .iter()
            .all(|d| d.ends_with("parser-scripts"))
    );
}

#[test]
fn toml_overrides_and_declares_parsers() {
    let config = Config::from_toml_str(
        r#"
        working_dir = "/scratch/datacat"
        interpreter = "python3"
        timeout_secs = 120
        exit_status = "permissive"
        artifact_naming = "fixed"
        embed_molecule_image = true
        max_concurrent = 2

        [[parsers]]
        name = "orca"
        script = "chem/orca.py"
        output_file = "orca-output.json"
        aux_file = "orca-molecule.png"
        "#,
    )
    .unwrap();

    assert_eq!(config.working_dir, "/scratch/datacat");
    assert_eq!(config.interpreter, "python3");
    assert_eq!(config.timeout().as_secs(), 120);
    assert_eq!(config.exit_status, ExitStatusPolicy::Permissive);
    assert_eq!(config.artifact_naming, ArtifactNaming::Fixed);
    assert!(config.embed_molecule_image);
    assert_eq!(config.max_concurrent, 2);
    // untouched keys keep defaults
    assert_eq!(config.script_override_dir, PathBuf::from("../parser-scripts"));

    assert_eq!(config.parsers.len(), 1);
    let orca = &config.parsers[0];
    assert_eq!(orca.name, "orca");
    assert_eq!(orca.description, "");
    assert_eq!(orca.aux_file.as_deref(), Some("orca-molecule.png"));
}

#[test]
fn empty_toml_is_all_defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config.working_dir, "/tmp");
    assert_eq!(config.exit_status, ExitStatusPolicy::Strict);
}

#[test]
fn unknown_policy_value_is_config_error() {
    let err = Config::from_toml_str(r#"exit_status = "lenient""#).unwrap_err();
    assert!(matches!(err, ParserError::Config(_)), "got {err:?}");
}

#[test]
fn zero_concurrency_is_rejected() {
    let err = Config::from_toml_str("max_concurrent = 0").unwrap_err();
    assert!(err.to_string().contains("max_concurrent"));
}

#[test]
fn parser_entry_without_output_file_is_rejected() {
    let err = Config::from_toml_str(
        r#"
        [[parsers]]
        name = "orca"
        script = "chem/orca.py"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ParserError::Config(_)));
}

#[test]
fn from_file_reads_toml_and_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chemparse.toml");
    std::fs::write(&path, "interpreter = \"python3\"\n").unwrap();
    assert_eq!(Config::from_file(&path).unwrap().interpreter, "python3");

    let err = Config::from_file(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ParserError::Config(_)));
}

#[test]
fn working_dir_gets_exactly_one_trailing_separator() {
    assert_eq!(normalize_working_dir("/data/work"), "/data/work/");
    assert_eq!(normalize_working_dir("/data/work/"), "/data/work/");
    assert_eq!(normalize_working_dir("relative"), "relative/");
    assert_eq!(normalize_working_dir(""), "/tmp/");
    assert_eq!(normalize_working_dir("   "), "/tmp/");
}
