use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use chemparse::config::{ArtifactNaming, Config};
use chemparse::dispatch::ParseRequest;
use chemparse::dispatch::registry::Registry;
use chemparse::error::ParserError;
use chemparse::parsers::{ParserSpec, gamess, nwchem};

const WRITE_INPUT: &str = r#"printf '{"input": "%s", "argc": %d}' "$1" "$#" > "$2""#;

fn install(root: &Path, script: &str, body: &str) {
    let path = root.join(script);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

/// Config whose override dir holds both built-in scripts and nothing is bundled.
fn config_with_scripts(body: &str) -> (TempDir, TempDir, Config) {
    let scripts = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    install(scripts.path(), gamess::SCRIPT, body);
    install(scripts.path(), nwchem::SCRIPT, body);
    let config = Config {
        working_dir: work.path().display().to_string(),
        interpreter: "sh".to_string(),
        script_override_dir: scripts.path().to_path_buf(),
        bundled_script_dirs: vec![],
        ..Config::default()
    };
    (scripts, work, config)
}

fn empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn builtin_parsers_resolve_from_override_dir() {
    let (scripts, _work, config) = config_with_scripts(WRITE_INPUT);
    let registry = Registry::from_config(config);

    let names: Vec<&str> = registry.list_parsers().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["gamess", "nwchem"]);

    let nw = registry.get("nwchem").unwrap();
    assert_eq!(nw.script_path(), scripts.path().join("chem/nwchem.py"));
    assert_eq!(nw.output_file(), "nwchem-output.json");
    assert_eq!(nw.aux_file(), Some("nwchem-molecule.png"));

    let gm = registry.get("gamess").unwrap();
    assert_eq!(gm.output_file(), "gamess-output.json");
    assert_eq!(gm.aux_file(), None);
}

#[test]
fn parsers_without_scripts_are_unavailable() {
    let empty = tempfile::tempdir().unwrap();
    let config = Config {
        script_override_dir: empty.path().to_path_buf(),
        bundled_script_dirs: vec![empty.path().join("bundled")],
        ..Config::default()
    };
    let registry = Registry::from_config(config);

    assert!(registry.list_parsers().is_empty());
    assert!(registry.get("gamess").is_none());
}

#[test]
fn bundled_dir_is_used_when_override_lacks_script() {
    let over = tempfile::tempdir().unwrap();
    let bundled = tempfile::tempdir().unwrap();
    install(bundled.path(), gamess::SCRIPT, WRITE_INPUT);
    let config = Config {
        script_override_dir: over.path().to_path_buf(),
        bundled_script_dirs: vec![bundled.path().to_path_buf()],
        ..Config::default()
    };
    let registry = Registry::from_config(config);

    assert_eq!(
        registry.get("gamess").unwrap().script_path(),
        bundled.path().join(gamess::SCRIPT)
    );
    assert!(registry.get("nwchem").is_none());
}

#[test]
fn config_declared_parsers_add_and_replace() {
    let (scripts, _work, mut config) = config_with_scripts(WRITE_INPUT);
    install(scripts.path(), "chem/orca.py", WRITE_INPUT);
    install(scripts.path(), "chem/gamess_v2.py", WRITE_INPUT);
    config.parsers = vec![
        ParserSpec {
            name: "orca".to_string(),
            description: "ORCA output".to_string(),
            script: "chem/orca.py".to_string(),
            output_file: "orca-output.json".to_string(),
            aux_file: None,
        },
        ParserSpec {
            name: "gamess".to_string(),
            description: "patched GAMESS".to_string(),
            script: "chem/gamess_v2.py".to_string(),
            output_file: "gamess-output.json".to_string(),
            aux_file: None,
        },
    ];
    let registry = Registry::from_config(config);

    let names: Vec<&str> = registry.list_parsers().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["gamess", "nwchem", "orca"]);
    assert_eq!(registry.get("gamess").unwrap().description(), "patched GAMESS");
}

#[tokio::test]
async fn parser_names_match_case_insensitively() {
    let (scripts, work, mut config) = config_with_scripts(WRITE_INPUT);
    install(scripts.path(), "chem/orca.py", WRITE_INPUT);
    config.parsers = vec![ParserSpec {
        name: "ORCA".to_string(),
        description: "ORCA output".to_string(),
        script: "chem/orca.py".to_string(),
        output_file: "orca-output.json".to_string(),
        aux_file: None,
    }];
    let registry = Registry::from_config(config);

    let names: Vec<&str> = registry.list_parsers().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["ORCA", "gamess", "nwchem"]);
    assert!(registry.get("orca").is_some());
    assert!(registry.get(" Orca ").is_some());
    assert!(registry.get("GAMESS").is_some());

    let input = work.path().join("benzene.out");
    std::fs::write(&input, "").unwrap();
    let req = registry.request(&input, None);
    let result = registry.parse("orca", &req).await.unwrap();
    assert_eq!(result.parser, "ORCA");
    assert_eq!(result.document["input"], json!(input.display().to_string()));
}

#[test]
fn suggest_parsers_matches_substrings() {
    let (_scripts, _work, config) = config_with_scripts(WRITE_INPUT);
    let registry = Registry::from_config(config);

    assert_eq!(registry.suggest_parsers("gam"), vec!["gamess"]);
    assert_eq!(registry.suggest_parsers("NWCHEM7"), vec!["nwchem"]);
    assert!(registry.suggest_parsers("  ").is_empty());
    assert!(registry.suggest_parsers("orca").is_empty());
}

#[tokio::test]
async fn unknown_parser_carries_suggestions() {
    let (_scripts, work, config) = config_with_scripts(WRITE_INPUT);
    let registry = Registry::from_config(config);
    let req = registry.request(work.path().join("in.log"), None);

    let err = registry.parse("gams", &req).await.unwrap_err();
    match &err {
        ParserError::UnknownParser { name, suggestions } => {
            assert_eq!(name, "gams");
            assert!(suggestions.is_empty());
        }
        other => panic!("expected UnknownParser, got {other:?}"),
    }

    let err = registry.parse("gamess-us", &req).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "parser not found: gamess-us. Did you mean: gamess?"
    );
}

#[tokio::test]
async fn parse_routes_to_named_parser_and_cleans_up() {
    let (_scripts, work, config) = config_with_scripts(WRITE_INPUT);
    let registry = Registry::from_config(config);
    let input = work.path().join("h2o.nw.out");
    std::fs::write(&input, "").unwrap();

    let req = registry.request(&input, Some(json!({"experimentId": "exp-7"}).as_object().unwrap().clone()));
    let result = registry.parse("nwchem", &req).await.unwrap();

    assert_eq!(result.parser, "nwchem");
    assert_eq!(result.document["argc"], json!(3));
    assert_eq!(result.document["id"], json!("exp-7"));
    assert_eq!(result.document["experimentId"], json!("exp-7"));

    // Only the input file remains.
    std::fs::remove_file(&input).unwrap();
    assert!(empty_dir(work.path()));
    assert_eq!(registry.available_permits(), 4);
}

#[tokio::test]
async fn fixed_names_serialize_concurrent_calls() {
    let (_scripts, work, mut config) = config_with_scripts(
        r#"sleep 0.3; printf '{"input": "%s"}' "$1" > "$2""#,
    );
    config.artifact_naming = ArtifactNaming::Fixed;
    let registry = Arc::new(Registry::from_config(config));

    let a = work.path().join("a.log");
    let b = work.path().join("b.log");
    let req_a = ParseRequest::new(&a, None, Duration::from_secs(10));
    let req_b = ParseRequest::new(&b, None, Duration::from_secs(10));

    let (ra, rb) = tokio::join!(registry.parse("gamess", &req_a), registry.parse("gamess", &req_b));

    assert_eq!(ra.unwrap().document["input"], json!(a.display().to_string()));
    assert_eq!(rb.unwrap().document["input"], json!(b.display().to_string()));
    assert!(empty_dir(work.path()));
}

#[test]
fn request_uses_configured_timeout() {
    let (_scripts, work, mut config) = config_with_scripts(WRITE_INPUT);
    config.timeout_secs = 1;
    let registry = Registry::from_config(config);
    let req = registry.request(work.path().join("in.log"), None);

    let remaining = req
        .deadline
        .checked_duration_since(std::time::Instant::now())
        .unwrap_or_default();
    assert!(remaining <= Duration::from_secs(1));

    // Blocking entry point for callers outside a runtime.
    let result = tokio_test::block_on(registry.parse("gamess", &req));
    assert!(result.is_ok(), "got {:?}", result.err());
}
