use fsb::core::codegen::{generate_entrypoint, EntrypointOptions};
use fsb::core::package::Packager;
use fsb::core::types::ErrorCategory;
use fsb::{LoadedFlow, LoadedStep, Trigger};
use indexmap::IndexMap;
use std::fs;
use std::io::{Cursor, Read};
use tempfile::TempDir;

fn runtime_dir(with_modules: bool) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("host.json"), r#"{"version":"2.0"}"#).unwrap();
    fs::write(dir.path().join("package.json"), r#"{"name":"fsb-runtime"}"#).unwrap();
    fs::write(dir.path().join("package-lock.json"), r#"{"lockfileVersion":1}"#).unwrap();
    if with_modules {
        let verify = dir.path().join("node_modules/@octokit/webhooks");
        fs::create_dir_all(&verify).unwrap();
        fs::write(verify.join("verify.js"), "module.exports = () => true;").unwrap();
        fs::write(dir.path().join("node_modules/.package-lock.json"), "{}").unwrap();
    }
    dir
}

fn step(name: &str, source: &str) -> LoadedStep {
    LoadedStep {
        name: name.to_string(),
        source_code: source.to_string(),
        inputs: IndexMap::new(),
    }
}

fn flow(steps: Vec<LoadedStep>) -> LoadedFlow {
    LoadedFlow {
        name: "cloud.yaml".to_string(),
        triggers: vec![Trigger::new("push")],
        steps,
    }
}

fn entries(archive: &[u8]) -> Vec<(String, String)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut file = zip.by_index(i).unwrap();
            let mut contents = String::new();
            file.read_to_string(&mut contents).unwrap();
            (file.name().to_string(), contents)
        })
        .collect()
}

#[test]
fn test_archive_layout_and_order() {
    let runtime = runtime_dir(true);
    let packager = Packager::new(runtime.path(), "FuncSoulBrother");
    let flow = flow(vec![step("job-0", "first();"), step("job-1", "second();")]);
    let entrypoint = generate_entrypoint("s", "t", &flow, &EntrypointOptions::default());

    let archive = packager.package(&entrypoint, &flow).unwrap();
    let entries = entries(&archive);
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();

    let expected = vec![
        "FuncSoulBrother/function.json".to_string(),
        "FuncSoulBrother/index.js".to_string(),
        ".funcignore".to_string(),
        "host.json".to_string(),
        "package.json".to_string(),
        "package-lock.json".to_string(),
        "node_modules/.package-lock.json".to_string(),
        "node_modules/@octokit/webhooks/verify.js".to_string(),
        flow.steps[0].filename(),
        flow.steps[1].filename(),
        "proxies.json".to_string(),
    ];
    assert_eq!(names, expected);

    assert_eq!(entries[1].1, entrypoint);
    assert_eq!(entries[3].1, r#"{"version":"2.0"}"#);
    assert_eq!(entries[8].1, "first();");
    assert_eq!(entries[9].1, "second();");
}

#[test]
fn test_identical_sources_are_packaged_once() {
    let runtime = runtime_dir(false);
    let packager = Packager::new(runtime.path(), "FuncSoulBrother");
    let flow = flow(vec![
        step("job-0", "shared();"),
        step("job-1", "shared();"),
        step("job-2", "other();"),
    ]);

    let archive = packager.package("module.exports = 1;", &flow).unwrap();
    let names: Vec<String> = entries(&archive).into_iter().map(|(name, _)| name).collect();

    let shared = flow.steps[0].filename();
    assert_eq!(names.iter().filter(|n| **n == shared).count(), 1);
    assert!(names.contains(&flow.steps[2].filename()));
    assert!(!names.iter().any(|n| n.starts_with("node_modules/")));
    assert_eq!(names.last().map(String::as_str), Some("proxies.json"));
}

#[test]
fn test_function_bindings_are_http() {
    let runtime = runtime_dir(false);
    let packager = Packager::new(runtime.path(), "Hook");
    let archive = packager.package("", &flow(vec![])).unwrap();
    let entries = entries(&archive);

    let (name, bindings) = &entries[0];
    assert_eq!(name, "Hook/function.json");
    let bindings: serde_json::Value = serde_json::from_str(bindings).unwrap();
    let types: Vec<&str> = bindings["bindings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["type"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"httpTrigger"));
    assert!(types.contains(&"http"));
}

#[test]
fn test_missing_runtime_file_is_packaging_error() {
    let runtime = runtime_dir(false);
    fs::remove_file(runtime.path().join("package-lock.json")).unwrap();
    let packager = Packager::new(runtime.path(), "FuncSoulBrother");

    let err = packager.package("", &flow(vec![])).unwrap_err();
    assert_eq!(err.category, ErrorCategory::PackagingError);
}
