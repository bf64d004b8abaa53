//! End-to-end tests for Compose to edge manifest conversion.
//!
//! These tests drive the whole pipeline from a Compose file on disk:
//! 1. Resolve the project
//! 2. Map services to modules
//! 3. Assemble the manifest
//! 4. Write file or project output (split, staging, `.env`)

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;
use std::path::{Path, PathBuf};

use c2m_common::config::{ConvertConfig, CredentialSyntax, NetworkPolicy};
use c2m_common::error::ConvertError;
use c2m_manifest::convert::{ConvertType, convert, split_file};
use c2m_manifest::mapper::MappingWarning;
use serde_json::{Value, json};

fn write_compose(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("docker-compose.yml");
    fs::write(&path, content).expect("write compose file");
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read json")).expect("parse json")
}

fn desired(manifest: &Value) -> &Value {
    &manifest["modulesContent"]["$edgeAgent"]["properties.desired"]
}

fn config(registry: &str) -> ConvertConfig {
    ConvertConfig {
        registry: registry.to_string(),
        ..ConvertConfig::default()
    }
}

// ── File mode ────────────────────────────────────────────────────────

#[test]
fn file_mode_single_image_service() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_compose(
        dir.path(),
        "name: demo\nservices:\n  web:\n    image: nginx:latest\n",
    );
    let output = dir.path().join("deployment.json");

    let report = convert(ConvertType::File, &input, &output, &ConvertConfig::default())
        .expect("convert");
    assert_eq!(report.modules.len(), 1);
    assert!(report.warnings.is_empty());
    assert!(!dir.path().join(".env").exists());
    assert!(!dir.path().join("modules").exists());

    let manifest = read_json(&output);
    assert!(manifest.get("$schema-template").is_none());
    let web = &desired(&manifest)["modules"]["web"];
    assert_eq!(web["version"], json!("1.0"));
    assert_eq!(web["type"], json!("docker"));
    assert_eq!(web["status"], json!("running"));
    assert_eq!(web["restartPolicy"], json!("always"));
    assert_eq!(web["settings"]["image"], json!("nginx:latest"));

    let options: Value =
        serde_json::from_str(web["settings"]["createOptions"].as_str().expect("string"))
            .expect("options json");
    assert!(options.get("HostConfig").is_none());
    assert!(options.get("NetworkingConfig").is_none());
    assert!(options.get("Image").is_none());
}

#[test]
fn file_mode_keeps_every_service_name_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_compose(
        dir.path(),
        "name: demo\nservices:\n  web:\n    image: nginx\n  db:\n    image: postgres:16\n  cache:\n    image: redis\n",
    );
    let output = dir.path().join("deployment.json");
    let _ = convert(ConvertType::File, &input, &output, &ConvertConfig::default()).expect("convert");

    let manifest = read_json(&output);
    let modules = desired(&manifest)["modules"].as_object().expect("modules");
    let mut names: Vec<&str> = modules.keys().map(String::as_str).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["cache", "db", "web"]);
}

#[test]
fn file_mode_restart_policies() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_compose(
        dir.path(),
        "name: demo\nservices:\n  a:\n    image: x\n    restart: \"no\"\n  b:\n    image: x\n    restart: unless-stopped\n  c:\n    image: x\n    restart: on-failure:3\n",
    );
    let output = dir.path().join("deployment.json");
    let _ = convert(ConvertType::File, &input, &output, &ConvertConfig::default()).expect("convert");

    let manifest = read_json(&output);
    let modules = &desired(&manifest)["modules"];
    assert_eq!(modules["a"]["restartPolicy"], json!("never"));
    assert_eq!(modules["b"]["restartPolicy"], json!("always"));
    assert_eq!(modules["c"]["restartPolicy"], json!("on-failure"));
}

#[test]
fn file_mode_blanks_build_placeholder() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("app")).expect("mkdir");
    let input = write_compose(dir.path(), "name: demo\nservices:\n  app:\n    build: ./app\n");
    let output = dir.path().join("deployment.json");
    let _ = convert(ConvertType::File, &input, &output, &ConvertConfig::default()).expect("convert");

    let manifest = read_json(&output);
    assert_eq!(desired(&manifest)["modules"]["app"]["settings"]["image"], json!(""));
}

#[test]
fn file_mode_rejects_oversized_options() {
    let dir = tempfile::tempdir().expect("tempdir");
    let env: String = (0..300)
        .map(|i| format!("      - VARIABLE_{i}=some-value-{i}\n"))
        .collect();
    let input = write_compose(
        dir.path(),
        &format!("name: demo\nservices:\n  big:\n    image: x\n    environment:\n{env}"),
    );
    let output = dir.path().join("deployment.json");
    let err = convert(ConvertType::File, &input, &output, &ConvertConfig::default())
        .expect_err("too large");
    assert!(matches!(err, ConvertError::SizeLimit { ref module, .. } if module == "big"));
}

#[test]
fn custom_network_warns_and_strip_all_removes_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_compose(
        dir.path(),
        "name: demo\nservices:\n  web:\n    image: x\n    networks: [backend]\nnetworks:\n  backend: {}\n",
    );
    let output = dir.path().join("deployment.json");

    let report = convert(ConvertType::File, &input, &output, &ConvertConfig::default())
        .expect("convert");
    assert!(matches!(
        report.warnings.as_slice(),
        [MappingWarning::CustomNetwork { .. }]
    ));
    let manifest = read_json(&output);
    let text = desired(&manifest)["modules"]["web"]["settings"]["createOptions"]
        .as_str()
        .expect("string")
        .to_string();
    assert!(text.contains("demo_backend"));

    let strict = ConvertConfig {
        network_policy: NetworkPolicy::StripAll,
        ..ConvertConfig::default()
    };
    let report = convert(ConvertType::File, &input, &output, &strict).expect("convert");
    assert!(matches!(
        report.warnings.as_slice(),
        [MappingWarning::NetworkStripped { .. }]
    ));
    assert!(!fs::read_to_string(&output).expect("read").contains("demo_backend"));
}

// ── Project mode ─────────────────────────────────────────────────────

#[test]
fn project_mode_stages_build_context() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = dir.path().join("app");
    fs::create_dir_all(app.join("src")).expect("mkdir");
    fs::write(app.join("Dockerfile"), "FROM alpine\n").expect("write");
    fs::write(app.join("src/main.py"), "print('hi')\n").expect("write");
    let input = write_compose(
        dir.path(),
        "name: demo\nservices:\n  app:\n    build:\n      context: ./app\n      args:\n        A: \"1\"\n      cache_from: [img:x]\n      labels:\n        L: v\n      shm_size: 1g\n      target: stage1\n  web:\n    image: nginx:latest\n",
    );
    let output = dir.path().join("out");

    let report = convert(ConvertType::Project, &input, &output, &config("myregistry.io"))
        .expect("convert");
    assert_eq!(report.manifest, output.join("deployment.template.json"));
    let staged: Vec<&str> = report
        .modules
        .iter()
        .filter(|m| m.staged.is_some())
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(staged, vec!["app"]);

    let module_dir = output.join("modules/app");
    assert_eq!(
        fs::read_to_string(module_dir.join("Dockerfile")).expect("read"),
        "FROM alpine\n"
    );
    assert_eq!(
        fs::read_to_string(module_dir.join("src/main.py")).expect("read"),
        "print('hi')\n"
    );
    assert!(!output.join("modules/web").exists());

    let descriptor_text = fs::read_to_string(module_dir.join("module.json")).expect("read");
    assert!(descriptor_text.ends_with("}\n"));
    assert!(descriptor_text.contains("\n    \"image\""));
    let descriptor: Value = serde_json::from_str(&descriptor_text).expect("parse");
    assert_eq!(descriptor["$schema-version"], json!("0.0.1"));
    assert_eq!(descriptor["image"]["repository"], json!("myregistry.io/app"));
    assert_eq!(descriptor["image"]["tag"]["version"], json!("0.0.1"));
    assert_eq!(descriptor["image"]["tag"]["platforms"]["amd64"], json!("Dockerfile"));
    assert_eq!(descriptor["image"]["contextPath"], json!("./"));
    assert_eq!(
        descriptor["image"]["buildOptions"],
        json!([
            "--build-arg A=1",
            "--cache-from img:x",
            "--label L=v",
            "--shm-size 1g",
            "--target stage1"
        ])
    );

    let template = read_json(&output.join("deployment.template.json"));
    assert_eq!(template["$schema-template"], json!("2.0.0"));
    let modules = &desired(&template)["modules"];
    assert_eq!(modules["app"]["settings"]["image"], json!("${MODULES.app}"));
    assert_eq!(modules["web"]["settings"]["image"], json!("nginx:latest"));
    assert!(modules["web"]["settings"]["createOptions"].is_object());

    assert_eq!(
        fs::read_to_string(output.join(".env")).expect("read"),
        "CONTAINER_REGISTRY_USERNAME=\nCONTAINER_REGISTRY_PASSWORD=\nCONTAINER_REGISTRY_ADDRESS=myregistry.io\n"
    );
}

#[test]
fn project_mode_refuses_existing_modules_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_compose(dir.path(), "name: demo\nservices:\n  web:\n    image: nginx\n");
    let output = dir.path().join("out");
    fs::create_dir_all(output.join("modules")).expect("mkdir");

    let err = convert(ConvertType::Project, &input, &output, &ConvertConfig::default())
        .expect_err("collision");
    assert!(matches!(err, ConvertError::DestinationExists { .. }));
}

#[test]
fn project_mode_missing_context_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_compose(dir.path(), "name: demo\nservices:\n  app:\n    build: ./missing\n");
    let output = dir.path().join("out");

    let err = convert(ConvertType::Project, &input, &output, &ConvertConfig::default())
        .expect_err("missing context");
    assert!(matches!(err, ConvertError::NotFound { kind: "build context", .. }));
    assert!(!output.exists());
}

#[test]
fn project_mode_bare_credentials() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_compose(dir.path(), "name: demo\nservices:\n  web:\n    image: nginx\n");
    let output = dir.path().join("out");
    let config = ConvertConfig {
        credential_syntax: CredentialSyntax::Bare,
        ..ConvertConfig::default()
    };
    let _ = convert(ConvertType::Project, &input, &output, &config).expect("convert");

    let template = read_json(&output.join("deployment.template.json"));
    let credential = &desired(&template)["runtime"]["settings"]["registryCredentials"]["REGISTRY0"];
    assert_eq!(credential["username"], json!("$CONTAINER_REGISTRY_USERNAME"));
    assert_eq!(
        fs::read_to_string(output.join(".env")).expect("read"),
        "CONTAINER_REGISTRY_USERNAME=\nCONTAINER_REGISTRY_PASSWORD=\nCONTAINER_REGISTRY_ADDRESS=localhost:5000\n"
    );
}

// ── Splitting a written template ─────────────────────────────────────

#[test]
fn split_file_matches_file_mode_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_compose(
        dir.path(),
        "name: demo\nservices:\n  web:\n    image: nginx\n    ports: ['8080:80']\n",
    );
    let project_out = dir.path().join("out");
    let file_out = dir.path().join("direct.json");
    let _ = convert(ConvertType::Project, &input, &project_out, &ConvertConfig::default())
        .expect("project");
    let _ = convert(ConvertType::File, &input, &file_out, &ConvertConfig::default()).expect("file");

    let split_out = dir.path().join("split.json");
    split_file(&project_out.join("deployment.template.json"), &split_out).expect("split");
    assert_eq!(read_json(&split_out), read_json(&file_out));
}
