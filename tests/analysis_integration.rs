//! Integration tests for the full analysis pipeline.
//!
//! These tests run `analyze` against the fixture trees under testdata/ and
//! check the facts extracted for each stack.

use std::fs;
use std::path::PathBuf;

use stacklens::{analyze, Analyzer, CodebaseAnalysis, Framework, Language};

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
        .to_string_lossy()
        .to_string()
}

fn run(name: &str) -> CodebaseAnalysis {
    analyze(&fixture(name)).expect("analysis should succeed")
}

/// Every file named by any record in `analysis`.
fn record_files(analysis: &CodebaseAnalysis) -> Vec<&str> {
    let mut files: Vec<&str> = Vec::new();
    files.extend(analysis.routes.iter().map(|r| r.file.as_str()));
    files.extend(analysis.models.iter().map(|m| m.file.as_str()));
    files.extend(analysis.controllers.iter().map(|c| c.file.as_str()));
    files.extend(analysis.components.iter().map(|c| c.file.as_str()));
    files.extend(analysis.services.iter().map(|s| s.file.as_str()));
    files
}

#[test]
fn test_analysis_is_deterministic() {
    for name in ["phoenix_app", "next_app", "flask_app"] {
        let first = serde_json::to_string(&run(name)).unwrap();
        let second = serde_json::to_string(&run(name)).unwrap();
        assert_eq!(first, second, "{} differs between runs", name);
    }
}

#[test]
fn test_parallel_and_sequential_agree() {
    let path = fixture("phoenix_app");
    let parallel = Analyzer::new().analyze(&path).unwrap();
    let sequential = Analyzer::new().sequential().analyze(&path).unwrap();
    assert_eq!(parallel, sequential);
}

#[test]
fn test_phoenix_routes() {
    let analysis = run("phoenix_app");
    assert_eq!(analysis.language, Language::Elixir);
    assert_eq!(analysis.framework, Some(Framework::Phoenix));

    let users = analysis
        .routes
        .iter()
        .find(|r| r.method == "GET" && r.path == "/users")
        .expect("GET /users should be extracted");
    assert_eq!(users.handler.as_deref(), Some("UserController.index"));
    assert_eq!(users.file, "lib/shop_web/router.ex");

    assert!(analysis.routes.iter().any(|r| r.method == "GET" && r.path == "/users/:id"));
    assert!(analysis.routes.iter().any(|r| r.method == "POST" && r.path == "/api/users"));
}

#[test]
fn test_phoenix_model_fields() {
    let analysis = run("phoenix_app");
    let user = analysis
        .models
        .iter()
        .find(|m| m.name == "User")
        .expect("User schema should be extracted");
    assert_eq!(user.fields.len(), 3);
    assert!(user.fields.iter().all(|f| !f.name.is_empty() && !f.ty.is_empty()));
    let names: Vec<&str> = user.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["email", "name", "age"]);
}

#[test]
fn test_phoenix_controllers_services_and_project() {
    let analysis = run("phoenix_app");

    let controller = analysis
        .controllers
        .iter()
        .find(|c| c.name == "UserController")
        .expect("UserController should be extracted");
    assert_eq!(controller.actions, vec!["index", "show", "create"]);

    let accounts = analysis
        .services
        .iter()
        .find(|s| s.name == "Shop.Accounts")
        .expect("Accounts context should be a service");
    assert_eq!(accounts.functions, vec!["list_users", "get_user!", "create_user"]);

    assert!(analysis.readme.as_deref().unwrap_or("").starts_with("# Shop"));
    assert_eq!(analysis.config.get("type").and_then(|v| v.as_str()), Some("mix"));
}

#[test]
fn test_excluded_dirs_never_appear() {
    for name in ["phoenix_app", "next_app"] {
        let analysis = run(name);
        for file in record_files(&analysis) {
            assert!(
                !file.starts_with("deps/") && !file.contains("node_modules/"),
                "{}: record from excluded file {}",
                name,
                file
            );
        }
        assert!(!analysis.routes.iter().any(|r| r.path == "/vendored"));
        assert!(!analysis.components.iter().any(|c| c.name == "Widget"));
    }
}

#[test]
fn test_next_file_routes() {
    let analysis = run("next_app");
    assert_eq!(analysis.language, Language::TypeScript);
    assert_eq!(analysis.framework, Some(Framework::Next));

    let paths: Vec<(&str, &str)> = analysis
        .routes
        .iter()
        .map(|r| (r.method.as_str(), r.path.as_str()))
        .collect();
    assert!(paths.contains(&("GET", "/users/:id")), "{:?}", paths);
    assert!(paths.contains(&("GET", "/")), "{:?}", paths);
    assert!(paths.contains(&("ANY", "/api/users")), "{:?}", paths);
    assert!(!analysis.routes.iter().any(|r| r.file.ends_with("_app.tsx")));

    let search = analysis
        .components
        .iter()
        .find(|c| c.name == "SearchBar")
        .expect("SearchBar should be extracted");
    assert_eq!(search.props, vec!["query", "onSearch"]);
}

#[test]
fn test_unknown_stack_uses_universal_routes() {
    let analysis = run("unknown_stack");
    assert_eq!(analysis.language, Language::Unknown);
    assert_eq!(analysis.framework, None);

    let pairs: Vec<(&str, &str)> = analysis
        .routes
        .iter()
        .map(|r| (r.method.as_str(), r.path.as_str()))
        .collect();
    assert_eq!(pairs, vec![("GET", "/health"), ("POST", "/jobs")]);
    assert!(analysis.models.is_empty());
    assert!(analysis.controllers.is_empty());
    assert!(analysis.components.is_empty());
    assert!(analysis.services.is_empty());
    assert!(analysis.config.is_empty());
}

#[test]
fn test_workspace_packages_are_scanned() {
    let temp = tempfile::TempDir::new().unwrap();
    fs::write(
        temp.path().join("package.json"),
        r#"{"name": "mono", "private": true, "dependencies": {"express": "^4.18.0"}}"#,
    )
    .unwrap();
    let src = temp.path().join("packages").join("api").join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("server.js"), "app.get('/users', listUsers);\n").unwrap();

    let analysis = analyze(&temp.path().to_string_lossy()).unwrap();
    assert_eq!(analysis.framework, Some(Framework::Express));
    let routes: Vec<(&str, &str, &str)> = analysis
        .routes
        .iter()
        .map(|r| (r.method.as_str(), r.path.as_str(), r.file.as_str()))
        .collect();
    assert_eq!(routes, vec![("GET", "/users", "packages/api/src/server.js")]);
}

#[test]
fn test_missing_directory_yields_empty_analysis() {
    let analysis = run("does_not_exist");
    assert_eq!(analysis.language, Language::Unknown);
    assert!(analysis.is_empty());
    assert!(analysis.readme.is_none());
}
