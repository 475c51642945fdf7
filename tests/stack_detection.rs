//! Integration tests for marker-driven stack detection.

use std::fs;
use std::path::{Path, PathBuf};

use stacklens::{detect_stack, AnalyzeError, Detector, Framework, Language, Settings, Stack};
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
        .to_string_lossy()
        .to_string()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_flask_requirements() {
    let stack = detect_stack(&fixture("flask_app")).unwrap();
    assert_eq!(stack, Stack::new(Language::Python, Some(Framework::Flask)));
}

#[test]
fn test_ruby_wins_over_node() {
    let stack = detect_stack(&fixture("rails_with_node")).unwrap();
    assert_eq!(stack.language, Language::Ruby);
    assert_eq!(stack.framework, Some(Framework::Rails));
}

#[test]
fn test_fixture_stacks() {
    let cases = [
        ("phoenix_app", Language::Elixir, Some(Framework::Phoenix)),
        ("next_app", Language::TypeScript, Some(Framework::Next)),
        ("unknown_stack", Language::Unknown, None),
    ];
    for (name, language, framework) in cases {
        let stack = detect_stack(&fixture(name)).unwrap();
        assert_eq!(stack, Stack::new(language, framework), "{}", name);
    }
}

#[test]
fn test_marker_priority() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "package.json", r#"{"dependencies": {"express": "4.18.0"}}"#);
    write(temp.path(), "go.mod", "module example.com/api\n\nrequire github.com/gin-gonic/gin v1.9.1\n");
    let stack = detect_stack(temp.path().to_str().unwrap()).unwrap();
    assert_eq!(stack, Stack::new(Language::JavaScript, Some(Framework::Express)));

    write(temp.path(), "requirements.txt", "fastapi\n");
    let stack = detect_stack(temp.path().to_str().unwrap()).unwrap();
    assert_eq!(stack, Stack::new(Language::Python, Some(Framework::FastApi)));
}

#[test]
fn test_framework_from_sampled_sources() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "build.gradle", "plugins { id 'java' }\n");
    write(
        temp.path(),
        "src/main/java/app/Hello.java",
        "import io.micronaut.http.annotation.Controller;\n@Controller(\"/hello\")\nclass Hello {}\n",
    );
    let stack = detect_stack(temp.path().to_str().unwrap()).unwrap();
    assert_eq!(stack, Stack::new(Language::Java, Some(Framework::Micronaut)));

    let blind = Detector::new(&Settings {
        java_sample_limit: 0,
        ..Settings::default()
    });
    assert_eq!(
        blind.detect(temp.path()),
        Stack::new(Language::Java, Some(Framework::Java))
    );
}

#[test]
fn test_csharp_project_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "Api.csproj", "<Project Sdk=\"Microsoft.NET.Sdk.Web\" />\n");
    let stack = detect_stack(temp.path().to_str().unwrap()).unwrap();
    assert_eq!(stack, Stack::new(Language::CSharp, Some(Framework::Dotnet)));
}

#[test]
fn test_invalid_path() {
    assert!(matches!(detect_stack(""), Err(AnalyzeError::InvalidPath(_))));
}
