//! CLI integration tests for rest-schema binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const BASE_URL: &str = "localhost:8080/api/products/v2";

const REGISTRY: &str = r#"{
    "products": {
        "methods": ["get", "post"],
        "bodyValidator": {
            "type": "object",
            "properties": {
                "description": { "type": "string" },
                "name": { "type": "string" },
                "price": { "type": "integer" }
            },
            "required": ["name", "description", "price"]
        },
        "paramsValidator": {
            "type": "object",
            "properties": { "priceFrom": { "type": "integer" } }
        }
    },
    "product": {
        "methods": ["get", "patch"],
        "path": "/${ productId }"
    }
}"#;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("rest-schema"))
}

// Helper to create a temp registry file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod request_command {
    use super::*;

    #[test]
    fn prints_descriptor() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "post",
                "--base-url",
                BASE_URL,
                "--body",
                r#"{"name":"x","description":"y","price":20}"#,
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"method":"post","params":{},"body":{"name":"x","description":"y","price":20},"url":"localhost:8080/api/products/v2"}"#,
            ));
    }

    #[test]
    fn compiles_fragment_url() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "product",
                "get",
                "--base-url",
                BASE_URL,
                "--args",
                r#"{"productId":"abc123"}"#,
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""url":"localhost:8080/api/products/v2/abc123""#,
            ));
    }

    #[test]
    fn reads_body_from_file() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);
        let body = write_temp_file(
            &dir,
            "body.json",
            r#"{"name":"x","description":"y","price":5}"#,
        );

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "post",
                "--base-url",
                BASE_URL,
                "--body",
                &format!("@{}", body.display()),
                "--pretty",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"price\": 5"));
    }

    #[test]
    fn validation_failure_exit_code() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "post",
                "--base-url",
                BASE_URL,
                "--body",
                r#"{"name":"x","description":42,"price":20}"#,
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"))
            .stderr(predicate::str::contains("/description"));
    }

    #[test]
    fn strict_rejects_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);
        let body = r#"{"name":"x","description":"y","price":20,"colour":"red"}"#;

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "post",
                "--base-url",
                BASE_URL,
                "--body",
                body,
            ])
            .assert()
            .success();

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "post",
                "--base-url",
                BASE_URL,
                "--body",
                body,
                "--strict",
                "true",
            ])
            .assert()
            .code(1);
    }

    #[test]
    fn validate_empty_flag() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "post",
                "--base-url",
                BASE_URL,
            ])
            .assert()
            .success();

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "post",
                "--base-url",
                BASE_URL,
                "--validate-empty",
            ])
            .assert()
            .code(1);
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn unknown_resource_lists_valid_paths() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "orders",
                "get",
                "--base-url",
                BASE_URL,
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("[products,product]"));
    }

    #[test]
    fn unsupported_method_lists_methods() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "patch",
                "--base-url",
                BASE_URL,
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("get,post"));
    }

    #[test]
    fn invalid_http_method() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "grab",
                "--base-url",
                BASE_URL,
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("not a valid http method"));
    }

    #[test]
    fn invalid_base_url() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "get",
                "--base-url",
                "/api/v2/products",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("is not a valid url"));
    }

    #[test]
    fn registry_not_found() {
        cmd()
            .args([
                "request",
                "/nonexistent/registry.json",
                "products",
                "get",
                "--base-url",
                BASE_URL,
            ])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn invalid_registry_json() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", "{ not json }");

        cmd()
            .args(["list", registry.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn invalid_body_json() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args([
                "request",
                registry.to_str().unwrap(),
                "products",
                "post",
                "--base-url",
                BASE_URL,
                "--body",
                "{name:",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("--body is not valid JSON"));
    }

    #[test]
    fn missing_base_url() {
        cmd()
            .args(["request", "registry.json", "products", "get"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--base-url"));
    }
}

mod list_command {
    use super::*;

    #[test]
    fn text_listing() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args(["list", registry.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("products [get,post]"))
            .stdout(predicate::str::contains("product /${ productId } [get,patch]"));
    }

    #[test]
    fn json_listing() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args(["list", registry.to_str().unwrap(), "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"products":["get","post"],"product":["get","patch"]}"#,
            ));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn clean_registry_passes() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", REGISTRY);

        cmd()
            .args(["lint", registry.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 resources checked, all passed"));
    }

    #[test]
    fn reports_errors() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(
            &dir,
            "registry.json",
            r#"{"products": {"methods": ["get", "fetch"]}, "orders": {"methods": []}}"#,
        );

        cmd()
            .args(["lint", registry.to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("E003"))
            .stdout(predicate::str::contains("/products/methods/1"))
            .stdout(predicate::str::contains("E002"));
    }

    #[test]
    fn repeated_resource_name() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(
            &dir,
            "registry.json",
            r#"{"products": {"methods": ["get"]}, "products": {"methods": ["post"]}}"#,
        );

        cmd()
            .args(["lint", registry.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("\"products\" is defined more than once"));
    }

    #[test]
    fn json_format() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(
            &dir,
            "registry.json",
            r#"{"products": {"methods": ["get", "get"]}}"#,
        );

        cmd()
            .args(["lint", registry.to_str().unwrap(), "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""warnings": 1"#))
            .stdout(predicate::str::contains(r#""code": "W001""#));
    }

    #[test]
    fn strict_fails_on_warnings() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(
            &dir,
            "registry.json",
            r#"{"products": {"methods": ["get"], "extra": true}}"#,
        );

        cmd()
            .args(["lint", registry.to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["lint", registry.to_str().unwrap(), "--strict"])
            .assert()
            .code(1);
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("request"))
            .stdout(predicate::str::contains("lint"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("rest-schema"));
    }
}
