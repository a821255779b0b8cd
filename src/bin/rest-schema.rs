//! REST Schema CLI
//!
//! Command-line interface for checking requests against a schema registry.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use rest_schema::{
    lint_registry, load_document_auto, load_registry_auto, FragmentArgs, JsonSchemaValidator,
    Manager, ManagerError, SchemaRegistry, Severity, ValidateOptions,
};

#[derive(Parser)]
#[command(name = "rest-schema")]
#[command(about = "Resolve and validate requests against a REST schema registry")]
#[command(version)]
struct Cli {
    /// Log resolution and dispatch events to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a request and print its descriptor
    Request {
        /// Registry source: file path or URL (http:// or https://)
        registry: String,

        /// Resource name in the registry
        resource: String,

        /// HTTP method (e.g., get, post)
        method: String,

        /// Base URL the request is compiled against
        #[arg(long)]
        base_url: String,

        /// Fragment arguments for the path template (JSON object or @file)
        #[arg(long)]
        args: Option<String>,

        /// Request params (JSON or @file)
        #[arg(long)]
        params: Option<String>,

        /// Request body (JSON or @file)
        #[arg(long)]
        body: Option<String>,

        /// Strict mode: reject unknown fields (default: false)
        #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
        strict: bool,

        /// Validate empty params/body instead of skipping them
        #[arg(long)]
        validate_empty: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List resources and their permitted methods
    List {
        /// Registry source: file path or URL (http:// or https://)
        registry: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Lint a registry for errors (bad methods, uncompilable schemas, bad paths)
    Lint {
        /// Registry source: file path or URL (http:// or https://)
        registry: String,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("rest_schema=trace")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Request {
            registry,
            resource,
            method,
            base_url,
            args,
            params,
            body,
            strict,
            validate_empty,
            pretty,
        } => run_request(RequestArgs {
            registry,
            resource,
            method,
            base_url,
            args,
            params,
            body,
            options: ValidateOptions::new()
                .strict(strict)
                .validate_empty(validate_empty),
            pretty,
        }),

        Commands::List { registry, json } => run_list(&registry, json),

        Commands::Lint {
            registry,
            format,
            strict,
        } => run_lint(&registry, &format, strict),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct RequestArgs {
    registry: String,
    resource: String,
    method: String,
    base_url: String,
    args: Option<String>,
    params: Option<String>,
    body: Option<String>,
    options: ValidateOptions,
    pretty: bool,
}

fn run_request(args: RequestArgs) -> Result<(), u8> {
    let RequestArgs {
        registry: registry_source,
        resource,
        method,
        base_url,
        args: fragment_source,
        params,
        body,
        options,
        pretty,
    } = args;

    let registry = load_registry(&registry_source)?;

    let fragment_args = match fragment_source {
        Some(source) => match parse_json_arg("--args", &source)? {
            Value::Object(map) => Some(map),
            other => {
                eprintln!(
                    "Error: --args must be a JSON object, got {}",
                    rest_schema::json_type_name(&other)
                );
                return Err(2);
            }
        },
        None => None,
    };
    let params = optional_json_arg("--params", params)?;
    let body = optional_json_arg("--body", body)?;

    let manager = Manager::new(base_url).map_err(report_manager_error)?;
    manager.set_dispatch(move |descriptor| {
        let output = if pretty {
            serde_json::to_string_pretty(&descriptor)
        } else {
            serde_json::to_string(&descriptor)
        };
        match output {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing output: {}", e),
        }
    });

    let api = manager.bind_schema_with(registry, JsonSchemaValidator, options);
    invoke(&api, &resource, fragment_args, &method, params, body).map_err(report_manager_error)
}

fn invoke(
    api: &rest_schema::Resolver<'_>,
    resource: &str,
    fragment_args: Option<FragmentArgs>,
    method: &str,
    params: Value,
    body: Value,
) -> Result<(), ManagerError> {
    api.path(resource)?
        .fragment(fragment_args)
        .method(method)?
        .invoke(params, body)
}

fn run_list(source: &str, json_output: bool) -> Result<(), u8> {
    let registry = load_registry(source)?;

    if json_output {
        let listing: serde_json::Map<String, Value> = registry
            .iter()
            .map(|(name, def)| (name.to_string(), serde_json::json!(def.methods())))
            .collect();
        println!("{}", Value::Object(listing));
    } else {
        for (name, def) in registry.iter() {
            let methods: Vec<&str> = def.methods().iter().map(|m| m.as_str()).collect();
            let path = match def.template() {
                Some(rest_schema::PathTemplate::Pattern(p)) => format!(" {}", p),
                _ => String::new(),
            };
            println!("{}{} [{}]", name, path, methods.join(","));
        }
    }
    Ok(())
}

fn run_lint(source: &str, format: &str, strict: bool) -> Result<(), u8> {
    let document = load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let result = lint_registry(&document);
    let passed = result.is_ok() && (!strict || result.warnings == 0);

    if format == "json" {
        let output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        for diag in &result.diagnostics {
            let (color, label) = match diag.severity {
                Severity::Error => ("\x1b[31m", "error"),
                Severity::Warning => ("\x1b[33m", "warning"),
            };
            println!(
                "  {}{}[{}]\x1b[0m: {} - {}",
                color, label, diag.code, diag.path, diag.message
            );
        }
        if passed {
            println!(
                "\x1b[32m✓ {} resources checked, all passed\x1b[0m",
                result.resources
            );
        } else {
            println!(
                "\x1b[31m✗ {} resources checked ({} errors, {} warnings)\x1b[0m",
                result.resources, result.errors, result.warnings
            );
        }
    }

    if passed {
        Ok(())
    } else {
        Err(1)
    }
}

fn load_registry(source: &str) -> Result<SchemaRegistry, u8> {
    load_registry_auto(source).map_err(|e| {
        eprintln!("Error: loading registry: {}", e);
        e.exit_code() as u8
    })
}

/// Parse a JSON argument, reading it from a file when prefixed with `@`.
fn parse_json_arg(flag: &str, raw: &str) -> Result<Value, u8> {
    let content = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            eprintln!("Error: cannot read {} for {}: {}", path, flag, e);
            3u8
        })?,
        None => raw.to_string(),
    };
    serde_json::from_str(&content).map_err(|e| {
        eprintln!("Error: {} is not valid JSON: {}", flag, e);
        2u8
    })
}

fn optional_json_arg(flag: &str, raw: Option<String>) -> Result<Value, u8> {
    match raw {
        Some(raw) => parse_json_arg(flag, &raw),
        None => Ok(Value::Object(serde_json::Map::new())),
    }
}

fn report_manager_error(e: ManagerError) -> u8 {
    match &e {
        ManagerError::Validation { .. } => eprintln!("Validation failed: {}", e),
        _ => eprintln!("Error: {}", e),
    }
    e.exit_code() as u8
}
