use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde_json::{Value, json};

use pathform::{Form, FormConfig, FormEvent, JsonSchema, ValueMapping};

#[derive(Debug, Parser)]
#[command(
    name = "pathform",
    version,
    about = "Validate JSON values against a schema, one path-addressed edit at a time"
)]
struct Cli {
    /// Schema spec: file path, inline payload, or "-" for stdin
    #[arg(short = 's', long = "schema", value_name = "SPEC")]
    schema: String,

    /// Initial value spec: file path, inline payload, or "-" for stdin
    #[arg(short = 'c', long = "value", alias = "data", value_name = "SPEC")]
    value: Option<String>,

    /// Apply an edit before validating, as path=json (repeatable)
    #[arg(short = 'e', long = "set", value_name = "PATH=JSON", action = ArgAction::Append)]
    edits: Vec<String>,

    /// Debounce window in milliseconds
    #[arg(long = "delay", value_name = "MS", default_value_t = 0)]
    delay: u64,

    /// Validate the whole value instead of only the edited paths
    #[arg(long = "submit")]
    submit: bool,

    /// Skip validation entirely; edits still apply
    #[arg(long = "no-validate")]
    no_validate: bool,

    /// Print the form event stream to stderr
    #[arg(long = "events")]
    events: bool,

    /// Emit compact JSON rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let schema_doc = load_value(&cli.schema, "schema")?;
    let initial = match cli.value.as_deref() {
        Some(spec) => load_value(spec, "value")?,
        None => json!({}),
    };

    let schema =
        JsonSchema::compile(schema_doc).map_err(|err| eyre!("invalid schema: {err}"))?;
    let config = FormConfig {
        delay: Duration::from_millis(cli.delay),
        no_validate: cli.no_validate,
        ..FormConfig::default()
    };
    let (form, mut events) = Form::new(Arc::new(schema), initial, config);

    for raw in &cli.edits {
        let (path, leaf) = parse_edit(raw)?;
        form.handle_change(&path, leaf, &ValueMapping::Direct);
    }

    // Let the debounce window elapse so queued validations run.
    if !cli.edits.is_empty() {
        tokio::time::sleep(Duration::from_millis(cli.delay + 20)).await;
    }
    if cli.submit {
        form.submit().await;
    }

    let mut submitted = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, FormEvent::Submitted(_)) {
            submitted = true;
        }
        if cli.events {
            eprintln!("{event:?}");
        }
    }

    let errors = form.errors();
    let report = json!({
        "value": form.value(),
        "errors": errors,
    });
    let rendered = if cli.no_pretty {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{rendered}");

    form.close();

    let failed = !errors.is_empty() || (cli.submit && !submitted);
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_edit(raw: &str) -> Result<(String, Value)> {
    let (path, rhs) = raw
        .split_once('=')
        .ok_or_else(|| eyre!("edit '{raw}' must look like path=json"))?;
    // Bare words that are not valid JSON are taken as strings.
    let leaf = serde_json::from_str(rhs).unwrap_or_else(|_| Value::String(rhs.to_string()));
    Ok((path.to_string(), leaf))
}

fn load_value(spec: &str, label: &str) -> Result<Value> {
    if spec == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .wrap_err("failed to read from stdin")?;
        return parse_contents(&buffer, label);
    }

    let path = PathBuf::from(spec);
    match fs::read_to_string(&path) {
        Ok(contents) => parse_contents(&contents, label),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let inline_label = format!("inline {label}");
            parse_contents(spec, &inline_label)
        }
        Err(err) => {
            Err(err).wrap_err_with(|| format!("failed to load {label} from {}", path.display()))
        }
    }
}

fn parse_contents(contents: &str, label: &str) -> Result<Value> {
    serde_json::from_str(contents).wrap_err_with(|| format!("failed to parse {label} as JSON"))
}
