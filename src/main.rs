use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use missivectl::client::{ApiClient, DEFAULT_BASE_URL, RequestEnvelope};
use missivectl::config::{self, Scope, resolve, save};
use missivectl::params::{Batch, InputItem};
use missivectl::resource::{Operation, Resource};
use missivectl::runner::{RunOptions, run_batch};
use missivectl::schema::SchemaRegistry;
use serde_json::{Map, Value, json};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "missivectl", version, about = "CLI for the Missive REST API")]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "MISSIVE_API_TOKEN",
        hide_env_values = true,
        help = "API token override for this invocation (otherwise read from config)"
    )]
    api_token: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "Base URL for the API (defaults to https://public.missiveapp.com/v1)"
    )]
    base_url: Option<String>,

    #[arg(
        long,
        short = 'o',
        value_enum,
        default_value_t = OutputFormat::Pretty,
        global = true,
        help = "Output format (propagates to subcommands)"
    )]
    output: OutputFormat,

    #[arg(long, short = 'v', global = true, help = "Log requests to stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Persist an API token to the chosen scope
    Configure {
        #[arg(long)]
        token: String,
        #[arg(
            long,
            value_enum,
            default_value_t = ScopeArg::User,
            help = "Where to write the config (local project dir or user config dir)"
        )]
        scope: ScopeArg,
        #[arg(
            long,
            value_name = "URL",
            help = "Optional base URL to store alongside the token"
        )]
        base_url: Option<String>,
    },
    /// Run a batch of items against one resource/operation
    Run {
        #[arg(long, short = 'r')]
        resource: Resource,
        #[arg(long, help = "Operation (defaults to the resource's default operation)")]
        operation: Option<Operation>,
        #[arg(
            long,
            short = 'i',
            value_name = "FILE",
            default_value = "-",
            help = "Batch document ({\"items\": [...]} or a bare array); '-' reads stdin"
        )]
        input: PathBuf,
        #[arg(long, help = "Record failed items as {\"error\": ...} and keep going")]
        continue_on_fail: bool,
        #[arg(long, help = "Show the requests that would be sent without sending them")]
        dry_run: bool,
    },
    /// Contact operations
    #[command(subcommand)]
    Contacts(ContactsCommand),
    /// Contact book operations
    #[command(subcommand)]
    ContactBooks(ListOnly),
    /// Conversation operations
    #[command(subcommand)]
    Conversations(ConversationsCommand),
    /// Organization operations
    #[command(subcommand)]
    Organizations(ListOnly),
    /// Print the input fields accepted per resource and operation
    Schema {
        #[arg(long)]
        resource: Option<Resource>,
        #[arg(long)]
        operation: Option<Operation>,
    },
    /// Validate the configured API token
    Validate,
    /// Show current configuration (secrets masked)
    ConfigShow,
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
enum ContactsCommand {
    /// List contacts
    List {
        #[arg(long)]
        contact_book: Option<String>,
        #[arg(long, short = 'q')]
        search: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Get a contact by ID
    Get { id: String },
    /// Delete a contact by ID
    Delete {
        id: String,
        #[arg(long, help = "Show what would be deleted without sending the request")]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum ConversationsCommand {
    /// List conversations
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Get a conversation by ID
    Get { id: String },
}

#[derive(Subcommand)]
enum ListOnly {
    /// List all
    List,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cwd = std::env::current_dir().context("reading current directory")?;

    match cli.command {
        Commands::Configure {
            token,
            scope,
            base_url,
        } => {
            let mut existing = config::load_scope(scope.into(), &cwd)?;
            existing.api_token = Some(token);
            if let Some(url) = base_url {
                existing.base_url = Some(url);
            }
            let path = save(scope.into(), &existing, &cwd)?;
            println!("Saved API token to {}", path.display());
        }
        Commands::ConfigShow => {
            let merged = config::load(&cwd)?;
            println!("{}", serde_json::to_string_pretty(&merged.masked())?);
        }
        Commands::Schema {
            resource,
            operation,
        } => {
            let table = SchemaRegistry::global().to_json(resource, operation);
            print_json(&table, cli.output)?;
        }
        Commands::Completion { shell } => {
            use clap_complete::{generate, shells};
            let mut cmd = Cli::command();
            let bin = cmd.get_name().to_string();
            match shell {
                CompletionShell::Bash => {
                    generate(shells::Bash, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::Zsh => {
                    generate(shells::Zsh, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::Fish => {
                    generate(shells::Fish, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::PowerShell => {
                    generate(shells::PowerShell, &mut cmd, bin, &mut std::io::stdout())
                }
            }
        }
        Commands::Validate => {
            let client = connect(&cwd, cli.api_token, cli.base_url)?;
            println!("Validating API token against {}...", client.base_url());
            match client.send(&RequestEnvelope::get("/organizations")) {
                Ok(_) => println!("Missive API: ok"),
                Err(e) if e.remote_status() == Some(401) => {
                    return Err(anyhow!("Missive API rejected the token (401)"));
                }
                Err(e) => return Err(e).context("validating API token"),
            }
        }
        Commands::Run {
            resource,
            operation,
            input,
            continue_on_fail,
            dry_run,
        } => {
            let operation = operation.unwrap_or_else(|| resource.default_operation());
            if !resource.supports(operation) {
                return Err(anyhow!(
                    "operation `{operation}` is not supported for resource `{resource}` (supported: {})",
                    list_operations(resource)
                ));
            }
            let batch = read_batch(&input)?;
            let client = connect_for(&cwd, cli.api_token, cli.base_url, dry_run)?;
            let options = RunOptions {
                continue_on_fail,
                dry_run,
            };
            let output = run_batch(&client, &batch, &batch, resource, operation, options)
                .with_context(|| format!("running {resource}/{operation}"))?;
            print_json(&Value::Array(output), cli.output)?;
        }
        Commands::Contacts(command) => {
            let (operation, parameters, dry_run, columns) = match command {
                ContactsCommand::List {
                    contact_book,
                    search,
                    limit,
                    offset,
                } => {
                    let mut additional = Map::new();
                    insert_opt(&mut additional, "contactBookId", contact_book.map(Value::from));
                    insert_opt(&mut additional, "q", search.map(Value::from));
                    insert_opt(&mut additional, "limit", limit.map(Value::from));
                    insert_opt(&mut additional, "offset", offset.map(Value::from));
                    (
                        Operation::GetAll,
                        json!({ "additionalFields": additional }),
                        false,
                        Some(&["id", "name", "company", "emails"][..]),
                    )
                }
                ContactsCommand::Get { id } => {
                    (Operation::Get, json!({ "contactId": id }), false, None)
                }
                ContactsCommand::Delete { id, dry_run } => {
                    (Operation::Delete, json!({ "contactId": id }), dry_run, None)
                }
            };
            let client = connect_for(&cwd, cli.api_token, cli.base_url, dry_run)?;
            run_single(
                &client,
                Resource::Contact,
                operation,
                parameters,
                dry_run,
                cli.output,
                columns,
            )?;
        }
        Commands::ContactBooks(ListOnly::List) => {
            let client = connect(&cwd, cli.api_token, cli.base_url)?;
            run_single(
                &client,
                Resource::ContactBook,
                Operation::GetAll,
                json!({}),
                false,
                cli.output,
                Some(&["id", "name", "description"][..]),
            )?;
        }
        Commands::Conversations(command) => {
            let (operation, parameters, columns) = match command {
                ConversationsCommand::List { limit, offset } => {
                    let mut additional = Map::new();
                    insert_opt(&mut additional, "limit", limit.map(Value::from));
                    insert_opt(&mut additional, "offset", offset.map(Value::from));
                    (
                        Operation::GetAll,
                        json!({ "additionalFields": additional }),
                        Some(&["id", "subject", "latest_message_subject", "messages_count"][..]),
                    )
                }
                ConversationsCommand::Get { id } => {
                    (Operation::Get, json!({ "conversationId": id }), None)
                }
            };
            let client = connect(&cwd, cli.api_token, cli.base_url)?;
            run_single(
                &client,
                Resource::Conversation,
                operation,
                parameters,
                false,
                cli.output,
                columns,
            )?;
        }
        Commands::Organizations(ListOnly::List) => {
            let client = connect(&cwd, cli.api_token, cli.base_url)?;
            run_single(
                &client,
                Resource::Organization,
                Operation::GetAll,
                json!({}),
                false,
                cli.output,
                Some(&["id", "name"][..]),
            )?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn connect(cwd: &Path, api_token: Option<String>, base_url: Option<String>) -> Result<ApiClient> {
    let effective = resolve(cwd, api_token, base_url)?;
    ApiClient::new(&effective.base_url, &effective.api_token)
}

/// Dry runs never send, so they work without a configured token.
fn connect_for(
    cwd: &Path,
    api_token: Option<String>,
    base_url: Option<String>,
    dry_run: bool,
) -> Result<ApiClient> {
    if !dry_run {
        return connect(cwd, api_token, base_url);
    }
    let merged = config::load(cwd)?;
    let base_url = base_url
        .or(merged.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    ApiClient::new(&base_url, api_token.as_deref().unwrap_or_default())
}

fn read_batch(input: &Path) -> Result<Batch> {
    let raw = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading batch from stdin")?;
        buf
    } else {
        fs::read_to_string(input)
            .with_context(|| format!("reading batch file {}", input.display()))?
    };
    let value: Value = serde_json::from_str(&raw).context("parsing batch as JSON")?;
    Batch::from_value(value).context("batch must be {\"items\": [...]} or an array of items")
}

fn run_single(
    client: &ApiClient,
    resource: Resource,
    operation: Operation,
    parameters: Value,
    dry_run: bool,
    output: OutputFormat,
    columns: Option<&[&str]>,
) -> Result<()> {
    let batch = Batch::new(vec![InputItem::with_parameters(parameters)]);
    let options = RunOptions {
        continue_on_fail: false,
        dry_run,
    };
    let mut results = run_batch(client, &batch, &batch, resource, operation, options)
        .with_context(|| format!("running {resource}/{operation}"))?;
    let response = results.pop().unwrap_or(Value::Null);

    if output == OutputFormat::Pretty && !dry_run && print_table(&response, columns) {
        return Ok(());
    }
    print_json(&response, output)
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

fn list_operations(resource: Resource) -> String {
    resource
        .operations()
        .iter()
        .map(|op| op.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_json(value: &Value, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Pretty => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Missive wraps list results as `{"contacts": [...]}`; render the first
/// array of objects found as a table. Returns false when nothing fits.
fn print_table(json: &Value, columns_hint: Option<&[&str]>) -> bool {
    let Some(columns_hint) = columns_hint else {
        return false;
    };
    let rows = match json {
        Value::Array(arr) => arr,
        Value::Object(map) => match map.values().find_map(Value::as_array) {
            Some(arr) => arr,
            None => return false,
        },
        _ => return false,
    };

    if rows.is_empty() {
        println!("No resources found.");
        return true;
    }

    let columns: Vec<&str> = columns_hint
        .iter()
        .copied()
        .filter(|key| {
            rows.iter()
                .any(|row| row.get(key).map(is_non_empty).unwrap_or(false))
        })
        .collect();
    if columns.is_empty() {
        return false;
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    let mut table: Vec<Vec<String>> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            let out_row: Vec<String> = columns
                .iter()
                .map(|col| value_to_str(map.get(*col).unwrap_or(&Value::Null)))
                .collect();
            for (idx, cell) in out_row.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.len());
            }
            table.push(out_row);
        }
    }

    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            print!("  ");
        }
        print!("{:width$}", col, width = widths[i]);
    }
    println!();
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            print!("  ");
        }
        print!("{:-<width$}", "", width = *width);
    }
    println!();
    for row in table {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                print!("  ");
            }
            print!("{:width$}", cell, width = widths[i]);
        }
        println!();
    }

    true
}

fn value_to_str(value: &Value) -> String {
    match value {
        Value::Null => "".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_to_str).collect::<Vec<_>>().join(", "),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
