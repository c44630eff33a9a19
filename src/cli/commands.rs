use super::demo::demo_page;
use crate::fields::FieldContainer;
use crate::handler::HandlerTree;
use crate::logging::{init_logging_with_config, LogConfig};
use crate::runtime_config::DispatchConfig;
use crate::server::Request;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use http::Method;
use std::io::Write;
use std::path::PathBuf;

/// Command-line interface for the dynform demo page
#[derive(Parser, Debug)]
#[command(name = "dynform")]
#[command(about = "Inspect and dispatch against the dynform demo page", long_about = None)]
pub struct Cli {
    /// YAML dispatch configuration (defaults come from DYNFORM_* variables)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every node of the demo tree and its client init scripts
    Tree,
    /// Dispatch one request against the demo tree and print the result as JSON
    Dispatch {
        /// Dotted handler path; repeat to fan out
        #[arg(long = "handler")]
        handlers: Vec<String>,

        /// HTTP method of the request
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request field as key=value; repeat for more (or for list values)
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// Authenticated user to attach to the request
        #[arg(long)]
        user: Option<String>,
    },
}

/// Parse arguments, initialise logging and run the selected command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the demo tree
/// fails to build or the request arguments are malformed.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging_with_config(&LogConfig::from_env())?;
    let stdout = std::io::stdout();
    run_command(&cli, &mut stdout.lock())
}

/// Run `cli` writing all output to `out`.
pub fn run_command(cli: &Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => DispatchConfig::from_yaml_file(path)?,
        None => DispatchConfig::from_env(),
    };
    let tree = HandlerTree::build_with_config(&demo_page(), config)
        .context("Failed to build demo page")?;

    match &cli.command {
        Commands::Tree => print_tree(&tree, out),
        Commands::Dispatch {
            handlers,
            method,
            fields,
            user,
        } => {
            let request = build_request(&tree, handlers, method, fields, user.as_deref())?;
            let response = tree.dispatch(request);
            let json = serde_json::to_string_pretty(&response.serialize())?;
            writeln!(out, "{json}")?;
            Ok(())
        }
    }
}

fn print_tree(tree: &HandlerTree, out: &mut dyn Write) -> anyhow::Result<()> {
    for node in tree.all_nodes() {
        let meta = tree.get(node);
        writeln!(
            out,
            "{}\t{}\tgrab_fields={:?}\tshared_fields={:?}",
            meta.accessor,
            meta.label(),
            meta.grab_fields,
            meta.shared_fields
        )?;
    }
    writeln!(out)?;
    for script in tree.init_scripts() {
        writeln!(out, "{script}")?;
    }
    Ok(())
}

fn build_request(
    tree: &HandlerTree,
    handlers: &[String],
    method: &str,
    fields: &[String],
    user: Option<&str>,
) -> anyhow::Result<Request> {
    let mut container = FieldContainer::new();
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            bail!("Invalid field '{field}', expected key=value");
        };
        container.append(key, value);
    }

    let routing_field = tree.config().routing_field.clone();
    match handlers {
        [] => {}
        [single] => {
            container.insert(routing_field, single.as_str());
        }
        many => {
            container.insert(routing_field, many.to_vec());
        }
    }

    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{method}'"))?;

    let mut request = Request::with_fields(container);
    request.method = method;
    request.user = user.map(str::to_string);
    Ok(request)
}
