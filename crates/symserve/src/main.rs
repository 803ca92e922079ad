use std::io::Read;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use symserve_core::{CompactSymbolTable, SymbolError, SymbolManager};
use symserve_utils::{info, init_logging};

mod helper;

use helper::DirectoryAccessor;

/// Extract symbol tables from local binaries and answer symbolication queries.
#[derive(Parser, Debug)]
#[command(name = "symserve")]
#[command(version)]
#[command(about = "Extract symbol tables from local binaries and answer symbolication queries", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Dump the compact symbol table of one binary
    Dump
    {
        /// Debug name of the binary (e.g. xul.pdb, libxul.so)
        debug_name: String,
        /// Breakpad ID of the build; discovered automatically if omitted
        #[arg(long)]
        breakpad_id: Option<String>,
        /// Directory holding the binaries and their debug companions
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
        /// Print every symbol instead of the first 15
        #[arg(long, default_value_t = false)]
        full: bool,
    },
    /// Run a JSON API request against local binaries
    Query
    {
        /// Endpoint URL path (e.g. /symbolicate/v5)
        url: String,
        /// File holding the request JSON; reads stdin if omitted
        #[arg(long)]
        request: Option<PathBuf>,
        /// Directory holding the binaries and their debug companions
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
    },
}

fn main()
{
    // Initialize logging (reads from RUST_LOG env var)
    // Defaults to INFO level and Pretty format if not set
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run_command(cli)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>>
{
    match cli.command {
        Commands::Dump {
            debug_name,
            breakpad_id,
            directory,
            full,
        } => {
            info!("Dumping symbols for {} from {}", debug_name, directory.display());
            let accessor = DirectoryAccessor::new(directory);
            let table = get_table_retry_id(&debug_name, breakpad_id, &accessor).await?;
            dump_table(&mut std::io::stdout(), &table, full)?;
            Ok(())
        }
        Commands::Query { url, request, directory } => {
            let request_json = match request {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            info!("Running {} against {}", url, directory.display());
            let manager = SymbolManager::new(DirectoryAccessor::new(directory));
            let response = symserve_api::query_api(&url, &request_json, &manager).await;
            println!("{}", response);
            Ok(())
        }
    }
}

/// Fetch a table, discovering the breakpad ID when none was given.
///
/// The engine always wants an ID, so an unspecified one is resolved by
/// querying with a bogus ID and retrying with the ID the mismatch error
/// reports back.
async fn get_table_retry_id(
    debug_name: &str,
    breakpad_id: Option<String>,
    accessor: &DirectoryAccessor,
) -> Result<CompactSymbolTable, SymbolError>
{
    let breakpad_id = match breakpad_id {
        Some(breakpad_id) => breakpad_id,
        None => {
            match symserve_core::get_compact_symbol_table(debug_name, "<unspecified>", accessor).await {
                Ok(table) => return Ok(table),
                Err(err) => match expected_breakpad_id(&err) {
                    Some(expected) => {
                        eprintln!("Using breakpadID: {}", expected);
                        expected
                    }
                    None => return Err(err),
                },
            }
        }
    };
    symserve_core::get_compact_symbol_table(debug_name, &breakpad_id, accessor).await
}

/// Dig the ID the file actually carries out of a mismatch failure.
fn expected_breakpad_id(err: &SymbolError) -> Option<String>
{
    match err {
        SymbolError::UnmatchedBreakpadId { expected, .. } => Some(expected.clone()),
        SymbolError::NoUsableCandidatePath { last_error, .. } => expected_breakpad_id(last_error),
        // A fat archive reports one mismatch per member; pick the first
        // and let the user rerun with an explicit ID for the others.
        SymbolError::NoMatchMultiArch(errors) => errors.iter().find_map(expected_breakpad_id),
        _ => None,
    }
}

fn dump_table(w: &mut impl std::io::Write, table: &CompactSymbolTable, full: bool) -> std::io::Result<()>
{
    writeln!(w, "Found {} symbols.", table.len())?;
    for (i, address) in table.addr.iter().enumerate() {
        if i >= 15 && !full {
            writeln!(w, "and {} more symbols. Pass --full to print the full list.", table.len() - i)?;
            break;
        }
        writeln!(w, "{:x} {}", address, table.name_at(i).unwrap_or_default())?;
    }
    Ok(())
}
