//! Command-line front end over `todo_core`.
//!
//! # Responsibility
//! - Move task lists between a SQLite store and plain-text files.
//! - Show stored lists with their link state.
//! - Administer per-document reference registries.

use clap::{Args, Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use todo_core::transfer::{default_export_file_name, export_file, import_file};
use todo_core::{
    init_logging, open_db, ChecklistService, CoreConfig, DocumentId, InMemoryHost,
    RegistryRepository, SqliteRegistryRepository, SqliteTaskListRepository, StoredTaskList,
    TaskList, TaskListRepository,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "todo", author, version, about = "Per-document checklists with cross-document links")]
struct Cli {
    /// SQLite store holding task lists and registries.
    #[arg(long, global = true, default_value = "todo.db")]
    db: PathBuf,

    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Absolute directory for rotated log files. Logging is off without it.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a list to a text file, one item per line.
    Export {
        #[arg(long)]
        list: String,
        /// Target file; defaults to `<list>_<product>.txt`.
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value = "todo")]
        product: String,
    },
    /// Append the items of a text file to a list, creating it if missing.
    Import {
        #[arg(long)]
        list: String,
        #[arg(long)]
        file: PathBuf,
        /// Document a newly created list lives in.
        #[arg(long)]
        document: Option<String>,
    },
    /// Print every stored list with its counts.
    Lists,
    /// Print a list's items and the state of their links.
    Show {
        #[arg(long)]
        list: String,
    },
    /// Reference registry administration.
    Registry(RegistryArgs),
}

#[derive(Args, Debug)]
struct RegistryArgs {
    #[command(subcommand)]
    command: RegistryCommand,
}

#[derive(Subcommand, Debug)]
enum RegistryCommand {
    /// Print the entries of one document's registry.
    Show { document: String },
    /// Delete one document's registry. Links into it become lost.
    Destroy { document: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = match cli.config.as_deref() {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir)?;
    }

    let conn = open_db(&cli.db)?;
    let lists = SqliteTaskListRepository::new(&conn);
    let registries = SqliteRegistryRepository::new(&conn);

    match cli.command {
        Command::Export { list, out, product } => {
            let stored = find_list(&lists, &list)?;
            let out = out.unwrap_or_else(|| {
                PathBuf::from(default_export_file_name(&stored.list.name, &product))
            });
            export_file(&stored.list, &out)?;
            println!("exported {} items to {}", stored.list.len(), out.display());
        }
        Command::Import {
            list,
            file,
            document,
        } => {
            let document = document.map(DocumentId::new).transpose()?;
            let mut stored = import_target(&lists, list, document)?;
            let added = import_file(&mut stored.list, &file)?;
            lists.save_list(&stored)?;
            println!("imported {added} items into `{}`", stored.list.name);
        }
        Command::Lists => {
            for summary in lists.list_lists()? {
                println!(
                    "{}  {:<24} {}/{} done  {}",
                    summary.id,
                    summary.name,
                    summary.completed_count,
                    summary.item_count,
                    summary
                        .document
                        .as_ref()
                        .map_or("(asset)", DocumentId::as_str)
                );
            }
        }
        Command::Show { list } => {
            let stored = find_list(&lists, &list)?;
            let service = hydrate_service(&registries, config, &stored)?;
            print_list(service, &stored);
        }
        Command::Registry(RegistryArgs { command }) => match command {
            RegistryCommand::Show { document } => {
                let document = DocumentId::new(document)?;
                match registries.load_registry(&document)? {
                    Some(registry) => {
                        for (id, object) in registry.entries() {
                            println!("{id}  {object}");
                        }
                        println!("{} entries in {document}", registry.len());
                    }
                    None => println!("no registry in {document}"),
                }
            }
            RegistryCommand::Destroy { document } => {
                let document = DocumentId::new(document)?;
                if registries.delete_registry(&document)? {
                    info!("event=registry_destroy module=cli status=ok document={document}");
                    println!("destroyed registry in {document}");
                } else {
                    println!("no registry in {document}");
                }
            }
        },
    }
    Ok(())
}

fn find_list(lists: &impl TaskListRepository, name: &str) -> CliResult<StoredTaskList> {
    lists
        .find_list_by_name(name)?
        .ok_or_else(|| format!("no list named `{name}`").into())
}

/// Existing list named `name`, or a new one living in `document`.
///
/// `document` must match the stored list's document when the list exists.
fn import_target(
    lists: &impl TaskListRepository,
    name: String,
    document: Option<DocumentId>,
) -> CliResult<StoredTaskList> {
    match lists.find_list_by_name(&name)? {
        Some(stored) => {
            if let Some(requested) = document {
                if stored.document.as_ref() != Some(&requested) {
                    return Err(format!(
                        "list `{name}` already exists in {}; --document {requested} does not apply",
                        stored
                            .document
                            .as_ref()
                            .map_or("(asset)", DocumentId::as_str)
                    )
                    .into());
                }
            }
            Ok(stored)
        }
        None => Ok(StoredTaskList::create(document, TaskList::new(name))),
    }
}

/// Builds a host with every stored registry installed and every document
/// `stored` refers to loaded.
fn hydrate_service(
    registries: &impl RegistryRepository,
    config: CoreConfig,
    stored: &StoredTaskList,
) -> CliResult<ChecklistService<InMemoryHost>> {
    let mut host = InMemoryHost::new();
    for document in registries.list_documents()? {
        if let Some(registry) = registries.load_registry(&document)? {
            host.install_registry(registry);
        }
    }
    if let Some(document) = stored.document.as_ref() {
        host.open_document(document);
    }
    let opened = host.open_link_targets(&stored.list);
    info!("event=cli_hydrate module=cli status=ok documents_without_registry={opened}");
    Ok(ChecklistService::new(host, config.references))
}

fn print_list(mut service: ChecklistService<InMemoryHost>, stored: &StoredTaskList) {
    println!("{}", stored.list.name);
    for (item, resolution) in stored
        .list
        .iter()
        .zip(service.resolve_all(&stored.list))
    {
        let mark = if item.completed { 'x' } else { ' ' };
        let text = item.text.replace('\n', " / ");
        match resolution {
            Some(resolution) => {
                let object = resolution
                    .object()
                    .map(|object| object.to_string())
                    .unwrap_or_default();
                println!("[{mark}] {text}  {}{object}", resolution.label());
            }
            None => println!("[{mark}] {text}"),
        }
    }
}
