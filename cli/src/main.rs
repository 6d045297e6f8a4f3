mod config;
mod logging;
mod render;
mod snapshot_file;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use mergeblock::query::{find_innermost_containing, select_by_name};
use mergeblock::{Block, BlockError, BlockParser};

use crate::config::Config;
use crate::snapshot_file::LoadedSnapshot;

#[derive(Parser)]
#[command(name = "mergeblock", version, about = "Inspect merge block structure in document snapshots")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log parser activity to stderr (overridden by MERGEBLOCK_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./mergeblock.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate block marker nesting
    Check(FileArgs),

    /// Print the block tree with each block's merge fields
    Tree(TreeArgs),

    /// Print all blocks as a flat list sorted by position
    Flat(FileArgs),

    /// Print the innermost block containing a text position
    Find(FindArgs),

    /// Print the selection range (start and length) of a named block
    Select(SelectArgs),

    /// Rename a block by rewriting its start and end markers
    Rename(RenameArgs),

    /// Run .test.toml case files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct FileArgs {
    /// Snapshot file (TOML)
    file: PathBuf,
}

#[derive(clap::Args)]
struct TreeArgs {
    /// Snapshot file (TOML)
    file: PathBuf,

    /// Omit merge fields from the outline
    #[arg(long)]
    no_fields: bool,
}

#[derive(clap::Args)]
struct FindArgs {
    /// Snapshot file (TOML)
    file: PathBuf,

    /// Text position
    position: usize,
}

#[derive(clap::Args)]
struct SelectArgs {
    /// Snapshot file (TOML)
    file: PathBuf,

    /// Block name (exact match)
    name: String,
}

#[derive(clap::Args)]
struct RenameArgs {
    /// Snapshot file (TOML)
    file: PathBuf,

    /// Current block name (exact match)
    old: String,

    /// New block name
    new: String,

    /// Write the updated snapshot back to the file instead of printing it
    #[arg(long)]
    write: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.toml file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// Shared state for the subcommands.
struct App {
    config: Config,
    color: ColorChoice,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        config.color.choice()
    };
    let app = App { config, color };

    let result = match cli.command {
        Command::Check(args) => do_check(&app, &args.file),
        Command::Tree(args) => do_tree(&app, &args),
        Command::Flat(args) => do_flat(&app, &args.file),
        Command::Find(args) => do_find(&app, &args),
        Command::Select(args) => do_select(&app, &args),
        Command::Rename(args) => do_rename(&app, &args),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                Ok(0)
            } else {
                Ok(test_runner::run_tests(
                    &args.path,
                    color == ColorChoice::Never,
                    &args.category,
                ))
            }
        }
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Render a structural error against the snapshot file it came from.
fn emit_block_error(app: &App, loaded: &LoadedSnapshot, error: &BlockError) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(loaded.path.display().to_string(), loaded.source.clone());
    let diagnostic = error.to_diagnostic(file_id, |target| loaded.span_of(target));

    let writer = StandardStream::stderr(app.color);
    let config = term::Config::default();
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
}

/// Load a snapshot and list its blocks. Structural errors are reported
/// and give `None`.
fn load_flattened(
    app: &App,
    file: &Path,
) -> anyhow::Result<Option<(LoadedSnapshot, Vec<Block>)>> {
    let loaded = LoadedSnapshot::load(file)?;
    let parsed = BlockParser::new(&loaded.snapshot).parse_flattened();
    match parsed {
        Ok(blocks) => Ok(Some((loaded, blocks))),
        Err(error) => {
            emit_block_error(app, &loaded, &error);
            Ok(None)
        }
    }
}

fn do_check(app: &App, file: &Path) -> anyhow::Result<i32> {
    let loaded = LoadedSnapshot::load(file)?;
    match BlockParser::new(&loaded.snapshot).validate() {
        Ok(markers) => {
            eprintln!(
                "ok: {} has {} block marker(s), nesting valid",
                file.display(),
                markers.len()
            );
            Ok(0)
        }
        Err(error) => {
            emit_block_error(app, &loaded, &error);
            Ok(1)
        }
    }
}

fn do_tree(app: &App, args: &TreeArgs) -> anyhow::Result<i32> {
    let loaded = LoadedSnapshot::load(&args.file)?;
    let tree = match BlockParser::new(&loaded.snapshot).parse_tree() {
        Ok(t) => t,
        Err(error) => {
            emit_block_error(app, &loaded, &error);
            return Ok(1);
        }
    };

    let show_fields = app.config.show_fields && !args.no_fields;
    for line in render::outline_lines(&tree, show_fields) {
        println!("{}", line);
    }
    Ok(0)
}

fn do_flat(app: &App, file: &Path) -> anyhow::Result<i32> {
    let Some((_, blocks)) = load_flattened(app, file)? else {
        return Ok(1);
    };

    for line in render::flat_lines(&blocks) {
        println!("{}", line);
    }
    Ok(0)
}

fn do_find(app: &App, args: &FindArgs) -> anyhow::Result<i32> {
    let Some((_, blocks)) = load_flattened(app, &args.file)? else {
        return Ok(1);
    };

    match find_innermost_containing(&blocks, args.position) {
        Some(block) => {
            println!("{}", render::block_label(block));
            Ok(0)
        }
        None => {
            eprintln!("no block contains position {}", args.position);
            Ok(1)
        }
    }
}

fn do_select(app: &App, args: &SelectArgs) -> anyhow::Result<i32> {
    let Some((_, blocks)) = load_flattened(app, &args.file)? else {
        return Ok(1);
    };

    match select_by_name(&blocks, &args.name) {
        Some(selection) => {
            println!("{} {}", selection.start, selection.length);
            Ok(0)
        }
        None => {
            eprintln!("no block named '{}'", args.name);
            Ok(1)
        }
    }
}

fn do_rename(app: &App, args: &RenameArgs) -> anyhow::Result<i32> {
    let Some((mut loaded, mut blocks)) = load_flattened(app, &args.file)? else {
        return Ok(1);
    };

    let Some(block) = blocks.iter_mut().find(|b| b.name() == args.old) else {
        eprintln!("no block named '{}'", args.old);
        return Ok(1);
    };
    if let Err(error) = block.rename(&mut loaded.snapshot, &args.new) {
        emit_block_error(app, &loaded, &error);
        return Ok(1);
    }

    let updated = loaded.to_toml()?;
    if args.write {
        std::fs::write(&args.file, updated)
            .with_context(|| format!("cannot write '{}'", args.file.display()))?;
        eprintln!("renamed '{}' to '{}' in {}", args.old, args.new, args.file.display());
    } else {
        print!("{}", updated);
    }
    Ok(0)
}
