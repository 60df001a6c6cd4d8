//! livemark - Markdown export for rendered chat content

use std::cell::RefCell;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use livemark::driver::run_until_idle;
use livemark::{Config, FlushReport, Scheduler, Services, parse_html, serialize};

/// Upper bound on flushes for one `--render` pass.
const MAX_FRAMES: usize = 64;

#[derive(Parser)]
#[command(name = "livemark")]
#[command(version, about = "Markdown export for rendered chat content", long_about = None)]
#[command(after_help = "EXAMPLES:
    livemark export answer.html             Print the answer as Markdown
    livemark export --render answer.html    Typeset math and diagrams first
    livemark css --config settings.json     Print the host stylesheet")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (JSON, as written by the settings tool)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert an HTML snapshot to Markdown
    Export {
        /// Input HTML file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: String,

        /// Run the math and diagram passes before exporting
        #[arg(short, long)]
        render: bool,

        /// Also place the Markdown on the system clipboard
        #[arg(long)]
        copy: bool,

        /// Print flush reports as JSON on stderr
        #[arg(long)]
        report: bool,
    },
    /// Print the stylesheet for the current configuration
    Css,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref().map(Config::load).unwrap_or_default();

    let result = match cli.command {
        Command::Export {
            input,
            render,
            copy,
            report,
        } => export(&input, config, render, copy, report),
        Command::Css => {
            print!("{}", config.stylesheet());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn export(input: &str, config: Config, render: bool, copy: bool, report: bool) -> Result<(), String> {
    let html = read_input(input)?;
    let tree = Rc::new(RefCell::new(parse_html(&html)));

    if render {
        let reports = render_all(&tree, config)?;
        if report {
            let json = serde_json::to_string_pretty(&reports).map_err(|e| e.to_string())?;
            eprintln!("{json}");
        }
    }

    let tree = tree.borrow();
    let markdown = serialize(&tree, tree.body());
    println!("{markdown}");

    if copy {
        copy_to_clipboard(&markdown)?;
    }
    Ok(())
}

fn read_input(input: &str) -> Result<String, String> {
    if input == "-" {
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .map_err(|e| format!("stdin: {e}"))?;
        Ok(html)
    } else {
        std::fs::read_to_string(input).map_err(|e| format!("{input}: {e}"))
    }
}

fn render_all(tree: &livemark::SharedTree, config: Config) -> Result<Vec<FlushReport>, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| e.to_string())?;

    let services = Rc::new(Services::with_default_engines(config));
    let scheduler = Rc::new(RefCell::new(Scheduler::new(tree.clone(), services)));
    let body = tree.borrow().body();
    scheduler.borrow_mut().bind(body);

    let reports = runtime.block_on(run_until_idle(&scheduler, MAX_FRAMES));
    scheduler.borrow_mut().unbind();
    Ok(reports)
}

#[cfg(feature = "clipboard")]
fn copy_to_clipboard(markdown: &str) -> Result<(), String> {
    use livemark::Clipboard;

    let mut clipboard = livemark::copy::SystemClipboard::new().map_err(|e| e.to_string())?;
    clipboard.write_text(markdown).map_err(|e| e.to_string())
}

#[cfg(not(feature = "clipboard"))]
fn copy_to_clipboard(_markdown: &str) -> Result<(), String> {
    Err("built without clipboard support".to_string())
}
