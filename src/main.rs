use clap::{Parser, Subcommand};
use photo_post::git::GitCli;
use photo_post::interrupt::{self, CleanupRegistry};
use photo_post::output::{self, Console};
use photo_post::prompt::TerminalPrompter;
use photo_post::workflow::{self, CancelReason, Outcome, RunContext};
use photo_post::{config, post};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "create-post")]
#[command(about = "Create a photo-blog post from a directory of images")]
#[command(long_about = "\
Create a photo-blog post from a directory of images

Walks through the whole onboarding in one run:

  1. Post metadata: title, slug, description (in $EDITOR), image key suffix
  2. Image directory and display order (e.g. 3,1,2)
  3. Staging: content-sniffed, renamed to <suffix>/<name>.jpg
  4. Upload to object storage (each image retried once)
  5. <posts_dir>/<slug>.md with YAML frontmatter
  6. git add, commit, push

Nothing is rolled back on failure: uploaded objects stay in the bucket.

Settings come from photo-post.toml in the project root when present.
Run 'create-post gen-config' to print a documented default file.")]
#[command(version)]
struct Cli {
    /// Project root (git working tree holding the content directory)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Log more to stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a post interactively (the default)
    New,
    /// Validate the frontmatter of every existing post
    Check,
    /// Print a stock photo-post.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let console = Console::stdout();
    let result = match cli.command.unwrap_or(Command::New) {
        Command::New => create(&cli.root, &console),
        Command::Check => check(&cli.root, &console),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            console.error(&format!("✗ Error: {e}"));
            ExitCode::FAILURE
        }
    }
}

/// Run the interactive workflow. `Ok(false)` means the operator cancelled.
fn create(root: &Path, console: &Console) -> Result<bool, Box<dyn std::error::Error>> {
    let config = config::load_config(root)?;

    let registry = CleanupRegistry::new();
    interrupt::install(registry.clone())?;

    let store = config.object_store(root);
    let vcs = GitCli::new(root);
    let ctx = RunContext {
        root,
        config: &config,
        store: store.as_ref(),
        vcs: &vcs,
        console,
        cleanup: Some(&registry),
        staging_parent: None,
    };

    console.heading("Create New Photo Post");
    let mut prompter = TerminalPrompter::new();
    match workflow::run(&ctx, &mut prompter) {
        Ok(Outcome::Cancelled(reason)) => {
            match reason {
                CancelReason::UploadDeclined => console.warning("Upload cancelled"),
                CancelReason::OverwriteDeclined(path) => console.warning(&format!(
                    "Cancelled: {} left unchanged",
                    path.display()
                )),
            }
            Ok(false)
        }
        Ok(_) => Ok(true),
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "workflow failed");
            Err(e.into())
        }
    }
}

/// Parse every post and report problems. `Ok(false)` if any post has one.
fn check(root: &Path, console: &Console) -> Result<bool, Box<dyn std::error::Error>> {
    let config = config::load_config(root)?;
    let posts_dir = config.posts_dir(root);
    console.heading(&format!("Checking {}", posts_dir.display()));
    let reports = post::check_posts(&posts_dir)?;
    console.lines(&output::format_check_report(&reports, &posts_dir));
    Ok(reports.iter().all(|r| r.is_ok()))
}
