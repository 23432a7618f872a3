use clap::Parser;
use iconsync::exec::SystemRunner;
use iconsync::imaging::RustBackend;
use iconsync::pipeline::{self, Collaborators, RunOptions};
use iconsync::vcs::GitCli;
use iconsync::{config, logging, notify, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iconsync")]
#[command(version)]
#[command(about = "Incremental icon pipeline: normalize, upscale, mask, publish")]
#[command(long_about = "\
Incremental icon pipeline: normalize, upscale, mask, publish

Run from the root of the git working tree that hosts the icons.

  repo/
  ├── iconsync.toml      # Optional config (defaults are built in)
  ├── tubiao.json        # Published manifest, rewritten every batch run
  ├── uploaders.json     # Uploader records written by the upload bot
  └── pic/               # Source directory
      ├── .last_hash.json
      ├── logo.png       # Canonical 512x512
      ├── logo_radius.png
      └── logo_round.png

Changed sources are converted to PNG, upscaled when small, fitted onto a
square canvas and, when opaque, masked into rounded and circular variants.
The manifest is rebuilt and everything is committed and pushed.

A source directory whose name contains `temp_` or `processing` is handled in
single-file mode: files are transformed in place and nothing else is touched.

Log verbosity follows RUST_LOG (default: info).")]
struct Cli {
    /// Source directory, relative to the working tree
    #[arg(default_value = "pic")]
    source_dir: PathBuf,

    /// Super-resolution model passed to the upscaler
    #[arg(default_value = "realesrgan-x4plus")]
    model: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init();

    let work_dir = std::env::current_dir()?;
    let config = config::load_config(&work_dir)?;
    init_thread_pool(&config.processing);

    let options = RunOptions {
        work_dir: work_dir.clone(),
        source_dir: cli.source_dir,
        model: cli.model,
    };
    println!(
        "{}",
        output::format_run_header(&options.source_label(), options.mode())
    );

    let backend = RustBackend::new();
    let runner = SystemRunner::new();
    let git = GitCli::new(&runner, &work_dir);
    let notifier = notify::from_config(&config.notify);
    let deps = Collaborators {
        backend: &backend,
        runner: &runner,
        vcs: &git,
        notifier: notifier.as_ref(),
    };

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = pipeline::run(&config, &options, &deps, Some(tx));
    printer.join().unwrap();

    output::print_run_summary(&result?);
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
