//! citeref - resolve report citations to DOIs and write a two-column summary
//!
//! Usage: citeref <REPORT> [OUTPUT]

use citeref_lib::cache::{load_legacy_map, DoiCache};
use citeref_lib::error::{CiteError, Result};
use citeref_lib::logging::init_logging;
use citeref_lib::papers::resolver::{DoiResolver, RetryPolicy};
use citeref_lib::papers::semantic_scholar::SemanticScholarClient;
use citeref_lib::render::{render_report, ColumnLayout};
use citeref_lib::report::{extract_sections, load_report, unique_corpus_ids};
use citeref_lib::settings::Settings;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "citeref")]
#[command(version, about = "Extract report citations and resolve their DOIs", long_about = None)]
struct Cli {
    /// Report JSON file
    report: PathBuf,

    /// Output text file [default: citations_dois.txt]
    output: Option<PathBuf>,

    /// DOI cache file [default: doi_cache.json]
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Legacy "(Label) -> doi" file used to backfill the cache [default: trialreport.txt]
    #[arg(long)]
    legacy: Option<PathBuf>,

    /// Skip the legacy import
    #[arg(long)]
    no_legacy: bool,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Semantic Scholar API key (also read from SEMANTIC_SCHOLAR_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

#[cfg(unix)]
extern "C" fn on_interrupt(_signal: libc::c_int) {
    const MSG: &[u8] = b"\n\nInterrupted by user\n";
    // Only async-signal-safe calls in here
    unsafe {
        libc::write(2, MSG.as_ptr() as *const libc::c_void, MSG.len());
        libc::_exit(1);
    }
}

fn main() {
    #[cfg(unix)]
    unsafe {
        libc::signal(
            libc::SIGINT,
            on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }

    // Panics print their message plus a backtrace and exit 1
    std::panic::set_hook(Box::new(|info| {
        eprintln!("\n\nError: {}", info);
        eprintln!("{}", std::backtrace::Backtrace::force_capture());
    }));

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            eprintln!("\nExample:\n  citeref report.json citations_dois.txt");
            std::process::exit(1);
        }
    };

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&settings.log_level);

    match std::panic::catch_unwind(move || run(cli, settings)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            if let CiteError::ReportNotFound(_) = e {
                eprintln!("\nUsage: citeref <REPORT> [OUTPUT]");
            }
            std::process::exit(1);
        }
        Err(_) => std::process::exit(1),
    }
}

/// Settings file, then command line overrides
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(cache) = &cli.cache {
        settings.cache_file = cache.clone();
    }
    if let Some(legacy) = &cli.legacy {
        settings.legacy_file = legacy.clone();
    }
    if let Some(output) = &cli.output {
        settings.output_file = output.clone();
    }
    if cli.api_key.is_some() {
        settings.api_key = cli.api_key.clone();
    }
    Ok(settings)
}

fn run(cli: Cli, settings: Settings) -> Result<()> {
    println!("Loading report from: {}", cli.report.display());
    let report = load_report(&cli.report)?;

    println!("Extracting sections and citations from report...");
    let sections = extract_sections(&report);
    let corpus_ids = unique_corpus_ids(&sections);
    println!("Found {} unique citations\n", corpus_ids.len());

    println!("Fetching DOIs from Semantic Scholar API...");
    let cache = DoiCache::load(&settings.cache_file);
    let client = SemanticScholarClient::new(&settings.api_base, settings.api_key(), settings.timeout())?;
    info!(
        "Semantic Scholar auth: {}",
        if settings.api_key().is_some() { "yes" } else { "no (public API)" }
    );
    let mut resolver = DoiResolver::new(cache, client, RetryPolicy::from_settings(&settings));

    if !cli.no_legacy {
        let legacy = load_legacy_map(&settings.legacy_file);
        resolver.import_legacy(&sections, &legacy);
    }

    resolver.resolve_all(&corpus_ids);

    let layout = ColumnLayout {
        left_width: settings.left_width,
        right_width: settings.right_width,
        delimiter: settings.delimiter.clone(),
    };
    let output = &settings.output_file;
    println!("\nWriting to: {}", output.display());
    let text = render_report(report.query(), &sections, resolver.cache(), &layout);
    std::fs::write(output, text).map_err(|source| CiteError::Write {
        path: output.clone(),
        source,
    })?;

    resolver.stats.print_summary();
    let with_doi = corpus_ids
        .iter()
        .filter(|id| resolver.doi_for(id).is_some())
        .count();
    println!("  {:16} {}/{}", "With DOI:", with_doi, corpus_ids.len());
    println!("\nCache file: {}", settings.cache_file.display());
    println!("Output saved to: {}", output.display());
    Ok(())
}
