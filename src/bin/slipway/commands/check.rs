//! `slipway check` - probe every declared external library.
//!
//! Unlike `build`, which only probes the libraries its targets request,
//! `check` probes everything `[libs.*]` declares, in parallel.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;

use slipway::builder::cache::AvailabilityCache;
use slipway::builder::probe::CompilerProbe;
use slipway::builder::toolchain::Toolchain;
use slipway::core::environment::Environment;
use slipway::project::report::OutputFormat;
use slipway::resolver::resolve;
use slipway::util::config::{load_config, OptionRegistry};
use slipway::util::diagnostic::{suggestions, Diagnostic};

use crate::cli::CheckArgs;

#[derive(Debug, Serialize)]
struct CheckEntry {
    library: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

pub fn execute(args: CheckArgs, color: bool) -> Result<()> {
    let (root, manifest) = super::load_manifest(args.manifest_path.as_deref())?;
    let config = load_config(&root);

    let libs = manifest.libraries()?;
    let needs_probe = libs.values().any(|lib| !lib.is_internal());
    let toolchain = if needs_probe {
        Toolchain::detect(config.build.compiler.as_deref())?
    } else {
        Toolchain::detect_or_default(config.build.compiler.as_deref())
    };
    let prober = CompilerProbe::new(toolchain);
    let cache = AvailabilityCache::new();

    let mut options = OptionRegistry::from_config(&config);
    for name in libs.keys() {
        options.declare(name);
    }

    // Probe each library against its own closure's merged environment.
    let candidates: Vec<_> = libs
        .values()
        .filter(|lib| !lib.is_internal())
        .cloned()
        .collect();

    let progress = if matches!(args.output_format, OutputFormat::Human) {
        let bar = ProgressBar::new(candidates.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} probing [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    let probe_one = |lib: &std::sync::Arc<slipway::Library>| -> CheckEntry {
        if let Some(ref bar) = progress {
            bar.set_message(lib.id.to_string());
        }
        let entry = match resolve(std::slice::from_ref(lib)) {
            Ok(closure) => {
                let mut env = Environment::new();
                for resolved in &closure {
                    resolved.library.apply(&mut env, resolved.depth, &options);
                }
                match cache.verify(lib, &env, &prober) {
                    Ok(()) => CheckEntry {
                        library: lib.id.to_string(),
                        ok: true,
                        message: None,
                    },
                    Err(failure) => CheckEntry {
                        library: lib.id.to_string(),
                        ok: false,
                        message: Some(failure.message),
                    },
                }
            }
            Err(cycle) => CheckEntry {
                library: lib.id.to_string(),
                ok: false,
                message: Some(cycle.to_string()),
            },
        };
        if let Some(ref bar) = progress {
            bar.inc(1);
        }
        entry
    };

    let mut entries: Vec<CheckEntry> = match args.jobs {
        Some(jobs) if jobs > 0 => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .context("failed to build probe thread pool")?;
            pool.install(|| candidates.par_iter().map(probe_one).collect())
        }
        _ => candidates.par_iter().map(probe_one).collect(),
    };
    entries.sort_by(|a, b| a.library.cmp(&b.library));

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let failed = entries.iter().filter(|e| !e.ok).count();

    match args.output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).context("failed to serialize report")?
            );
        }
        OutputFormat::Human => {
            for entry in &entries {
                if entry.ok {
                    println!("  ok    {}", entry.library);
                } else {
                    println!("  FAIL  {}", entry.library);
                }
            }
            println!("\n{} librar(ies) checked, {} failed", entries.len(), failed);

            for entry in entries.iter().filter(|e| !e.ok) {
                let diag =
                    Diagnostic::error(format!("library `{}` is not usable", entry.library))
                        .with_context(entry.message.clone().unwrap_or_default())
                        .with_suggestion(suggestions::PROBE_FAILED);
                eprint!("{}", diag.format(color));
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
