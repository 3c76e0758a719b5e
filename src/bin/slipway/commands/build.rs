//! `slipway build` - configure the project and plan its targets.

use anyhow::Result;

use slipway::builder::toolchain::Toolchain;
use slipway::project::session::{BuildSession, SessionOptions};
use slipway::project::{PlanExecutor, Project, ProjectError};
use slipway::util::config::load_config;
use slipway::util::diagnostic::{emit, suggestions, Diagnostic};

use crate::cli::BuildArgs;

pub fn execute(args: BuildArgs, color: bool) -> Result<()> {
    let (root, manifest) = super::load_manifest(args.manifest_path.as_deref())?;

    let mut config = load_config(&root);
    if args.mode.is_some() {
        config.build.mode = args.mode;
    }
    if args.no_check {
        config.build.check_libs = Some(false);
    }
    if args.ignore_errors {
        config.build.ignore_configure_errors = Some(true);
    }
    if args.jobs.is_some() {
        config.build.jobs = args.jobs;
    }

    // Verification needs a real compiler; planning without checks does not.
    let toolchain = if config.build.check_libs() {
        Toolchain::detect(config.build.compiler.as_deref())?
    } else {
        Toolchain::detect_or_default(config.build.compiler.as_deref())
    };
    let options = SessionOptions::from_config(&config);
    let session = BuildSession::new(options, toolchain, &config);

    let mut project = Project::new(&root, session, Box::new(PlanExecutor));
    if let Err(err) = project.declare_from_manifest(&manifest) {
        if let ProjectError::NoSources(ref e) = err {
            let diag = Diagnostic::error(e.to_string())
                .with_context(format!("patterns: {}", e.patterns.join(", ")))
                .with_suggestion(suggestions::NO_SOURCES);
            emit(&diag, color);
            std::process::exit(1);
        }
        return Err(err.into());
    }

    let report = project.finish();
    print!("{}", report.render(args.output_format, color));

    let code = report.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
