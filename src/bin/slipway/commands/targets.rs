//! `slipway targets` - list declared targets.

use anyhow::Result;

use slipway::builder::toolchain::Toolchain;
use slipway::project::session::{BuildSession, SessionOptions};
use slipway::project::{PlanExecutor, Project};
use slipway::util::config::load_config;

use crate::cli::TargetsArgs;

pub fn execute(args: TargetsArgs) -> Result<()> {
    let (root, manifest) = super::load_manifest(args.manifest_path.as_deref())?;

    let mut config = load_config(&root);
    // Listing never probes.
    config.build.check_libs = Some(false);

    let toolchain = Toolchain::detect_or_default(config.build.compiler.as_deref());
    let session = BuildSession::new(SessionOptions::from_config(&config), toolchain, &config);

    let mut project = Project::new(&root, session, Box::new(PlanExecutor));
    project.declare_from_manifest(&manifest)?;

    for record in project.session.registry.all() {
        let default_marker = if record.exposed { "" } else { "  (not default)" };
        println!("{:<12} {}{}", record.kind.to_string(), record.name, default_marker);
    }

    Ok(())
}
