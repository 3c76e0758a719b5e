//! `slipway flags` - show the merged environment for a target.

use std::sync::Arc;

use anyhow::{anyhow, Result};

use slipway::builder::toolchain::Toolchain;
use slipway::core::environment::Environment;
use slipway::project::session::{BuildSession, SessionOptions};
use slipway::util::config::load_config;

use crate::cli::FlagsArgs;

pub fn execute(args: FlagsArgs) -> Result<()> {
    let (root, manifest) = super::load_manifest(args.manifest_path.as_deref())?;

    let mut config = load_config(&root);
    if args.mode.is_some() {
        config.build.mode = args.mode;
    }

    let spec = manifest
        .targets
        .iter()
        .find(|t| t.name == args.target)
        .ok_or_else(|| anyhow!("no target named `{}` in the manifest", args.target))?;

    let libs = manifest.libraries()?;
    let mut requested = Vec::new();
    for name in &spec.libraries {
        let lib = libs
            .get(name)
            .ok_or_else(|| anyhow!("target `{}` references unknown library `{}`", spec.name, name))?;
        requested.push(Arc::clone(lib));
    }

    let toolchain = Toolchain::detect_or_default(config.build.compiler.as_deref());
    let options = SessionOptions {
        check_libs: false,
        ..SessionOptions::from_config(&config)
    };
    let mut session = BuildSession::new(options, toolchain, &config);

    let base = session.base_env.clone();
    let built = session.env_builder().build(&base, &requested, &spec.name)?;

    print_env(&built.env, &session.toolchain);
    Ok(())
}

fn print_env(env: &Environment, toolchain: &Toolchain) {
    let mut cc_line: Vec<String> = Vec::new();
    for path in &env.include_paths {
        cc_line.push(format!("-I{}", path.display()));
    }
    for path in &env.extern_include_paths {
        cc_line.push(format!("-isystem {}", path.display()));
    }
    for define in &env.defines {
        cc_line.push(toolchain.flags.define_arg(define));
    }
    cc_line.extend(env.ccflags.iter().cloned());

    let mut cxx_line = cc_line.clone();
    cxx_line.extend(env.cxxflags.iter().cloned());

    let mut ld_line: Vec<String> = env.ldflags.clone();
    for path in &env.lib_paths {
        ld_line.push(format!("-L{}", path.display()));
    }
    for lib in &env.libs {
        ld_line.push(format!("-l{}", lib));
    }

    println!("cc:   {}", cc_line.join(" "));
    println!("cxx:  {}", cxx_line.join(" "));
    println!("ld:   {}", ld_line.join(" "));

    if !env.extra_sources.is_empty() {
        let sources: Vec<String> = env
            .extra_sources
            .iter()
            .map(|s| s.display().to_string())
            .collect();
        println!("srcs: {}", sources.join(" "));
    }
}
