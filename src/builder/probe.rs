//! External-library probing.
//!
//! A probe answers one question: with the configuration a library
//! contributes, does a minimal program that includes its header compile
//! (and, when the library has link-libraries, link)? Probes run against a
//! scratch environment in a temporary directory and never touch the build
//! tree.

use std::fmt::Write as _;
use std::fs;

use miette::Diagnostic;
use thiserror::Error;

use crate::builder::toolchain::Toolchain;
use crate::core::environment::Environment;
use crate::core::library::{Language, Library};
use crate::util::process::ProcessBuilder;

/// A library failed its compile/link check.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("library `{library}` is not usable: {message}")]
#[diagnostic(
    code(slipway::probe::failed),
    help("Install the library, or point slipway at it with `[libs.{library}]` in `.slipway/config.toml`")
)]
pub struct ProbeFailure {
    pub library: String,
    pub message: String,
}

/// Seam for library verification.
///
/// The production implementation drives a real compiler; tests substitute
/// recording or scripted implementations.
pub trait Prober: Send + Sync {
    fn probe(&self, library: &Library, env: &Environment) -> Result<(), ProbeFailure>;
}

/// Probes a library by compiling a minimal translation unit with the
/// library's configuration applied, linking it when the library carries
/// link-libraries.
pub struct CompilerProbe {
    toolchain: Toolchain,
}

impl CompilerProbe {
    pub fn new(toolchain: Toolchain) -> Self {
        CompilerProbe { toolchain }
    }

    fn check_program(&self, library: &Library) -> String {
        let mut src = String::new();
        if let Some(header) = library.probe_header() {
            let _ = writeln!(src, "#include <{}>", header);
        }
        src.push_str("int main(void) { return 0; }\n");
        src
    }

    fn compile_args(&self, env: &Environment, language: Language) -> Vec<String> {
        let mut args = Vec::new();
        for path in &env.include_paths {
            args.push(format!("-I{}", path.display()));
        }
        for path in &env.extern_include_paths {
            args.push("-isystem".to_string());
            args.push(path.display().to_string());
        }
        for define in &env.defines {
            args.push(self.toolchain.flags.define_arg(define));
        }
        args.extend(env.ccflags.iter().cloned());
        if language == Language::Cxx {
            args.extend(env.cxxflags.iter().cloned());
        }
        args
    }

    fn link_args(&self, env: &Environment) -> Vec<String> {
        let mut args = Vec::new();
        args.extend(env.ldflags.iter().cloned());
        for path in &env.lib_paths {
            args.push(format!("-L{}", path.display()));
        }
        for lib in &env.libs {
            args.push(format!("-l{}", lib));
        }
        args
    }

    fn fail(&self, library: &Library, message: impl Into<String>) -> ProbeFailure {
        ProbeFailure {
            library: library.id.to_string(),
            message: message.into(),
        }
    }
}

impl Prober for CompilerProbe {
    fn probe(&self, library: &Library, env: &Environment) -> Result<(), ProbeFailure> {
        let scratch = tempfile::tempdir()
            .map_err(|e| self.fail(library, format!("cannot create scratch directory: {}", e)))?;

        let (compiler, source_name) = match library.language {
            Language::C => (self.toolchain.cc.clone(), "check.c"),
            Language::Cxx => (
                self.toolchain
                    .cxx
                    .clone()
                    .ok_or_else(|| self.fail(library, "no C++ compiler found in PATH"))?,
                "check.cpp",
            ),
        };

        let source = scratch.path().join(source_name);
        fs::write(&source, self.check_program(library))
            .map_err(|e| self.fail(library, format!("cannot write check program: {}", e)))?;

        let output = scratch.path().join("check");
        let mut cmd = ProcessBuilder::new(&compiler)
            .cwd(scratch.path())
            .args(self.compile_args(env, library.language))
            .arg(&source)
            .arg("-o")
            .arg(&output);

        if library.probe_links() {
            cmd = cmd.args(self.link_args(env));
        } else {
            // Header-only and lib-less externals only need to compile.
            cmd = cmd.arg("-c");
        }

        tracing::debug!(library = %library.id, command = %cmd.display_command(), "probing");

        let result = cmd
            .exec()
            .map_err(|e| self.fail(library, e.to_string()))?;

        if result.status.success() {
            tracing::debug!(library = %library.id, "probe succeeded");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let step = if library.probe_links() {
                "compile/link check failed"
            } else {
                "compile check failed"
            };
            Err(self.fail(
                library,
                format!("{}: {}", step, stderr.trim()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::toolchain::{CompilerFamily, FlagTable};
    use crate::core::library::{ExternalSpec, HeaderOnlySpec};
    use std::path::PathBuf;

    fn fake_toolchain() -> Toolchain {
        Toolchain {
            family: CompilerFamily::Gcc,
            cc: PathBuf::from("cc"),
            cxx: Some(PathBuf::from("c++")),
            ar: None,
            version: None,
            flags: FlagTable::gcc(),
        }
    }

    #[test]
    fn test_check_program_includes_header() {
        let probe = CompilerProbe::new(fake_toolchain());
        let lib = Library::external(
            "png",
            ExternalSpec {
                header: Some("png.h".to_string()),
                libs: vec!["png".to_string()],
                ..Default::default()
            },
        );

        let src = probe.check_program(&lib);
        assert!(src.contains("#include <png.h>"));
        assert!(src.contains("int main(void)"));
    }

    #[test]
    fn test_check_program_without_header() {
        let probe = CompilerProbe::new(fake_toolchain());
        let lib = Library::external("m", ExternalSpec::default());

        let src = probe.check_program(&lib);
        assert!(!src.contains("#include"));
    }

    #[test]
    fn test_compile_args_render_paths_and_defines() {
        let probe = CompilerProbe::new(fake_toolchain());
        let mut env = Environment::new();
        env.add_include_path("/src/include");
        env.add_extern_include_path("/opt/png/include");
        env.add_define("PNG_SKIP_SETJMP_CHECK");

        let args = probe.compile_args(&env, Language::C);
        assert!(args.contains(&"-I/src/include".to_string()));
        assert!(args.contains(&"-isystem".to_string()));
        assert!(args.contains(&"/opt/png/include".to_string()));
        assert!(args.contains(&"-DPNG_SKIP_SETJMP_CHECK".to_string()));
    }

    #[test]
    fn test_link_args() {
        let probe = CompilerProbe::new(fake_toolchain());
        let mut env = Environment::new();
        env.add_lib_path("/opt/png/lib");
        env.add_lib("png");
        env.add_lib("z");

        assert_eq!(
            probe.link_args(&env),
            vec!["-L/opt/png/lib", "-lpng", "-lz"]
        );
    }

    #[test]
    fn test_header_only_probe_is_compile_only() {
        let lib = Library::header_only("span-lite", HeaderOnlySpec::default());
        assert!(!lib.probe_links());
    }
}
