//! Per-run build session.
//!
//! A [`BuildSession`] carries every piece of state shared across target
//! declarations: the option registry, the availability cache, the failure
//! aggregator, the target registry, the detected toolchain, and the base
//! environment targets start from. One session corresponds to one
//! invocation; nothing in it survives the process.

use crate::builder::cache::AvailabilityCache;
use crate::builder::env_builder::EnvironmentBuilder;
use crate::builder::probe::{CompilerProbe, Prober};
use crate::builder::toolchain::Toolchain;
use crate::core::environment::Environment;
use crate::project::aggregator::FailureAggregator;
use crate::project::registry::{MissingDepPolicy, TargetRegistry};
use crate::util::config::{Config, Mode, OptionRegistry};

/// Options fixed for the duration of a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub mode: Mode,

    /// Verify external libraries before use
    pub check_libs: bool,

    /// Report failures at the end instead of failing the run
    pub ignore_errors: bool,

    /// Parallel verification jobs (0 = all cores)
    pub jobs: usize,

    /// Handling of script-test dependencies that name no declared target
    pub missing_dep_policy: MissingDepPolicy,
}

impl SessionOptions {
    /// Derive session options from a loaded config.
    ///
    /// Production runs tolerate script tests whose dependencies are not
    /// declared; development runs fail fast on them.
    pub fn from_config(config: &Config) -> Self {
        let mode = config.build.mode();
        SessionOptions {
            mode,
            check_libs: config.build.check_libs(),
            ignore_errors: config.build.ignore_configure_errors(),
            jobs: config.build.jobs(),
            missing_dep_policy: match mode {
                Mode::Production => MissingDepPolicy::Skip,
                Mode::Debug | Mode::Release => MissingDepPolicy::Fail,
            },
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions::from_config(&Config::default())
    }
}

/// Shared state for one configuration run.
pub struct BuildSession {
    pub options: SessionOptions,
    pub toolchain: Toolchain,
    pub option_registry: OptionRegistry,
    pub cache: AvailabilityCache,
    pub aggregator: FailureAggregator,
    pub registry: TargetRegistry,
    pub base_env: Environment,
    prober: Box<dyn Prober>,
}

impl BuildSession {
    /// Create a session with a compiler-backed prober.
    pub fn new(options: SessionOptions, toolchain: Toolchain, config: &Config) -> Self {
        let prober = Box::new(CompilerProbe::new(toolchain.clone()));
        BuildSession::with_prober(options, toolchain, config, prober)
    }

    /// Create a session with a caller-supplied prober. Tests use this to
    /// script probe outcomes.
    pub fn with_prober(
        options: SessionOptions,
        toolchain: Toolchain,
        config: &Config,
        prober: Box<dyn Prober>,
    ) -> Self {
        let mut base_env = Environment::new();
        for flag in toolchain.flags.mode_flags(options.mode) {
            base_env.add_ccflag(*flag);
        }
        for flag in toolchain.flags.warning_flags(1) {
            base_env.add_ccflag(*flag);
        }

        BuildSession {
            options,
            toolchain,
            option_registry: OptionRegistry::from_config(config),
            cache: AvailabilityCache::new(),
            aggregator: FailureAggregator::new(),
            registry: TargetRegistry::new(),
            base_env,
            prober,
        }
    }

    /// Borrow the session's pieces as an environment builder.
    pub fn env_builder(&mut self) -> EnvironmentBuilder<'_> {
        EnvironmentBuilder {
            options: &mut self.option_registry,
            cache: &self.cache,
            aggregator: &self.aggregator,
            prober: self.prober.as_ref(),
            check: self.options.check_libs,
        }
    }

    pub fn prober(&self) -> &dyn Prober {
        self.prober.as_ref()
    }
}
