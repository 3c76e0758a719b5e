//! Environment assembly for one target.
//!
//! Resolves the target's dependency closure, merges every library's
//! configuration leaf-first into a copy of the base environment, then
//! verifies each external library against a scratch environment holding
//! only that library's own dependency chain. A failed verification does
//! not abort the build: the failure is recorded and the library's name
//! lands in the returned `missing` set, leaving the target degraded
//! rather than the whole run dead.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::builder::cache::AvailabilityCache;
use crate::builder::probe::{ProbeFailure, Prober};
use crate::core::environment::Environment;
use crate::core::library::Library;
use crate::project::aggregator::FailureAggregator;
use crate::resolver::{resolve, CyclicDependencyError};
use crate::util::config::OptionRegistry;

/// The result of building a target's environment.
#[derive(Debug)]
pub struct BuiltEnvironment {
    pub env: Environment,

    /// Names of libraries that failed verification
    pub missing: BTreeSet<String>,

    /// The failures behind the missing set, in discovery order
    pub failures: Vec<ProbeFailure>,
}

impl BuiltEnvironment {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Builds per-target environments against shared session state.
pub struct EnvironmentBuilder<'a> {
    pub options: &'a mut OptionRegistry,
    pub cache: &'a AvailabilityCache,
    pub aggregator: &'a FailureAggregator,
    pub prober: &'a dyn Prober,

    /// When false, verification is skipped entirely and every library is
    /// taken at its word.
    pub check: bool,
}

impl EnvironmentBuilder<'_> {
    /// Build the environment for a target requesting the given libraries.
    pub fn build(
        &mut self,
        base: &Environment,
        requested: &[Arc<Library>],
        target_name: &str,
    ) -> Result<BuiltEnvironment, CyclicDependencyError> {
        let closure = resolve(requested)?;

        for lib in requested {
            lib.declare_options(self.options);
        }

        let mut env = base.clone();
        for entry in &closure {
            entry.library.apply(&mut env, entry.depth, self.options);
        }

        let mut missing = BTreeSet::new();
        let mut failures = Vec::new();

        if self.check {
            for entry in &closure {
                if entry.library.is_internal() {
                    continue;
                }
                // Each library is checked against the base plus its own
                // dependency chain only; a sibling's flags must not leak
                // into the probe's link line, and the memoized outcome must
                // not depend on which target asked first.
                let mut scratch = base.clone();
                let own = resolve(std::slice::from_ref(&entry.library))?;
                for resolved in &own {
                    resolved
                        .library
                        .apply(&mut scratch, resolved.depth, self.options);
                }
                match self.cache.verify(&entry.library, &scratch, self.prober) {
                    Ok(()) => {}
                    Err(failure) => {
                        tracing::warn!(
                            target_name,
                            library = %entry.library.id,
                            "library verification failed"
                        );
                        self.aggregator
                            .record(Arc::clone(&entry.library), failure.clone());
                        missing.insert(entry.library.id.name.clone());
                        failures.push(failure);
                    }
                }
            }
        }

        if missing.is_empty() {
            tracing::debug!(target_name, libraries = closure.len(), "environment built");
        }

        Ok(BuiltEnvironment {
            env,
            missing,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::{ExternalSpec, InternalSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProber {
        calls: AtomicUsize,
        fail: Vec<&'static str>,
    }

    impl ScriptedProber {
        fn failing(fail: Vec<&'static str>) -> Self {
            ScriptedProber {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl Prober for ScriptedProber {
        fn probe(&self, library: &Library, _env: &Environment) -> Result<(), ProbeFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.contains(&library.id.name.as_str()) {
                Err(ProbeFailure {
                    library: library.id.to_string(),
                    message: "scripted failure".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn external(name: &str) -> Arc<Library> {
        Arc::new(Library::external(
            name,
            ExternalSpec {
                libs: vec![name.to_string()],
                ..Default::default()
            },
        ))
    }

    fn build_with(
        prober: &ScriptedProber,
        requested: &[Arc<Library>],
    ) -> BuiltEnvironment {
        let mut options = OptionRegistry::default();
        let cache = AvailabilityCache::new();
        let aggregator = FailureAggregator::new();
        let mut builder = EnvironmentBuilder {
            options: &mut options,
            cache: &cache,
            aggregator: &aggregator,
            prober,
            check: true,
        };
        builder
            .build(&Environment::new(), requested, "test-target")
            .unwrap()
    }

    #[test]
    fn test_partial_failure_leaves_env_usable() {
        let prober = ScriptedProber::failing(vec!["gl"]);
        let built = build_with(&prober, &[external("png"), external("gl")]);

        assert!(!built.is_complete());
        assert_eq!(
            built.missing.iter().collect::<Vec<_>>(),
            vec![&"gl".to_string()]
        );
        // The merged environment still carries both libraries' config.
        assert!(built.env.libs.contains(&"png".to_string()));
        assert!(built.env.libs.contains(&"gl".to_string()));
    }

    #[test]
    fn test_internal_libraries_skip_verification() {
        let prober = ScriptedProber::failing(vec![]);
        let internal = Arc::new(Library::internal("imgcore", InternalSpec::default()));

        let built = build_with(&prober, &[internal]);
        assert!(built.is_complete());
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dependencies_merge_before_dependents() {
        let z = external("z");
        let png = Arc::new(
            Library::external(
                "png",
                ExternalSpec {
                    libs: vec!["png".to_string()],
                    ..Default::default()
                },
            )
            .with_dependency(Arc::clone(&z)),
        );

        let prober = ScriptedProber::failing(vec![]);
        let built = build_with(&prober, &[png]);

        assert_eq!(built.env.libs, vec!["z", "png"]);
    }

    #[test]
    fn test_check_disabled_skips_probes() {
        let prober = ScriptedProber::failing(vec!["png"]);
        let mut options = OptionRegistry::default();
        let cache = AvailabilityCache::new();
        let aggregator = FailureAggregator::new();
        let mut builder = EnvironmentBuilder {
            options: &mut options,
            cache: &cache,
            aggregator: &aggregator,
            prober: &prober,
            check: false,
        };

        let built = builder
            .build(&Environment::new(), &[external("png")], "t")
            .unwrap();
        assert!(built.is_complete());
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_probe_env_excludes_siblings() {
        // Rejects any link line mentioning the uninstalled library, the way
        // a real compiler would fail on its -l flag.
        struct LinkAwareProber {
            seen: std::sync::Mutex<Vec<(String, Vec<String>)>>,
        }

        impl Prober for LinkAwareProber {
            fn probe(&self, library: &Library, env: &Environment) -> Result<(), ProbeFailure> {
                self.seen
                    .lock()
                    .unwrap()
                    .push((library.id.name.clone(), env.libs.clone()));
                if env.libs.iter().any(|l| l == "missing") {
                    Err(ProbeFailure {
                        library: library.id.to_string(),
                        message: "cannot find -lmissing".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }

        let z = external("z");
        let good = Arc::new(
            Library::external(
                "good",
                ExternalSpec {
                    libs: vec!["good".to_string()],
                    ..Default::default()
                },
            )
            .with_dependency(Arc::clone(&z)),
        );
        let missing = external("missing");

        let prober = LinkAwareProber {
            seen: std::sync::Mutex::new(Vec::new()),
        };
        let mut options = OptionRegistry::default();
        let cache = AvailabilityCache::new();
        let aggregator = FailureAggregator::new();
        let mut builder = EnvironmentBuilder {
            options: &mut options,
            cache: &cache,
            aggregator: &aggregator,
            prober: &prober,
            check: true,
        };
        let built = builder
            .build(&Environment::new(), &[good, missing], "viewer")
            .unwrap();

        // Only the library that is actually unusable lands in the missing
        // set; its sibling probes without the failing -l flag.
        assert_eq!(
            built.missing.iter().collect::<Vec<_>>(),
            vec![&"missing".to_string()]
        );

        let seen = prober.seen.lock().unwrap();
        let good_libs = &seen.iter().find(|(n, _)| n == "good").unwrap().1;
        assert!(good_libs.contains(&"z".to_string()));
        assert!(!good_libs.contains(&"missing".to_string()));

        // The merged target environment still carries everything.
        assert!(built.env.libs.contains(&"missing".to_string()));
    }

    #[test]
    fn test_failures_reach_aggregator_once() {
        let prober = ScriptedProber::failing(vec!["gl"]);
        let mut options = OptionRegistry::default();
        let cache = AvailabilityCache::new();
        let aggregator = FailureAggregator::new();
        let gl = external("gl");

        let mut builder = EnvironmentBuilder {
            options: &mut options,
            cache: &cache,
            aggregator: &aggregator,
            prober: &prober,
            check: true,
        };
        builder
            .build(&Environment::new(), &[Arc::clone(&gl)], "a")
            .unwrap();
        builder.build(&Environment::new(), &[gl], "b").unwrap();

        // Probed once (memoized), aggregated once (deduped), but both
        // targets see the missing library.
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
        assert_eq!(aggregator.len(), 1);
    }
}
