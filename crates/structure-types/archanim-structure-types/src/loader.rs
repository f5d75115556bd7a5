//! Dependency-checked loading of structure types.
//!
//! Every declaration is resolved before anything is loaded: missing
//! dependencies, unacceptable versions and cycles fail a type, and the
//! failure spreads to everything depending on it. The survivors are handed
//! to the host's loader dependencies-first.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::error::StructureTypeError;
use crate::topo::{load_order, LoadOrder};
use crate::types::StructureTypeInfo;

/// Outcome of [`StructureTypeLoader::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    loaded: Vec<String>,
    failures: IndexMap<String, StructureTypeError>,
}

impl LoadReport {
    /// Names loaded successfully, in load order.
    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    /// Failed types with their reasons, in the order they were found.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &StructureTypeError)> {
        self.failures.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn failure(&self, name: &str) -> Option<&StructureTypeError> {
        self.failures.get(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|n| n == name)
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A set of structure-type declarations ready to be loaded.
#[derive(Clone, Debug, Default)]
pub struct StructureTypeLoader {
    types: IndexMap<String, StructureTypeInfo>,
    duplicates: Vec<String>,
}

impl StructureTypeLoader {
    /// Names declared more than once are dropped and reported by [`Self::load`].
    pub fn new(types: impl IntoIterator<Item = StructureTypeInfo>) -> Self {
        let mut loader = Self::default();
        for info in types {
            if loader.types.contains_key(&info.name) {
                if !loader.duplicates.contains(&info.name) {
                    loader.duplicates.push(info.name.clone());
                }
                continue;
            }
            loader.types.insert(info.name.clone(), info);
        }
        for name in &loader.duplicates {
            loader.types.shift_remove(name);
        }
        loader
    }

    /// Resolve and load `types` in one go.
    pub fn load_all<F>(types: impl IntoIterator<Item = StructureTypeInfo>, loader: F) -> LoadReport
    where
        F: FnMut(&StructureTypeInfo) -> anyhow::Result<()>,
    {
        Self::new(types).load(loader)
    }

    pub fn types(&self) -> impl Iterator<Item = &StructureTypeInfo> {
        self.types.values()
    }

    pub fn load_order(&self) -> LoadOrder {
        let types: Vec<StructureTypeInfo> = self.types.values().cloned().collect();
        load_order(&types)
    }

    /// Call `loader` for every type whose dependencies are all satisfied
    /// and loaded, dependencies first.
    pub fn load<F>(&self, mut loader: F) -> LoadReport
    where
        F: FnMut(&StructureTypeInfo) -> anyhow::Result<()>,
    {
        let mut report = LoadReport::default();
        for name in &self.duplicates {
            fail(
                &mut report,
                StructureTypeError::DuplicateType { name: name.clone() },
                name,
            );
        }

        for info in self.types.values() {
            if let Some(err) = self.resolve(info) {
                fail(&mut report, err, &info.name);
            }
        }

        let order = self.load_order();
        debug!("structure type load order: {:?}", order.order);
        for name in &order.cyclic {
            fail(
                &mut report,
                StructureTypeError::DependencyCycle { name: name.clone() },
                name,
            );
        }
        let stuck: HashSet<&str> = order
            .cyclic
            .iter()
            .chain(order.blocked.iter())
            .map(String::as_str)
            .collect();
        for name in &order.blocked {
            let Some(info) = self.types.get(name) else {
                continue;
            };
            let dependency = info
                .dependencies
                .iter()
                .map(|d| d.name.as_str())
                .find(|d| stuck.contains(d))
                .unwrap_or_default()
                .to_string();
            fail(
                &mut report,
                StructureTypeError::DependencyFailed {
                    name: name.clone(),
                    dependency,
                },
                name,
            );
        }

        // Spread failures before attempting any load.
        for name in &order.order {
            self.cascade(&mut report, name);
        }

        for name in &order.order {
            if report.failures.contains_key(name) || self.cascade(&mut report, name) {
                continue;
            }
            let Some(info) = self.types.get(name) else {
                continue;
            };
            match loader(info) {
                Ok(()) => {
                    debug!("loaded structure type {} v{}", info.name, info.version);
                    report.loaded.push(name.clone());
                }
                Err(source) => fail(
                    &mut report,
                    StructureTypeError::LoadFailed {
                        name: name.clone(),
                        source,
                    },
                    name,
                ),
            }
        }

        info!(
            "loaded {} of {} structure types ({} failed)",
            report.loaded.len(),
            self.types.len() + self.duplicates.len(),
            report.failures.len()
        );
        report
    }

    /// First problem with the declared dependencies of `info`, if any.
    fn resolve(&self, info: &StructureTypeInfo) -> Option<StructureTypeError> {
        info.dependencies.iter().find_map(|dep| {
            if self.duplicates.contains(&dep.name) {
                return None;
            }
            match self.types.get(&dep.name) {
                None => Some(StructureTypeError::MissingDependency {
                    name: info.name.clone(),
                    dependency: dep.name.clone(),
                }),
                Some(found) if !dep.accepts(found.version) => {
                    Some(StructureTypeError::VersionOutOfRange {
                        name: info.name.clone(),
                        dependency: dep.name.clone(),
                        found: found.version,
                        min: dep.min_version,
                        max: dep.max_version,
                    })
                }
                Some(_) => None,
            }
        })
    }

    /// Fail `name` when one of its dependencies failed. Returns whether it did.
    fn cascade(&self, report: &mut LoadReport, name: &str) -> bool {
        if report.failures.contains_key(name) {
            return false;
        }
        let Some(info) = self.types.get(name) else {
            return false;
        };
        let Some(dep) = info
            .dependencies
            .iter()
            .find(|d| report.failures.contains_key(&d.name))
        else {
            return false;
        };
        let err = StructureTypeError::DependencyFailed {
            name: name.to_string(),
            dependency: dep.name.clone(),
        };
        fail(report, err, name);
        true
    }
}

fn fail(report: &mut LoadReport, err: StructureTypeError, name: &str) {
    if report.failures.contains_key(name) {
        return;
    }
    warn!("structure type {name} ({}): {err}", err.category());
    report.failures.insert(name.to_string(), err);
}
