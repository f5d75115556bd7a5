//! Test doubles and JSON fixtures for archanim crates.
//!
//! The fixtures under `fixtures/` at the workspace root are indexed by
//! `fixtures/manifest.json`; the in-memory host lives in [`world`],
//! [`scheduler`] and [`hooks`], and [`Harness`] wires them together.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub mod harness;
pub mod hooks;
pub mod scheduler;
pub mod world;

pub use harness::Harness;
pub use hooks::{FailingHook, HookCall, HookLog, RecordingHook, RecordingTracker, RecordingVerifier};
pub use scheduler::JournalingScheduler;
pub use world::{FakePreviewFactory, FakeSubstitutionFactory, RecordingWorld, WorldEvent};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    structures: HashMap<String, String>,
    #[serde(rename = "structure-types")]
    structure_types: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Structure snapshots.
pub mod structures {
    use super::*;
    use archanim_animation_core::StructureSnapshot;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.structures.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.structures, "structure", name)?)
    }

    pub fn load(name: &str) -> Result<StructureSnapshot> {
        super::load_json(lookup(&MANIFEST.structures, "structure", name)?)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.structures, "structure", name)?))
    }
}

/// Structure-type declaration sets for the loader.
pub mod structure_types {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.structure_types.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.structure_types, "structure type", name)?)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        super::load_json(lookup(&MANIFEST.structure_types, "structure type", name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_structure_fixture_parses() {
        for key in structures::keys() {
            let snapshot = structures::load(&key).unwrap();
            assert!(snapshot.cuboid.volume() > 0, "{key}");
        }
    }

    #[test]
    fn unknown_fixture_is_an_error() {
        let err = structures::load("nope").unwrap_err();
        assert!(err.to_string().contains("unknown structure fixture"));
    }

    #[test]
    fn structure_type_sets_are_listed() {
        assert_eq!(structure_types::keys(), vec!["cycle", "default"]);
        assert!(structure_types::json("default").unwrap().contains("big_door"));
    }
}
