//! Compiler options consumed by the core, and the richer project
//! manifest shape an external collaborator (the CLI/project loader)
//! would read and flatten into `CompilerOptions`.
//!
//! The core never parses a manifest file itself; `merge_configuration`
//! is exposed so the flattening logic is unit-testable independent of
//! any file I/O.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::target::TargetArchitecture;

/// The flat option set the pipeline actually observes.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub target: TargetArchitecture,
    pub main_source: PathBuf,
    pub include_paths: Vec<PathBuf>,
    pub defines: HashMap<String, i64>,
    pub autogenerate_labels: bool,
    pub warnings_as_errors: bool,
    pub big_endian_override: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            target: TargetArchitecture::Sm83,
            main_source: PathBuf::new(),
            include_paths: Vec::new(),
            defines: HashMap::new(),
            autogenerate_labels: false,
            warnings_as_errors: false,
            big_endian_override: false,
        }
    }
}

/// The external project manifest format (e.g. a `poppy.json` project
/// file). Only the fields the core observes are modeled; anything else
/// an external collaborator stores alongside is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectManifest {
    pub name: String,
    pub target: String,
    pub main: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub defines: HashMap<String, i64>,
    #[serde(default)]
    pub configurations: HashMap<String, ConfigurationOverride>,
}

/// A named override block that merges onto the manifest's base fields.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigurationOverride {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub defines: HashMap<String, i64>,
}

/// Flattens a manifest (plus an optional named configuration) into
/// `CompilerOptions`. Configuration fields override the base manifest's;
/// `defines` and `includes` merge additively, later entries winning on
/// key collisions.
pub fn merge_configuration(
    manifest: &ProjectManifest,
    configuration: Option<&str>,
) -> Result<CompilerOptions, String> {
    let mut target_str = manifest.target.clone();
    let mut main = manifest.main.clone();
    let mut includes = manifest.includes.clone();
    let mut defines = manifest.defines.clone();

    if let Some(name) = configuration {
        let cfg = manifest
            .configurations
            .get(name)
            .ok_or_else(|| format!("unknown configuration: {}", name))?;
        if let Some(t) = &cfg.target {
            target_str = t.clone();
        }
        if let Some(m) = &cfg.main {
            main = m.clone();
        }
        includes.extend(cfg.includes.iter().cloned());
        for (k, v) in &cfg.defines {
            defines.insert(k.clone(), *v);
        }
    }

    let target: TargetArchitecture = target_str.parse()?;

    Ok(CompilerOptions {
        target,
        main_source: PathBuf::from(main),
        include_paths: includes.into_iter().map(PathBuf::from).collect(),
        defines,
        autogenerate_labels: false,
        warnings_as_errors: false,
        big_endian_override: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_manifest() -> ProjectManifest {
        ProjectManifest {
            name: "demo".into(),
            target: "nes".into(),
            main: "main.pasm".into(),
            sources: vec![],
            includes: vec!["inc/".into()],
            defines: HashMap::from([("VERSION".to_string(), 1)]),
            configurations: HashMap::from([(
                "debug".to_string(),
                ConfigurationOverride {
                    target: None,
                    main: None,
                    includes: vec!["debug_inc/".into()],
                    defines: HashMap::from([("DEBUG".to_string(), 1)]),
                },
            )]),
        }
    }

    #[test]
    fn base_configuration_has_no_overrides() {
        let opts = merge_configuration(&base_manifest(), None).unwrap();
        assert_eq!(opts.target, TargetArchitecture::Mos6502);
        assert_eq!(opts.include_paths, vec![PathBuf::from("inc/")]);
        assert_eq!(opts.defines.get("VERSION"), Some(&1));
    }

    #[test]
    fn named_configuration_merges_additively() {
        let opts = merge_configuration(&base_manifest(), Some("debug")).unwrap();
        assert_eq!(opts.include_paths.len(), 2);
        assert_eq!(opts.defines.get("DEBUG"), Some(&1));
        assert_eq!(opts.defines.get("VERSION"), Some(&1));
    }

    #[test]
    fn unknown_configuration_errors() {
        assert!(merge_configuration(&base_manifest(), Some("release")).is_err());
    }
}
