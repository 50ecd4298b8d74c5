#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

pub const MANIFEST_NAME: &str = "toy.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(toy::config))]
pub struct ConfigError {
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub build: BuildConfig,
    pub check: CheckConfig,
    pub run: RunConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Label of the entry routine (`_start`, or `main` when linking through gcc).
    pub entry: String,
    pub target: String,
    /// Relative paths are taken from the directory holding `toy.toml`.
    pub output: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entry: "_start".to_string(),
            target: toy_backend_x86::DEFAULT_TARGET.to_string(),
            output: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Promote leak warnings to errors.
    pub deny_leaks: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub max_depth: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_depth: toy_interpret::DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedConfig {
    pub manifest_path: Option<PathBuf>,
    pub project_root: PathBuf,
    pub config: Config,
}

impl ResolvedConfig {
    pub fn empty(project_root: PathBuf) -> Self {
        Self {
            manifest_path: None,
            project_root,
            config: Config::default(),
        }
    }

    /// Where `build` writes its assembly when `-o` is not given.
    pub fn output_for(&self, input: &Path) -> PathBuf {
        match &self.config.build.output {
            Some(out) if out.is_absolute() => out.clone(),
            Some(out) => self.project_root.join(out),
            None => input.with_extension("asm"),
        }
    }
}

pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        match cur.parent() {
            Some(p) => cur = p.to_path_buf(),
            None => return None,
        }
    }
}

pub fn parse_config(raw: &str, origin: &Path) -> Result<Config, ConfigError> {
    toml::from_str(raw).map_err(|e| ConfigError {
        message: format!("failed to parse {}: {e}", origin.display()),
    })
}

/// Loads `explicit` when given, otherwise the nearest `toy.toml` above `input`. With no
/// file to be found every setting keeps its default.
pub fn load_config(input: &Path, explicit: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let start = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let manifest_path = match explicit {
        Some(path) if !path.is_file() => {
            return Err(ConfigError {
                message: format!("config file {} does not exist", path.display()),
            });
        }
        Some(path) => path.to_path_buf(),
        None => match find_manifest(start) {
            Some(path) => path,
            None => return Ok(ResolvedConfig::empty(start.to_path_buf())),
        },
    };

    let project_root = manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let raw = fs::read_to_string(&manifest_path).map_err(|e| ConfigError {
        message: format!("failed to read {}: {e}", manifest_path.display()),
    })?;
    let config = parse_config(&raw, &manifest_path)?;

    Ok(ResolvedConfig {
        manifest_path: Some(manifest_path),
        project_root,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("toyc-manifest-tests")
            .join(format!("{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn empty_file_keeps_every_default() {
        let cfg = parse_config("", Path::new("toy.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.build.entry, "_start");
        assert_eq!(cfg.build.target, "i686-unknown-linux-gnu");
        assert!(!cfg.check.deny_leaks);
        assert_eq!(cfg.run.max_depth, 10_000);
    }

    #[test]
    fn sections_override_only_what_they_name() {
        let cfg = parse_config(
            "[build]\nentry = \"main\"\n\n[check]\ndeny_leaks = true\n",
            Path::new("toy.toml"),
        )
        .unwrap();
        assert_eq!(cfg.build.entry, "main");
        assert_eq!(cfg.build.target, "i686-unknown-linux-gnu");
        assert!(cfg.check.deny_leaks);
        assert_eq!(cfg.run, RunConfig::default());
    }

    #[test]
    fn malformed_config_names_the_file() {
        let err = parse_config("[build\nentry = 1", Path::new("proj/toy.toml")).unwrap_err();
        assert!(err.message.contains("proj/toy.toml"), "{}", err.message);

        let err = parse_config("[run]\nmax_depth = \"deep\"", Path::new("toy.toml")).unwrap_err();
        assert!(err.message.starts_with("failed to parse"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("[build]\noptimize = true", Path::new("toy.toml")).is_err());
        assert!(parse_config("[link]\nlibs = []", Path::new("toy.toml")).is_err());
    }

    #[test]
    fn manifest_is_found_by_walking_up() {
        let root = scratch("walk");
        let nested = root.join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join(MANIFEST_NAME), "[run]\nmax_depth = 64\n").unwrap();
        let input = nested.join("prog.toy");
        fs::write(&input, "print(1)").unwrap();

        assert_eq!(find_manifest(&input), Some(root.join(MANIFEST_NAME)));

        let resolved = load_config(&input, None).unwrap();
        assert_eq!(resolved.project_root, root);
        assert_eq!(resolved.config.run.max_depth, 64);
    }

    #[test]
    fn explicit_config_must_exist() {
        let root = scratch("explicit");
        let input = root.join("prog.toy");
        let err = load_config(&input, Some(&root.join("missing.toml"))).unwrap_err();
        assert!(err.message.contains("does not exist"));
    }

    #[test]
    fn output_defaults_next_to_the_input() {
        let resolved = ResolvedConfig::empty(PathBuf::from("proj"));
        assert_eq!(
            resolved.output_for(Path::new("proj/fac.toy")),
            PathBuf::from("proj/fac.asm")
        );

        let mut resolved = resolved;
        resolved.config.build.output = Some(PathBuf::from("build/out.asm"));
        assert_eq!(
            resolved.output_for(Path::new("proj/fac.toy")),
            PathBuf::from("proj/build/out.asm")
        );
    }
}
