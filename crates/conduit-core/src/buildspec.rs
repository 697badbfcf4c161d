//! Build specifications run by the build service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Result;
use crate::secret::SecretRef;

pub const BUILDSPEC_VERSION: &str = "0.2";

/// The phases a build runs through, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Install,
    PreBuild,
    Build,
    PostBuild,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 4] = [
        PhaseKind::Install,
        PhaseKind::PreBuild,
        PhaseKind::Build,
        PhaseKind::PostBuild,
    ];
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::Install => write!(f, "install"),
            PhaseKind::PreBuild => write!(f, "pre_build"),
            PhaseKind::Build => write!(f, "build"),
            PhaseKind::PostBuild => write!(f, "post_build"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEnv {
    /// Plain variables known at synthesis time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    /// Variables resolved from the secret store when the build starts.
    #[serde(
        rename = "secrets-manager",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub secrets_manager: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phases {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_build: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_build: Option<Phase>,
}

impl Phases {
    pub fn get(&self, kind: PhaseKind) -> Option<&Phase> {
        match kind {
            PhaseKind::Install => self.install.as_ref(),
            PhaseKind::PreBuild => self.pre_build.as_ref(),
            PhaseKind::Build => self.build.as_ref(),
            PhaseKind::PostBuild => self.post_build.as_ref(),
        }
    }

    fn slot(&mut self, kind: PhaseKind) -> &mut Option<Phase> {
        match kind {
            PhaseKind::Install => &mut self.install,
            PhaseKind::PreBuild => &mut self.pre_build,
            PhaseKind::Build => &mut self.build,
            PhaseKind::PostBuild => &mut self.post_build,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    pub files: Vec<String>,
}

/// A buildspec document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    pub version: String,
    pub env: BuildEnv,
    pub phases: Phases,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Artifacts>,
}

impl Default for BuildSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildSpec {
    pub fn new() -> Self {
        Self {
            version: BUILDSPEC_VERSION.to_string(),
            env: BuildEnv::default(),
            phases: Phases::default(),
            artifacts: None,
        }
    }

    pub fn with_variable(mut self, name: &str, value: impl Into<String>) -> Self {
        self.env.variables.insert(name.to_string(), value.into());
        self
    }

    /// Expose one key of a JSON secret as an environment variable.
    pub fn with_secret(mut self, name: &str, secret: &SecretRef, key: &str) -> Self {
        self.env
            .secrets_manager
            .insert(name.to_string(), secret.build_env_entry(key));
        self
    }

    /// Append commands to a phase, creating it if needed.
    pub fn with_phase<I, S>(mut self, kind: PhaseKind, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phase = self.phases.slot(kind).get_or_insert_with(Phase::default);
        phase.commands.extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn with_artifact_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let artifacts = self.artifacts.get_or_insert_with(Artifacts::default);
        artifacts.files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Every command in execution order, tagged with its phase.
    pub fn commands(&self) -> Vec<(PhaseKind, &str)> {
        PhaseKind::ALL
            .iter()
            .filter_map(|kind| self.phases.get(*kind).map(|p| (*kind, p)))
            .flat_map(|(kind, phase)| phase.commands.iter().map(move |c| (kind, c.as_str())))
            .collect()
    }

    /// Serialized form embedded in the build project.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_follow_phase_order() {
        let spec = BuildSpec::new()
            .with_phase(PhaseKind::PostBuild, ["deploy"])
            .with_phase(PhaseKind::Install, ["install-a", "install-b"])
            .with_phase(PhaseKind::Build, ["build"])
            .with_phase(PhaseKind::PreBuild, ["migrate"]);

        let commands: Vec<&str> = spec.commands().into_iter().map(|(_, c)| c).collect();
        assert_eq!(commands, vec!["install-a", "install-b", "migrate", "build", "deploy"]);
    }

    #[test]
    fn test_serialization_skips_empty_sections() {
        let spec = BuildSpec::new()
            .with_variable("NODE_ENV", "develop")
            .with_phase(PhaseKind::Build, ["yarn build"]);

        let value: serde_json::Value = serde_json::from_str(&spec.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], "0.2");
        assert_eq!(value["env"]["variables"]["NODE_ENV"], "develop");
        assert!(value["env"].get("secrets-manager").is_none());
        assert!(value["phases"].get("install").is_none());
        assert!(value.get("artifacts").is_none());
    }

    #[test]
    fn test_secret_variables() {
        let db = SecretRef::from_name("app/database-config");
        let spec = BuildSpec::new().with_secret("DATABASE_HOST", &db, "host");
        assert_eq!(
            spec.env.secrets_manager["DATABASE_HOST"],
            "app/database-config:host"
        );
        assert!(spec.env.variables.is_empty());
    }

    #[test]
    fn test_round_trip_through_json() {
        let spec = BuildSpec::new()
            .with_phase(PhaseKind::Install, ["yarn install"])
            .with_artifact_files(["**/*"]);
        let parsed: BuildSpec = serde_json::from_str(&spec.to_json().unwrap()).unwrap();
        assert_eq!(parsed, spec);
    }
}
