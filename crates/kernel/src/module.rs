//! The module installation contract.

use serde::Serialize;

use crate::services::ServiceCollection;

/// Documentation metadata a module publishes about itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    /// Short key, also the prefix of the module's HTTP route tags.
    pub key: &'static str,
    pub title: &'static str,
    pub version: &'static str,
}

/// Installation phases, in the order the registry runs them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InstallPhase {
    Domain,
    Application,
    Infrastructure,
    Presentation,
}

impl InstallPhase {
    pub const ALL: [InstallPhase; 4] = [
        InstallPhase::Domain,
        InstallPhase::Application,
        InstallPhase::Infrastructure,
        InstallPhase::Presentation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InstallPhase::Domain => "domain",
            InstallPhase::Application => "application",
            InstallPhase::Infrastructure => "infrastructure",
            InstallPhase::Presentation => "presentation",
        }
    }
}

impl core::fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A business module that can be composed into the host.
///
/// The registry calls the phases strictly in [`InstallPhase::ALL`] order, once
/// each, after it resolved the module's connection string. Later phases may
/// rely on services registered by earlier ones.
///
/// The module name (and with it the connection-string key) is derived from
/// [`Module::type_name`]: an `ItemsInstaller` type becomes the `Items` module
/// reading `ItemsConnectionString`.
pub trait Module: Send + Sync {
    fn info(&self) -> ModuleInfo;

    fn install_domain(&self, services: &mut ServiceCollection) -> anyhow::Result<()>;

    fn install_application(&self, services: &mut ServiceCollection) -> anyhow::Result<()>;

    fn install_infrastructure(
        &self,
        services: &mut ServiceCollection,
        connection_string: &str,
    ) -> anyhow::Result<()>;

    fn install_presentation(&self, services: &mut ServiceCollection) -> anyhow::Result<()>;

    /// Fully qualified name of the implementing type.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
