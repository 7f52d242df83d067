//! Module registry: explicit registration, startup resolution and installation.

use thiserror::Error;

use crate::config::AppConfig;
use crate::module::{InstallPhase, Module, ModuleInfo};
use crate::services::ServiceCollection;

const INSTALLER_SUFFIX: &str = "Installer";
const CONNECTION_STRING_SUFFIX: &str = "ConnectionString";

/// Fatal startup error; the host must not start serving after one of these.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("connection string '{key}' for module '{module}' not found")]
    MissingConnectionString { module: String, key: String },

    #[error("module '{module}' failed during {phase} installation: {source}")]
    Install {
        module: String,
        phase: InstallPhase,
        #[source]
        source: anyhow::Error,
    },
}

/// Module name for an implementation type name.
///
/// Takes the last path segment (generic arguments dropped) and strips one
/// trailing `Installer`: `vertobank_items::ItemsInstaller` becomes `Items`.
pub fn module_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let last = base.rsplit("::").next().unwrap_or(base);
    last.strip_suffix(INSTALLER_SUFFIX).unwrap_or(last)
}

/// Configuration key holding the connection string of `module`.
pub fn connection_string_key(module: &str) -> String {
    format!("{module}{CONNECTION_STRING_SUFFIX}")
}

/// An installed module with its resolved settings. Immutable.
pub struct ModuleRegistration {
    name: String,
    connection_string: String,
    module: Box<dyn Module>,
}

impl ModuleRegistration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn info(&self) -> ModuleInfo {
        self.module.info()
    }

    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }
}

impl core::fmt::Debug for ModuleRegistration {
    // Connection strings may carry credentials.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleRegistration")
            .field("name", &self.name)
            .field("info", &self.module.info())
            .finish_non_exhaustive()
    }
}

/// Ordered list of modules to compose into the host.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module; installation follows registration order.
    pub fn register<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Resolve every module's connection string, then install all modules.
    ///
    /// Resolution completes for every module before any phase runs, so a
    /// missing key leaves `services` untouched.
    pub fn install(
        self,
        config: &AppConfig,
        services: &mut ServiceCollection,
    ) -> Result<Vec<ModuleRegistration>, StartupError> {
        let registrations = self
            .modules
            .into_iter()
            .map(|module| resolve(module, config))
            .collect::<Result<Vec<_>, _>>()?;

        for registration in &registrations {
            install_module(registration, services)?;
        }

        Ok(registrations)
    }
}

fn resolve(module: Box<dyn Module>, config: &AppConfig) -> Result<ModuleRegistration, StartupError> {
    let name = module_name(module.type_name()).to_string();
    let key = connection_string_key(&name);

    let Some(connection_string) = config.connection_string(&key) else {
        return Err(StartupError::MissingConnectionString { module: name, key });
    };

    Ok(ModuleRegistration {
        connection_string: connection_string.to_string(),
        name,
        module,
    })
}

fn install_module(registration: &ModuleRegistration, services: &mut ServiceCollection) -> Result<(), StartupError> {
    let module = registration.module();

    for phase in InstallPhase::ALL {
        tracing::debug!(module = %registration.name, %phase, "installing module phase");

        let result = match phase {
            InstallPhase::Domain => module.install_domain(services),
            InstallPhase::Application => module.install_application(services),
            InstallPhase::Infrastructure => {
                module.install_infrastructure(services, &registration.connection_string)
            }
            InstallPhase::Presentation => module.install_presentation(services),
        };

        result.map_err(|source| StartupError::Install {
            module: registration.name.clone(),
            phase,
            source,
        })?;
    }

    tracing::info!(module = %registration.name, "module installed");
    Ok(())
}
