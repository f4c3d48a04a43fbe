//! Loaded modules and live plugin instances, addressed by integer handles.
//!
//! Modules are cached by path for the life of the registry. Instances are
//! owned per engine context: each context has its own handle list that
//! starts at 0, only grows, and is released as a whole by [`teardown`].
//!
//! [`teardown`]: HostRegistry::teardown

use crate::config::HostConfig;
use crate::engine::ContextId;
use crate::error::{Error, Result};
use crate::instance::PluginInstance;
use crate::provider::PluginProvider;
use parking_lot::Mutex;
use plughost_abi::{ClassInfo, ModuleLoader, PluginModule};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// An instance shared between the registry and the opcodes using it.
pub type SharedInstance = Arc<Mutex<PluginInstance>>;

pub struct HostRegistry {
    loader: Box<dyn ModuleLoader>,
    config: HostConfig,
    modules: HashMap<PathBuf, Arc<dyn PluginModule>>,
    instances: HashMap<ContextId, Vec<SharedInstance>>,
}

impl HostRegistry {
    pub fn builder() -> HostRegistryBuilder {
        HostRegistryBuilder::default()
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Load `path` (once per path), instantiate the audio-module class named
    /// `name` and return its handle within `ctx`.
    pub fn load_module(
        &mut self,
        ctx: ContextId,
        path: impl AsRef<Path>,
        name: &str,
        verbose: bool,
    ) -> Result<i32> {
        let path = path.as_ref();
        let module = self.module(path)?;
        let class_info = find_class(module.as_ref(), name, verbose).ok_or_else(|| {
            Error::ClassNotFound {
                path: path.to_path_buf(),
                name: name.to_string(),
            }
        })?;

        let provider = PluginProvider::new(module, class_info);
        let mut instance = PluginInstance::new(self.config.clone());
        instance.initialize(&provider)?;

        let list = self.instances.entry(ctx).or_default();
        let handle = list.len() as i32;
        list.push(Arc::new(Mutex::new(instance)));
        tracing::info!(
            context = ctx,
            handle,
            plugin = name,
            path = %path.display(),
            "Plugin instance created"
        );
        Ok(handle)
    }

    fn module(&mut self, path: &Path) -> Result<Arc<dyn PluginModule>> {
        if let Some(module) = self.modules.get(path) {
            return Ok(Arc::clone(module));
        }
        let module = self.loader.load(path)?;
        tracing::debug!(path = %path.display(), "Loaded plugin module");
        self.modules
            .insert(path.to_path_buf(), Arc::clone(&module));
        Ok(module)
    }

    pub fn instance(&self, ctx: ContextId, handle: i32) -> Result<SharedInstance> {
        usize::try_from(handle)
            .ok()
            .and_then(|index| self.instances.get(&ctx)?.get(index))
            .cloned()
            .ok_or(Error::InvalidHandle(handle))
    }

    /// Terminate and release every instance created for `ctx`.
    ///
    /// Returns how many were released. Modules stay cached.
    pub fn teardown(&mut self, ctx: ContextId) -> usize {
        let Some(instances) = self.instances.remove(&ctx) else {
            return 0;
        };
        for instance in &instances {
            instance.lock().terminate();
        }
        tracing::info!(context = ctx, count = instances.len(), "Released plugin instances");
        instances.len()
    }

    pub fn instance_count(&self, ctx: ContextId) -> usize {
        self.instances.get(&ctx).map_or(0, Vec::len)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn is_module_loaded(&self, path: impl AsRef<Path>) -> bool {
        self.modules.contains_key(path.as_ref())
    }
}

/// Last audio-module class named `name`; later classes shadow earlier ones.
fn find_class(module: &dyn PluginModule, name: &str, verbose: bool) -> Option<ClassInfo> {
    let mut found = None;
    for info in module.class_infos() {
        if verbose {
            tracing::info!(
                class_id = %info.class_id,
                category = %info.category,
                name = %info.name,
                vendor = %info.vendor,
                version = %info.version,
                "Module class"
            );
        } else {
            tracing::debug!(class_id = %info.class_id, name = %info.name, "Module class");
        }
        if info.is_audio_module() && info.name == name {
            found = Some(info);
        }
    }
    found
}

#[derive(Default)]
pub struct HostRegistryBuilder {
    loader: Option<Box<dyn ModuleLoader>>,
    config: Option<HostConfig>,
}

impl HostRegistryBuilder {
    /// Default: the VST3 loader with the `vst3` feature, otherwise a loader
    /// that rejects every path.
    pub fn loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<HostRegistry> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let loader = match self.loader {
            Some(loader) => loader,
            None => default_loader(&config),
        };
        Ok(HostRegistry {
            loader,
            config,
            modules: HashMap::new(),
            instances: HashMap::new(),
        })
    }
}

#[cfg(feature = "vst3")]
fn default_loader(config: &HostConfig) -> Box<dyn ModuleLoader> {
    Box::new(plughost_vst3::Vst3Loader::new(config.host_name.clone()))
}

#[cfg(not(feature = "vst3"))]
fn default_loader(_config: &HostConfig) -> Box<dyn ModuleLoader> {
    Box::new(NoFormatLoader)
}

#[cfg(not(feature = "vst3"))]
use plughost_abi::ModuleError;

#[cfg(not(feature = "vst3"))]
struct NoFormatLoader;

#[cfg(not(feature = "vst3"))]
impl ModuleLoader for NoFormatLoader {
    fn load(&self, path: &Path) -> std::result::Result<Arc<dyn PluginModule>, ModuleError> {
        Err(ModuleError::Open {
            path: path.to_path_buf(),
            reason: "no plugin format enabled (build with the `vst3` feature)".to_string(),
        })
    }
}

static GLOBAL: OnceLock<Mutex<HostRegistry>> = OnceLock::new();

/// Process-wide registry with the default loader and configuration.
pub fn global() -> &'static Mutex<HostRegistry> {
    GLOBAL.get_or_init(|| {
        let registry = HostRegistry {
            loader: default_loader(&HostConfig::default()),
            config: HostConfig::default(),
            modules: HashMap::new(),
            instances: HashMap::new(),
        };
        Mutex::new(registry)
    })
}
