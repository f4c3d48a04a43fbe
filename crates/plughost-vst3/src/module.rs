use crate::component::{Vst3Component, Vst3Controller};
use crate::convert::{check, class_id_to_tuid, class_info, class_info2, guid_to_tuid};
use crate::host::HostApplication;
use plughost_abi::{
    ClassId, ClassInfo, Component, EditController, ModuleError, ModuleLoader, PluginModule,
    PluginResult, ResultCode,
};
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vst3::Steinberg::Vst::{IComponent, IEditController};
use vst3::Steinberg::{
    FUnknown, IPluginBaseTrait, IPluginFactory, IPluginFactory2, IPluginFactory2Trait,
    IPluginFactoryTrait, PClassInfo, PClassInfo2,
};
use vst3::{ComPtr, ComWrapper, Interface};

#[cfg(target_os = "linux")]
const ENTRY_SYMBOL: &[u8] = b"ModuleEntry";
#[cfg(target_os = "linux")]
const EXIT_SYMBOL: &[u8] = b"ModuleExit";
#[cfg(target_os = "macos")]
const ENTRY_SYMBOL: &[u8] = b"bundleEntry";
#[cfg(target_os = "macos")]
const EXIT_SYMBOL: &[u8] = b"bundleExit";
#[cfg(target_os = "windows")]
const ENTRY_SYMBOL: &[u8] = b"InitDll";
#[cfg(target_os = "windows")]
const EXIT_SYMBOL: &[u8] = b"ExitDll";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const EXIT_SYMBOL: &[u8] = b"ModuleExit";

/// Resolve the shared library inside a `.vst3` bundle directory. Paths that
/// are not directories are returned unchanged.
pub fn bundle_binary_path(bundle: &Path) -> PathBuf {
    if !bundle.is_dir() {
        return bundle.to_path_buf();
    }
    let stem = bundle
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let contents = bundle.join("Contents");

    #[cfg(target_os = "linux")]
    let binary = contents
        .join(format!("{}-linux", std::env::consts::ARCH))
        .join(format!("{stem}.so"));
    #[cfg(target_os = "macos")]
    let binary = contents.join("MacOS").join(&stem);
    #[cfg(target_os = "windows")]
    let binary = contents
        .join(format!("{}-win", std::env::consts::ARCH))
        .join(format!("{stem}.vst3"));
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    let binary = contents.join(&stem);

    binary
}

/// Keeps the shared library mapped while any object created from it lives.
pub(crate) struct LibraryGuard {
    exit_fn: Option<unsafe extern "C" fn() -> bool>,
    // Dropped after the exit function runs.
    library: libloading::Library,
}

impl Drop for LibraryGuard {
    fn drop(&mut self) {
        if let Some(exit) = self.exit_fn {
            // SAFETY: symbol resolved from `library`, which is still loaded.
            if !unsafe { exit() } {
                tracing::warn!("VST3 module exit function reported failure");
            }
        }
    }
}

/// Wrap an entered library in its guard, then fetch the plugin factory.
fn guarded_factory(
    library: libloading::Library,
    exit_fn: Option<unsafe extern "C" fn() -> bool>,
    path: &Path,
) -> Result<(Arc<LibraryGuard>, ComPtr<IPluginFactory>), ModuleError> {
    let guard = Arc::new(LibraryGuard { exit_fn, library });
    let no_factory = || ModuleError::NoFactory {
        path: path.to_path_buf(),
    };

    let get_factory = unsafe {
        guard
            .library
            .get::<unsafe extern "C" fn() -> *mut IPluginFactory>(b"GetPluginFactory")
    }
    .map(|symbol| *symbol)
    .map_err(|_| no_factory())?;
    let factory = unsafe { ComPtr::from_raw(get_factory()) }.ok_or_else(no_factory)?;
    Ok((guard, factory))
}

/// A loaded VST3 module and its plugin factory.
pub struct Vst3Module {
    path: PathBuf,
    factory: ComPtr<IPluginFactory>,
    host: ComPtr<FUnknown>,
    // Must stay the last field: the library outlives the factory.
    library: Arc<LibraryGuard>,
}

// SAFETY: the factory is only used from the thread holding the registry lock;
// VST3 factories are required to be callable from any thread.
unsafe impl Send for Vst3Module {}
unsafe impl Sync for Vst3Module {}

impl Vst3Module {
    pub fn open(path: &Path, host_name: &str) -> Result<Self, ModuleError> {
        let binary = bundle_binary_path(path);
        let open_err = |reason: String| ModuleError::Open {
            path: path.to_path_buf(),
            reason,
        };
        if !binary.exists() {
            return Err(open_err(format!("binary not found: {}", binary.display())));
        }

        // SAFETY: loading a plugin runs its static initializers; that is the
        // contract of hosting it at all.
        let library = unsafe { libloading::Library::new(&binary) }
            .map_err(|e| open_err(e.to_string()))?;

        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            let entry = unsafe {
                library.get::<unsafe extern "C" fn(*mut c_void) -> bool>(ENTRY_SYMBOL)
            }
            .map_err(|e| open_err(e.to_string()))?;
            if !unsafe { entry(std::ptr::null_mut()) } {
                return Err(open_err("module entry returned false".into()));
            }
        }
        #[cfg(target_os = "windows")]
        {
            if let Ok(entry) = unsafe { library.get::<unsafe extern "C" fn() -> bool>(ENTRY_SYMBOL) }
            {
                if !unsafe { entry() } {
                    return Err(open_err("module entry returned false".into()));
                }
            }
        }

        let exit_fn = unsafe { library.get::<unsafe extern "C" fn() -> bool>(EXIT_SYMBOL) }
            .ok()
            .map(|symbol| *symbol);
        // Entered from here on: every later failure must run the exit function.
        let (library, factory) = guarded_factory(library, exit_fn, path)?;

        let host = ComWrapper::new(HostApplication::new(host_name))
            .to_com_ptr::<FUnknown>()
            .ok_or_else(|| open_err("host application has no FUnknown".into()))?;

        tracing::debug!(path = %binary.display(), "Loaded VST3 module");

        Ok(Self {
            path: path.to_path_buf(),
            factory,
            host,
            library,
        })
    }

    /// Ask the factory for an instance of `class_id` exposing `iid`.
    fn create_instance(
        &self,
        class_id: &ClassId,
        iid: &vst3::com_scrape_types::Guid,
    ) -> PluginResult<*mut c_void> {
        let cid = class_id_to_tuid(class_id);
        let iid = guid_to_tuid(iid);
        let mut obj: *mut c_void = std::ptr::null_mut();
        check(unsafe { self.factory.createInstance(cid.as_ptr(), iid.as_ptr(), &mut obj) })?;
        if obj.is_null() {
            return Err(ResultCode::NoInterface);
        }
        Ok(obj)
    }
}

impl PluginModule for Vst3Module {
    fn path(&self) -> &Path {
        &self.path
    }

    fn class_infos(&self) -> Vec<ClassInfo> {
        let count = unsafe { self.factory.countClasses() };
        let factory2 = self.factory.cast::<IPluginFactory2>();
        (0..count)
            .filter_map(|index| {
                if let Some(f2) = &factory2 {
                    let mut info: PClassInfo2 = unsafe { std::mem::zeroed() };
                    if check(unsafe { f2.getClassInfo2(index, &mut info) }).is_ok() {
                        return Some(class_info2(&info));
                    }
                }
                let mut info: PClassInfo = unsafe { std::mem::zeroed() };
                check(unsafe { self.factory.getClassInfo(index, &mut info) })
                    .ok()
                    .map(|_| class_info(&info))
            })
            .collect()
    }

    fn create_component(&self, class_id: &ClassId) -> PluginResult<Box<dyn Component>> {
        let obj = self.create_instance(class_id, &<IComponent as Interface>::IID)?;
        let component = unsafe { ComPtr::from_raw(obj as *mut IComponent) }
            .ok_or(ResultCode::NoInterface)?;
        check(unsafe { component.initialize(self.host.as_ptr()) })?;
        Ok(Box::new(Vst3Component::new(component, self.library.clone())))
    }

    fn create_controller(&self, class_id: &ClassId) -> PluginResult<Box<dyn EditController>> {
        let obj = self.create_instance(class_id, &<IEditController as Interface>::IID)?;
        let controller = unsafe { ComPtr::from_raw(obj as *mut IEditController) }
            .ok_or(ResultCode::NoInterface)?;
        check(unsafe { controller.initialize(self.host.as_ptr()) })?;
        Ok(Box::new(Vst3Controller::new(
            controller,
            true,
            self.library.clone(),
        )))
    }
}

/// Loads `.vst3` bundles and bare VST3 shared libraries.
pub struct Vst3Loader {
    host_name: String,
}

impl Vst3Loader {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
        }
    }
}

impl Default for Vst3Loader {
    fn default() -> Self {
        Self::new("plughost")
    }
}

impl ModuleLoader for Vst3Loader {
    fn load(&self, path: &Path) -> Result<Arc<dyn PluginModule>, ModuleError> {
        let module = Vst3Module::open(path, &self.host_name)?;
        Ok(Arc::new(module) as Arc<dyn PluginModule>)
    }
}
