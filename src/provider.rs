//! Turns a class descriptor into the component, processor and controller of
//! one plugin instance.

use crate::error::{Error, Result, Stage};
use plughost_abi::{AudioProcessor, ClassInfo, Component, EditController, PluginModule};
use std::sync::Arc;

/// The capability set obtained for one instance.
pub struct ProvidedPlugin {
    pub component: Box<dyn Component>,
    pub processor: Option<Box<dyn AudioProcessor>>,
    pub controller: Option<Box<dyn EditController>>,
    /// True when the controller is a separate object that must be
    /// terminated on its own.
    pub separate_controller: bool,
}

pub struct PluginProvider {
    module: Arc<dyn PluginModule>,
    class_info: ClassInfo,
}

impl PluginProvider {
    pub fn new(module: Arc<dyn PluginModule>, class_info: ClassInfo) -> Self {
        Self { module, class_info }
    }

    pub fn module(&self) -> &Arc<dyn PluginModule> {
        &self.module
    }

    pub fn class_info(&self) -> &ClassInfo {
        &self.class_info
    }

    /// Create the component and whatever optional capabilities it offers.
    ///
    /// Only a failure to create the component is an error. A missing audio
    /// processor or controller leaves the instance in a degraded mode.
    pub fn provide(&self) -> Result<ProvidedPlugin> {
        let class_id = self.class_info.class_id;
        let mut component =
            self.module
                .create_component(&class_id)
                .map_err(|code| Error::Instantiation {
                    class: class_id,
                    stage: Stage::CreateComponent,
                    code,
                })?;

        let processor = component.audio_processor();
        if processor.is_none() {
            tracing::warn!(plugin = %self.class_info.name, "Component has no audio processor");
        }

        if let Some(controller) = component.edit_controller() {
            tracing::debug!(plugin = %self.class_info.name, "Single-component plugin");
            return Ok(ProvidedPlugin {
                component,
                processor,
                controller: Some(controller),
                separate_controller: false,
            });
        }

        let controller = match self.separate_controller(component.as_mut()) {
            Ok(controller) => Some(controller),
            Err(e) => {
                tracing::warn!(
                    plugin = %self.class_info.name,
                    "No edit controller, continuing without named parameters: {e}"
                );
                None
            }
        };
        let separate_controller = controller.is_some();

        Ok(ProvidedPlugin {
            component,
            processor,
            controller,
            separate_controller,
        })
    }

    fn separate_controller(
        &self,
        component: &mut dyn Component,
    ) -> Result<Box<dyn EditController>> {
        let controller_id = component
            .controller_class_id()
            .map_err(|_| Error::NoController)?;
        if !controller_id.is_valid() {
            return Err(Error::NoController);
        }

        let mut controller = self
            .module
            .create_controller(&controller_id)
            .map_err(|code| Error::Instantiation {
                class: controller_id,
                stage: Stage::CreateController,
                code,
            })?;

        if let Err(code) = component.connect(controller.as_ref()) {
            tracing::warn!(
                "{}",
                Error::Instantiation {
                    class: controller_id,
                    stage: Stage::ConnectController,
                    code,
                }
            );
        }

        // The controller starts from the component's current state.
        match component.get_state() {
            Ok(state) => {
                if let Err(code) = controller.set_component_state(&state) {
                    tracing::debug!("Controller rejected component state: {code}");
                }
            }
            Err(code) => tracing::debug!("Component state unavailable: {code}"),
        }

        Ok(controller)
    }
}
