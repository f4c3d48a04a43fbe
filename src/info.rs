//! Diagnostic dump of a plugin instance.

use crate::instance::PluginInstance;
use plughost_abi::{
    BusDirection, Component, EditController, MediaType, SampleSize, UnitInfoSource,
};

impl PluginInstance {
    /// Log class metadata, buses, parameters and the unit/program hierarchy.
    pub fn log_info(&self) {
        let Some(info) = self.class_info() else {
            tracing::warn!("Plugin instance is not initialized");
            return;
        };
        tracing::info!(
            class_id = %info.class_id,
            cardinality = info.cardinality,
            category = %info.category,
            name = %info.name,
            vendor = %info.vendor,
            version = %info.version,
            sdk_version = %info.sdk_version,
            sub_categories = %info.sub_categories,
            class_flags = info.class_flags,
            "Plugin class"
        );

        if let Some(component) = self.component.as_deref() {
            match component.controller_class_id() {
                Ok(id) if id.is_valid() => tracing::info!(controller_class_id = %id, "Controller"),
                _ => tracing::warn!("Plugin reports no valid controller class id"),
            }
            log_buses(component);
        }

        if let Some(processor) = self.processor.as_deref() {
            tracing::info!(
                supports_32bit = processor.can_process_sample_size(SampleSize::Sample32),
                supports_64bit = processor.can_process_sample_size(SampleSize::Sample64),
                host_sample_bits = self.sample_size().bits(),
                latency = processor.latency_samples(),
                "Processing"
            );
        }

        match self.controller.as_deref() {
            Some(controller) => {
                log_parameters(controller);
                if let Some(units) = controller.unit_info() {
                    log_units(units);
                }
            }
            None => tracing::info!("No edit controller, parameters unavailable"),
        }
    }
}

fn log_buses(component: &dyn Component) {
    for media_type in [MediaType::Audio, MediaType::Event] {
        for direction in [BusDirection::Input, BusDirection::Output] {
            for index in 0..component.bus_count(media_type, direction) {
                match component.bus_info(media_type, direction, index) {
                    Ok(bus) => tracing::info!(
                        %direction,
                        media = %media_type,
                        index,
                        channels = bus.channel_count,
                        bus_type = %bus.bus_type,
                        flags = bus.flags,
                        name = %bus.name,
                        "Bus"
                    ),
                    Err(code) => {
                        tracing::warn!(%direction, media = %media_type, index, "Bus info: {code}")
                    }
                }
            }
        }
    }
}

fn log_parameters(controller: &dyn EditController) {
    let count = controller.parameter_count();
    tracing::info!(count, "Parameters");
    for index in 0..count {
        let Ok(param) = controller.parameter_info(index) else {
            continue;
        };
        tracing::info!(
            index,
            id = param.id,
            title = %param.title,
            units = %param.units,
            default = param.default_normalized_value,
            current = controller.param_normalized(param.id),
            "Parameter"
        );
    }
}

fn log_units(units: &dyn UnitInfoSource) {
    for index in 0..units.unit_count() {
        if let Ok(unit) = units.unit_info(index) {
            tracing::info!(
                id = unit.id,
                parent = unit.parent_unit_id,
                name = %unit.name,
                program_list = unit.program_list_id,
                "Unit"
            );
        }
    }
    for index in 0..units.program_list_count() {
        let Ok(list) = units.program_list_info(index) else {
            continue;
        };
        tracing::info!(
            id = list.id,
            name = %list.name,
            programs = list.program_count,
            "Program list"
        );
        for program in 0..list.program_count {
            if let Ok(name) = units.program_name(list.id, program) {
                tracing::info!(list = list.id, program, name = %name, "Program");
            }
        }
    }
}
