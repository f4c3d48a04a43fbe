//! Host-side COM objects handed to plugins.

use crate::convert::string_to_string128;
use plughost_abi::ParameterChanges;
use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use vst3::Steinberg::Vst::{
    Event, IComponentHandler, IComponentHandlerTrait, IEventList, IEventListTrait,
    IHostApplication, IHostApplicationTrait, IParamValueQueue, IParamValueQueueTrait,
    IParameterChanges, IParameterChangesTrait, ParamID, ParamValue, String128,
};
use vst3::Steinberg::{
    self, int32, int64, kInvalidArgument, kNotImplemented, kResultFalse, kResultOk, tresult,
    IBStream, IBStreamTrait,
};
use vst3::{Class, ComWrapper};

// IBStream seek modes.
const SEEK_SET: int32 = 0;
const SEEK_CUR: int32 = 1;
const SEEK_END: int32 = 2;

pub(crate) struct HostApplication {
    name: String,
}

impl HostApplication {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Class for HostApplication {
    type Interfaces = (IHostApplication,);
}

impl IHostApplicationTrait for HostApplication {
    unsafe fn getName(&self, name: *mut String128) -> tresult {
        if name.is_null() {
            return kInvalidArgument;
        }
        unsafe { *name = string_to_string128(&self.name) };
        kResultOk
    }

    unsafe fn createInstance(
        &self,
        _cid: *mut Steinberg::TUID,
        _iid: *mut Steinberg::TUID,
        _obj: *mut *mut c_void,
    ) -> tresult {
        kNotImplemented
    }
}

/// Accepts edits from the controller; the host drives parameters itself.
pub(crate) struct ComponentHandler;

impl Class for ComponentHandler {
    type Interfaces = (IComponentHandler,);
}

impl IComponentHandlerTrait for ComponentHandler {
    unsafe fn beginEdit(&self, _id: ParamID) -> tresult {
        kResultOk
    }

    unsafe fn performEdit(&self, _id: ParamID, _value_normalized: ParamValue) -> tresult {
        kResultOk
    }

    unsafe fn endEdit(&self, _id: ParamID) -> tresult {
        kResultOk
    }

    unsafe fn restartComponent(&self, flags: int32) -> tresult {
        tracing::debug!(flags, "VST3 plugin requested restart (ignored)");
        kResultOk
    }
}

/// In-memory stream used for component and controller state.
pub(crate) struct MemoryStream {
    data: RefCell<Vec<u8>>,
    position: Cell<usize>,
}

impl MemoryStream {
    pub(crate) fn new() -> Self {
        Self::from_bytes(Vec::new())
    }

    pub(crate) fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data: RefCell::new(data),
            position: Cell::new(0),
        }
    }

    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }
}

impl Class for MemoryStream {
    type Interfaces = (IBStream,);
}

impl IBStreamTrait for MemoryStream {
    unsafe fn read(&self, buffer: *mut c_void, num_bytes: int32, num_bytes_read: *mut int32) -> tresult {
        if buffer.is_null() || num_bytes < 0 {
            return kInvalidArgument;
        }
        let data = self.data.borrow();
        let start = self.position.get().min(data.len());
        let count = (num_bytes as usize).min(data.len() - start);
        // SAFETY: caller guarantees `buffer` holds at least `num_bytes` bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(data[start..].as_ptr(), buffer as *mut u8, count);
            if !num_bytes_read.is_null() {
                *num_bytes_read = count as int32;
            }
        }
        self.position.set(start + count);
        kResultOk
    }

    unsafe fn write(
        &self,
        buffer: *mut c_void,
        num_bytes: int32,
        num_bytes_written: *mut int32,
    ) -> tresult {
        if buffer.is_null() || num_bytes < 0 {
            return kInvalidArgument;
        }
        let count = num_bytes as usize;
        // SAFETY: caller guarantees `buffer` holds `num_bytes` readable bytes.
        let bytes = unsafe { std::slice::from_raw_parts(buffer as *const u8, count) };
        let mut data = self.data.borrow_mut();
        let start = self.position.get();
        if data.len() < start + count {
            data.resize(start + count, 0);
        }
        data[start..start + count].copy_from_slice(bytes);
        self.position.set(start + count);
        if !num_bytes_written.is_null() {
            unsafe { *num_bytes_written = num_bytes };
        }
        kResultOk
    }

    unsafe fn seek(&self, pos: int64, mode: int32, result: *mut int64) -> tresult {
        let len = self.data.borrow().len() as int64;
        let base = match mode {
            SEEK_SET => 0,
            SEEK_CUR => self.position.get() as int64,
            SEEK_END => len,
            _ => return kInvalidArgument,
        };
        let target = base + pos;
        if target < 0 {
            return kResultFalse;
        }
        self.position.set(target as usize);
        if !result.is_null() {
            unsafe { *result = target };
        }
        kResultOk
    }

    unsafe fn tell(&self, pos: *mut int64) -> tresult {
        if pos.is_null() {
            return kInvalidArgument;
        }
        unsafe { *pos = self.position.get() as int64 };
        kResultOk
    }
}

/// Input event list for one block.
pub(crate) struct HostEventList {
    events: RefCell<Vec<Event>>,
}

impl HostEventList {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: RefCell::new(Vec::with_capacity(capacity)),
        }
    }

    pub(crate) fn fill(&self, events: impl Iterator<Item = Event>) {
        let mut list = self.events.borrow_mut();
        list.clear();
        list.extend(events);
    }
}

impl Class for HostEventList {
    type Interfaces = (IEventList,);
}

impl IEventListTrait for HostEventList {
    unsafe fn getEventCount(&self) -> int32 {
        self.events.borrow().len() as int32
    }

    unsafe fn getEvent(&self, index: int32, e: *mut Event) -> tresult {
        if e.is_null() {
            return kInvalidArgument;
        }
        match self.events.borrow().get(index as usize) {
            Some(event) => {
                unsafe { *e = *event };
                kResultOk
            }
            None => kResultFalse,
        }
    }

    unsafe fn addEvent(&self, e: *mut Event) -> tresult {
        if e.is_null() {
            return kInvalidArgument;
        }
        self.events.borrow_mut().push(unsafe { *e });
        kResultOk
    }
}

pub(crate) struct HostParamValueQueue {
    param_id: Cell<ParamID>,
    points: RefCell<Vec<(int32, ParamValue)>>,
}

impl HostParamValueQueue {
    fn new() -> Self {
        Self {
            param_id: Cell::new(0),
            points: RefCell::new(Vec::with_capacity(16)),
        }
    }

    fn reset(&self, param_id: ParamID) {
        self.param_id.set(param_id);
        self.points.borrow_mut().clear();
    }
}

impl Class for HostParamValueQueue {
    type Interfaces = (IParamValueQueue,);
}

impl IParamValueQueueTrait for HostParamValueQueue {
    unsafe fn getParameterId(&self) -> ParamID {
        self.param_id.get()
    }

    unsafe fn getPointCount(&self) -> int32 {
        self.points.borrow().len() as int32
    }

    unsafe fn getPoint(
        &self,
        index: int32,
        sample_offset: *mut int32,
        value: *mut ParamValue,
    ) -> tresult {
        if sample_offset.is_null() || value.is_null() {
            return kInvalidArgument;
        }
        match self.points.borrow().get(index as usize) {
            Some(&(offset, v)) => {
                unsafe {
                    *sample_offset = offset;
                    *value = v;
                }
                kResultOk
            }
            None => kResultFalse,
        }
    }

    unsafe fn addPoint(&self, sample_offset: int32, value: ParamValue, index: *mut int32) -> tresult {
        let mut points = self.points.borrow_mut();
        let position = match points.binary_search_by_key(&sample_offset, |p| p.0) {
            Ok(i) => {
                points[i].1 = value;
                i
            }
            Err(i) => {
                points.insert(i, (sample_offset, value));
                i
            }
        };
        if !index.is_null() {
            unsafe { *index = position as int32 };
        }
        kResultOk
    }
}

/// A fixed pool of parameter queues, reused every block.
pub(crate) struct HostParameterChanges {
    count: Cell<usize>,
    queues: Vec<ComWrapper<HostParamValueQueue>>,
}

impl HostParameterChanges {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            count: Cell::new(0),
            queues: (0..capacity)
                .map(|_| ComWrapper::new(HostParamValueQueue::new()))
                .collect(),
        }
    }

    pub(crate) fn clear(&self) {
        self.count.set(0);
    }

    /// Copy host automation into the pool. Returns the number of queues
    /// that did not fit.
    pub(crate) fn load(&self, changes: &ParameterChanges) -> usize {
        self.clear();
        let mut dropped = 0;
        for queue in changes.iter() {
            let index = self.count.get();
            let Some(target) = self.queues.get(index) else {
                dropped += 1;
                continue;
            };
            target.reset(queue.param_id);
            target
                .points
                .borrow_mut()
                .extend(queue.points().iter().map(|p| (p.sample_offset, p.value)));
            self.count.set(index + 1);
        }
        dropped
    }

    fn queue_ptr(&self, index: usize) -> *mut IParamValueQueue {
        self.queues
            .get(index)
            .and_then(|q| q.as_com_ref::<IParamValueQueue>())
            .map(|r| r.as_ptr())
            .unwrap_or(std::ptr::null_mut())
    }
}

impl Class for HostParameterChanges {
    type Interfaces = (IParameterChanges,);
}

impl IParameterChangesTrait for HostParameterChanges {
    unsafe fn getParameterCount(&self) -> int32 {
        self.count.get() as int32
    }

    unsafe fn getParameterData(&self, index: int32) -> *mut IParamValueQueue {
        if index < 0 || index as usize >= self.count.get() {
            return std::ptr::null_mut();
        }
        self.queue_ptr(index as usize)
    }

    unsafe fn addParameterData(&self, id: *const ParamID, index: *mut int32) -> *mut IParamValueQueue {
        if id.is_null() {
            return std::ptr::null_mut();
        }
        let id = unsafe { *id };
        let count = self.count.get();
        let existing = self.queues[..count]
            .iter()
            .position(|q| q.param_id.get() == id);
        let slot = match existing {
            Some(slot) => slot,
            None if count < self.queues.len() => {
                self.queues[count].reset(id);
                self.count.set(count + 1);
                count
            }
            None => return std::ptr::null_mut(),
        };
        if !index.is_null() {
            unsafe { *index = slot as int32 };
        }
        self.queue_ptr(slot)
    }
}
