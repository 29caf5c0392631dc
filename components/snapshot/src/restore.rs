//! Restoring an image into an engine.
//!
//! Restore validates every class and method the image refers to against the
//! engine's loaded classes before it touches any engine state. A mismatch
//! fails the whole restore, so no restored thread ever runs against a class
//! whose shape changed.

use std::sync::Arc;

use class_model::{ClassInfo, ClassTable};
use core_types::ClassId;
use interpreter::{Engine, Frame};
use memory_manager::{Heap, HeapObject, Payload, StaticStorage};
use rustc_hash::FxHashMap;
use scheduler::{JavaThread, ThreadState};

use crate::codec::CompanionRegistry;
use crate::error::SnapshotError;
use crate::image::{FrameRecord, PayloadRecord, SnapshotImage, ThreadStateRecord};

/// Class ids of an image's classes in the target engine.
#[derive(Debug)]
pub struct ResolvedClasses {
    ids: FxHashMap<String, ClassId>,
}

impl ResolvedClasses {
    /// Id of an image class.
    pub fn id(&self, name: &str) -> Result<ClassId, SnapshotError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| SnapshotError::Corrupt(format!("class {} used but not listed", name)))
    }
}

fn lookup(table: &ClassTable, name: &str) -> Option<ClassId> {
    if name.starts_with('[') {
        table.array_class(name).ok()
    } else {
        table.lookup(name)
    }
}

/// Checks every class hash and every framed method hash of `image`
/// against `engine`'s loaded classes.
pub fn validate(engine: &Engine, image: &SnapshotImage) -> Result<ResolvedClasses, SnapshotError> {
    let table = engine.classes();
    let mut ids = FxHashMap::default();
    for record in &image.classes {
        let id = lookup(table, &record.name).ok_or_else(|| SnapshotError::MissingClass(record.name.clone()))?;
        let info = table.get(id).ok_or_else(|| SnapshotError::MissingClass(record.name.clone()))?;
        let found = info.structural_hash();
        if found != record.hash {
            log::warn!("class {} changed since capture", record.name);
            return Err(SnapshotError::ClassHashMismatch {
                class: record.name.clone(),
                expected: record.hash.clone(),
                found: found.to_string(),
            });
        }
        ids.insert(record.name.clone(), id);
    }
    let resolved = ResolvedClasses { ids };
    for frame in image.threads.iter().flat_map(|t| &t.frames) {
        let info = class_info(table, &resolved, &frame.class)?;
        let method = info
            .method(&frame.name, &frame.descriptor)
            .ok_or_else(|| SnapshotError::MissingMethod(frame.method_name()))?;
        let found = method.structural_hash();
        if found != frame.method_hash {
            return Err(SnapshotError::MethodHashMismatch {
                method: frame.method_name(),
                expected: frame.method_hash.clone(),
                found,
            });
        }
    }
    Ok(resolved)
}

fn class_info(table: &ClassTable, classes: &ResolvedClasses, name: &str) -> Result<Arc<ClassInfo>, SnapshotError> {
    let id = classes.id(name)?;
    table.get(id).ok_or_else(|| SnapshotError::MissingClass(name.to_string()))
}

/// Restores `image` into `engine`, which must not have any threads.
///
/// Restored classes with static storage count as initialized; their
/// initializers do not run again. Timed detaches resume with the time they
/// had left at capture.
pub fn restore(engine: &mut Engine, image: &SnapshotImage, codecs: &CompanionRegistry) -> Result<(), SnapshotError> {
    let classes = validate(engine, image)?;
    if engine.scheduler().threads().next().is_some() {
        return Err(SnapshotError::Busy("restore target already has threads"));
    }

    let capacity = image.heap_capacity.max(engine.config().heap_capacity);
    let mut heap = Heap::new(capacity, engine.config().overflow);
    for record in &image.objects {
        let class = classes.id(&record.class)?;
        let payload = match &record.payload {
            PayloadRecord::None => Payload::None,
            PayloadRecord::Array { kind, elements } => Payload::Array {
                kind: *kind,
                elements: elements.clone(),
            },
            PayloadRecord::Str(text) => Payload::Str(Arc::from(text.as_str())),
            PayloadRecord::Mirror(name) => {
                let mirrored = classes.id(name)?;
                heap.register_mirror(mirrored, record.reference);
                Payload::Mirror(mirrored)
            }
            PayloadRecord::Companion(bytes) => {
                Payload::Companion(codecs.get(&record.class)?.decode(&record.class, bytes)?)
            }
        };
        let mut object = HeapObject::with_payload(class, record.fields.clone(), payload);
        object.monitor = record.monitor.clone();
        if !heap.insert_at(record.reference, object) {
            return Err(SnapshotError::Corrupt(format!("duplicate or null handle {}", record.reference)));
        }
    }
    for (text, reference) in &image.interned {
        heap.intern(Arc::from(text.as_str()), *reference);
    }

    let mut statics = StaticStorage::new();
    let mut initialized = Vec::with_capacity(image.statics.len());
    for record in &image.statics {
        let class = classes.id(&record.class)?;
        statics.restore(class, record.values.clone());
        initialized.push(class);
    }

    let now = engine.scheduler().now();
    let mut threads = Vec::with_capacity(image.threads.len());
    for record in &image.threads {
        let frames = record
            .frames
            .iter()
            .map(|frame| restore_frame(engine, &classes, frame))
            .collect::<Result<Vec<_>, _>>()?;
        let mut thread = JavaThread::new(record.id, record.object, frames);
        thread.state = match record.state {
            ThreadStateRecord::Ready => ThreadState::Ready,
            ThreadStateRecord::DetachedFor(remaining) => ThreadState::DetachedUntil(now.saturating_add(remaining)),
            ThreadStateRecord::Detached => ThreadState::Detached,
        };
        thread.interrupted = record.interrupted;
        thread.interruptible = record.interruptible;
        thread.pending = record.pending;
        thread.joiners = record.joiners.clone();
        threads.push(thread);
    }
    // Ready threads rejoin the rotation in the order they left it.
    let position = |thread: &JavaThread<Vec<Frame>>| {
        image.ready.iter().position(|id| *id == thread.id).unwrap_or(usize::MAX)
    };
    threads.sort_by_key(|t| (t.state == ThreadState::Ready, position(t)));

    engine.install_state(heap, statics, threads, image.out_of_memory)?;
    for class in initialized {
        if let Some(info) = engine.linker().prepare(class) {
            info.take_pending_init();
        }
    }
    log::debug!("restored {} objects, {} threads", image.objects.len(), image.threads.len());
    Ok(())
}

fn restore_frame(engine: &Engine, classes: &ResolvedClasses, record: &FrameRecord) -> Result<Frame, SnapshotError> {
    let info = class_info(engine.classes(), classes, &record.class)?;
    let method = info
        .method(&record.name, &record.descriptor)
        .ok_or_else(|| SnapshotError::MissingMethod(record.method_name()))?;
    let code = engine.linker().link(&info, method)?;
    if record.pc as usize >= code.len() {
        return Err(SnapshotError::Corrupt(format!("pc {} past the end of {}", record.pc, record.method_name())));
    }
    Ok(Frame {
        method: method.id,
        code,
        pc: record.pc,
        locals: record.locals.clone(),
        stack: record.stack.clone(),
        monitor: record.monitor,
    })
}
