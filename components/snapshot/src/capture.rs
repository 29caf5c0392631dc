//! Capturing an engine into an image.

use std::collections::BTreeMap;

use class_model::ClassTable;
use core_types::ClassId;
use interpreter::{Engine, Frame};
use memory_manager::Payload;
use scheduler::ThreadState;

use crate::codec::CompanionRegistry;
use crate::error::SnapshotError;
use crate::image::{
    ClassRecord, FrameRecord, ObjectRecord, PayloadRecord, SnapshotImage, StaticsRecord, ThreadRecord,
    ThreadStateRecord,
};

/// Collects the name and hash of every class the image mentions.
struct ClassNames<'a> {
    table: &'a ClassTable,
    seen: BTreeMap<String, String>,
}

impl<'a> ClassNames<'a> {
    fn name(&mut self, id: ClassId) -> Result<String, SnapshotError> {
        let info = self
            .table
            .get(id)
            .ok_or_else(|| SnapshotError::Corrupt(format!("heap refers to unknown class {}", id)))?;
        let name = info.name.to_string();
        self.seen
            .entry(name.clone())
            .or_insert_with(|| info.structural_hash().to_string());
        Ok(name)
    }

    fn into_records(self) -> Vec<ClassRecord> {
        self.seen
            .into_iter()
            .map(|(name, hash)| ClassRecord { name, hash })
            .collect()
    }
}

/// Captures the engine between slices.
///
/// Companions are encoded with the codec registered for their object's
/// class; an object with a companion but no codec fails the capture.
pub fn capture(engine: &Engine, codecs: &CompanionRegistry) -> Result<SnapshotImage, SnapshotError> {
    let scheduler = engine.scheduler();
    if scheduler.current().is_some() {
        return Err(SnapshotError::Busy("a thread is mid-slice"));
    }
    if scheduler.threads().any(|t| t.synthetic && t.is_alive()) {
        return Err(SnapshotError::Busy("a synthetic invocation is running"));
    }
    let mut classes = ClassNames {
        table: engine.classes(),
        seen: BTreeMap::new(),
    };

    let heap = engine.heap();
    let mut objects = Vec::with_capacity(heap.len());
    for (reference, object) in heap.objects() {
        let class = classes.name(object.class)?;
        let payload = match &object.payload {
            Payload::None => PayloadRecord::None,
            Payload::Array { kind, elements } => PayloadRecord::Array {
                kind: *kind,
                elements: elements.clone(),
            },
            Payload::Str(text) => PayloadRecord::Str(text.to_string()),
            Payload::Mirror(mirrored) => PayloadRecord::Mirror(classes.name(*mirrored)?),
            Payload::Companion(companion) => {
                PayloadRecord::Companion(codecs.get(&class)?.encode(&class, companion.as_ref())?)
            }
        };
        objects.push(ObjectRecord {
            reference,
            class,
            monitor: object.monitor.clone(),
            fields: object.fields.clone(),
            payload,
        });
    }

    let interned = heap
        .interned_strings()
        .into_iter()
        .map(|(text, reference)| (text.to_string(), reference))
        .collect();

    let mut statics = Vec::new();
    for id in engine.statics().classes() {
        statics.push(StaticsRecord {
            class: classes.name(id)?,
            values: engine.statics().slots(id).map(<[_]>::to_vec).unwrap_or_default(),
        });
    }

    let now = scheduler.now();
    let mut threads = Vec::new();
    for thread in scheduler.threads().filter(|t| t.is_alive()) {
        let state = match thread.state {
            ThreadState::Ready => ThreadStateRecord::Ready,
            ThreadState::DetachedUntil(deadline) => ThreadStateRecord::DetachedFor(deadline.saturating_sub(now)),
            ThreadState::Detached => ThreadStateRecord::Detached,
            ThreadState::Terminated => continue,
        };
        let frames = thread
            .stack
            .iter()
            .map(|frame| frame_record(&mut classes, frame))
            .collect::<Result<Vec<_>, _>>()?;
        threads.push(ThreadRecord {
            id: thread.id,
            state,
            interrupted: thread.interrupted,
            interruptible: thread.interruptible,
            pending: thread.pending,
            object: thread.object,
            joiners: thread.joiners.clone(),
            frames,
        });
    }

    let image = SnapshotImage {
        captured_at: now,
        heap_capacity: heap.capacity(),
        out_of_memory: engine.out_of_memory_error(),
        classes: classes.into_records(),
        objects,
        interned,
        statics,
        threads,
        ready: scheduler.ready_queue(),
    };
    log::debug!(
        "captured {} objects, {} threads, {} classes",
        image.objects.len(),
        image.threads.len(),
        image.classes.len()
    );
    Ok(image)
}

fn frame_record(classes: &mut ClassNames<'_>, frame: &Frame) -> Result<FrameRecord, SnapshotError> {
    let class = classes.name(frame.method.class)?;
    let info = classes
        .table
        .get(frame.method.class)
        .ok_or_else(|| SnapshotError::Corrupt(format!("frame of unknown class {}", class)))?;
    let method = info
        .method_at(frame.method.index)
        .ok_or_else(|| SnapshotError::Corrupt(format!("frame of unknown method {}", frame.method)))?;
    Ok(FrameRecord {
        class,
        name: method.name.to_string(),
        descriptor: method.descriptor.to_string(),
        method_hash: method.structural_hash(),
        pc: frame.pc,
        locals: frame.locals.clone(),
        stack: frame.stack.clone(),
        monitor: frame.monitor,
    })
}
