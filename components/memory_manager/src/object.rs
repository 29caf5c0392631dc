//! Heap objects.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use core_types::{ClassId, Reference, Value, ValueKind, OBJECT_HEADER_WEIGHT};

use crate::monitor::Monitor;

/// Host-side state attached to a heap object.
///
/// Companions let host natives keep Rust data next to a Java object. The
/// collector asks them for references they hold outside the object's fields
/// and lets them veto deletion, for example while a host resource is still
/// in use.
pub trait NativeCompanion: fmt::Debug + Send {
    /// References held by the companion that the collector must keep alive.
    fn hidden_references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Called when the collector is about to free the object. Returning
    /// `false` vetoes deletion for this cycle.
    fn on_delete(&mut self) -> bool {
        true
    }

    /// Upcast for downcasting to the concrete companion type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Extra storage beyond instance fields.
#[derive(Debug, Default)]
pub enum Payload {
    /// Plain instance
    #[default]
    None,
    /// Array elements, already narrowed to the element kind
    Array {
        /// Element kind
        kind: ValueKind,
        /// Elements
        elements: Vec<Value>,
    },
    /// Text of a `java/lang/String`
    Str(Arc<str>),
    /// Class mirror: the class a `java/lang/Class` object stands for
    Mirror(ClassId),
    /// Host companion
    Companion(Box<dyn NativeCompanion>),
}

/// One object in the heap.
#[derive(Debug)]
pub struct HeapObject {
    /// Class of the object
    pub class: ClassId,
    /// Monitor header
    pub monitor: Monitor,
    /// Instance fields in layout slot order
    pub fields: Vec<Value>,
    /// Array, string, mirror or companion storage
    pub payload: Payload,
    size: usize,
    reachable: bool,
}

impl HeapObject {
    /// Plain instance with zeroed fields of the given kinds.
    pub fn instance(class: ClassId, field_kinds: &[ValueKind]) -> Self {
        let mut object = Self::with_payload(
            class,
            field_kinds.iter().map(|k| Value::zero_of(*k)).collect(),
            Payload::None,
        );
        object.size = OBJECT_HEADER_WEIGHT + field_kinds.iter().map(|k| k.weight()).sum::<usize>();
        object
    }

    /// Zeroed array of `length` elements.
    pub fn array(class: ClassId, kind: ValueKind, length: usize) -> Self {
        Self::with_payload(
            class,
            Vec::new(),
            Payload::Array {
                kind,
                elements: vec![Value::zero_of(kind); length],
            },
        )
    }

    /// Weight an array of `length` elements would have, saturating.
    pub fn array_weight(kind: ValueKind, length: usize) -> usize {
        OBJECT_HEADER_WEIGHT.saturating_add(kind.weight().saturating_mul(length))
    }

    /// Object with explicit fields and payload.
    pub fn with_payload(class: ClassId, fields: Vec<Value>, payload: Payload) -> Self {
        let field_weight: usize = fields.iter().map(value_weight).sum();
        let payload_weight = match &payload {
            Payload::Array { kind, elements } => kind.weight() * elements.len(),
            Payload::Str(text) => 2 * text.chars().count(),
            _ => 0,
        };
        Self {
            class,
            monitor: Monitor::new(),
            fields,
            payload,
            size: OBJECT_HEADER_WEIGHT + field_weight + payload_weight,
            reachable: false,
        }
    }

    /// Array elements, if this is an array.
    pub fn elements(&self) -> Option<&[Value]> {
        match &self.payload {
            Payload::Array { elements, .. } => Some(elements),
            _ => None,
        }
    }

    /// Mutable array elements and their kind, if this is an array.
    pub fn elements_mut(&mut self) -> Option<(ValueKind, &mut Vec<Value>)> {
        match &mut self.payload {
            Payload::Array { kind, elements } => Some((*kind, elements)),
            _ => None,
        }
    }

    /// String text, if this is a string.
    pub fn text(&self) -> Option<&Arc<str>> {
        match &self.payload {
            Payload::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Companion, if any.
    pub fn companion(&self) -> Option<&dyn NativeCompanion> {
        match &self.payload {
            Payload::Companion(companion) => Some(companion.as_ref()),
            _ => None,
        }
    }

    /// Mutable companion, if any.
    pub fn companion_mut(&mut self) -> Option<&mut (dyn NativeCompanion + 'static)> {
        match &mut self.payload {
            Payload::Companion(companion) => Some(companion.as_mut()),
            _ => None,
        }
    }

    /// Accounting size charged against the heap capacity: header, fields
    /// and array elements, fixed when the object is created.
    pub fn weight(&self) -> usize {
        self.size
    }

    /// Every reference the object holds: fields, array elements and
    /// companion hidden references.
    pub fn references(&self) -> Vec<Reference> {
        let mut out: Vec<Reference> = self.fields.iter().filter_map(Value::as_reference).collect();
        match &self.payload {
            Payload::Array { elements, .. } => out.extend(elements.iter().filter_map(Value::as_reference)),
            Payload::Companion(companion) => out.extend(companion.hidden_references()),
            _ => {}
        }
        out.retain(|r| !r.is_null());
        out
    }

    /// Mark bit. Only set while a collection is in progress.
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub(crate) fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }
}

fn value_weight(value: &Value) -> usize {
    match value {
        Value::Long(_) | Value::Double(_) => 8,
        _ => 4,
    }
}
