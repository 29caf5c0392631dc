//! Class table
//!
//! Arena of every loaded class, addressed by [`ClassId`]. Registration,
//! name lookup, hierarchy links and the `is` subtype test live here; the
//! linker builds on top of it.

use std::sync::Arc;

use core_types::{ClassId, LoadLog, MethodId, Severity, ValueKind};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::class::{ClassInfo, ElementType, FieldId};
use crate::constant_pool::ConstantPool;
use crate::definition::ClassDefinition;
use crate::descriptor::{FieldType, MethodDescriptor};
use crate::error::ClassError;
use crate::flags::AccessFlags;
use crate::member::{Field, Method, MethodBody};

/// Internal name of the root class.
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// All loaded classes.
///
/// # Examples
///
/// ```
/// use class_model::{ClassBuilder, ClassTable};
///
/// let table = ClassTable::new();
/// let base = table.register(ClassBuilder::new("java/lang/Object").build()).unwrap();
/// let shape = table.register(ClassBuilder::new("app/Shape").build()).unwrap();
/// assert!(table.is(shape, base));
/// assert!(!table.is(base, shape));
/// ```
#[derive(Debug)]
pub struct ClassTable {
    classes: RwLock<Vec<Arc<ClassInfo>>>,
    by_name: RwLock<FxHashMap<Arc<str>, ClassId>>,
    log: Arc<LoadLog>,
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassTable {
    /// Creates an empty table with its own load log.
    pub fn new() -> Self {
        Self::with_log(Arc::new(LoadLog::new()))
    }

    /// Creates an empty table recording issues into `log`.
    pub fn with_log(log: Arc<LoadLog>) -> Self {
        Self {
            classes: RwLock::new(Vec::new()),
            by_name: RwLock::new(FxHashMap::default()),
            log,
        }
    }

    /// Shared load-time log.
    pub fn load_log(&self) -> &Arc<LoadLog> {
        &self.log
    }

    /// Number of loaded classes.
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// True when nothing is loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class by id.
    pub fn get(&self, id: ClassId) -> Option<Arc<ClassInfo>> {
        self.classes.read().get(id.0 as usize).cloned()
    }

    /// Class id by internal name.
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.read().get(name).copied()
    }

    /// Class by internal name.
    pub fn by_name(&self, name: &str) -> Option<Arc<ClassInfo>> {
        self.lookup(name).and_then(|id| self.get(id))
    }

    /// Every loaded class in id order.
    pub fn all(&self) -> Vec<Arc<ClassInfo>> {
        self.classes.read().clone()
    }

    /// Class name for messages; `?` for unknown ids.
    pub fn name_of(&self, id: ClassId) -> Arc<str> {
        self.get(id)
            .map(|class| class.name.clone())
            .unwrap_or_else(|| Arc::from("?"))
    }

    fn insert(&self, name: &str, build: impl FnOnce(ClassId) -> ClassInfo) -> Result<ClassId, ClassError> {
        let mut classes = self.classes.write();
        let mut by_name = self.by_name.write();
        if by_name.contains_key(name) {
            return Err(ClassError::DuplicateClass(name.to_string()));
        }
        let id = ClassId(classes.len() as u32);
        let class = build(id);
        by_name.insert(class.name.clone(), id);
        classes.push(Arc::new(class));
        Ok(id)
    }

    /// Loads a class definition.
    ///
    /// Descriptors are parsed here; a malformed one rejects the class and is
    /// recorded in the load log. Static fields get their slots immediately;
    /// instance slots wait for the linker.
    pub fn register(&self, definition: ClassDefinition) -> Result<ClassId, ClassError> {
        let result = self.build_and_insert(definition);
        if let Err(err) = &result {
            self.log.record(Severity::Error, "class table", err.to_string());
        }
        result
    }

    fn build_and_insert(&self, definition: ClassDefinition) -> Result<ClassId, ClassError> {
        let class_name: Arc<str> = definition.name.as_str().into();
        let descriptor_error = |member: &str, source| ClassError::Descriptor {
            class: definition.name.clone(),
            member: member.to_string(),
            source,
        };

        let mut field_types = Vec::with_capacity(definition.fields.len());
        for field in &definition.fields {
            field_types.push(
                FieldType::parse(&field.descriptor).map_err(|e| descriptor_error(&field.name, e))?,
            );
        }
        let mut signatures = Vec::with_capacity(definition.methods.len());
        for method in &definition.methods {
            signatures.push(
                MethodDescriptor::parse(&method.descriptor)
                    .map_err(|e| descriptor_error(&method.name, e))?,
            );
        }

        let log = &self.log;
        self.insert(&definition.name, |id| {
            let mut static_slot = 0u16;
            let fields = definition
                .fields
                .iter()
                .zip(field_types)
                .map(|(def, field_type)| {
                    let field = Field::new(
                        id,
                        def.name.as_str().into(),
                        def.descriptor.as_str().into(),
                        field_type,
                        def.flags,
                    );
                    if field.is_static() {
                        field.assign_slot(static_slot);
                        static_slot += 1;
                    }
                    field
                })
                .collect();
            let methods = definition
                .methods
                .iter()
                .zip(signatures)
                .enumerate()
                .map(|(index, (def, signature))| {
                    let body = if def.flags.is_native() {
                        MethodBody::Native(Default::default())
                    } else if let Some(raw) = &def.code {
                        MethodBody::Bytecode {
                            raw: raw.clone(),
                            linked: Default::default(),
                        }
                    } else {
                        if !def.flags.is_abstract() {
                            log.record(
                                Severity::Warning,
                                format!("{}.{}{}", definition.name, def.name, def.descriptor),
                                "concrete method has no code; treated as abstract",
                            );
                        }
                        MethodBody::Abstract
                    };
                    Method {
                        id: MethodId::new(id, index as u16),
                        class_name: class_name.clone(),
                        name: def.name.as_str().into(),
                        descriptor: def.descriptor.as_str().into(),
                        signature,
                        flags: def.flags,
                        body,
                    }
                })
                .collect();
            ClassInfo::new(
                id,
                class_name.clone(),
                definition.super_name.as_deref().map(Arc::from),
                definition.interfaces.iter().map(|i| Arc::from(i.as_str())).collect(),
                definition.flags,
                ConstantPool::from_entries(definition.constants.iter().cloned()),
                fields,
                methods,
                None,
            )
        })
    }

    /// Array class with this descriptor name (`[I`, `[[Ljava/lang/String;`),
    /// created on first request. Array classes extend `java/lang/Object`.
    pub fn array_class(&self, name: &str) -> Result<ClassId, ClassError> {
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }
        let component = match FieldType::parse(name) {
            Ok(FieldType::Array(component)) => component,
            _ => return Err(ClassError::NotAnArray(name.to_string())),
        };
        let element = match *component {
            FieldType::Primitive(kind) => ElementType::Primitive(kind),
            FieldType::Object(ref class) => ElementType::Reference(
                self.lookup(class)
                    .ok_or_else(|| ClassError::NoSuchClass(class.clone()))?,
            ),
            FieldType::Array(_) => ElementType::Reference(self.array_class(&component.to_string())?),
        };
        let object = self.lookup(OBJECT_CLASS);
        let inserted = self.insert(name, |id| {
            let class = ClassInfo::new(
                id,
                Arc::from(name),
                Some(Arc::from(OBJECT_CLASS)),
                Vec::new(),
                AccessFlags::PUBLIC | AccessFlags::FINAL,
                ConstantPool::new(),
                Vec::new(),
                Vec::new(),
                Some(element),
            );
            class.set_super_class(object);
            class.set_interfaces(Vec::new());
            class
        });
        match inserted {
            Ok(id) => Ok(id),
            // Lost a race with another creator.
            Err(ClassError::DuplicateClass(_)) => self
                .lookup(name)
                .ok_or_else(|| ClassError::NoSuchClass(name.to_string())),
            Err(err) => Err(err),
        }
    }

    /// Array class whose elements are of `kind` (primitive) or `element`
    /// (reference).
    pub fn array_of(&self, element: ElementType) -> Result<ClassId, ClassError> {
        let name = match element {
            ElementType::Primitive(kind) if kind != ValueKind::Reference => {
                format!("[{}", kind.descriptor_char())
            }
            ElementType::Primitive(_) => return Err(ClassError::NotAnArray("[L".to_string())),
            ElementType::Reference(id) => {
                let class = self
                    .get(id)
                    .ok_or_else(|| ClassError::NoSuchClass(id.to_string()))?;
                if class.is_array() {
                    format!("[{}", class.name)
                } else {
                    format!("[L{};", class.name)
                }
            }
        };
        self.array_class(&name)
    }

    /// Superclass of `id`, resolving the name link on first use. A missing
    /// superclass is recorded in the load log and treated as none.
    pub fn superclass(&self, id: ClassId) -> Option<ClassId> {
        let class = self.get(id)?;
        if let Some(link) = class.super_class() {
            return link;
        }
        let link = match &class.super_name {
            None => None,
            Some(name) => {
                let found = self.lookup(name);
                if found.is_none() {
                    self.log.record(
                        Severity::Warning,
                        class.name.to_string(),
                        format!("missing superclass {}", name),
                    );
                }
                found
            }
        };
        class.set_super_class(link)
    }

    /// Directly declared interfaces of `id`, resolving names on first use.
    pub fn interfaces(&self, id: ClassId) -> Vec<ClassId> {
        let Some(class) = self.get(id) else {
            return Vec::new();
        };
        if let Some(links) = class.interfaces() {
            return links.to_vec();
        }
        let mut links = Vec::with_capacity(class.interface_names.len());
        for name in &class.interface_names {
            match self.lookup(name) {
                Some(link) => links.push(link),
                None => self.log.record(
                    Severity::Warning,
                    class.name.to_string(),
                    format!("missing interface {}", name),
                ),
            }
        }
        class.set_interfaces(links).to_vec()
    }

    /// Superclass chain starting at `id` itself, root last.
    pub fn ancestry(&self, id: ClassId) -> Vec<ClassId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.superclass(current) {
            if chain.contains(&parent) {
                self.log.record(
                    Severity::Error,
                    self.name_of(id).to_string(),
                    "circular superclass chain",
                );
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Subtype test.
    ///
    /// Walks the superclass chain of `sub`, checking each ancestor and the
    /// interfaces it declares directly. Interfaces extended by those
    /// interfaces are not followed. Array classes compare element types,
    /// covariantly for reference elements.
    pub fn is(&self, sub: ClassId, sup: ClassId) -> bool {
        if sub == sup {
            return true;
        }
        if let (Some(sub_class), Some(sup_class)) = (self.get(sub), self.get(sup)) {
            if let (Some(a), Some(b)) = (sub_class.element(), sup_class.element()) {
                return match (a, b) {
                    (ElementType::Reference(a), ElementType::Reference(b)) => self.is(a, b),
                    (ElementType::Primitive(a), ElementType::Primitive(b)) => a == b,
                    _ => false,
                };
            }
        }
        self.ancestry(sub)
            .into_iter()
            .any(|ancestor| ancestor == sup || self.interfaces(ancestor).contains(&sup))
    }

    /// Finds a method by name and descriptor, starting at `class` and walking
    /// the superclass chain, then the interfaces of each ancestor.
    pub fn resolve_method(&self, class: ClassId, name: &str, descriptor: &str) -> Result<MethodId, ClassError> {
        let chain = self.ancestry(class);
        for ancestor in &chain {
            if let Some(method) = self.get(*ancestor).and_then(|c| c.method(name, descriptor).map(|m| m.id)) {
                return Ok(method);
            }
        }
        let mut pending: Vec<ClassId> = chain.iter().flat_map(|c| self.interfaces(*c)).collect();
        let mut seen = Vec::new();
        while let Some(interface) = pending.pop() {
            if seen.contains(&interface) {
                continue;
            }
            seen.push(interface);
            if let Some(method) = self.get(interface).and_then(|c| c.method(name, descriptor).map(|m| m.id)) {
                return Ok(method);
            }
            pending.extend(self.interfaces(interface));
        }
        Err(ClassError::NoSuchMethod {
            class: self.name_of(class).to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    /// Finds a field by name and descriptor, starting at `class` and walking
    /// the superclass chain.
    pub fn resolve_field(&self, class: ClassId, name: &str, descriptor: &str) -> Result<FieldId, ClassError> {
        for ancestor in self.ancestry(class) {
            if let Some(index) = self.get(ancestor).and_then(|c| c.field_position(name, descriptor)) {
                return Ok(FieldId {
                    class: ancestor,
                    index,
                });
            }
        }
        Err(ClassError::NoSuchField {
            class: self.name_of(class).to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    /// Owning class of a method, paired for convenient access.
    pub fn method_owner(&self, id: MethodId) -> Option<Arc<ClassInfo>> {
        let class = self.get(id.class)?;
        class.method_at(id.index)?;
        Some(class)
    }
}
