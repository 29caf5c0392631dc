//! Class metadata.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use core_types::{ClassId, MethodId, SignatureId, ValueKind};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

use crate::constant_pool::ConstantPool;
use crate::flags::AccessFlags;
use crate::member::{Field, Method};

/// Element type of an array class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Primitive elements
    Primitive(ValueKind),
    /// Reference elements of this class (possibly itself an array class)
    Reference(ClassId),
}

impl ElementType {
    /// Storage kind of one element.
    pub fn kind(self) -> ValueKind {
        match self {
            ElementType::Primitive(kind) => kind,
            ElementType::Reference(_) => ValueKind::Reference,
        }
    }
}

/// A field addressed by declaring class and declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId {
    /// Declaring class
    pub class: ClassId,
    /// Index into the class's field list
    pub index: u16,
}

/// Instance layout computed once the superclass chain is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Kind of every instance field slot, inherited slots first
    pub field_kinds: Vec<ValueKind>,
    /// Allocation-accounting size of one instance
    pub size: usize,
}

/// Loaded class.
///
/// Created at load time. The superclass link, interface links, virtual table
/// and layout are filled in once on first use and never change afterwards;
/// only the pending-initializer flag flips, once.
#[derive(Debug)]
pub struct ClassInfo {
    /// This class's id
    pub id: ClassId,
    /// Internal name (`java/lang/Object`, `[I`)
    pub name: Arc<str>,
    /// Superclass name; `None` only for `java/lang/Object`
    pub super_name: Option<Arc<str>>,
    /// Directly declared interface names
    pub interface_names: Vec<Arc<str>>,
    /// Access flags
    pub flags: AccessFlags,
    /// Constant pool
    pub constant_pool: ConstantPool,
    /// Declared fields
    pub fields: Vec<Field>,
    /// Declared methods
    pub methods: Vec<Method>,
    /// Kind of each static slot
    pub static_kinds: Vec<ValueKind>,
    element: Option<ElementType>,
    field_index: FxHashMap<(Arc<str>, Arc<str>), u16>,
    method_index: FxHashMap<(Arc<str>, Arc<str>), u16>,
    super_class: OnceCell<Option<ClassId>>,
    interfaces: OnceCell<Vec<ClassId>>,
    vtable: OnceCell<FxHashMap<SignatureId, MethodId>>,
    layout: OnceCell<Layout>,
    pending_init: AtomicBool,
    pub(crate) hash: OnceCell<String>,
}

impl ClassInfo {
    /// Creates class metadata. Member indices are built from the lists.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ClassId,
        name: Arc<str>,
        super_name: Option<Arc<str>>,
        interface_names: Vec<Arc<str>>,
        flags: AccessFlags,
        constant_pool: ConstantPool,
        fields: Vec<Field>,
        methods: Vec<Method>,
        element: Option<ElementType>,
    ) -> Self {
        let field_index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| ((f.name.clone(), f.descriptor.clone()), i as u16))
            .collect();
        let method_index = methods
            .iter()
            .enumerate()
            .map(|(i, m)| ((m.name.clone(), m.descriptor.clone()), i as u16))
            .collect();
        let static_kinds = fields
            .iter()
            .filter(|f| f.is_static())
            .map(Field::kind)
            .collect();
        Self {
            id,
            name,
            super_name,
            interface_names,
            flags,
            constant_pool,
            fields,
            methods,
            static_kinds,
            pending_init: AtomicBool::new(element.is_none()),
            element,
            field_index,
            method_index,
            super_class: OnceCell::new(),
            interfaces: OnceCell::new(),
            vtable: OnceCell::new(),
            layout: OnceCell::new(),
            hash: OnceCell::new(),
        }
    }

    /// Declared field with this name and descriptor.
    pub fn field(&self, name: &str, descriptor: &str) -> Option<&Field> {
        let index = self.field_index.get(&(Arc::from(name), Arc::from(descriptor)))?;
        self.fields.get(*index as usize)
    }

    /// Index of a declared field.
    pub fn field_position(&self, name: &str, descriptor: &str) -> Option<u16> {
        self.field_index
            .get(&(Arc::from(name), Arc::from(descriptor)))
            .copied()
    }

    /// Declared method with this name and descriptor.
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        let index = self.method_index.get(&(Arc::from(name), Arc::from(descriptor)))?;
        self.methods.get(*index as usize)
    }

    /// Declared method by index.
    pub fn method_at(&self, index: u16) -> Option<&Method> {
        self.methods.get(index as usize)
    }

    /// Static initializer, if declared.
    pub fn class_initializer(&self) -> Option<&Method> {
        self.method("<clinit>", "()V")
    }

    /// True for interfaces.
    pub fn is_interface(&self) -> bool {
        self.flags.is_interface()
    }

    /// True for abstract classes and interfaces.
    pub fn is_abstract(&self) -> bool {
        self.flags.is_abstract() || self.flags.is_interface()
    }

    /// Element type, for array classes.
    pub fn element(&self) -> Option<ElementType> {
        self.element
    }

    /// True for array classes.
    pub fn is_array(&self) -> bool {
        self.element.is_some()
    }

    /// Resolved superclass; outer `None` while unresolved.
    pub fn super_class(&self) -> Option<Option<ClassId>> {
        self.super_class.get().copied()
    }

    pub(crate) fn set_super_class(&self, link: Option<ClassId>) -> Option<ClassId> {
        *self.super_class.get_or_init(|| link)
    }

    /// Resolved direct interfaces; `None` while unresolved.
    pub fn interfaces(&self) -> Option<&[ClassId]> {
        self.interfaces.get().map(Vec::as_slice)
    }

    pub(crate) fn set_interfaces(&self, links: Vec<ClassId>) -> &[ClassId] {
        self.interfaces.get_or_init(|| links)
    }

    /// Virtual table, once built.
    pub fn vtable(&self) -> Option<&FxHashMap<SignatureId, MethodId>> {
        self.vtable.get()
    }

    /// Installs the virtual table. Returns false if one already exists.
    pub fn install_vtable(&self, table: FxHashMap<SignatureId, MethodId>) -> bool {
        self.vtable.set(table).is_ok()
    }

    /// Virtual table lookup.
    pub fn dispatch(&self, signature: SignatureId) -> Option<MethodId> {
        self.vtable.get()?.get(&signature).copied()
    }

    /// Instance layout, once computed.
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.get()
    }

    /// Installs the instance layout. Returns false if one already exists.
    pub fn install_layout(&self, layout: Layout) -> bool {
        self.layout.set(layout).is_ok()
    }

    /// Allocation-accounting size of one instance, once computed.
    pub fn size(&self) -> Option<usize> {
        self.layout.get().map(|l| l.size)
    }

    /// True until [`take_pending_init`](Self::take_pending_init) is called.
    pub fn is_init_pending(&self) -> bool {
        self.pending_init.load(Ordering::Acquire)
    }

    /// Clears the pending-initializer flag. Returns true for exactly one
    /// caller: the one that must run the initializer.
    pub fn take_pending_init(&self) -> bool {
        self.pending_init.swap(false, Ordering::AcqRel)
    }
}
