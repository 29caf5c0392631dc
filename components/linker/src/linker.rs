//! Class preparation and lazy method linking.

use std::fmt;
use std::sync::Arc;

use bytecode_system::{LinkError, LinkedCode, Verifier};
use class_model::{ClassInfo, ClassTable, Layout, Method, MethodBody, NativeBinding};
use core_types::{ClassId, FieldAccessMode, MethodId, Severity, OBJECT_HEADER_WEIGHT};
use rustc_hash::FxHashMap;

use crate::decode::Decoder;
use crate::natives::{builtin_native, NativeResolver};
use crate::signature::SignatureTable;

/// Prepares classes and links methods against one class table.
///
/// All work is done at most once per class or method: layouts, virtual
/// tables, linked code and native bindings are stored in write-once cells
/// on the class model, so repeated calls return the same values.
pub struct Linker {
    classes: Arc<ClassTable>,
    signatures: SignatureTable,
    field_access: FieldAccessMode,
    natives: Arc<dyn NativeResolver>,
    verifier: Verifier,
}

impl fmt::Debug for Linker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Linker")
            .field("classes", &self.classes.len())
            .field("signatures", &self.signatures.len())
            .field("field_access", &self.field_access)
            .finish_non_exhaustive()
    }
}

impl Linker {
    /// Creates a linker. Host natives are looked up through `natives`.
    pub fn new(classes: Arc<ClassTable>, field_access: FieldAccessMode, natives: Arc<dyn NativeResolver>) -> Self {
        Self {
            classes,
            signatures: SignatureTable::new(),
            field_access,
            natives,
            verifier: Verifier::new().with_trace(log::log_enabled!(log::Level::Trace)),
        }
    }

    /// The class table being linked.
    pub fn classes(&self) -> &Arc<ClassTable> {
        &self.classes
    }

    /// Engine-wide signature ids.
    pub fn signatures(&self) -> &SignatureTable {
        &self.signatures
    }

    /// Field access strategy compiled into field instructions.
    pub fn field_access(&self) -> FieldAccessMode {
        self.field_access
    }

    /// Resolves the class's hierarchy links and computes its layout and
    /// virtual table, ancestors first. Returns `None` for an unknown id.
    pub fn prepare(&self, id: ClassId) -> Option<Arc<ClassInfo>> {
        let class = self.classes.get(id)?;
        if class.layout().is_some() && class.vtable().is_some() {
            return Some(class);
        }
        let mut chain = self.classes.ancestry(id);
        chain.reverse();

        let mut field_kinds = Vec::new();
        let mut vtable = FxHashMap::default();
        for ancestor in chain {
            let Some(info) = self.classes.get(ancestor) else {
                continue;
            };
            self.classes.interfaces(ancestor);

            if info.layout().is_none() {
                let mut kinds = field_kinds.clone();
                for field in info.fields.iter().filter(|f| !f.is_static()) {
                    field.assign_slot(kinds.len() as u16);
                    kinds.push(field.kind());
                }
                let size = OBJECT_HEADER_WEIGHT + kinds.iter().map(|k| k.weight()).sum::<usize>();
                info.install_layout(Layout {
                    field_kinds: kinds,
                    size,
                });
            }
            if info.vtable().is_none() {
                let mut table = vtable.clone();
                for method in &info.methods {
                    if method.is_static() || method.is_initializer() || method.flags.is_private() {
                        continue;
                    }
                    table.insert(self.signatures.intern(&method.name, &method.descriptor), method.id);
                }
                if info.install_vtable(table) {
                    log::trace!("prepared {} ({} virtual methods)", info.name, info.vtable().map_or(0, |t| t.len()));
                }
            }

            if let Some(layout) = info.layout() {
                field_kinds = layout.field_kinds.clone();
            }
            if let Some(table) = info.vtable() {
                vtable = table.clone();
            }
        }
        Some(class)
    }

    /// Links the method with this id. See [`Linker::link`].
    pub fn link_method(&self, id: MethodId) -> Result<Arc<LinkedCode>, LinkError> {
        let class = self.classes.method_owner(id).ok_or(LinkError::EmptyCode)?;
        let method = class.method_at(id.index).ok_or(LinkError::EmptyCode)?;
        self.link(&class, method)
    }

    /// Links a bytecode method, at most once.
    ///
    /// The first call decodes and verifies; later calls return the cached
    /// result, success or failure, without touching the load log again.
    /// Native and abstract methods have no code and fail with
    /// [`LinkError::EmptyCode`].
    pub fn link(&self, class: &ClassInfo, method: &Method) -> Result<Arc<LinkedCode>, LinkError> {
        let MethodBody::Bytecode { raw, linked } = &method.body else {
            return Err(LinkError::EmptyCode);
        };
        linked
            .get_or_init(|| {
                self.prepare(class.id);
                let result = Decoder::new(self, class, method, raw)
                    .decode()
                    .and_then(|code| {
                        let depth = self.verifier.verify(&code)?;
                        log::debug!("linked {} ({} instructions, stack {})", method, code.len(), depth);
                        Ok(Arc::new(code))
                    });
                if let Err(err) = &result {
                    self.classes
                        .load_log()
                        .record(Severity::Error, method.to_string(), format!("link failed: {}", err));
                }
                result
            })
            .clone()
    }

    /// Links every bytecode method of a class. Returns the number of methods
    /// that failed.
    pub fn link_all(&self, id: ClassId) -> usize {
        let Some(class) = self.prepare(id) else {
            return 0;
        };
        class
            .methods
            .iter()
            .filter(|m| matches!(m.body, MethodBody::Bytecode { .. }))
            .filter(|m| self.link(&class, m).is_err())
            .count()
    }

    /// Binds a native method, at most once. Engine builtins win over host
    /// natives. Returns `None` for methods that are not native.
    pub fn bind_native(&self, method: &Method) -> Option<NativeBinding> {
        let MethodBody::Native(binding) = &method.body else {
            return None;
        };
        let binding = binding.get_or_init(|| {
            if let Some(builtin) = builtin_native(&method.class_name, &method.name, &method.descriptor) {
                return NativeBinding::Builtin(builtin);
            }
            match self.natives.resolve(&method.class_name, &method.name, &method.descriptor) {
                Some(id) => NativeBinding::Host(id),
                None => {
                    self.classes
                        .load_log()
                        .record(Severity::Warning, method.to_string(), "no native implementation registered");
                    NativeBinding::Unbound
                }
            }
        });
        Some(*binding)
    }
}
