//! Tests for native binding

use std::sync::Arc;

use class_model::{install_core_classes, names, AccessFlags, Builtin, ClassBuilder, ClassTable, NativeBinding};
use core_types::{FieldAccessMode, NativeId, Severity};
use linker::{Linker, NativeResolver, NoHostNatives};

struct OneNative;

impl NativeResolver for OneNative {
    fn resolve(&self, class: &str, name: &str, descriptor: &str) -> Option<NativeId> {
        (class == "app/Host" && name == "ping" && descriptor == "()I").then_some(NativeId(7))
    }
}

fn linker(natives: Arc<dyn NativeResolver>) -> Linker {
    let classes = Arc::new(ClassTable::new());
    install_core_classes(&classes).unwrap();
    let mut host = ClassBuilder::new("app/Host");
    host.native_method("ping", "()I", AccessFlags::STATIC)
        .native_method("pong", "()I", AccessFlags::STATIC);
    classes.register(host.build()).unwrap();
    Linker::new(classes, FieldAccessMode::Generic, natives)
}

#[test]
fn test_builtin_binding() {
    let linker = linker(Arc::new(NoHostNatives));
    let object = linker.classes().by_name(names::OBJECT).unwrap();
    let wait = object.method("wait", "()V").unwrap();
    assert_eq!(
        linker.bind_native(wait),
        Some(NativeBinding::Builtin(Builtin::ObjectWait))
    );
    assert_eq!(wait.native_binding(), Some(NativeBinding::Builtin(Builtin::ObjectWait)));
}

#[test]
fn test_host_binding() {
    let linker = linker(Arc::new(OneNative));
    let host = linker.classes().by_name("app/Host").unwrap();
    assert_eq!(
        linker.bind_native(host.method("ping", "()I").unwrap()),
        Some(NativeBinding::Host(NativeId(7)))
    );
}

#[test]
fn test_unbound_native_is_load_issue() {
    let linker = linker(Arc::new(OneNative));
    let host = linker.classes().by_name("app/Host").unwrap();
    let pong = host.method("pong", "()I").unwrap();
    assert_eq!(linker.bind_native(pong), Some(NativeBinding::Unbound));
    let warnings = linker.classes().load_log().count(Severity::Warning);
    assert!(linker.classes().load_log().mentions("app/Host.pong()I"));

    // bound once
    assert_eq!(linker.bind_native(pong), Some(NativeBinding::Unbound));
    assert_eq!(linker.classes().load_log().count(Severity::Warning), warnings);
}

#[test]
fn test_bytecode_method_has_no_binding() {
    let linker = linker(Arc::new(NoHostNatives));
    let object = linker.classes().by_name(names::OBJECT).unwrap();
    assert_eq!(linker.bind_native(object.method("<init>", "()V").unwrap()), None);
}
