//! Tests for class preparation: layouts and virtual tables

use std::sync::Arc;

use bytecode_system::RawCode;
use class_model::{install_core_classes, names, AccessFlags, ClassBuilder, ClassTable};
use core_types::{FieldAccessMode, ValueKind, OBJECT_HEADER_WEIGHT};
use linker::{Linker, NoHostNatives};

fn linker() -> Linker {
    let classes = Arc::new(ClassTable::new());
    install_core_classes(&classes).unwrap();
    Linker::new(classes, FieldAccessMode::Generic, Arc::new(NoHostNatives))
}

fn returns_zero() -> RawCode {
    RawCode::new(1, 1, vec![0x03, 0xac])
}

#[test]
fn test_layout_appends_subclass_fields() {
    let linker = linker();
    let mut base = ClassBuilder::new("app/Base");
    base.field("count", "I", AccessFlags::PRIVATE)
        .field("total", "J", AccessFlags::PRIVATE)
        .field("instances", "I", AccessFlags::STATIC);
    linker.classes().register(base.build()).unwrap();
    let mut derived = ClassBuilder::new("app/Derived");
    derived.extends("app/Base").field("flag", "B", AccessFlags::PUBLIC);
    let derived = linker.classes().register(derived.build()).unwrap();

    let class = linker.prepare(derived).unwrap();
    let layout = class.layout().unwrap();
    assert_eq!(
        layout.field_kinds,
        vec![ValueKind::Int, ValueKind::Long, ValueKind::Byte]
    );
    assert_eq!(layout.size, OBJECT_HEADER_WEIGHT + 4 + 8 + 1);
    assert_eq!(class.fields[0].slot(), Some(2));

    let base = linker.classes().by_name("app/Base").unwrap();
    assert_eq!(base.size(), Some(OBJECT_HEADER_WEIGHT + 12));
    assert_eq!(base.field("total", "J").unwrap().slot(), Some(1));
    // static slots are numbered separately
    assert_eq!(base.field("instances", "I").unwrap().slot(), Some(0));
}

#[test]
fn test_object_has_header_only() {
    let linker = linker();
    let object = linker.classes().lookup(names::OBJECT).unwrap();
    assert_eq!(linker.prepare(object).unwrap().size(), Some(OBJECT_HEADER_WEIGHT));
}

#[test]
fn test_vtable_inherits_and_overrides() {
    let linker = linker();
    let mut base = ClassBuilder::new("app/Animal");
    base.method("legs", "()I", AccessFlags::PUBLIC, returns_zero())
        .method("name", "()I", AccessFlags::PUBLIC, returns_zero())
        .method("secret", "()I", AccessFlags::PRIVATE, returns_zero())
        .method("create", "()I", AccessFlags::STATIC, returns_zero());
    let animal = linker.classes().register(base.build()).unwrap();
    let mut bird = ClassBuilder::new("app/Bird");
    bird.extends("app/Animal")
        .method("legs", "()I", AccessFlags::PUBLIC, returns_zero());
    let bird = linker.classes().register(bird.build()).unwrap();

    let class = linker.prepare(bird).unwrap();
    let signatures = linker.signatures();
    let legs = signatures.get("legs", "()I").unwrap();
    let name = signatures.get("name", "()I").unwrap();

    assert_eq!(class.dispatch(legs).unwrap().class, bird);
    assert_eq!(class.dispatch(name).unwrap().class, animal);
    assert!(signatures.get("secret", "()I").is_none());
    assert!(signatures.get("create", "()I").is_none());

    let hash_code = signatures.get("hashCode", "()I").unwrap();
    let object = linker.classes().lookup(names::OBJECT).unwrap();
    assert_eq!(class.dispatch(hash_code).unwrap().class, object);
}

#[test]
fn test_signature_ids_shared_across_classes() {
    let linker = linker();
    let mut a = ClassBuilder::new("app/A");
    a.method("size", "()I", AccessFlags::PUBLIC, returns_zero());
    let a = linker.classes().register(a.build()).unwrap();
    let mut b = ClassBuilder::new("app/B");
    b.method("size", "()I", AccessFlags::PUBLIC, returns_zero());
    let b = linker.classes().register(b.build()).unwrap();

    let a = linker.prepare(a).unwrap();
    let b = linker.prepare(b).unwrap();
    let size = linker.signatures().get("size", "()I").unwrap();
    assert_eq!(a.dispatch(size).unwrap().class, a.id);
    assert_eq!(b.dispatch(size).unwrap().class, b.id);
}

#[test]
fn test_prepare_is_stable() {
    let linker = linker();
    let mut point = ClassBuilder::new("app/Point");
    point.field("x", "I", AccessFlags::PUBLIC);
    let point = linker.classes().register(point.build()).unwrap();

    let first = linker.prepare(point).unwrap();
    let size = first.size();
    let second = linker.prepare(point).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.size(), size);
    assert!(linker.prepare(core_types::ClassId(9999)).is_none());
}
