#![allow(missing_docs)]

use pagepack::{ClassRegistry, Pagepack, PagepackObject, Value};

#[derive(Default, PagepackObject)]
struct Mixed {
    flag: bool,
    byte: i8,
    short: i16,
    letter: char,
    int: i32,
    long: i64,
    float: f32,
    double: f64,
    text: String,
    child: Value,
}

#[derive(Default, PagepackObject)]
struct Cached {
    id: i64,
    #[pagepack(skip)]
    scratch: i32,
}

#[derive(Default, PagepackObject)]
struct Marker;

// --- TESTS ---

/// The derive enumerates every supported field kind symmetrically.
#[test]
fn test_derive_all_field_kinds() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Mixed>("Mixed")?;

    let root = Value::object(Mixed {
        flag: true,
        byte: -8,
        short: -1600,
        letter: 'ß',
        int: 123_456,
        long: -1,
        float: 2.5,
        double: -0.0625,
        text: "déjà vu".to_string(),
        child: Value::string("nested"),
    });

    let bytes = Pagepack::to_bytes(&registry, &root)?;
    let decoded = Pagepack::from_bytes(&registry, &bytes)?;

    let obj = decoded.as_object().expect("object root").borrow();
    let mixed = obj.as_any().downcast_ref::<Mixed>().expect("Mixed");
    assert!(mixed.flag);
    assert_eq!(mixed.byte, -8);
    assert_eq!(mixed.short, -1600);
    assert_eq!(mixed.letter, 'ß');
    assert_eq!(mixed.int, 123_456);
    assert_eq!(mixed.long, -1);
    assert_eq!(mixed.float, 2.5);
    assert_eq!(mixed.double, -0.0625);
    assert_eq!(mixed.text, "déjà vu");
    assert_eq!(mixed.child.as_str(), Some("nested"));
    Ok(())
}

/// `#[pagepack(skip)]` fields are absent from the stream and come back as
/// their default.
#[test]
fn test_skip_attribute() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Cached>("Cached")?;

    let root = Value::object(Cached {
        id: 42,
        scratch: 999,
    });

    let bytes = Pagepack::to_bytes(&registry, &root)?;
    // ClassDef tag + u16 class id + i64 only; the skipped i32 is not written.
    assert_eq!(bytes.len(), 1 + 2 + 8);

    let decoded = Pagepack::from_bytes(&registry, &bytes)?;
    let obj = decoded.as_object().expect("object root").borrow();
    let cached = obj.as_any().downcast_ref::<Cached>().expect("Cached");
    assert_eq!(cached.id, 42);
    assert_eq!(cached.scratch, 0);
    Ok(())
}

/// Unit structs derive to an empty (but valid) stream body.
#[test]
fn test_unit_struct() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Marker>("Marker")?;

    let root = Value::object(Marker);
    let bytes = Pagepack::to_bytes(&registry, &root)?;
    assert_eq!(bytes.len(), 1 + 2);

    let decoded = Pagepack::from_bytes(&registry, &bytes)?;
    let obj = decoded.as_object().expect("object root").borrow();
    assert!(obj.as_any().downcast_ref::<Marker>().is_some());
    Ok(())
}
