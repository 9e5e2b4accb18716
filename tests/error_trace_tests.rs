#![allow(missing_docs)]

use pagepack::decoder::GraphDecoder;
use pagepack::encoder::GraphEncoder;
use pagepack::{ClassId, ClassRegistry, Pagepack, PagepackError, PagepackObject, Value};
use std::any::Any;

/// Fails on write, unconditionally.
#[derive(Default)]
struct Bomb;

impl pagepack::Persist for Bomb {
    fn default_write(&self, _enc: &mut GraphEncoder<'_>) -> pagepack::Result<()> {
        Ok(())
    }

    fn default_read(&mut self, _dec: &mut GraphDecoder<'_>) -> pagepack::Result<()> {
        Ok(())
    }

    fn custom_write(&self, _enc: &mut GraphEncoder<'_>) -> pagepack::Result<bool> {
        Err(PagepackError::serialization("state is not serializable"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default, PagepackObject)]
struct Holder {
    inner: Value,
}

// --- TESTS ---

/// A failure three levels deep reports the containment path, innermost
/// frame first.
#[test]
fn test_trace_lists_containment_path() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Bomb>("Bomb")?;
    registry.register::<Holder>("Holder")?;

    let root = Value::object(Holder {
        inner: Value::object(Holder {
            inner: Value::object(Bomb),
        }),
    });

    let err = Pagepack::to_bytes(&registry, &root).expect_err("must fail");
    match err {
        PagepackError::Serialization { message, trace } => {
            assert_eq!(message, "state is not serializable");
            assert_eq!(trace, vec!["Bomb", "Holder", "Holder"]);
        }
        other => panic!("expected a serialization error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_trace_display_format() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Bomb>("Bomb")?;
    registry.register::<Holder>("Holder")?;

    let root = Value::object(Holder {
        inner: Value::object(Bomb),
    });

    let err = Pagepack::to_bytes(&registry, &root).expect_err("must fail");
    assert_eq!(
        err.to_string(),
        "Serialization Error: state is not serializable [while processing Bomb -> Holder]"
    );
    Ok(())
}

/// Array frames record the component name and length.
#[test]
fn test_trace_includes_array_frame() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Bomb>("Bomb")?;

    let root = Value::array(ClassId::OBJECT, vec![Value::object(Bomb)]);
    let err = Pagepack::to_bytes(&registry, &root).expect_err("must fail");
    match err {
        PagepackError::Serialization { trace, .. } => {
            assert_eq!(trace, vec!["Bomb", "object[1]"]);
        }
        other => panic!("expected a serialization error, got {other:?}"),
    }
    Ok(())
}

/// I/O failures pass through undecorated: no frames, original shape.
#[test]
fn test_io_error_passes_through() -> pagepack::Result<()> {
    struct FailingSink;
    impl std::io::Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let registry = ClassRegistry::new();
    registry.register::<Holder>("Holder")?;
    let mut sink = FailingSink;
    let mut encoder = GraphEncoder::new(registry, &mut sink);
    let root = Value::object(Holder { inner: Value::Null });

    let err = encoder.write_object(&root).expect_err("must fail");
    match err {
        PagepackError::Io(e) => assert_eq!(e.to_string(), "disk gone"),
        other => panic!("expected an I/O error, got {other:?}"),
    }
    Ok(())
}

/// A corrupted stream surfaces as a protocol error on decode.
#[test]
fn test_corrupt_stream_is_protocol_error() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Holder>("Holder")?;
    let root = Value::object(Holder { inner: Value::Null });
    let mut bytes = Pagepack::to_bytes(&registry, &root)?;

    // Unknown tag byte.
    bytes[0] = 0xEE;
    let err = Pagepack::from_bytes(&registry, &bytes).expect_err("must fail");
    assert!(matches!(err, PagepackError::Protocol(_)));
    Ok(())
}

/// A back-reference to a handle that was never registered is rejected.
#[test]
fn test_dangling_handle_rejected() {
    let registry = ClassRegistry::new();
    // HANDLE tag referring to handle 9 in an empty session.
    let bytes = [1u8, 9, 0];
    let err = Pagepack::from_bytes(&registry, &bytes).expect_err("must fail");
    assert!(matches!(err, PagepackError::Protocol(_)));
}

/// Truncated input is rejected rather than read out of bounds.
#[test]
fn test_truncated_stream_rejected() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    let root = Value::from((0..100).collect::<Vec<i32>>());
    let bytes = Pagepack::to_bytes(&registry, &root)?;

    let err = Pagepack::from_bytes(&registry, &bytes[..bytes.len() / 2]).expect_err("must fail");
    assert!(matches!(err, PagepackError::Protocol(_)));
    Ok(())
}
