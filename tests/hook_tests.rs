#![allow(missing_docs)]

use pagepack::decoder::GraphDecoder;
use pagepack::encoder::GraphEncoder;
use pagepack::{ClassRegistry, Pagepack, PagepackObject, Value};
use std::any::Any;

/// Serializes as a lightweight string proxy instead of its fields.
#[derive(Default)]
struct Heavy {
    payload: String,
}

impl pagepack::Persist for Heavy {
    fn default_write(&self, enc: &mut GraphEncoder<'_>) -> pagepack::Result<()> {
        enc.write_utf(&self.payload)
    }

    fn default_read(&mut self, dec: &mut GraphDecoder<'_>) -> pagepack::Result<()> {
        self.payload = dec.read_utf()?;
        Ok(())
    }

    fn replace_for_write(&self) -> Option<Value> {
        Some(Value::string(format!("proxy:{}", self.payload)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Resolves to a string token after its fields are populated.
#[derive(Default)]
struct Frozen {
    n: i32,
}

impl pagepack::Persist for Frozen {
    fn default_write(&self, enc: &mut GraphEncoder<'_>) -> pagepack::Result<()> {
        enc.write_i32(self.n)
    }

    fn default_read(&mut self, dec: &mut GraphDecoder<'_>) -> pagepack::Result<()> {
        self.n = dec.read_i32()?;
        Ok(())
    }

    fn resolve_after_read(&self) -> Option<Value> {
        Some(Value::string(format!("thawed:{}", self.n)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default, PagepackObject)]
struct Pair {
    left: Value,
    right: Value,
}

// --- TESTS ---

/// The write-replace hook substitutes the proxy on the wire; the decoder
/// sees the proxy, not the original.
#[test]
fn test_write_replace_substitutes_proxy() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Heavy>("Heavy")?;

    let root = Value::object(Heavy {
        payload: "big".to_string(),
    });
    let bytes = Pagepack::to_bytes(&registry, &root)?;
    let decoded = Pagepack::from_bytes(&registry, &bytes)?;

    assert_eq!(decoded.as_str(), Some("proxy:big"));
    Ok(())
}

/// The original instance keeps the handle assigned before replacement, so
/// a second encounter still collapses to one stream object.
#[test]
fn test_replaced_original_keeps_handle() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Heavy>("Heavy")?;
    registry.register::<Pair>("Pair")?;

    let heavy = Value::object(Heavy {
        payload: "shared".to_string(),
    });
    let root = Value::object(Pair {
        left: heavy.clone(),
        right: heavy,
    });

    let bytes = Pagepack::to_bytes(&registry, &root)?;
    let decoded = Pagepack::from_bytes(&registry, &bytes)?;

    let obj = decoded.as_object().expect("object root").borrow();
    let pair = obj.as_any().downcast_ref::<Pair>().expect("Pair");
    assert_eq!(pair.left.as_str(), Some("proxy:shared"));
    assert!(pair.left.ptr_eq(&pair.right));
    Ok(())
}

/// The read-resolve hook runs after fields are populated and substitutes
/// the returned value for the decoded instance.
#[test]
fn test_read_resolve_substitutes_value() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Frozen>("Frozen")?;

    let root = Value::object(Frozen { n: 5 });
    let bytes = Pagepack::to_bytes(&registry, &root)?;
    let decoded = Pagepack::from_bytes(&registry, &bytes)?;

    assert_eq!(decoded.as_str(), Some("thawed:5"));
    Ok(())
}

/// The resolved value also takes over the handle slot: back-references to
/// the original resolve to the substitute.
#[test]
fn test_read_resolve_replaces_handle_slot() -> pagepack::Result<()> {
    let registry = ClassRegistry::new();
    registry.register::<Frozen>("Frozen")?;
    registry.register::<Pair>("Pair")?;

    let frozen = Value::object(Frozen { n: 9 });
    let root = Value::object(Pair {
        left: frozen.clone(),
        right: frozen,
    });

    let bytes = Pagepack::to_bytes(&registry, &root)?;
    let decoded = Pagepack::from_bytes(&registry, &bytes)?;

    let obj = decoded.as_object().expect("object root").borrow();
    let pair = obj.as_any().downcast_ref::<Pair>().expect("Pair");
    assert_eq!(pair.left.as_str(), Some("thawed:9"));
    assert!(pair.left.ptr_eq(&pair.right));
    Ok(())
}

/// A custom writer asking for the default fields twice gets them once.
#[test]
fn test_default_write_is_idempotent_per_object() -> pagepack::Result<()> {
    #[derive(Default)]
    struct Once {
        n: i32,
    }
    impl pagepack::Persist for Once {
        fn default_write(&self, enc: &mut GraphEncoder<'_>) -> pagepack::Result<()> {
            enc.write_i32(self.n)
        }
        fn default_read(&mut self, dec: &mut GraphDecoder<'_>) -> pagepack::Result<()> {
            self.n = dec.read_i32()?;
            Ok(())
        }
        fn custom_write(&self, enc: &mut GraphEncoder<'_>) -> pagepack::Result<bool> {
            enc.default_write_object(self)?;
            enc.default_write_object(self)?;
            Ok(true)
        }
        fn custom_read(&mut self, dec: &mut GraphDecoder<'_>) -> pagepack::Result<bool> {
            dec.default_read_object(self)?;
            dec.default_read_object(self)?;
            Ok(true)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    let registry = ClassRegistry::new();
    registry.register::<Once>("Once")?;

    let root = Value::object(Once { n: 77 });
    let bytes = Pagepack::to_bytes(&registry, &root)?;
    // ClassDef tag + u16 class id + exactly one i32 field pass.
    assert_eq!(bytes.len(), 1 + 2 + 4);

    let decoded = Pagepack::from_bytes(&registry, &bytes)?;
    let obj = decoded.as_object().expect("object root").borrow();
    let once = obj.as_any().downcast_ref::<Once>().expect("Once");
    assert_eq!(once.n, 77);
    Ok(())
}
