//! Convenience entry points for whole-graph snapshots.
//!
//! [`Pagepack::to_bytes`] / [`Pagepack::from_bytes`] run one complete encode
//! or decode session against an in-memory buffer. [`Pagepack::save`] /
//! [`Pagepack::load`] additionally wrap the stream in the file container
//! (magic, version, compression meta byte) and memory-map the file on the
//! read side.

use crate::compression::{self, Compressor, NoCompression};
use crate::decoder::GraphDecoder;
use crate::encoder::GraphEncoder;
use crate::error::{PagepackError, Result};
use crate::format::{MetaByte, CONTAINER_HEADER_SIZE, FORMAT_VERSION, MAGIC_BYTES};
use crate::registry::ClassRegistry;
use crate::value::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// The main entry point for snapshotting object graphs.
#[derive(Debug)]
pub struct Pagepack;

impl Pagepack {
    /// Encodes one graph to an in-memory byte stream.
    pub fn to_bytes(registry: &Arc<ClassRegistry>, root: &Value) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut encoder = GraphEncoder::new(registry.clone(), &mut buffer);
        encoder.write_object(root)?;
        encoder.close()?;
        Ok(buffer)
    }

    /// Decodes one graph from a byte stream produced by
    /// [`Pagepack::to_bytes`].
    pub fn from_bytes(registry: &Arc<ClassRegistry>, bytes: &[u8]) -> Result<Value> {
        let mut decoder = GraphDecoder::new(registry.clone(), bytes);
        let value = decoder.read_object()?;
        decoder.close();
        Ok(value)
    }

    /// Saves a graph snapshot to a container file without compression.
    pub fn save<P: AsRef<Path>>(
        path: P,
        registry: &Arc<ClassRegistry>,
        root: &Value,
    ) -> Result<()> {
        Self::save_with(path, registry, root, &NoCompression)
    }

    /// Saves a graph snapshot, compressing the payload with the given
    /// algorithm. The algorithm id is recorded in the container header.
    pub fn save_with<P: AsRef<Path>>(
        path: P,
        registry: &Arc<ClassRegistry>,
        root: &Value,
        compressor: &dyn Compressor,
    ) -> Result<()> {
        let payload = Self::to_bytes(registry, root)?;
        let compressed = compressor.compress(&payload)?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&MAGIC_BYTES)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&[MetaByte::new(compressor.id()).as_u8()])?;
        writer.write_all(&compressed)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads a graph snapshot from a container file.
    ///
    /// The file is memory-mapped and validated (magic bytes, version) before
    /// the payload is decompressed and decoded.
    pub fn load<P: AsRef<Path>>(path: P, registry: &Arc<ClassRegistry>) -> Result<Value> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < CONTAINER_HEADER_SIZE as u64 {
            return Err(PagepackError::Protocol("file smaller than header".into()));
        }

        // Safety: mapping assumes no concurrent modification of the file,
        // the standard trade for zero-copy reads.
        #[allow(unsafe_code)]
        let mmap = unsafe { memmap2::Mmap::map(&file)? };

        if mmap[0..4] != MAGIC_BYTES {
            return Err(PagepackError::Protocol("invalid magic bytes".into()));
        }
        let version = u16::from_le_bytes([mmap[4], mmap[5]]);
        if version != FORMAT_VERSION {
            return Err(PagepackError::Protocol(format!(
                "unsupported container version: {version}"
            )));
        }
        let meta = MetaByte::from_byte(mmap[6]);
        let compressor = compression::for_id(meta.compression_method())?;
        let payload = compressor.decompress(&mmap[CONTAINER_HEADER_SIZE..])?;

        Self::from_bytes(registry, &payload)
    }
}
