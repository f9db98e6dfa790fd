//! On-disk snapshot: a binary index image plus a JSON metadata file.
//!
//! Writes go through temp files and rename, so readers never observe a
//! torn image. Vectors are little-endian f32, matching the wire codec
//! used for embedding blobs elsewhere in the system.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use engram_core::EngramResult;

use crate::document::VectorDocument;
use crate::to_vector_err;

const MAGIC: &[u8; 4] = b"EGVX";
const FORMAT_VERSION: u8 = 1;

const INDEX_FILE: &str = "index.bin";
const METADATA_FILE: &str = "metadata.json";

/// Sidecar file carrying dimension, count, and per-id metadata.
#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    version: u8,
    dimension: Option<usize>,
    count: usize,
    metadata: HashMap<String, Map<String, Value>>,
}

/// A loaded snapshot.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub dimension: Option<usize>,
    pub docs: Vec<VectorDocument>,
}

/// Write the snapshot atomically into `dir`.
pub fn write_snapshot(
    dir: &Path,
    dimension: Option<usize>,
    docs: &[VectorDocument],
) -> EngramResult<()> {
    fs::create_dir_all(dir).map_err(|e| to_vector_err(format!("create {}: {e}", dir.display())))?;

    // Binary image first, metadata last: a reader that sees new metadata
    // is guaranteed a matching image.
    let image_tmp = dir.join(format!("{INDEX_FILE}.tmp"));
    let mut image = Vec::with_capacity(16 + docs.len() * 64);
    image.extend_from_slice(MAGIC);
    image.push(FORMAT_VERSION);
    let dim = dimension.unwrap_or(0) as u32;
    image.extend_from_slice(&dim.to_le_bytes());
    image.extend_from_slice(&(docs.len() as u64).to_le_bytes());
    for doc in docs {
        let id_bytes = doc.id.as_bytes();
        image.extend_from_slice(&(id_bytes.len() as u32).to_le_bytes());
        image.extend_from_slice(id_bytes);
        for component in &doc.vector {
            image.extend_from_slice(&component.to_le_bytes());
        }
    }
    write_file(&image_tmp, &image)?;
    fs::rename(&image_tmp, dir.join(INDEX_FILE))
        .map_err(|e| to_vector_err(format!("rename index image: {e}")))?;

    let metadata_tmp = dir.join(format!("{METADATA_FILE}.tmp"));
    let sidecar = MetadataFile {
        version: FORMAT_VERSION,
        dimension,
        count: docs.len(),
        metadata: docs
            .iter()
            .map(|d| (d.id.clone(), d.metadata.clone()))
            .collect(),
    };
    let json = serde_json::to_vec_pretty(&sidecar)
        .map_err(|e| to_vector_err(format!("serialize metadata: {e}")))?;
    write_file(&metadata_tmp, &json)?;
    fs::rename(&metadata_tmp, dir.join(METADATA_FILE))
        .map_err(|e| to_vector_err(format!("rename metadata: {e}")))?;

    Ok(())
}

/// Read a snapshot from `dir`. Missing files yield an empty snapshot;
/// a corrupt metadata or image file is an error.
pub fn read_snapshot(dir: &Path) -> EngramResult<Snapshot> {
    let image_path = dir.join(INDEX_FILE);
    let metadata_path = dir.join(METADATA_FILE);
    if !image_path.exists() || !metadata_path.exists() {
        return Ok(Snapshot::default());
    }

    let metadata_bytes = fs::read(&metadata_path)
        .map_err(|e| to_vector_err(format!("read metadata: {e}")))?;
    let sidecar: MetadataFile = serde_json::from_slice(&metadata_bytes)
        .map_err(|e| to_vector_err(format!("corrupt metadata file: {e}")))?;

    let image = fs::read(&image_path).map_err(|e| to_vector_err(format!("read image: {e}")))?;
    let mut cursor = &image[..];

    let mut magic = [0u8; 4];
    read_exact(&mut cursor, &mut magic)?;
    if &magic != MAGIC {
        return Err(to_vector_err("corrupt index image: bad magic"));
    }
    let mut version = [0u8; 1];
    read_exact(&mut cursor, &mut version)?;
    if version[0] != FORMAT_VERSION {
        return Err(to_vector_err(format!(
            "unsupported index image version {}",
            version[0]
        )));
    }

    let mut dim_bytes = [0u8; 4];
    read_exact(&mut cursor, &mut dim_bytes)?;
    let dim = u32::from_le_bytes(dim_bytes) as usize;

    let mut count_bytes = [0u8; 8];
    read_exact(&mut cursor, &mut count_bytes)?;
    let count = u64::from_le_bytes(count_bytes) as usize;
    if count != sidecar.count {
        return Err(to_vector_err(format!(
            "image/metadata count mismatch: {count} vs {}",
            sidecar.count
        )));
    }

    let mut docs = Vec::with_capacity(count);
    let mut metadata = sidecar.metadata;
    for _ in 0..count {
        let mut len_bytes = [0u8; 4];
        read_exact(&mut cursor, &mut len_bytes)?;
        let id_len = u32::from_le_bytes(len_bytes) as usize;

        let mut id_bytes = vec![0u8; id_len];
        read_exact(&mut cursor, &mut id_bytes)?;
        let id = String::from_utf8(id_bytes)
            .map_err(|e| to_vector_err(format!("corrupt index image: bad id: {e}")))?;

        let mut vector = Vec::with_capacity(dim);
        let mut component = [0u8; 4];
        for _ in 0..dim {
            read_exact(&mut cursor, &mut component)?;
            vector.push(f32::from_le_bytes(component));
        }

        let doc_metadata = metadata.remove(&id).unwrap_or_default();
        docs.push(VectorDocument {
            id,
            vector,
            metadata: doc_metadata,
        });
    }

    Ok(Snapshot {
        dimension: sidecar.dimension,
        docs,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> EngramResult<()> {
    let mut file =
        fs::File::create(path).map_err(|e| to_vector_err(format!("create {}: {e}", path.display())))?;
    file.write_all(bytes)
        .map_err(|e| to_vector_err(format!("write {}: {e}", path.display())))?;
    file.sync_all()
        .map_err(|e| to_vector_err(format!("sync {}: {e}", path.display())))?;
    Ok(())
}

fn read_exact(cursor: &mut &[u8], buf: &mut [u8]) -> EngramResult<()> {
    Read::read_exact(cursor, buf).map_err(|_| to_vector_err("corrupt index image: truncated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, vector: Vec<f32>) -> VectorDocument {
        let mut metadata = Map::new();
        metadata.insert("id".to_string(), json!(id));
        VectorDocument {
            id: id.to_string(),
            vector,
            metadata,
        }
    }

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![doc("a", vec![1.0, 2.0]), doc("b", vec![3.0, 4.0])];
        write_snapshot(dir.path(), Some(2), &docs).unwrap();

        let snapshot = read_snapshot(dir.path()).unwrap();
        assert_eq!(snapshot.dimension, Some(2));
        assert_eq!(snapshot.docs.len(), 2);
        let a = snapshot.docs.iter().find(|d| d.id == "a").unwrap();
        assert_eq!(a.vector, vec![1.0, 2.0]);
        assert_eq!(a.metadata.get("id"), Some(&json!("a")));
    }

    #[test]
    fn missing_files_yield_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = read_snapshot(dir.path()).unwrap();
        assert!(snapshot.docs.is_empty());
        assert_eq!(snapshot.dimension, None);
    }

    #[test]
    fn corrupt_metadata_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), Some(1), &[doc("a", vec![1.0])]).unwrap();
        fs::write(dir.path().join(METADATA_FILE), b"{not json").unwrap();
        assert!(read_snapshot(dir.path()).is_err());
    }

    #[test]
    fn truncated_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), Some(4), &[doc("a", vec![1.0, 2.0, 3.0, 4.0])]).unwrap();
        let image = fs::read(dir.path().join(INDEX_FILE)).unwrap();
        fs::write(dir.path().join(INDEX_FILE), &image[..image.len() - 5]).unwrap();
        assert!(read_snapshot(dir.path()).is_err());
    }
}
