//! Parser for the chunked binary mesh format.
//!
//! A file is a small header followed by `num_chunks` self-describing chunks.
//! Chunk sizes are self-reported and the cursor always advances by the
//! declared size, so unknown chunk types are skipped rather than rejected.
//! All multi-byte fields are little-endian. Parsing never reinterprets raw
//! memory: every declared length is validated against the remaining bytes
//! before the range is read.

use thiserror::Error;

pub const MESH_MAGIC: u32 = u32::from_le_bytes(*b"SB6M");

const CHUNK_VERTEX_ATTRIBS: u32 = u32::from_le_bytes(*b"ATRB");
const CHUNK_VERTEX_DATA: u32 = u32::from_le_bytes(*b"VRTX");
const CHUNK_INDEX_DATA: u32 = u32::from_le_bytes(*b"INDX");
const CHUNK_SUB_OBJECT_LIST: u32 = u32::from_le_bytes(*b"OLST");
const CHUNK_DATA: u32 = u32::from_le_bytes(*b"DATA");

/// Component type codes stored in the file.
pub const COMPONENT_U8: u32 = 0x1401;
pub const COMPONENT_U16: u32 = 0x1403;
pub const COMPONENT_F32: u32 = 0x1406;

const ATTRIB_NAME_LEN: usize = 64;
const ATTRIB_FLAG_NORMALIZED: u32 = 1;

pub const MAX_SUB_OBJECTS: usize = 256;

#[derive(Debug, Error)]
pub enum MeshFileError {
    #[error("need {needed} bytes at offset {offset}, file has {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("bad magic {0:#010x}")]
    BadMagic(u32),
    #[error("chunk at offset {offset} declares invalid size {size}")]
    BadChunkSize { offset: usize, size: u32 },
    #[error("unsupported vertex component type {0:#06x}")]
    UnsupportedComponentType(u32),
    #[error("unsupported index type {0:#06x}")]
    UnsupportedIndexType(u32),
    #[error("file contains no vertex or raw data chunk")]
    NoGeometryData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    U8,
    U16,
    F32,
}

impl ComponentType {
    fn from_code(code: u32) -> Result<Self, MeshFileError> {
        match code {
            COMPONENT_U8 => Ok(Self::U8),
            COMPONENT_U16 => Ok(Self::U16),
            COMPONENT_F32 => Ok(Self::F32),
            other => Err(MeshFileError::UnsupportedComponentType(other)),
        }
    }

    pub fn byte_size(self) -> u32 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

/// One vertex attribute declaration. Slots are assigned sequentially from 0
/// in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub component_count: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub stride: u32,
    /// Byte offset of this attribute's data within the combined buffer.
    pub data_offset: u32,
}

impl AttributeDecl {
    /// A stride of zero means tightly packed.
    pub fn effective_stride(&self) -> u32 {
        if self.stride != 0 {
            self.stride
        } else {
            self.component_count * self.component_type.byte_size()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U8,
    U16,
}

impl IndexType {
    fn from_code(code: u32) -> Result<Self, MeshFileError> {
        match code {
            COMPONENT_U16 => Ok(Self::U16),
            COMPONENT_U8 => Ok(Self::U8),
            other => Err(MeshFileError::UnsupportedIndexType(other)),
        }
    }

    pub fn element_size(self) -> u32 {
        match self {
            Self::U16 => 2,
            Self::U8 => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexInfo {
    pub ty: IndexType,
    pub count: u32,
    /// Byte offset of the index region within the combined buffer.
    pub byte_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubObject {
    pub first: u32,
    pub count: u32,
}

/// The fully resolved contents of a mesh file, ready for GPU upload.
#[derive(Debug)]
pub struct MeshFile {
    /// Vertex bytes followed by index bytes, a single allocation.
    pub buffer: Vec<u8>,
    pub attributes: Vec<AttributeDecl>,
    pub index: Option<IndexInfo>,
    /// Draw ranges in file order; always between 1 and 256 entries.
    pub sub_objects: Vec<SubObject>,
    pub total_vertices: u32,
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], MeshFileError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(MeshFileError::OutOfBounds {
                offset: self.offset,
                needed: len,
                len: self.bytes.len(),
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, MeshFileError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn seek(&mut self, offset: usize) -> Result<(), MeshFileError> {
        if offset > self.bytes.len() {
            return Err(MeshFileError::OutOfBounds {
                offset,
                needed: 0,
                len: self.bytes.len(),
            });
        }
        self.offset = offset;
        Ok(())
    }
}

// Raw chunk payloads collected during the chunk walk. At most one of each
// kind is kept; a repeated chunk type overwrites the earlier one.
#[derive(Default)]
struct Chunks<'a> {
    vertex_attribs: Option<&'a [u8]>,
    vertex_data: Option<VertexDataChunk>,
    index_data: Option<IndexDataChunk>,
    sub_object_list: Option<&'a [u8]>,
    data: Option<DataChunk>,
}

struct VertexDataChunk {
    data_size: u32,
    data_offset: u32,
    total_vertices: u32,
}

struct IndexDataChunk {
    index_type: u32,
    index_count: u32,
    index_data_offset: u32,
}

struct DataChunk {
    data_length: u32,
    /// Relative to the start of the owning chunk.
    data_offset: u32,
    chunk_start: usize,
}

impl MeshFile {
    pub fn parse(bytes: &[u8]) -> Result<MeshFile, MeshFileError> {
        let mut reader = Reader::new(bytes);

        let magic = reader.read_u32()?;
        if magic != MESH_MAGIC {
            return Err(MeshFileError::BadMagic(magic));
        }
        // The header size is self-reported; skip by it, never by a struct
        // size, so extended headers keep parsing.
        let header_size = reader.read_u32()?;
        let num_chunks = reader.read_u32()?;
        let _flags = reader.read_u32()?;
        reader.seek(header_size as usize)?;

        let chunks = walk_chunks(&mut reader, num_chunks)?;

        let attributes = match chunks.vertex_attribs {
            Some(payload) => parse_attributes(payload)?,
            None => Vec::new(),
        };

        let index = match &chunks.index_data {
            Some(chunk) => Some((
                IndexType::from_code(chunk.index_type)?,
                chunk.index_count,
                chunk.index_data_offset,
            )),
            None => None,
        };

        // Resolve the combined buffer: either the raw data blob verbatim, or
        // vertex bytes at offset 0 with index bytes packed immediately after.
        let (buffer, index) = if let Some(data) = &chunks.data {
            let start = data
                .chunk_start
                .checked_add(data.data_offset as usize)
                .ok_or(MeshFileError::OutOfBounds {
                    offset: data.chunk_start,
                    needed: data.data_offset as usize,
                    len: bytes.len(),
                })?;
            let mut blob = Reader::new(bytes);
            blob.seek(start)?;
            let buffer = blob.take(data.data_length as usize)?.to_vec();
            let index = index.map(|(ty, count, byte_offset)| IndexInfo {
                ty,
                count,
                byte_offset,
            });
            (buffer, index)
        } else {
            if chunks.vertex_data.is_none() && chunks.index_data.is_none() {
                return Err(MeshFileError::NoGeometryData);
            }

            let vertex_size = chunks
                .vertex_data
                .as_ref()
                .map(|v| v.data_size)
                .unwrap_or(0);
            let index_size = index
                .map(|(ty, count, _)| count * ty.element_size())
                .unwrap_or(0);

            let mut buffer = Vec::with_capacity((vertex_size + index_size) as usize);
            if let Some(vertex) = &chunks.vertex_data {
                let mut src = Reader::new(bytes);
                src.seek(vertex.data_offset as usize)?;
                buffer.extend_from_slice(src.take(vertex.data_size as usize)?);
            }
            let index = match (index, &chunks.index_data) {
                (Some((ty, count, _)), Some(chunk)) => {
                    let byte_offset = buffer.len() as u32;
                    let mut src = Reader::new(bytes);
                    src.seek(chunk.index_data_offset as usize)?;
                    buffer.extend_from_slice(src.take(index_size as usize)?);
                    Some(IndexInfo {
                        ty,
                        count,
                        byte_offset,
                    })
                }
                _ => None,
            };
            (buffer, index)
        };

        let total_vertices = chunks
            .vertex_data
            .as_ref()
            .map(|v| v.total_vertices)
            .unwrap_or(0);

        let mut sub_objects = match chunks.sub_object_list {
            Some(payload) => parse_sub_objects(payload)?,
            None => Vec::new(),
        };
        if sub_objects.is_empty() {
            // No list in the file: exactly one range spanning everything.
            let count = match index {
                Some(info) => info.count,
                None => total_vertices,
            };
            sub_objects.push(SubObject { first: 0, count });
        }

        Ok(MeshFile {
            buffer,
            attributes,
            index,
            sub_objects,
            total_vertices,
        })
    }
}

fn walk_chunks<'a>(
    reader: &mut Reader<'a>,
    num_chunks: u32,
) -> Result<Chunks<'a>, MeshFileError> {
    let mut chunks = Chunks::default();

    for _ in 0..num_chunks {
        let chunk_start = reader.offset;
        let chunk_type = reader.read_u32()?;
        let chunk_size = reader.read_u32()?;
        if chunk_size < 8 {
            return Err(MeshFileError::BadChunkSize {
                offset: chunk_start,
                size: chunk_size,
            });
        }

        reader.seek(chunk_start)?;
        let chunk = reader.take(chunk_size as usize)?;
        let payload = &chunk[8..];

        match chunk_type {
            CHUNK_VERTEX_ATTRIBS => chunks.vertex_attribs = Some(payload),
            CHUNK_VERTEX_DATA => {
                let mut p = Reader::new(payload);
                chunks.vertex_data = Some(VertexDataChunk {
                    data_size: p.read_u32()?,
                    data_offset: p.read_u32()?,
                    total_vertices: p.read_u32()?,
                });
            }
            CHUNK_INDEX_DATA => {
                let mut p = Reader::new(payload);
                chunks.index_data = Some(IndexDataChunk {
                    index_type: p.read_u32()?,
                    index_count: p.read_u32()?,
                    index_data_offset: p.read_u32()?,
                });
            }
            CHUNK_SUB_OBJECT_LIST => chunks.sub_object_list = Some(payload),
            CHUNK_DATA => {
                let mut p = Reader::new(payload);
                chunks.data = Some(DataChunk {
                    data_length: p.read_u32()?,
                    data_offset: p.read_u32()?,
                    chunk_start,
                });
            }
            // Unknown chunk type: already advanced by its declared size.
            _ => {}
        }

        debug_assert_eq!(reader.offset, chunk_start + chunk_size as usize);
    }

    Ok(chunks)
}

fn parse_attributes(payload: &[u8]) -> Result<Vec<AttributeDecl>, MeshFileError> {
    let mut p = Reader::new(payload);
    let count = p.read_u32()?;

    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        // The name field is fixed-width and only informational.
        p.take(ATTRIB_NAME_LEN)?;
        let component_count = p.read_u32()?;
        let type_code = p.read_u32()?;
        let stride = p.read_u32()?;
        let flags = p.read_u32()?;
        let data_offset = p.read_u32()?;

        attributes.push(AttributeDecl {
            component_count,
            component_type: ComponentType::from_code(type_code)?,
            normalized: flags & ATTRIB_FLAG_NORMALIZED != 0,
            stride,
            data_offset,
        });
    }

    Ok(attributes)
}

fn parse_sub_objects(payload: &[u8]) -> Result<Vec<SubObject>, MeshFileError> {
    let mut p = Reader::new(payload);
    let declared = p.read_u32()? as usize;

    // Bounded container: entries past the cap are silently dropped, never
    // reallocated and never an error.
    let kept = declared.min(MAX_SUB_OBJECTS);
    if declared > kept {
        log::warn!("sub-object list declares {declared} entries, keeping the first {kept}");
    }

    let mut sub_objects = Vec::with_capacity(kept);
    for _ in 0..kept {
        let first = p.read_u32()?;
        let count = p.read_u32()?;
        sub_objects.push(SubObject { first, count });
    }

    Ok(sub_objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER_SIZE: u32 = 16;

    fn header(num_chunks: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MESH_MAGIC.to_le_bytes());
        out.extend_from_slice(&HEADER_SIZE.to_le_bytes());
        out.extend_from_slice(&num_chunks.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }

    fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(tag);
        out.extend_from_slice(&((payload.len() + 8) as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn u32s(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn vertex_bytes() -> Vec<u8> {
        // 10 vertices, one f32 each (stride 4): 40 bytes.
        (0..10u32).flat_map(|i| (i as f32).to_le_bytes()).collect()
    }

    fn index_bytes() -> Vec<u8> {
        // 6 u16 indices: 12 bytes.
        [0u16, 1, 2, 2, 1, 3]
            .iter()
            .flat_map(|i| i.to_le_bytes())
            .collect()
    }

    /// Header + VRTX + INDX chunks followed by the raw data regions.
    fn split_layout_file() -> Vec<u8> {
        let vertices = vertex_bytes();
        let indices = index_bytes();

        // header(16) + vrtx chunk(20) + indx chunk(20)
        let vertex_offset = 16 + 20 + 20u32;
        let index_offset = vertex_offset + vertices.len() as u32;

        let mut file = header(2);
        file.extend(chunk(
            b"VRTX",
            &u32s(&[vertices.len() as u32, vertex_offset, 10]),
        ));
        file.extend(chunk(b"INDX", &u32s(&[COMPONENT_U16, 6, index_offset])));
        file.extend(vertices);
        file.extend(indices);
        file
    }

    /// The same mesh expressed with one combined DATA blob.
    fn combined_layout_file() -> Vec<u8> {
        let mut blob = vertex_bytes();
        blob.extend(index_bytes());

        let mut data_payload = u32s(&[blob.len() as u32, 16]);
        data_payload.extend(&blob);

        let mut file = header(2);
        // Index offset here addresses the combined buffer directly.
        file.extend(chunk(b"INDX", &u32s(&[COMPONENT_U16, 6, 40])));
        file.extend(chunk(b"DATA", &data_payload));
        file
    }

    #[test]
    fn split_layout_resolves_vertex_then_index_bytes() {
        let mesh = MeshFile::parse(&split_layout_file()).unwrap();

        assert!(mesh.buffer.len() >= 40 + 12);
        let index = mesh.index.unwrap();
        assert_eq!(index.ty, IndexType::U16);
        assert_eq!(index.count, 6);
        assert_eq!(index.byte_offset, 40);
        assert_eq!(mesh.sub_objects, vec![SubObject { first: 0, count: 6 }]);
        assert_eq!(mesh.total_vertices, 10);
    }

    #[test]
    fn combined_and_split_layouts_are_equivalent() {
        let split = MeshFile::parse(&split_layout_file()).unwrap();
        let combined = MeshFile::parse(&combined_layout_file()).unwrap();

        assert_eq!(split.buffer, combined.buffer);
        assert_eq!(split.index, combined.index);
        assert_eq!(split.sub_objects, combined.sub_objects);
    }

    #[test]
    fn unknown_chunks_are_skipped_by_declared_size() {
        let vertices = vertex_bytes();
        let indices = index_bytes();

        let unknown_payload = [0xABu8; 24];
        // header(16) + vrtx(20) + unknown(32) + indx(20)
        let vertex_offset = 16 + 20 + 32 + 20u32;
        let index_offset = vertex_offset + vertices.len() as u32;

        let mut file = header(3);
        file.extend(chunk(
            b"VRTX",
            &u32s(&[vertices.len() as u32, vertex_offset, 10]),
        ));
        file.extend(chunk(b"WXYZ", &unknown_payload));
        file.extend(chunk(b"INDX", &u32s(&[COMPONENT_U16, 6, index_offset])));
        file.extend(&vertices);
        file.extend(&indices);

        let mesh = MeshFile::parse(&file).unwrap();
        assert_eq!(mesh.buffer[..40], vertices[..]);
        assert_eq!(mesh.buffer[40..], indices[..]);
        assert_eq!(mesh.index.unwrap().count, 6);
    }

    #[test]
    fn missing_sub_object_list_synthesizes_the_full_range() {
        let mesh = MeshFile::parse(&split_layout_file()).unwrap();
        assert_eq!(mesh.sub_objects, vec![SubObject { first: 0, count: 6 }]);

        // Non-indexed variant covers the vertex count instead.
        let vertices = vertex_bytes();
        let vertex_offset = 16 + 20u32;
        let mut file = header(1);
        file.extend(chunk(
            b"VRTX",
            &u32s(&[vertices.len() as u32, vertex_offset, 10]),
        ));
        file.extend(&vertices);

        let mesh = MeshFile::parse(&file).unwrap();
        assert_eq!(mesh.sub_objects, vec![SubObject { first: 0, count: 10 }]);
    }

    #[test]
    fn declared_zero_sub_objects_synthesizes_one() {
        let vertices = vertex_bytes();
        let indices = index_bytes();
        // header(16) + vrtx(20) + indx(20) + olst(12)
        let vertex_offset = 16 + 20 + 20 + 12u32;
        let index_offset = vertex_offset + vertices.len() as u32;

        let mut file = header(3);
        file.extend(chunk(
            b"VRTX",
            &u32s(&[vertices.len() as u32, vertex_offset, 10]),
        ));
        file.extend(chunk(b"INDX", &u32s(&[COMPONENT_U16, 6, index_offset])));
        file.extend(chunk(b"OLST", &u32s(&[0])));
        file.extend(&vertices);
        file.extend(&indices);

        let mesh = MeshFile::parse(&file).unwrap();
        assert_eq!(mesh.sub_objects, vec![SubObject { first: 0, count: 6 }]);
    }

    #[test]
    fn sub_object_list_is_capped_at_256_entries() {
        let vertices = vertex_bytes();
        let declared = 300u32;
        let mut olst = u32s(&[declared]);
        for i in 0..declared {
            olst.extend(u32s(&[i, 1]));
        }

        let olst_size = 8 + olst.len() as u32;
        let vertex_offset = 16 + 20 + olst_size;
        let mut file = header(2);
        file.extend(chunk(
            b"VRTX",
            &u32s(&[vertices.len() as u32, vertex_offset, 10]),
        ));
        file.extend(chunk(b"OLST", &olst));
        file.extend(&vertices);

        let mesh = MeshFile::parse(&file).unwrap();
        assert_eq!(mesh.sub_objects.len(), MAX_SUB_OBJECTS);
        assert_eq!(mesh.sub_objects[0], SubObject { first: 0, count: 1 });
        assert_eq!(
            mesh.sub_objects[MAX_SUB_OBJECTS - 1],
            SubObject {
                first: MAX_SUB_OBJECTS as u32 - 1,
                count: 1
            }
        );
    }

    #[test]
    fn declared_ranges_stay_within_the_element_total() {
        let vertices = vertex_bytes();
        let indices = index_bytes();
        let olst = u32s(&[2, 0, 3, 3, 3]);
        let olst_size = 8 + olst.len() as u32;
        let vertex_offset = 16 + 20 + 20 + olst_size;
        let index_offset = vertex_offset + vertices.len() as u32;

        let mut file = header(3);
        file.extend(chunk(
            b"VRTX",
            &u32s(&[vertices.len() as u32, vertex_offset, 10]),
        ));
        file.extend(chunk(b"INDX", &u32s(&[COMPONENT_U16, 6, index_offset])));
        file.extend(chunk(b"OLST", &olst));
        file.extend(&vertices);
        file.extend(&indices);

        let mesh = MeshFile::parse(&file).unwrap();
        assert!(mesh.sub_objects.len() <= MAX_SUB_OBJECTS);
        assert!(!mesh.sub_objects.is_empty());
        let total: u32 = mesh.sub_objects.iter().map(|s| s.count).sum();
        assert!(total <= mesh.index.unwrap().count);
    }

    #[test]
    fn attributes_parse_in_declaration_order() {
        let vertices = vertex_bytes();

        let mut atrb = u32s(&[2]);
        // position: 3 floats, tight, offset 0
        atrb.extend([0u8; ATTRIB_NAME_LEN]);
        atrb.extend(u32s(&[3, COMPONENT_F32, 0, 0, 0]));
        // normal: 3 floats, tight, normalized flag set, offset 120
        atrb.extend([0u8; ATTRIB_NAME_LEN]);
        atrb.extend(u32s(&[3, COMPONENT_F32, 0, 1, 120]));

        let atrb_size = 8 + atrb.len() as u32;
        let vertex_offset = 16 + atrb_size + 20;
        let mut file = header(2);
        file.extend(chunk(b"ATRB", &atrb));
        file.extend(chunk(
            b"VRTX",
            &u32s(&[vertices.len() as u32, vertex_offset, 10]),
        ));
        file.extend(&vertices);

        let mesh = MeshFile::parse(&file).unwrap();
        assert_eq!(mesh.attributes.len(), 2);
        assert_eq!(mesh.attributes[0].data_offset, 0);
        assert!(!mesh.attributes[0].normalized);
        assert_eq!(mesh.attributes[0].effective_stride(), 12);
        assert_eq!(mesh.attributes[1].data_offset, 120);
        assert!(mesh.attributes[1].normalized);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut file = split_layout_file();
        file[0] = b'X';
        assert!(matches!(
            MeshFile::parse(&file),
            Err(MeshFileError::BadMagic(_))
        ));
    }

    #[test]
    fn truncated_files_are_rejected() {
        let file = split_layout_file();

        // Cut inside the raw data region.
        assert!(matches!(
            MeshFile::parse(&file[..file.len() - 4]),
            Err(MeshFileError::OutOfBounds { .. })
        ));

        // Cut inside the chunk list.
        assert!(matches!(
            MeshFile::parse(&file[..24]),
            Err(MeshFileError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn chunk_size_running_past_the_file_is_rejected() {
        let mut file = header(1);
        let mut bad = chunk(b"VRTX", &u32s(&[40, 56, 10]));
        // Inflate the declared size far past the file end.
        bad[4..8].copy_from_slice(&4096u32.to_le_bytes());
        file.extend(bad);

        assert!(matches!(
            MeshFile::parse(&file),
            Err(MeshFileError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn files_without_geometry_are_rejected() {
        let file = header(0);
        assert!(matches!(
            MeshFile::parse(&file),
            Err(MeshFileError::NoGeometryData)
        ));
    }
}
