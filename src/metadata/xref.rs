//! Structures that table rows point to: method bodies, mapped field data and embedded managed
//! resources.
//!
//! All targets are collected from the table stream first and inserted afterwards, each with its
//! length measured up front. A target that collides with existing structure is skipped with a
//! warning by [`crate::Tree::insert_xref`]; an RVA that no section maps is an error.

use crate::{
    metadata::{
        method::MethodHeader,
        streams::{Blob, HeapKind, Strings},
        tables::{
            ClassLayoutRow, CodedIndexType, FieldRow, FieldRvaRow, ManifestResourceRow,
            MethodDefRow, TableId, TableStream, TypeDefRow,
        },
    },
    file::parser::read_compressed_uint,
    pe::{image_layout, require_rva},
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

/// `ELEMENT_TYPE_FIELD`, the leading byte of a field signature
const FIELD_SIGNATURE: u8 = 0x06;
/// `ELEMENT_TYPE_VALUETYPE`
const ELEMENT_TYPE_VALUETYPE: u8 = 0x11;
/// `ELEMENT_TYPE_CLASS`
const ELEMENT_TYPE_CLASS: u8 = 0x12;
/// Size of mapped data whose type gives no size
const DEFAULT_FIELD_DATA_SIZE: usize = 8;

struct Target {
    kind: NodeKind,
    label: String,
    offset: usize,
    length: usize,
}

/// Follows the rows of the table stream to the structures they reference and inserts them
/// below `image`. Embedded resources are inserted into the `resources` container.
pub(crate) fn resolve(tree: &mut Tree, image: NodeId, resources: Option<NodeId>) -> Result<()> {
    let Some(stream) = tree.table_stream().cloned() else {
        return Ok(());
    };

    let mut targets = Vec::new();
    if tree.config().resolve_method_bodies {
        targets.extend(method_bodies(tree, image, &stream)?);
    }
    if tree.config().resolve_field_data {
        targets.extend(field_data(tree, image, &stream)?);
    }
    log::debug!("{} method bodies and mapped fields referenced", targets.len());

    for target in targets {
        tree.insert_xref(
            image,
            NewNode::new(target.kind, target.label)
                .at(target.offset)
                .len(target.length),
        )?;
    }

    if let Some(container) = resources {
        if tree.config().resolve_resources {
            for target in managed_resources(tree, container, &stream)? {
                tree.insert_xref(
                    container,
                    NewNode::new(target.kind, target.label)
                        .at(target.offset)
                        .len(target.length),
                )?;
            }
        }
    }
    Ok(())
}

fn heap<'a>(tree: &'a Tree, kind: HeapKind) -> &'a [u8] {
    tree.metadata()
        .and_then(|layout| layout.heap(kind))
        .map_or(&[][..], |id| tree.get(id).bytes())
}

fn name(strings: Option<&Strings>, index: u32) -> String {
    strings
        .and_then(|strings| strings.get(index as usize).ok())
        .filter(|name| !name.is_empty())
        .map_or_else(|| format!("#{index}"), str::to_string)
}

fn method_bodies(tree: &Tree, image: NodeId, stream: &TableStream) -> Result<Vec<Target>> {
    let strings = Strings::from(heap(tree, HeapKind::Strings)).ok();
    let mut targets = Vec::new();

    for method in stream.rows::<MethodDefRow>() {
        let method = method?;
        if !method.has_il_body() {
            continue;
        }

        let offset = require_rva(tree, image, method.rva, method.offset)?;
        let header = MethodHeader::read(tree.buffer(), offset)?;
        targets.push(Target {
            kind: NodeKind::MethodBody,
            label: format!("Method {}", name(strings.as_ref(), method.name)),
            offset,
            length: header.size(),
        });
    }
    Ok(targets)
}

fn field_data(tree: &Tree, image: NodeId, stream: &TableStream) -> Result<Vec<Target>> {
    let strings = Strings::from(heap(tree, HeapKind::Strings)).ok();
    let blobs = Blob::from(heap(tree, HeapKind::Blob)).ok();
    let pointer_size = image_layout(tree, image).map_or(4, |layout| layout.pointer_size());
    let mut targets = Vec::new();

    for mapping in stream.rows::<FieldRvaRow>() {
        let mapping = mapping?;
        let offset = require_rva(tree, image, mapping.rva, mapping.offset)?;
        let field = stream.row::<FieldRow>(mapping.field)?;

        let signature = blobs
            .as_ref()
            .and_then(|blobs| blobs.get(field.signature as usize).ok())
            .unwrap_or_default();
        let length = field_data_size(stream, strings.as_ref(), signature, pointer_size);

        targets.push(Target {
            kind: NodeKind::FieldData,
            label: format!("Field Data {}", name(strings.as_ref(), field.name)),
            offset,
            length,
        });
    }
    Ok(targets)
}

/// Size of the mapped data of a field with the given signature blob.
///
/// Primitive element types give the size directly. For value types defined in this module, a
/// `=<N>` suffix of the type name (as in compiler generated `__StaticArrayInitTypeSize=16`)
/// decides, then the `ClassLayout` class size; anything else is assumed to be 8 bytes.
pub(crate) fn field_data_size(
    stream: &TableStream,
    strings: Option<&Strings>,
    signature: &[u8],
    pointer_size: usize,
) -> usize {
    if signature.first() != Some(&FIELD_SIGNATURE) {
        return DEFAULT_FIELD_DATA_SIZE;
    }
    let Some(&element) = signature.get(1) else {
        return DEFAULT_FIELD_DATA_SIZE;
    };

    match element {
        0x02 | 0x04 | 0x05 => return 1,
        0x03 | 0x06 | 0x07 => return 2,
        0x08 | 0x09 | 0x0C => return 4,
        0x0A | 0x0B | 0x0D => return 8,
        0x18 | 0x19 => return pointer_size,
        ELEMENT_TYPE_VALUETYPE | ELEMENT_TYPE_CLASS => {}
        _ => return DEFAULT_FIELD_DATA_SIZE,
    }

    let Some((TableId::TypeDef, rid)) = signature
        .get(2..)
        .and_then(|rest| read_compressed_uint(rest).ok())
        .and_then(|(value, _)| CodedIndexType::TypeDefOrRef.decode(value))
    else {
        return DEFAULT_FIELD_DATA_SIZE;
    };
    let Ok(type_def) = stream.row::<TypeDefRow>(rid) else {
        return DEFAULT_FIELD_DATA_SIZE;
    };

    let suffix = strings
        .and_then(|strings| strings.get(type_def.type_name as usize).ok())
        .and_then(|name| name.rsplit_once('='))
        .and_then(|(_, size)| size.parse::<usize>().ok());
    if let Some(size) = suffix {
        return size;
    }

    stream
        .rows::<ClassLayoutRow>()
        .filter_map(std::result::Result::ok)
        .find(|layout| layout.parent == rid)
        .map_or(DEFAULT_FIELD_DATA_SIZE, |layout| layout.class_size as usize)
}

fn managed_resources(tree: &Tree, container: NodeId, stream: &TableStream) -> Result<Vec<Target>> {
    let strings = Strings::from(heap(tree, HeapKind::Strings)).ok();
    let base = tree.get(container).start();
    let mut targets = Vec::new();

    for resource in stream.rows::<ManifestResourceRow>() {
        let resource = resource?;
        if !resource.is_embedded() {
            continue;
        }

        let offset = base + resource.data_offset as usize;
        let Ok(length) = tree.buffer().read_le::<u32>(offset) else {
            log::warn!(
                "resource {} at {offset:#x} lies past the end of file",
                resource.rid
            );
            continue;
        };
        targets.push(Target {
            kind: NodeKind::ManagedResource,
            label: format!("Resource {}", name(strings.as_ref(), resource.name)),
            offset,
            length: 4 + length as usize,
        });
    }
    Ok(targets)
}

/// Parse hook of an embedded managed resource: length prefix and data.
pub(crate) fn parse_managed_resource(tree: &mut Tree, id: NodeId) -> Result<()> {
    let length = tree.field::<u32>(id, "Length")? as usize;
    tree.append_bytes(id, "Data", length)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::ByteBuffer;

    // TypeDef rows 1 "<Module>", 2 "__StaticArrayInitTypeSize=16", 3 "Block" with a ClassLayout
    #[rustfmt::skip]
    fn stream() -> (TableStream, Vec<u8>) {
        let strings = b"\0<Module>\0__StaticArrayInitTypeSize=16\0Block\0".to_vec();
        let valid: u64 = (1 << 0x02) | (1 << 0x0F);
        let mut data = vec![0, 0, 0, 0, 2, 0, 0, 1];
        data.extend(valid.to_le_bytes());
        data.extend(0_u64.to_le_bytes());
        data.extend(3_u32.to_le_bytes());
        data.extend(1_u32.to_le_bytes());
        for name in [1_u16, 10, 39] {
            // Flags, TypeName, TypeNamespace, Extends, FieldList, MethodList
            data.extend([0, 0, 0, 0]);
            data.extend(name.to_le_bytes());
            data.extend([0, 0, 0, 0, 1, 0, 1, 0]);
        }
        // PackingSize, ClassSize, Parent
        data.extend([1, 0, 0x20, 0, 0, 0, 3, 0]);

        let buffer = ByteBuffer::from_mem(data);
        (TableStream::read(&buffer, 0, |_| true, None).unwrap(), strings)
    }

    #[test]
    fn primitive_sizes() {
        let (stream, _) = stream();
        assert_eq!(field_data_size(&stream, None, &[0x06, 0x08], 8), 4);
        assert_eq!(field_data_size(&stream, None, &[0x06, 0x0B], 8), 8);
        assert_eq!(field_data_size(&stream, None, &[0x06, 0x05], 8), 1);
        assert_eq!(field_data_size(&stream, None, &[0x06, 0x18], 8), 8);
        assert_eq!(field_data_size(&stream, None, &[0x06, 0x18], 4), 4);
        assert_eq!(field_data_size(&stream, None, &[0x06, 0x0E], 4), 8);
        assert_eq!(field_data_size(&stream, None, &[], 4), 8);
    }

    #[test]
    fn value_type_sizes() {
        let (stream, strings) = stream();
        let strings = Strings::from(&strings).unwrap();

        // TypeDef 2, encoded as (2 << 2) | 0
        assert_eq!(field_data_size(&stream, Some(&strings), &[0x06, 0x11, 0x08], 4), 16);
        // TypeDef 3 has no suffix, sized by its ClassLayout
        assert_eq!(field_data_size(&stream, Some(&strings), &[0x06, 0x11, 0x0C], 4), 32);
        // TypeDef 1 has neither
        assert_eq!(field_data_size(&stream, Some(&strings), &[0x06, 0x11, 0x04], 4), 8);
        // TypeRef 1
        assert_eq!(field_data_size(&stream, Some(&strings), &[0x06, 0x11, 0x05], 4), 8);
    }
}
