//! Custom debug information of portable PDBs.
//!
//! Rows of the `CustomDebugInformation` table pair a GUID kind with a blob. For the well-known
//! kinds the blob payload is decoded in place, as a child of the blob entry's data:
//!
//! ```text
//! SourceLink                     UTF-8 JSON document
//! EmbeddedSource                 int32 format, then raw (0) or deflated (> 0) content
//! CompilationOptions             zero-terminated UTF-8 key / value pairs
//! CompilationMetadataReferences  name, aliases, flags, timestamp, image size, MVID per reference
//! DefaultNamespace               UTF-8 namespace
//! ```
//!
//! The remaining known kinds are labelled but kept opaque.
//!
//! # Reference
//! - Portable PDB v1.0 Format Specification - `CustomDebugInformation` table
//! - Roslyn `PortableCustomDebugInfoKinds`

use std::collections::BTreeSet;

use strum::{EnumIter, IntoEnumIterator};
use uguid::{guid, Guid};

use crate::{
    metadata::{
        streams::{metadata_layout, Blob, Guid as GuidHeap, HeapKind},
        tables::{CustomDebugInformationRow, TableStream},
    },
    tree::{NewNode, NodeId, NodeKind, Payload, Tree},
    Result,
};

/// Well-known custom debug information kinds, identified by GUID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter)]
pub enum CustomDebugKind {
    /// Source Link JSON document
    SourceLink,
    /// Source file content embedded into the PDB
    EmbeddedSource,
    /// References of the compilation
    CompilationMetadataReferences,
    /// Compiler options of the compilation
    CompilationOptions,
    /// Default namespace of a VB project
    DefaultNamespace,
    /// Scopes of locals hoisted into a state machine
    StateMachineHoistedLocalScopes,
    /// `dynamic` flags of locals
    DynamicLocalVariables,
    /// Edit and Continue local slot map
    EncLocalSlotMap,
    /// Edit and Continue lambda and closure map
    EncLambdaAndClosureMap,
    /// Tuple element names of locals
    TupleElementNames,
    /// Documents of types without method bodies
    TypeDefinitionDocuments,
    /// Edit and Continue state machine state map
    EncStateMachineStateMap,
    /// Primary constructor information
    PrimaryConstructorInformationBlob,
}

impl CustomDebugKind {
    /// The GUID that identifies this kind.
    #[must_use]
    pub fn guid(self) -> Guid {
        match self {
            CustomDebugKind::SourceLink => guid!("CC110556-A091-4D38-9FEC-25AB9A351A6A"),
            CustomDebugKind::EmbeddedSource => guid!("0E8A571B-6926-466E-B4AD-8AB04611F5FE"),
            CustomDebugKind::CompilationMetadataReferences => {
                guid!("7E4D4708-096E-4C5C-AEDA-CB10BA6A740D")
            }
            CustomDebugKind::CompilationOptions => guid!("B5FEEC05-8CD0-4A83-96DA-466284BB4BD8"),
            CustomDebugKind::DefaultNamespace => guid!("58B2EAB6-209F-4E4E-A22C-B2D0F910C782"),
            CustomDebugKind::StateMachineHoistedLocalScopes => {
                guid!("6DA9A61E-F8C7-4874-BE62-68BC5630DF71")
            }
            CustomDebugKind::DynamicLocalVariables => {
                guid!("83C563C4-B4F3-47D5-B824-BA5441477EA8")
            }
            CustomDebugKind::EncLocalSlotMap => guid!("755F52A8-91C5-45BE-B4B8-209571E552BD"),
            CustomDebugKind::EncLambdaAndClosureMap => {
                guid!("A643004C-0240-496F-A783-30D64F4979DE")
            }
            CustomDebugKind::TupleElementNames => guid!("ED9FDF71-8879-4747-8ED3-FE5EDE3CE710"),
            CustomDebugKind::TypeDefinitionDocuments => {
                guid!("932E74BC-DBA9-4478-8D46-0F32A7BAB3D3")
            }
            CustomDebugKind::EncStateMachineStateMap => {
                guid!("8B78CD68-2EDE-420B-980B-E15884B8AAA3")
            }
            CustomDebugKind::PrimaryConstructorInformationBlob => {
                guid!("9D40ACE1-C703-4D0E-BF41-7243060A8FB5")
            }
        }
    }

    /// Looks up the kind of a GUID, `None` for GUIDs without a known meaning.
    #[must_use]
    pub fn from_guid(guid: Guid) -> Option<CustomDebugKind> {
        CustomDebugKind::iter().find(|kind| kind.guid() == guid)
    }

    /// Human readable name, used as node label.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CustomDebugKind::SourceLink => "Source Link",
            CustomDebugKind::EmbeddedSource => "Embedded Source",
            CustomDebugKind::CompilationMetadataReferences => "Compilation Metadata References",
            CustomDebugKind::CompilationOptions => "Compilation Options",
            CustomDebugKind::DefaultNamespace => "Default Namespace",
            CustomDebugKind::StateMachineHoistedLocalScopes => "State Machine Hoisted Local Scopes",
            CustomDebugKind::DynamicLocalVariables => "Dynamic Local Variables",
            CustomDebugKind::EncLocalSlotMap => "EnC Local Slot Map",
            CustomDebugKind::EncLambdaAndClosureMap => "EnC Lambda And Closure Map",
            CustomDebugKind::TupleElementNames => "Tuple Element Names",
            CustomDebugKind::TypeDefinitionDocuments => "Type Definition Documents",
            CustomDebugKind::EncStateMachineStateMap => "EnC State Machine State Map",
            CustomDebugKind::PrimaryConstructorInformationBlob => {
                "Primary Constructor Information"
            }
        }
    }
}

/// Places the decoded payloads of all custom debug information rows of the metadata root
/// `root` inside their blob entries.
pub(crate) fn resolve_debug_info(tree: &mut Tree, root: NodeId) -> Result<()> {
    let Some(layout) = metadata_layout(tree, root) else {
        return Ok(());
    };
    let (Some(tables), Some(guids), Some(blobs)) = (
        layout.heap(HeapKind::Tables),
        layout.heap(HeapKind::Guid),
        layout.heap(HeapKind::Blob),
    ) else {
        return Ok(());
    };
    let Some(Payload::Tables(stream)) = tree.payload(tables) else {
        return Ok(());
    };
    let stream: TableStream = (**stream).clone();

    let blob_start = tree.get(blobs).start();
    let mut targets = Vec::new();
    {
        let (Ok(guids), Ok(blobs)) = (
            GuidHeap::from(tree.get(guids).bytes()),
            Blob::from(tree.get(blobs).bytes()),
        ) else {
            return Ok(());
        };

        let mut seen = BTreeSet::new();
        for row in stream.rows::<CustomDebugInformationRow>() {
            let row = row?;
            let Some(kind) = guids
                .get(row.kind as usize)
                .ok()
                .and_then(CustomDebugKind::from_guid)
            else {
                continue;
            };
            let Ok((start, length)) = blobs.entry(row.value as usize) else {
                log::warn!("custom debug information row {} has an invalid blob", row.rid);
                continue;
            };
            if seen.insert(start) {
                targets.push((kind, blob_start + start, length));
            }
        }
    }

    log::debug!("{} custom debug information blobs", targets.len());
    for (kind, offset, length) in targets {
        tree.insert_xref(
            blobs,
            NewNode::new(NodeKind::DebugInfo(kind), kind.name())
                .at(offset)
                .len(length),
        )?;
    }
    Ok(())
}

/// Parse hook of a decoded custom debug information payload.
pub(crate) fn parse_debug_info(tree: &mut Tree, id: NodeId, kind: CustomDebugKind) -> Result<()> {
    let length = tree.get(id).len();
    match kind {
        CustomDebugKind::SourceLink => {
            tree.add(id, NewNode::new(NodeKind::Utf8, "Document").len(length))?;
        }
        CustomDebugKind::DefaultNamespace => {
            tree.add(id, NewNode::new(NodeKind::Utf8, "Namespace").len(length))?;
        }
        CustomDebugKind::EmbeddedSource => {
            if length < 4 {
                return Ok(());
            }
            let format = tree.field::<u32>(id, "Format")?;
            let label = if format == 0 {
                "Content"
            } else {
                "Compressed Content"
            };
            tree.append_bytes(id, label, length - 4)?;
        }
        CustomDebugKind::CompilationOptions => {
            let mut key = true;
            while let Some(terminated) = next_string(tree, id) {
                if !terminated {
                    break;
                }
                tree.append(id, NodeKind::ZString, if key { "Key" } else { "Value" })?;
                key = !key;
            }
        }
        CustomDebugKind::CompilationMetadataReferences => {
            while let Some(size) = next_reference(tree, id) {
                let Some(reference) = tree.append_bytes(id, "Reference", size)? else {
                    break;
                };
                tree.append(reference, NodeKind::ZString, "FileName")?;
                tree.append(reference, NodeKind::ZString, "Aliases")?;
                tree.append(reference, NodeKind::U8, "Flags")?;
                tree.append(reference, NodeKind::U32, "TimeStamp")?;
                tree.append(reference, NodeKind::U32, "FileSize")?;
                tree.append(reference, NodeKind::Guid, "Mvid")?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Remaining bytes of the payload after its last child.
fn remaining(tree: &Tree, id: NodeId) -> &[u8] {
    let node = tree.get(id);
    let cursor = node.children().last().map_or(node.start(), |last| last.end());
    node.bytes().get(cursor - node.start()..).unwrap_or_default()
}

/// `Some(true)` if a terminated string follows, `Some(false)` for trailing unterminated bytes,
/// `None` at the end of the payload.
fn next_string(tree: &Tree, id: NodeId) -> Option<bool> {
    let rest = remaining(tree, id);
    if rest.is_empty() {
        return None;
    }
    Some(rest.contains(&0))
}

/// Size of the next complete compilation reference record.
fn next_reference(tree: &Tree, id: NodeId) -> Option<usize> {
    let rest = remaining(tree, id);
    let name = rest.iter().position(|b| *b == 0)? + 1;
    let aliases = rest[name..].iter().position(|b| *b == 0)? + 1;
    let size = name + aliases + 1 + 4 + 4 + 16;
    (size <= rest.len()).then_some(size)
}
