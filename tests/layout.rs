//! Whole-image layout: coverage, determinism and the minimal PE32+ image.

#[path = "../src/test/image.rs"]
mod image;

use dotlayout::{
    metadata::tables::{ModuleRow, TableId},
    prelude::*,
};
use image::{portable_pdb, ImageBuilder, DEFAULT_MVID};

fn parse(data: Vec<u8>) -> Tree {
    dotlayout::parse(ByteBuffer::from_mem(data)).unwrap()
}

fn layout(tree: &Tree) -> Vec<(String, usize, usize)> {
    tree.walk()
        .into_iter()
        .map(|(_, node)| (node.label().to_string(), node.start(), node.len()))
        .collect()
}

#[test]
fn leaves_cover_the_whole_file() {
    for builder in [
        ImageBuilder::new(),
        ImageBuilder::new().pe32_plus(),
        ImageBuilder::sample(),
        ImageBuilder::sample().pe32_plus(),
    ] {
        let data = builder.build();
        let size = data.len();
        let tree = parse(data);

        assert!(tree.check_coverage().is_empty(), "{:?}", tree.check_coverage());
        let covered: usize = tree.leaves().iter().map(NodeRef::len).sum();
        assert_eq!(covered, size);
    }
}

#[test]
fn parsing_is_deterministic() {
    let data = ImageBuilder::sample().build();
    let first = parse(data.clone());
    let second = parse(data);

    assert_eq!(layout(&first), layout(&second));
}

#[test]
fn minimal_pe32_plus() {
    let tree = parse(ImageBuilder::new().pe32_plus().build());

    let image = tree.image().unwrap();
    assert!(image.is_pe32_plus);
    assert_eq!(image.sections.len(), 1);

    let stream = tree.table_stream().unwrap();
    assert_eq!(stream.row_count(TableId::Module), 1);
    assert_eq!(stream.tables().count(), 1);

    let module: ModuleRow = stream.row(1).unwrap();
    let heaps = tree.metadata().unwrap();
    for kind in [HeapKind::Tables, HeapKind::Strings, HeapKind::Guid, HeapKind::Blob] {
        assert!(heaps.has(kind), "{kind:?} missing");
    }

    let guids = tree.get(heaps.heap(HeapKind::Guid).unwrap()).bytes();
    let mvid = Guid::from(guids).unwrap().get(module.mvid as usize).unwrap();
    assert_eq!(mvid, uguid::Guid::from_bytes(DEFAULT_MVID));

    let strings = Strings::from(tree.get(heaps.heap(HeapKind::Strings).unwrap()).bytes()).unwrap();
    assert_eq!(strings.get(module.name as usize).unwrap(), "app.dll");
}

#[test]
fn truncated_buffer() {
    let result = dotlayout::parse(ByteBuffer::from_mem(vec![0u8; 32]));
    assert!(matches!(result, Err(Error::TruncatedBuffer { .. })));
}

#[test]
fn truncated_image() {
    let mut data = ImageBuilder::sample().build();
    data.truncate(0x100);
    assert!(dotlayout::parse(ByteBuffer::from_mem(data)).is_err());
}

#[test]
fn bad_dos_magic() {
    let mut data = ImageBuilder::new().build();
    data[0] = b'X';
    let result = dotlayout::parse(ByteBuffer::from_mem(data));
    assert!(matches!(result, Err(Error::BadMagic { offset: 0, .. })));
}

#[test]
fn standalone_pdb() {
    let pdb = portable_pdb(r#"{"documents":{}}"#);
    let size = pdb.len();
    let tree = dotlayout::parse_pdb(ByteBuffer::from_mem(pdb), ParseConfig::default()).unwrap();

    assert_eq!(tree.root().kind(), NodeKind::MetadataRoot);
    assert!(tree.image().is_none());
    assert!(tree.check_coverage().is_empty());
    assert_eq!(tree.root().len(), size);

    let pdb_stream = tree.metadata().unwrap().pdb.as_ref().unwrap();
    assert_eq!(pdb_stream.entry_point, 0x0600_0001);
    assert_eq!(
        tree.table_stream().unwrap().row_count(TableId::CustomDebugInformation),
        1
    );
}

#[test]
fn node_inspection() {
    let tree = parse(ImageBuilder::sample().build());
    let root = tree.root();

    let subsystem = root
        .path(&["Optional Header", "Windows Fields", "Subsystem"])
        .unwrap();
    assert_eq!(subsystem.as_u64(), Some(3));
    assert_eq!(subsystem.value().unwrap(), "0x0003");
    assert_eq!(subsystem.parent().unwrap().label(), "Windows Fields");

    let cli = tree.find_kind(NodeKind::CliHeader).unwrap();
    assert_eq!(cli.parent().unwrap().label(), ".text");
    assert_eq!(cli.child("Cb").unwrap().as_u64(), Some(72));

    let text = root.child(".text").unwrap();
    let starts: Vec<_> = text.children().map(|node| node.start()).collect();
    assert!(starts.windows(2).all(|pair| pair[0] < pair[1]));
}
