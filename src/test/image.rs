//! Synthetic .NET images.
//!
//! [`ImageBuilder`] writes a small but complete image: DOS header and stub, PE32 or PE32+
//! headers, one `.text` section holding the CLI header, method bodies, mapped field data,
//! managed resources, the metadata root and a debug directory with a CodeView record and an
//! optional embedded portable PDB.
//!
//! This file is shared by the unit tests, the integration tests and the benchmarks; it only
//! uses `std` and the crate's own dependencies.

#![allow(dead_code)]

use std::io::Write as _;

use flate2::{write::DeflateEncoder, Compression};

pub const FILE_ALIGNMENT: usize = 0x200;
pub const TEXT_RVA: u32 = 0x2000;
pub const TEXT_OFFSET: usize = 0x200;

/// MVID written to the `#GUID` heap unless [`ImageBuilder::mvid`] is used
pub const DEFAULT_MVID: [u8; 16] = [
    0x4A, 0x1B, 0x7C, 0x2D, 0x9E, 0x3F, 0x40, 0x51, 0x82, 0x93, 0xA4, 0xB5, 0xC6, 0xD7, 0xE8, 0xF9,
];

/// `SourceLink` custom debug information kind, in memory layout
pub const SOURCE_LINK_GUID: [u8; 16] = [
    0x56, 0x05, 0x11, 0xCC, 0x91, 0xA0, 0x38, 0x4D, 0x9F, 0xEC, 0x25, 0xAB, 0x9A, 0x35, 0x1A, 0x6A,
];

const TABLE_MODULE: u8 = 0x00;
const TABLE_TYPEDEF: u8 = 0x02;
const TABLE_FIELD: u8 = 0x04;
const TABLE_METHODDEF: u8 = 0x06;
const TABLE_FIELDRVA: u8 = 0x1D;
const TABLE_MANIFESTRESOURCE: u8 = 0x28;
const TABLE_CUSTOMDEBUGINFORMATION: u8 = 0x37;

fn align(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

fn pad(data: &mut Vec<u8>, alignment: usize) {
    data.resize(align(data.len(), alignment), 0);
}

fn put_u16(data: &mut Vec<u8>, value: u16) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(data: &mut Vec<u8>, value: u64) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn compressed_len(length: usize) -> Vec<u8> {
    match length {
        0..=0x7F => vec![length as u8],
        0x80..=0x3FFF => vec![0x80 | (length >> 8) as u8, length as u8],
        _ => vec![
            0xC0 | (length >> 24) as u8,
            (length >> 16) as u8,
            (length >> 8) as u8,
            length as u8,
        ],
    }
}

/// `#Strings` heap with deduplicated entries
struct StringHeap {
    data: Vec<u8>,
    entries: Vec<(String, u16)>,
}

impl StringHeap {
    fn new() -> StringHeap {
        StringHeap {
            data: vec![0],
            entries: Vec::new(),
        }
    }

    fn add(&mut self, value: &str) -> u16 {
        if value.is_empty() {
            return 0;
        }
        if let Some((_, index)) = self.entries.iter().find(|(s, _)| s == value) {
            return *index;
        }
        let index = self.data.len() as u16;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.entries.push((value.to_string(), index));
        index
    }

    fn finish(mut self) -> Vec<u8> {
        pad(&mut self.data, 4);
        self.data
    }
}

/// `#Blob` heap with deduplicated entries
struct BlobHeap {
    data: Vec<u8>,
    entries: Vec<(Vec<u8>, u16)>,
}

impl BlobHeap {
    fn new() -> BlobHeap {
        BlobHeap {
            data: vec![0],
            entries: Vec::new(),
        }
    }

    fn add(&mut self, value: &[u8]) -> u16 {
        if let Some((_, index)) = self.entries.iter().find(|(blob, _)| blob == value) {
            return *index;
        }
        let index = self.data.len() as u16;
        self.data.extend(compressed_len(value.len()));
        self.data.extend_from_slice(value);
        self.entries.push((value.to_vec(), index));
        index
    }

    fn finish(mut self) -> Vec<u8> {
        pad(&mut self.data, 4);
        self.data
    }
}

/// Table stream with narrow indices; tables must be added in ascending id order.
struct TableWriter {
    valid: u64,
    counts: Vec<u32>,
    rows: Vec<u8>,
}

impl TableWriter {
    fn new() -> TableWriter {
        TableWriter {
            valid: 0,
            counts: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn table(&mut self, table: u8, rows: &[Vec<u8>]) {
        if rows.is_empty() {
            return;
        }
        self.valid |= 1 << table;
        self.counts.push(rows.len() as u32);
        for row in rows {
            self.rows.extend_from_slice(row);
        }
    }

    fn finish(self) -> Vec<u8> {
        let mut data = Vec::new();
        put_u32(&mut data, 0);
        data.extend_from_slice(&[2, 0, 0, 1]);
        put_u64(&mut data, self.valid);
        put_u64(&mut data, 0);
        for count in self.counts {
            put_u32(&mut data, count);
        }
        data.extend_from_slice(&self.rows);
        pad(&mut data, 4);
        data
    }
}

/// Writes a metadata root with the given `(name, data)` streams in order.
fn metadata_root(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let version = b"v4.0.30319\0\0";

    let headers_size: usize = streams
        .iter()
        .map(|(name, _)| 8 + align(name.len() + 1, 4))
        .sum();
    let mut offset = 16 + version.len() + 4 + headers_size;

    let mut data = Vec::new();
    put_u32(&mut data, 0x424A_5342);
    put_u16(&mut data, 1);
    put_u16(&mut data, 1);
    put_u32(&mut data, 0);
    put_u32(&mut data, version.len() as u32);
    data.extend_from_slice(version);
    put_u16(&mut data, 0);
    put_u16(&mut data, streams.len() as u16);
    for (name, stream) in streams {
        put_u32(&mut data, offset as u32);
        put_u32(&mut data, stream.len() as u32);
        data.extend_from_slice(name.as_bytes());
        data.push(0);
        pad(&mut data, 4);
        offset += stream.len();
    }
    for (_, stream) in streams {
        data.extend_from_slice(stream);
    }
    data
}

/// Builds a standalone portable PDB with one `CustomDebugInformation` row holding a SourceLink
/// document.
pub fn portable_pdb(source_link: &str) -> Vec<u8> {
    let mut pdb = vec![0xAB; 20];
    put_u32(&mut pdb, 0x0600_0001);
    put_u64(&mut pdb, 0);

    let mut blobs = BlobHeap::new();
    let document = blobs.add(source_link.as_bytes());

    let mut tables = TableWriter::new();
    let mut row = Vec::new();
    // HasCustomDebugInformation: Module 1, tag 7
    put_u16(&mut row, (1 << 5) | 7);
    put_u16(&mut row, 1);
    put_u16(&mut row, document);
    tables.table(TABLE_CUSTOMDEBUGINFORMATION, &[row]);

    metadata_root(&[
        ("#Pdb", pdb),
        ("#~", tables.finish()),
        ("#Strings", StringHeap::new().finish()),
        ("#GUID", SOURCE_LINK_GUID.to_vec()),
        ("#Blob", blobs.finish()),
    ])
}

struct MethodSpec {
    name: String,
    body: Vec<u8>,
}

struct FieldSpec {
    name: String,
    element_type: u8,
    data: Vec<u8>,
}

/// Writes synthetic .NET images.
///
/// ```rust,ignore
/// let data = ImageBuilder::new()
///     .pe32_plus()
///     .tiny_method("Main", &[0x2A])
///     .build();
/// ```
pub struct ImageBuilder {
    pe32_plus: bool,
    module_name: String,
    mvid: [u8; 16],
    methods: Vec<MethodSpec>,
    fields: Vec<FieldSpec>,
    resources: Vec<(String, Vec<u8>)>,
    user_strings: Vec<String>,
    codeview: bool,
    embedded_pdb: Option<Vec<u8>>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        ImageBuilder::new()
    }
}

impl ImageBuilder {
    /// A PE32 image whose metadata holds only the `Module` row.
    pub fn new() -> ImageBuilder {
        ImageBuilder {
            pe32_plus: false,
            module_name: "app.dll".to_string(),
            mvid: DEFAULT_MVID,
            methods: Vec::new(),
            fields: Vec::new(),
            resources: Vec::new(),
            user_strings: Vec::new(),
            codeview: false,
            embedded_pdb: None,
        }
    }

    /// The image used by most scenario tests: two methods (tiny and fat), two mapped fields,
    /// one resource, a user string, a CodeView record and an embedded PDB.
    pub fn sample() -> ImageBuilder {
        ImageBuilder::new()
            .tiny_method("Main", &[0x72, 0x01, 0x00, 0x00, 0x70, 0x28, 0x01, 0x00, 0x00, 0x0A, 0x2A])
            .fat_method("Compute", 8, &[0x02, 0x03, 0x58, 0x2A])
            .field("Counter", 0x08, &[0x2A, 0x00, 0x00, 0x00])
            .field("Seed", 0x0B, &[1, 2, 3, 4, 5, 6, 7, 8])
            .resource("app.Strings.resources", b"resource payload")
            .user_string("Hello")
            .codeview()
            .embedded_pdb(&portable_pdb(r#"{"documents":{"/src/*":"https://example.org/*"}}"#))
    }

    pub fn pe32_plus(mut self) -> ImageBuilder {
        self.pe32_plus = true;
        self
    }

    pub fn module_name(mut self, name: &str) -> ImageBuilder {
        self.module_name = name.to_string();
        self
    }

    pub fn mvid(mut self, mvid: [u8; 16]) -> ImageBuilder {
        self.mvid = mvid;
        self
    }

    /// Adds a method with a raw body (header included).
    pub fn method(mut self, name: &str, body: &[u8]) -> ImageBuilder {
        self.methods.push(MethodSpec {
            name: name.to_string(),
            body: body.to_vec(),
        });
        self
    }

    /// Adds a method with a tiny header; `code` must be shorter than 64 bytes.
    pub fn tiny_method(self, name: &str, code: &[u8]) -> ImageBuilder {
        assert!(code.len() < 64);
        let mut body = vec![((code.len() as u8) << 2) | 0x02];
        body.extend_from_slice(code);
        self.method(name, &body)
    }

    /// Adds a method with a 12-byte fat header and no exception sections.
    pub fn fat_method(self, name: &str, max_stack: u16, code: &[u8]) -> ImageBuilder {
        let mut body = Vec::new();
        // flags 0x3 (fat) | 0x10 (init locals), header size 3 dwords
        put_u16(&mut body, 0x3013);
        put_u16(&mut body, max_stack);
        put_u32(&mut body, code.len() as u32);
        put_u32(&mut body, 0);
        body.extend_from_slice(code);
        self.method(name, &body)
    }

    /// Adds a static field of a primitive element type with mapped initial data.
    pub fn field(mut self, name: &str, element_type: u8, data: &[u8]) -> ImageBuilder {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            element_type,
            data: data.to_vec(),
        });
        self
    }

    /// Adds an embedded managed resource.
    pub fn resource(mut self, name: &str, data: &[u8]) -> ImageBuilder {
        self.resources.push((name.to_string(), data.to_vec()));
        self
    }

    /// Adds a string literal to the `#US` heap.
    pub fn user_string(mut self, value: &str) -> ImageBuilder {
        self.user_strings.push(value.to_string());
        self
    }

    /// Adds a CodeView debug record.
    pub fn codeview(mut self) -> ImageBuilder {
        self.codeview = true;
        self
    }

    /// Embeds a portable PDB, deflate compressed.
    pub fn embedded_pdb(mut self, pdb: &[u8]) -> ImageBuilder {
        self.embedded_pdb = Some(pdb.to_vec());
        self
    }

    fn has_types(&self) -> bool {
        !self.methods.is_empty() || !self.fields.is_empty()
    }

    fn metadata(&self, method_rvas: &[u32], field_rvas: &[u32], resource_offsets: &[u32]) -> Vec<u8> {
        let mut strings = StringHeap::new();
        let mut blobs = BlobHeap::new();
        let mut tables = TableWriter::new();

        let mut module = Vec::new();
        put_u16(&mut module, 0);
        put_u16(&mut module, strings.add(&self.module_name));
        put_u16(&mut module, 1);
        put_u16(&mut module, 0);
        put_u16(&mut module, 0);
        tables.table(TABLE_MODULE, &[module]);

        if self.has_types() {
            let mut types = Vec::new();
            for (name, namespace) in [("<Module>", ""), ("Program", "App")] {
                let mut row = Vec::new();
                put_u32(&mut row, if name == "Program" { 0x0010_0001 } else { 0 });
                put_u16(&mut row, strings.add(name));
                put_u16(&mut row, strings.add(namespace));
                put_u16(&mut row, 0);
                put_u16(&mut row, 1);
                put_u16(&mut row, 1);
                types.push(row);
            }
            tables.table(TABLE_TYPEDEF, &types);
        }

        let fields: Vec<Vec<u8>> = self
            .fields
            .iter()
            .map(|field| {
                let mut row = Vec::new();
                // static, has field RVA
                put_u16(&mut row, 0x0116);
                put_u16(&mut row, strings.add(&field.name));
                put_u16(&mut row, blobs.add(&[0x06, field.element_type]));
                row
            })
            .collect();
        tables.table(TABLE_FIELD, &fields);

        let methods: Vec<Vec<u8>> = self
            .methods
            .iter()
            .zip(method_rvas)
            .map(|(method, rva)| {
                let mut row = Vec::new();
                put_u32(&mut row, *rva);
                put_u16(&mut row, 0);
                put_u16(&mut row, 0x0096);
                put_u16(&mut row, strings.add(&method.name));
                put_u16(&mut row, blobs.add(&[0x00, 0x00, 0x01]));
                put_u16(&mut row, 1);
                row
            })
            .collect();
        tables.table(TABLE_METHODDEF, &methods);

        let mappings: Vec<Vec<u8>> = field_rvas
            .iter()
            .enumerate()
            .map(|(index, rva)| {
                let mut row = Vec::new();
                put_u32(&mut row, *rva);
                put_u16(&mut row, index as u16 + 1);
                row
            })
            .collect();
        tables.table(TABLE_FIELDRVA, &mappings);

        let resources: Vec<Vec<u8>> = self
            .resources
            .iter()
            .zip(resource_offsets)
            .map(|((name, _), offset)| {
                let mut row = Vec::new();
                put_u32(&mut row, *offset);
                put_u32(&mut row, 0x0001);
                put_u16(&mut row, strings.add(name));
                put_u16(&mut row, 0);
                row
            })
            .collect();
        tables.table(TABLE_MANIFESTRESOURCE, &resources);

        let mut streams = vec![("#~", tables.finish()), ("#Strings", strings.finish())];
        if !self.user_strings.is_empty() {
            let mut heap = vec![0];
            for value in &self.user_strings {
                let units: Vec<u16> = value.encode_utf16().collect();
                heap.extend(compressed_len(units.len() * 2 + 1));
                for unit in units {
                    put_u16(&mut heap, unit);
                }
                heap.push(0);
            }
            pad(&mut heap, 4);
            streams.push(("#US", heap));
        }
        streams.push(("#GUID", self.mvid.to_vec()));
        streams.push(("#Blob", blobs.finish()));
        metadata_root(&streams)
    }

    /// Writes the image.
    pub fn build(&self) -> Vec<u8> {
        // .text content, offsets relative to the section start
        let mut text = vec![0u8; 72];
        let rva = |offset: usize| TEXT_RVA + offset as u32;

        let mut method_rvas = Vec::new();
        for method in &self.methods {
            pad(&mut text, 4);
            method_rvas.push(rva(text.len()));
            text.extend_from_slice(&method.body);
        }

        let mut field_rvas = Vec::new();
        for field in &self.fields {
            pad(&mut text, 8);
            field_rvas.push(rva(text.len()));
            text.extend_from_slice(&field.data);
        }

        let mut resource_offsets = Vec::new();
        let mut resources_directory = (0, 0);
        if !self.resources.is_empty() {
            pad(&mut text, 8);
            let start = text.len();
            for (_, data) in &self.resources {
                pad(&mut text, 8);
                resource_offsets.push((text.len() - start) as u32);
                put_u32(&mut text, data.len() as u32);
                text.extend_from_slice(data);
            }
            resources_directory = (rva(start), (text.len() - start) as u32);
        }

        pad(&mut text, 4);
        let metadata = self.metadata(&method_rvas, &field_rvas, &resource_offsets);
        let metadata_directory = (rva(text.len()), metadata.len() as u32);
        text.extend_from_slice(&metadata);

        let mut payloads: Vec<(u32, Vec<u8>)> = Vec::new();
        if self.codeview {
            let mut record = b"RSDS".to_vec();
            record.extend_from_slice(&self.mvid);
            put_u32(&mut record, 1);
            record.extend_from_slice(b"app.pdb\0");
            payloads.push((2, record));
        }
        if let Some(pdb) = &self.embedded_pdb {
            let mut record = b"MPDB".to_vec();
            put_u32(&mut record, pdb.len() as u32);
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(pdb).expect("in-memory write");
            record.extend(encoder.finish().expect("in-memory write"));
            payloads.push((17, record));
        }

        let mut debug_directory = (0, 0);
        if !payloads.is_empty() {
            pad(&mut text, 4);
            let directory_start = text.len();
            text.resize(directory_start + payloads.len() * 28, 0);

            for (index, (kind, record)) in payloads.iter().enumerate() {
                pad(&mut text, 4);
                let offset = text.len();
                text.extend_from_slice(record);

                let mut entry = Vec::new();
                put_u32(&mut entry, 0);
                put_u32(&mut entry, 0x6543_2100);
                put_u16(&mut entry, if *kind == 17 { 0x0100 } else { 0 });
                put_u16(&mut entry, if *kind == 17 { 0x0100 } else { 0 });
                put_u32(&mut entry, *kind);
                put_u32(&mut entry, record.len() as u32);
                put_u32(&mut entry, rva(offset));
                put_u32(&mut entry, (TEXT_OFFSET + offset) as u32);
                let at = directory_start + index * 28;
                text[at..at + 28].copy_from_slice(&entry);
            }
            debug_directory = (rva(directory_start), (payloads.len() * 28) as u32);
        }

        let mut cli = Vec::new();
        put_u32(&mut cli, 72);
        put_u16(&mut cli, 2);
        put_u16(&mut cli, 5);
        put_u32(&mut cli, metadata_directory.0);
        put_u32(&mut cli, metadata_directory.1);
        put_u32(&mut cli, 0x0000_0001);
        put_u32(&mut cli, if self.methods.is_empty() { 0 } else { 0x0600_0001 });
        put_u32(&mut cli, resources_directory.0);
        put_u32(&mut cli, resources_directory.1);
        cli.resize(72, 0);
        text[..72].copy_from_slice(&cli);

        let virtual_size = text.len();
        pad(&mut text, FILE_ALIGNMENT);

        let mut image = self.headers(virtual_size, text.len(), debug_directory);
        image.extend_from_slice(&text);
        image
    }

    fn headers(&self, virtual_size: usize, raw_size: usize, debug: (u32, u32)) -> Vec<u8> {
        let mut data = vec![0u8; 0x40];
        data[0] = b'M';
        data[1] = b'Z';
        data[2..4].copy_from_slice(&0x90_u16.to_le_bytes());
        data[0x3C..0x40].copy_from_slice(&0x80_u32.to_le_bytes());
        data.extend_from_slice(&[0x0E, 0x1F, 0xBA, 0x0E, 0x00, 0xB4, 0x09, 0xCD, 0x21, 0xB8, 0x01, 0x4C, 0xCD, 0x21]);
        data.extend_from_slice(b"This program cannot be run in DOS mode.\r\r\n$");
        data.resize(0x80, 0);

        let optional_size: u16 = if self.pe32_plus { 240 } else { 224 };
        put_u32(&mut data, 0x0000_4550);
        put_u16(&mut data, if self.pe32_plus { 0x8664 } else { 0x014C });
        put_u16(&mut data, 1);
        put_u32(&mut data, 0x6543_2100);
        put_u32(&mut data, 0);
        put_u32(&mut data, 0);
        put_u16(&mut data, optional_size);
        put_u16(&mut data, 0x2022);

        let size_of_image = align(TEXT_RVA as usize + virtual_size, 0x2000) as u32;
        put_u16(&mut data, if self.pe32_plus { 0x020B } else { 0x010B });
        data.extend_from_slice(&[48, 0]);
        put_u32(&mut data, raw_size as u32);
        put_u32(&mut data, 0);
        put_u32(&mut data, 0);
        put_u32(&mut data, 0);
        put_u32(&mut data, TEXT_RVA);
        if self.pe32_plus {
            put_u64(&mut data, 0x1_8000_0000);
        } else {
            put_u32(&mut data, 0);
            put_u32(&mut data, 0x1000_0000);
        }
        put_u32(&mut data, 0x2000);
        put_u32(&mut data, FILE_ALIGNMENT as u32);
        for version in [4, 0, 0, 0, 4, 0] {
            put_u16(&mut data, version);
        }
        put_u32(&mut data, 0);
        put_u32(&mut data, size_of_image);
        put_u32(&mut data, TEXT_OFFSET as u32);
        put_u32(&mut data, 0);
        put_u16(&mut data, 3);
        put_u16(&mut data, 0x8560);
        for size in [0x10_0000_u64, 0x1000, 0x10_0000, 0x1000] {
            if self.pe32_plus {
                put_u64(&mut data, size);
            } else {
                put_u32(&mut data, size as u32);
            }
        }
        put_u32(&mut data, 0);
        put_u32(&mut data, 16);

        let mut directories = [(0_u32, 0_u32); 16];
        directories[6] = debug;
        directories[14] = (TEXT_RVA, 72);
        for (rva, size) in directories {
            put_u32(&mut data, rva);
            put_u32(&mut data, size);
        }

        data.extend_from_slice(b".text\0\0\0");
        put_u32(&mut data, virtual_size as u32);
        put_u32(&mut data, TEXT_RVA);
        put_u32(&mut data, raw_size as u32);
        put_u32(&mut data, TEXT_OFFSET as u32);
        put_u32(&mut data, 0);
        put_u32(&mut data, 0);
        put_u16(&mut data, 0);
        put_u16(&mut data, 0);
        put_u32(&mut data, 0x6000_0020);

        data.resize(TEXT_OFFSET, 0);
        data
    }
}
