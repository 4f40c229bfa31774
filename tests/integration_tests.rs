//! End-to-end tests: build documents through the public API, encode, decode, compare.

use pescodec::{
    ColorEntry, DesignDocument, DesignHeader, DesignObject, EmbroideryFile, FileFormat,
    Instruction, MachineDocument, ObjectHeader, PecBatch, PecFile, Rgb, StitchBlock,
    StitchSegment, Thread,
};

fn two_layer_document() -> MachineDocument {
    MachineDocument::new(
        "scenario",
        vec![
            vec![
                Instruction::Stitch { dx: 5, dy: -3 },
                Instruction::ColorChange(1),
            ],
            vec![Instruction::Jump { dx: -700, dy: 10 }, Instruction::Stop],
        ],
        vec![Rgb::new(0xE0, 0x10, 0x10), Rgb::new(0x10, 0x10, 0xE0)],
    )
    .unwrap()
}

fn design(batch: PecBatch) -> DesignDocument {
    let header = DesignHeader {
        name: "scenario".into(),
        author: "tests".into(),
        show_grid: true,
        ..DesignHeader::default()
    };
    let threads = vec![
        Thread {
            catalog_number: "800".into(),
            color: Rgb::new(0xE0, 0x10, 0x10),
            color_type: 0x0A,
            chart_index: "1".into(),
            brand: "Madeira".into(),
            chart_name: "Polyneon".into(),
            ..Thread::default()
        },
        Thread {
            catalog_number: "405".into(),
            color: Rgb::new(0x10, 0x10, 0xE0),
            color_type: 0x0A,
            chart_index: "2".into(),
            brand: "Madeira".into(),
            chart_name: "Polyneon".into(),
            ..Thread::default()
        },
    ];
    let segment = StitchSegment::new(
        ObjectHeader {
            width: 705,
            height: 13,
            ..ObjectHeader::default()
        },
        vec![
            StitchBlock {
                stitch_type: 0,
                thread_index: 0,
                points: vec![[0, 0], [5, -3]],
            },
            StitchBlock {
                stitch_type: 1,
                thread_index: 1,
                points: vec![[5, -3], [-695, 7]],
            },
        ],
        vec![
            ColorEntry {
                block_index: 0,
                thread_index: 0,
            },
            ColorEntry {
                block_index: 1,
                thread_index: 1,
            },
        ],
    );
    DesignDocument::new(
        header,
        threads,
        vec![DesignObject::StitchSegment(segment)],
        batch,
    )
}

/// Two layers (stitch then colour change, jump then stop) and two colours survive encode then decode.
#[test]
fn two_layer_machine_document_round_trip() {
    let original = two_layer_document();
    let bytes = PecFile::new(original.clone()).to_bytes().unwrap();
    let decoded = PecFile::from_bytes(&bytes).unwrap();
    let doc = decoded.document().unwrap();

    assert_eq!(doc.layers, original.layers);
    assert_eq!(doc.thread_colors, original.thread_colors);
    assert_eq!(doc.thread_specs, original.thread_specs);
    assert_eq!(doc.thread_bitmaps, original.thread_bitmaps);
    assert_eq!(doc.index_table, original.index_table);
    assert_eq!(doc.layer_colors(), original.layer_colors());
}

/// A design with threads and one stitch segment decodes and re-encodes to the same bytes.
#[test]
fn design_document_re_encodes_byte_for_byte() {
    let doc = design(PecBatch::new(vec![two_layer_document()]));
    let bytes = doc.to_bytes().unwrap();
    let decoded = DesignDocument::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.header, doc.header);
    assert_eq!(decoded.threads, doc.threads);
    assert_eq!(decoded.objects, doc.objects);
    assert_eq!(decoded.to_bytes().unwrap(), bytes);
}

/// Unknown header blobs, thumbnail pixels, gap and trailing bytes come back unchanged.
#[test]
fn opaque_fields_survive_round_trip() {
    let mut machine = two_layer_document();
    machine.label = format!("{:<16}", "scenario");
    machine.unknown_after_label = *b"opaque-bytes-1";
    machine.unknown_after_hoop = [1, 2, 3, 4, 5, 6, 7, 8];
    machine.unknown_after_offset = [0x31, 0x32, 0x33];
    machine.thumbnails[0].set_pixel(10, 3, true);
    let mut doc = design(PecBatch::new(vec![machine]));
    doc.header.unknown_after_grid = [0xAB, 0xCD];
    doc.gap = vec![0x00, 0x11, 0x22];
    doc.trailing = vec![0x1A];

    let bytes = doc.to_bytes().unwrap();
    let decoded = DesignDocument::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, doc);
    assert_eq!(decoded.to_bytes().unwrap(), bytes);
}

/// The stored embedded offset points at the batch and moves with the bytes before it.
#[test]
fn embedded_offset_equals_bytes_before_batch() {
    let doc = design(PecBatch::new(vec![two_layer_document()]));
    let bytes = doc.to_bytes().unwrap();
    let stored = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
    assert_eq!(&bytes[stored..stored + 3], b"LA:");

    // Dropping the only object shortens the prefix but leaves the batch untouched.
    let mut fewer = doc.clone();
    fewer.objects.clear();
    let shorter = fewer.to_bytes().unwrap();
    let stored_shorter = u32::from_le_bytes(shorter[8..12].try_into().unwrap()) as usize;
    assert!(stored_shorter < stored);
    assert_eq!(&bytes[stored..], &shorter[stored_shorter..]);
}

/// The 127-entry copy equals the head of the 463-entry table before and after a cycle.
#[test]
fn redundant_index_table_is_prefix_of_full_table() {
    let doc = two_layer_document();
    let full = doc.index_table.as_bytes().to_vec();
    assert_eq!(full.len(), 463);
    assert_eq!(doc.index_table.redundant(), &full[..127]);

    let bytes = PecFile::new(doc).to_bytes().unwrap();
    let decoded = PecFile::from_bytes(&bytes).unwrap();
    let table = &decoded.document().unwrap().index_table;
    assert_eq!(table.as_bytes(), full.as_slice());
    assert_eq!(table.redundant(), &full[..127]);
}

/// Two machine documents in one design keep their own layers and colours.
#[test]
fn co_resident_machine_documents() {
    let second = MachineDocument::new(
        "second",
        vec![vec![
            Instruction::Trim { dx: 100, dy: -100 },
            Instruction::Stitch { dx: 1, dy: 1 },
            Instruction::Stop,
        ]],
        vec![Rgb::new(0, 0x80, 0)],
    )
    .unwrap();
    let doc = design(PecBatch::new(vec![two_layer_document(), second]));
    let bytes = doc.to_bytes().unwrap();

    match EmbroideryFile::from_bytes(&bytes).unwrap() {
        EmbroideryFile::Design(decoded) => {
            assert_eq!(decoded.batch.documents.len(), 2);
            assert_eq!(decoded.batch.documents[0].layers, doc.batch.documents[0].layers);
            assert_eq!(decoded.batch.documents[1].layers, doc.batch.documents[1].layers);
            assert_eq!(
                decoded.batch.documents[1].thread_colors,
                vec![Rgb::new(0, 0x80, 0)]
            );
            assert_eq!(decoded.to_bytes().unwrap(), bytes);
        }
        other => panic!("expected a design document, got {:?}", other.format()),
    }
}

/// `#PES0060` opens as a design and `#PEC0001` as a machine file.
#[test]
fn format_is_detected_from_version_literal() {
    let pes = design(PecBatch::new(vec![two_layer_document()]))
        .to_bytes()
        .unwrap();
    let pec = PecFile::new(two_layer_document()).to_bytes().unwrap();
    assert_eq!(
        EmbroideryFile::from_bytes(&pes).unwrap().format(),
        FileFormat::PesV6
    );
    assert_eq!(
        EmbroideryFile::from_bytes(&pec).unwrap().format(),
        FileFormat::PecV1
    );
}
