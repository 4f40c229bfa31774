//! Minimal example: build a two-colour design, save it as .pes, read it back and print its layers.
//!
//! Run: cargo run --example build_and_read

use pescodec::{
    DesignDocument, DesignHeader, EmbroideryFile, Instruction, MachineDocument, PecBatch, Rgb,
    Thread,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let layers = vec![
        vec![
            Instruction::Stitch { dx: 5, dy: -3 },
            Instruction::Stitch { dx: 40, dy: 0 },
            Instruction::ColorChange(1),
        ],
        vec![Instruction::Jump { dx: -700, dy: 10 }, Instruction::Stop],
    ];
    let colors = vec![Rgb::new(0xE0, 0x10, 0x10), Rgb::new(0x10, 0x10, 0xE0)];
    let machine = MachineDocument::new("demo", layers, colors.clone())?;

    let threads = colors
        .iter()
        .enumerate()
        .map(|(i, c)| Thread {
            catalog_number: format!("{}", 100 + i),
            color: *c,
            brand: "demo".to_string(),
            ..Thread::default()
        })
        .collect();
    let doc = DesignDocument::new(
        DesignHeader {
            name: "demo".to_string(),
            ..DesignHeader::default()
        },
        threads,
        Vec::new(),
        PecBatch::new(vec![machine]),
    );

    let dir = std::env::temp_dir().join("pescodec-demo");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("demo.pes");
    let written = doc.save(&path)?;
    println!("wrote {} bytes to {}", written, path.display());

    match EmbroideryFile::open(&path)? {
        EmbroideryFile::Design(doc) => {
            println!("design {:?}, {} threads", doc.header.name, doc.threads.len());
            for (i, pec) in doc.batch.documents.iter().enumerate() {
                println!("machine document {} ({}x{}):", i, pec.width, pec.height);
                for (layer, color) in pec.layers.iter().zip(pec.layer_colors()) {
                    println!("  {:?}: {} instructions", color, layer.len());
                }
            }
        }
        EmbroideryFile::Machine(_) => println!("unexpected standalone machine file"),
    }
    Ok(())
}
