use criterion::{criterion_group, criterion_main, Criterion};

use lopdf::Document;

/// A PDF with `count` simple indirect dictionary objects and a matching classic xref
/// table, offsets computed from the actual bytes written.
fn generate_pdf(count: u32) -> Vec<u8> {
    let mut body = b"%PDF-1.7\n".to_vec();
    let mut offsets = Vec::with_capacity(count as usize + 1);

    offsets.push(body.len());
    body.extend_from_slice(b"1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n");
    offsets.push(body.len());
    body.extend_from_slice(b"2 0 obj<</Type/Pages/Kids[]/Count 0>>endobj\n");

    for i in 3..=count {
        offsets.push(body.len());
        body.extend_from_slice(format!("{i} 0 obj<</Type/TestObj/Value {i}/Next {} 0 R>>endobj\n", i + 1).as_bytes());
    }

    let xref_start = body.len();
    body.extend_from_slice(format!("xref\n0 {}\n", count + 1).as_bytes());
    body.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        body.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    body.extend_from_slice(format!("trailer\n<</Root 1 0 R/Size {}>>\nstartxref\n{xref_start}\n%%EOF", count + 1).as_bytes());
    body
}

fn bench_load_many_objects(c: &mut Criterion) {
    let buffer = generate_pdf(2000);
    c.bench_function("load_many_objects", |b| {
        b.iter(|| {
            let doc = Document::load_mem(&buffer).unwrap();
            assert_eq!(doc.max_id, 2000);
        })
    });
}

fn bench_load_small_document(c: &mut Criterion) {
    let buffer = generate_pdf(10);
    c.bench_function("load_small_document", |b| {
        b.iter(|| {
            let _ = Document::load_mem(&buffer).unwrap();
        })
    });
}

criterion_group!(benches, bench_load_many_objects, bench_load_small_document);
criterion_main!(benches);
