use criterion::{criterion_group, criterion_main, Criterion};
use lopdf::Document;

fn base_revision() -> (Vec<u8>, usize, usize) {
    let mut body = b"%PDF-1.7\n".to_vec();
    let obj1 = body.len();
    body.extend_from_slice(b"1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n");
    let obj2 = body.len();
    body.extend_from_slice(b"2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj\n");
    let obj3 = body.len();
    body.extend_from_slice(b"3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]>>endobj\n");

    let xref_start = body.len();
    body.extend_from_slice(b"xref\n0 4\n");
    body.extend_from_slice(b"0000000000 65535 f \n");
    for offset in [obj1, obj2, obj3] {
        body.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    body.extend_from_slice(format!("trailer\n<</Root 1 0 R/Size 4>>\nstartxref\n{xref_start}\n%%EOF\n").as_bytes());
    (body, obj3, xref_start)
}

fn plain_pdf() -> Vec<u8> {
    base_revision().0
}

/// A second revision that overrides object 3 and chains back to the first xref via
/// `/Prev`, exercising the incremental-update merge path.
fn incremental_pdf() -> Vec<u8> {
    let (mut body, _, first_xref_start) = base_revision();

    let obj3_new = body.len();
    body.extend_from_slice(b"3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 1000]>>endobj\n");

    let xref_start = body.len();
    body.extend_from_slice(b"xref\n3 1\n");
    body.extend_from_slice(format!("{obj3_new:010} 00000 n \n").as_bytes());
    body.extend_from_slice(
        format!("trailer\n<</Root 1 0 R/Size 4/Prev {first_xref_start}>>\nstartxref\n{xref_start}\n%%EOF").as_bytes(),
    );
    body
}

fn bench_load(c: &mut Criterion) {
    let buffer = plain_pdf();
    c.bench_function("load", |b| {
        b.iter(|| {
            Document::load_mem(&buffer).unwrap();
        })
    });
}

fn bench_load_incremental_pdf(c: &mut Criterion) {
    let buffer = incremental_pdf();
    c.bench_function("load_incremental_pdf", |b| {
        b.iter(|| {
            Document::load_mem(&buffer).unwrap();
        })
    });
}

criterion_group!(benches, bench_load, bench_load_incremental_pdf);
criterion_main!(benches);
