use criterion::{criterion_group, criterion_main, Criterion};

use lopdf::parser::{self, ParserInput};

fn sample_content_stream() -> Vec<u8> {
    let mut content = Vec::new();
    for _ in 0..200 {
        content.extend_from_slice(b"q 1 0 0 1 0 0 cm BT /F1 12 Tf 100 700 Td (Hello, world!) Tj ET Q\n");
    }
    content
}

fn bench_parse_content_stream(c: &mut Criterion) {
    let buffer = sample_content_stream();
    c.bench_function("parse_content_stream", |b| {
        b.iter(|| {
            let parsed = parser::content(ParserInput::new_extra(&buffer, "bench")).unwrap();
            assert_eq!(parsed.operations.len(), 200 * 8);
        })
    });
}

criterion_group!(benches, bench_parse_content_stream);
criterion_main!(benches);
