use criterion::{criterion_group, criterion_main, Criterion};

use lopdf::encodings::{decode_text_string, format_pdf_date, parse_pdf_date, PdfDate};

fn parse_and_format_datetime(c: &mut Criterion) {
    c.bench_function("parse_and_format_datetime", |b| {
        b.iter(|| {
            let date = parse_pdf_date(b"D:20230615103000-05'00'").unwrap();
            let formatted = format_pdf_date(&date);
            assert!(parse_pdf_date(formatted.as_bytes()).is_some());
        });
    });
}

fn parse_year_only_datetime(c: &mut Criterion) {
    c.bench_function("parse_year_only_datetime", |b| {
        b.iter(|| {
            let date = parse_pdf_date(b"D:2024").unwrap();
            assert_eq!(date, PdfDate { year: 2024, ..PdfDate::default() });
        });
    });
}

fn decode_utf16_text_string(c: &mut Criterion) {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in "Produced by lopdf".encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    c.bench_function("decode_utf16_text_string", |b| {
        b.iter(|| {
            let decoded = decode_text_string(&bytes);
            assert!(!decoded.is_empty());
        });
    });
}

criterion_group!(benches, parse_and_format_datetime, parse_year_only_datetime, decode_utf16_text_string);
criterion_main!(benches);
