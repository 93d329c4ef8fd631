use criterion::{criterion_group, criterion_main, Criterion};

use lopdf::object_stream::ObjectStream;
use lopdf::{Dictionary, Object, Stream};

fn build_object_stream_content() -> Stream {
    let mut header = String::new();
    let mut body = String::new();
    let mut offset = 0usize;
    for i in 1..=100 {
        let obj = format!("<</Type/TestObj/Value {i}>>");
        header.push_str(&format!("{i} {offset} "));
        offset += obj.len() + 1;
        body.push_str(&obj);
        body.push(' ');
    }
    let content = format!("{header}{body}");
    let mut dict = Dictionary::new();
    dict.set(b"Type".to_vec(), Object::Name(b"ObjStm".to_vec()));
    dict.set(b"N".to_vec(), Object::Integer(100));
    dict.set(b"First".to_vec(), Object::Integer(header.len() as i64));
    dict.set(b"Length".to_vec(), Object::Integer(content.len() as i64));
    Stream::new(dict, content.into_bytes())
}

fn bench_object_stream_parse(c: &mut Criterion) {
    let template = build_object_stream_content();
    c.bench_function("object_stream_parse", |b| {
        b.iter(|| {
            let mut stream = template.clone();
            let parsed = ObjectStream::new(&mut stream).unwrap();
            assert_eq!(parsed.objects.len(), 100);
        })
    });
}

criterion_group!(benches, bench_object_stream_parse);
criterion_main!(benches);
