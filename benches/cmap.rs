use criterion::{criterion_group, criterion_main, Criterion};

use lopdf::cmap::CMap;

fn sample_tounicode_cmap() -> Vec<u8> {
    let mut bfrange = String::new();
    for i in 0..90u32 {
        let low = 0x20 + i;
        let high = low;
        bfrange.push_str(&format!("<{low:04X}> <{high:04X}> <{:04X}>\n", low));
    }
    format!(
        "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo <</Registry (Adobe) /Ordering (UCS) /Supplement 0>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
{bfrange}endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end"
    )
    .into_bytes()
}

fn bench_parse_cmap(c: &mut Criterion) {
    let buffer = sample_tounicode_cmap();
    c.bench_function("parse_cmap", |b| {
        b.iter(|| {
            let cmap = CMap::parse(&buffer).unwrap();
            assert!(!cmap.code_to_unicode.is_empty());
        })
    });
}

fn bench_decode_bytes(c: &mut Criterion) {
    let cmap = CMap::parse(&sample_tounicode_cmap()).unwrap();
    let data: Vec<u8> = (0..200).flat_map(|i| [0x00u8, 0x20 + (i % 80) as u8]).collect();
    c.bench_function("decode_bytes", |b| {
        b.iter(|| {
            let (decoded, _missing) = cmap.decode_bytes(&data);
            assert!(!decoded.is_empty());
        })
    });
}

criterion_group!(benches, bench_parse_cmap, bench_decode_bytes);
criterion_main!(benches);
