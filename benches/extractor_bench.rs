use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use domain_spider::extractor::{decode_escapes, DomainExtractor, TldTable};

fn sample_page() -> Vec<u8> {
    let mut html = String::from("<html><head><style>.x{}</style></head><body>");
    for i in 0..200 {
        html.push_str(&format!(
            "<p>Item {i}: visit shop-{i}.com, mirror-{i}%2Enet or cdn.assets-{i}.co.uk</p>\
             <script>{{\"u\":\"https:\\u002F\\u002Fapi-{i}.io\"}}</script>"
        ));
    }
    html.push_str("</body></html>");
    html.into_bytes()
}

fn bench_find_domains(c: &mut Criterion) {
    let extractor = DomainExtractor::new(Arc::new(TldTable::builtin().unwrap()));
    let page = sample_page();

    c.bench_function("find_domains_200_items", |b| {
        b.iter(|| extractor.find_domains(black_box(&page)))
    });
}

fn bench_decode_escapes(c: &mut Criterion) {
    let text = String::from_utf8(sample_page()).unwrap();

    c.bench_function("decode_escapes", |b| b.iter(|| decode_escapes(black_box(&text))));
}

fn bench_tld_split(c: &mut Criterion) {
    let tlds = TldTable::builtin().unwrap();

    c.bench_function("tld_split", |b| {
        b.iter(|| tlds.split(black_box("docs.api.widgets.co.uk")))
    });
}

criterion_group!(benches, bench_find_domains, bench_decode_escapes, bench_tld_split);
criterion_main!(benches);
