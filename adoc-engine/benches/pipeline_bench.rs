use std::hint::black_box;

use adoc_engine::{Options, parse_documents, parse_str};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

const HEADER: &str = "= Guide\n:product: Widget\n:imagesdir: images\n\n";

const PROSE: &str = "== Overview {counter:section}\n\n\
The *{product}* ships with _two_ modes, see <<setup>>.footnote:[Since 2.0.]\n\
Use `+{literal}+` text and kbd:[Ctrl+C] freely.\n\n\
image::{product}/diagram.png[Diagram, 640]\n\n";

const LISTS: &str = ". Prepare\n.. Unpack\n.. Verify\n* note\n. Install\n\n\
CPU:: Any\nRAM:: 4 GiB\n\n\
----\nrun <1>\nstop <2>\n----\n<1> Start it\n<2> Stop it\n\n";

const TABLE: &str = "[cols=\"1,2\"]\n|===\n|Name |Value\n\n|a |*b*\n|c |{product}\n|===\n\n";

fn repeated(body: &str, times: usize) -> String {
    let mut source = String::from(HEADER);
    for _ in 0..times {
        source.push_str(body);
    }
    source
}

fn pipeline_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let options = Options::default();

    let inputs = [
        ("prose", repeated(PROSE, 50)),
        ("lists", repeated(LISTS, 50)),
        ("tables", repeated(TABLE, 50)),
        ("mixed", repeated(&[PROSE, LISTS, TABLE].concat(), 50)),
    ];

    for (name, content) in &inputs {
        group.bench_with_input(BenchmarkId::new("parse", name), content, |b, input| {
            b.iter(|| black_box(parse_str(black_box(input), &options)));
        });
    }

    let batch = [PROSE, LISTS, TABLE].concat();
    let documents = vec![batch.as_str(); 64];
    group.bench_with_input(
        BenchmarkId::new("parse_documents", "64"),
        &documents,
        |b, inputs| {
            b.iter(|| black_box(parse_documents(black_box(inputs), &options)));
        },
    );

    group.finish();
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
