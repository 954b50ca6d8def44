use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use csv_unify::config::EngineConfig;
use csv_unify::project::RowProjector;
use csv_unify::schema::UnifiedSchema;
use csv_unify::source::{Provenance, SourceFile};

fn generate_flights(rows: usize) -> Vec<u8> {
    let mut text = String::from(
        "empresa;ano;mes;aeroporto origem;aeroporto destino;decolagens;assentos\n",
    );
    for i in 0..rows {
        let month = (i % 12) + 1;
        let takeoffs = i % 90;
        text.push_str(&format!(
            "\"AZU;LINHAS AEREAS\";2024;{month};SBGR;SBRJ;{takeoffs};{seats}\n",
            seats = takeoffs * 118,
        ));
    }
    text.into_bytes()
}

fn bench_projection(c: &mut Criterion) {
    let bytes = generate_flights(20_000);
    let config = EngineConfig::for_table("anac");
    let file = SourceFile::resolve("basica2024-01.txt", &bytes, &config).expect("resolve");
    let unified = UnifiedSchema::from_raw_headers(&file.raw_headers);
    let provenance = Provenance::for_file("basica2024-01.txt", &config);

    let mut group = c.benchmark_group("projection");

    group.bench_function("resolve_20k_rows", |b| {
        b.iter_batched(
            || (),
            |_| SourceFile::resolve("basica2024-01.txt", &bytes, &config).expect("resolve"),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("project_20k_rows", |b| {
        let projector = RowProjector::new(&unified);
        b.iter_batched(
            || (),
            |_| projector.project_file(&file, &provenance),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("serialize_20k_rows", |b| {
        let projector = RowProjector::new(&unified);
        let batch = projector.project_file(&file, &provenance);
        b.iter_batched(
            || (),
            |_| batch.to_delimited_bytes(b';').expect("serialize"),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_projection);
criterion_main!(benches);
