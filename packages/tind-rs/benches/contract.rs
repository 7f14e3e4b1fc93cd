use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tind_rs::{find_indicator, Stream};

fn series(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0 + i as f64 * 0.01).collect()
}

fn bench_kernels(c: &mut Criterion) {
    let data = series(10_000);
    let volume: Vec<f64> = data.iter().map(|x| x * 10.0).collect();

    let mut group = c.benchmark_group("kernels");
    for (name, options) in [
        ("sma", vec![20.0]),
        ("bbands", vec![20.0, 2.0]),
        ("vwap", vec![20.0]),
        ("max", vec![50.0]),
        ("atr", vec![14.0]),
    ] {
        let d = find_indicator(name).unwrap_or_else(|e| panic!("{e}"));
        let inputs: Vec<&[f64]> = d
            .input_names
            .iter()
            .map(|n| if *n == "volume" { &volume[..] } else { &data[..] })
            .collect();
        let out_len = d.output_len(data.len(), &options).unwrap();
        let mut columns = vec![vec![0.0; out_len]; d.output_names.len()];

        group.bench_function(BenchmarkId::new("batch", name), |b| {
            b.iter(|| {
                let mut outputs: Vec<&mut [f64]> = columns.iter_mut().map(Vec::as_mut_slice).collect();
                d.run(black_box(&inputs), &options, &mut outputs).unwrap()
            })
        });

        if d.has_reference() {
            group.bench_function(BenchmarkId::new("ref", name), |b| {
                b.iter(|| {
                    let mut outputs: Vec<&mut [f64]> = columns.iter_mut().map(Vec::as_mut_slice).collect();
                    d.run_ref(black_box(&inputs), &options, &mut outputs).unwrap()
                })
            });
        }

        if d.supports_streaming() {
            group.bench_function(BenchmarkId::new("stream_all", name), |b| {
                b.iter(|| {
                    let mut s = Stream::new(d, &options).unwrap();
                    s.feed(black_box(&inputs)).unwrap()
                })
            });

            group.bench_function(BenchmarkId::new("stream_1", name), |b| {
                let mut row = vec![0.0; d.output_names.len()];
                b.iter(|| {
                    let mut s = Stream::new(d, &options).unwrap();
                    for i in 0..data.len() {
                        let bar: Vec<&[f64]> = inputs.iter().map(|c| &c[i..=i]).collect();
                        let mut outputs: Vec<&mut [f64]> = row.chunks_mut(1).collect();
                        s.run(&bar, &mut outputs).unwrap();
                    }
                    black_box(s.progress())
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_kernels);
criterion_main!(benches);
