//! Catalog-wide contract checks: option sweeps, output extent, and agreement
//! between the batch, reference and streaming kernels.

use proptest::prelude::*;
use tind_rs::contract::rows_for;
use tind_rs::{registry, ErrorKind, IndicatorDescriptor, Stream};

const OPTION_GRID: [f64; 4] = [-20.0, 0.0, 0.7, 5.0];
const SIZES: [usize; 5] = [0, 1, 2, 5, 210];
const SENTINEL: f64 = -123_456.0;

/// Deterministic positive series, distinct per input slot.
fn series(size: usize, slot: usize) -> Vec<f64> {
    let mut x = 0x2545_f491_u64.wrapping_mul(slot as u64 + 1);
    (0..size)
        .map(|_| {
            x = x.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            1.0 + (x >> 11) as f64 / (1u64 << 53) as f64 * 999.0
        })
        .collect()
}

fn option_sets(n: usize) -> Vec<Vec<f64>> {
    let mut sets = vec![Vec::new()];
    for _ in 0..n {
        sets = sets
            .into_iter()
            .flat_map(|s| {
                OPTION_GRID.iter().map(move |&o| {
                    let mut s = s.clone();
                    s.push(o);
                    s
                })
            })
            .collect();
    }
    sets
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b || (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[track_caller]
fn assert_columns(d: &IndicatorDescriptor, what: &str, a: &[Vec<f64>], b: &[Vec<f64>]) {
    assert_eq!(a.len(), b.len(), "{} {what}: output count", d.name);
    for (o, (x, y)) in a.iter().zip(b).enumerate() {
        assert_eq!(x.len(), y.len(), "{} {what}: output {o} length", d.name);
        for (i, (&p, &q)) in x.iter().zip(y).enumerate() {
            assert!(same(p, q), "{} {what}: output {o}[{i}] {p} != {q}", d.name);
        }
    }
}

/// Runs a kernel into sentinel-filled buffers one longer than needed.
fn run_guarded(
    d: &IndicatorDescriptor,
    reference: bool,
    inputs: &[&[f64]],
    options: &[f64],
    out_len: usize,
) -> Vec<Vec<f64>> {
    let mut columns = vec![vec![SENTINEL; out_len + 1]; d.output_names.len()];
    let mut outputs: Vec<&mut [f64]> = columns.iter_mut().map(Vec::as_mut_slice).collect();
    let written = if reference {
        d.run_ref(inputs, options, &mut outputs)
    } else {
        d.run(inputs, options, &mut outputs)
    }
    .unwrap();
    assert_eq!(written, out_len, "{}", d.name);
    for c in &mut columns {
        assert_eq!(c.pop(), Some(SENTINEL), "{} wrote past its extent", d.name);
    }
    columns
}

fn stream_all(d: &'static IndicatorDescriptor, inputs: &[&[f64]], options: &[f64]) -> Vec<Vec<f64>> {
    let mut s = Stream::new(d, options).unwrap();
    s.feed(inputs).unwrap()
}

fn check_case(d: &'static IndicatorDescriptor, inputs: &[&[f64]], options: &[f64]) {
    let size = inputs[0].len();
    let lookback = match d.lookback(options) {
        Ok(l) => l,
        Err(e) => {
            assert_eq!(e.kind(), ErrorKind::InvalidParameter, "{} {options:?}", d.name);
            assert!(d.compute(inputs, options).is_err());
            if d.supports_streaming() {
                assert!(Stream::new(d, options).is_err());
            }
            return;
        }
    };

    if size <= lookback {
        let e = d.compute(inputs, options).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidParameter, "{} size {size}", d.name);
        if d.supports_streaming() {
            let out = stream_all(d, inputs, options);
            assert!(out.iter().all(Vec::is_empty), "{} produced rows in warm-up", d.name);
        }
        return;
    }

    let batch = run_guarded(d, false, inputs, options, size - lookback);
    if d.has_reference() {
        let reference = run_guarded(d, true, inputs, options, size - lookback);
        assert_columns(d, "ref", &batch, &reference);
    }
    if d.supports_streaming() {
        assert_columns(d, "stream", &batch, &stream_all(d, inputs, options));
    }
}

#[test]
fn option_and_size_sweep() {
    for d in registry().iter() {
        let data: Vec<Vec<f64>> = (0..d.input_names.len()).map(|i| series(210, i)).collect();
        let zeros = vec![0.0; 210];
        for options in option_sets(d.option_names.len()) {
            for size in SIZES {
                let distinct: Vec<&[f64]> = data.iter().map(|s| &s[..size]).collect();
                check_case(d, &distinct, &options);

                let duplicate = vec![&data[0][..size]; d.input_names.len()];
                check_case(d, &duplicate, &options);

                let zero = vec![&zeros[..size]; d.input_names.len()];
                check_case(d, &zero, &options);
            }
        }
    }
}

#[test]
fn duplicated_inputs_match_separate_copies() {
    let base = series(64, 0);
    for d in registry().iter() {
        let options = vec![5.0; d.option_names.len()];
        let copies: Vec<Vec<f64>> = vec![base.clone(); d.input_names.len()];
        let separate: Vec<&[f64]> = copies.iter().map(Vec::as_slice).collect();
        let shared = vec![&base[..]; d.input_names.len()];
        let a = d.compute(&separate, &options).unwrap();
        let b = d.compute(&shared, &options).unwrap();
        assert_eq!(a, b, "{}", d.name);
    }
}

#[test]
fn arity_and_length_errors() {
    for d in registry().iter() {
        let options = vec![5.0; d.option_names.len()];
        let x = series(20, 0);

        let too_many = vec![&x[..]; d.input_names.len() + 1];
        assert!(d.compute(&too_many, &options).is_err(), "{}", d.name);

        if d.input_names.len() > 1 {
            let mut ragged = vec![&x[..]; d.input_names.len()];
            ragged[1] = &x[..19];
            assert!(d.compute(&ragged, &options).is_err(), "{}", d.name);
        }

        let inputs = vec![&x[..]; d.input_names.len()];
        let short_options = vec![5.0; d.option_names.len() + 1];
        assert!(d.compute(&inputs, &short_options).is_err(), "{}", d.name);
    }
}

#[test]
fn ready_follows_progress() {
    for d in registry().iter().filter(|d| d.supports_streaming()) {
        let options = vec![3.0; d.option_names.len()];
        let lookback = d.lookback(&options).unwrap();
        let mut s = Stream::new(d, &options).unwrap();
        assert_eq!(s.progress(), -(lookback as i32), "{}", d.name);
        let bar = vec![10.0; d.input_names.len()];
        for i in 0..=lookback {
            assert!(!s.is_ready(), "{}", d.name);
            let row = s.next(&bar).unwrap();
            assert_eq!(row.is_some(), i == lookback, "{}", d.name);
        }
        assert!(s.is_ready(), "{}", d.name);
    }
}

fn streaming_descriptors() -> Vec<&'static IndicatorDescriptor> {
    registry().iter().filter(|d| d.supports_streaming()).collect()
}

proptest! {
    #[test]
    fn chunked_streams_match_batch(
        values in prop::collection::vec(1.0f64..1000.0, 1..120),
        chunks in prop::collection::vec(1usize..9, 1..40),
        which in 0usize..64,
    ) {
        let descriptors = streaming_descriptors();
        let d = descriptors[which % descriptors.len()];
        let options = vec![3.0; d.option_names.len()];
        let columns: Vec<Vec<f64>> = (0..d.input_names.len())
            .map(|slot| values.iter().map(|v| v + slot as f64).collect())
            .collect();
        let inputs: Vec<&[f64]> = columns.iter().map(Vec::as_slice).collect();

        let mut s = Stream::new(d, &options).unwrap();
        let mut streamed = vec![Vec::new(); d.output_names.len()];
        let mut at = 0;
        let mut chunk = chunks.iter().cycle();
        while at < values.len() {
            let n = (*chunk.next().unwrap()).min(values.len() - at);
            let window: Vec<&[f64]> = inputs.iter().map(|c| &c[at..at + n]).collect();
            let expected_rows = rows_for(s.progress(), n);
            let rows = s.feed(&window).unwrap();
            prop_assert_eq!(rows[0].len(), expected_rows);
            for (acc, r) in streamed.iter_mut().zip(rows) {
                acc.extend(r);
            }
            at += n;
        }

        match d.compute(&inputs, &options) {
            Ok(batch) => {
                for (b, st) in batch.iter().zip(&streamed) {
                    prop_assert_eq!(b.len(), st.len());
                    for (&x, &y) in b.iter().zip(st) {
                        prop_assert!(same(x, y), "{}: {} != {}", d.name, x, y);
                    }
                }
            }
            Err(_) => {
                prop_assert!(streamed.iter().all(Vec::is_empty));
            }
        }
    }
}
