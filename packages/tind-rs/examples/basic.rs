use tind_rs::{registry, Args, Indicator};

// Batch calls through the host adapter; outputs are left-padded with NaN.
// See `examples/streaming.rs` for bar-by-bar evaluation.

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("{} indicators, built at {}", registry().count(), registry().build_timestamp());

    let close: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0).collect();

    let bbands = Indicator::find("bbands").unwrap();
    let out = bbands
        .call(&Args::new().arg(&close).kwarg("period", 20.0).kwarg("stddev", 2.0))
        .unwrap();
    println!("{} lookback={}", out.label(), out.lookback());
    for name in out.names() {
        println!("{name}_last={:.4}", out.get(name).unwrap()[close.len() - 1]);
    }

    let rsi = Indicator::find("rsi").unwrap();
    let out = rsi.call(&Args::new().arg(&close).arg(14.0)).unwrap();
    println!("rsi_last={:.2}", out.get("rsi").unwrap()[close.len() - 1]);

    if let Err(e) = rsi.call(&Args::new().arg(&close).arg(-1.0)) {
        println!("rejected: {e}");
    }
}
