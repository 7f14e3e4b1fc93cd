use tind_rs::Stream;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut atr = Stream::open("atr", &[14.0]).unwrap();
    let mut ema = Stream::open("ema", &[20.0]).unwrap();

    for i in 0..100 {
        let close = 100.0 + (i as f64 * 0.2).cos() * 3.0;
        let (high, low) = (close + 0.5, close - 0.5);

        let atr_row = atr.next(&[high, low, close]).unwrap();
        let ema_row = ema.next(&[close]).unwrap();
        if i % 10 == 9 {
            println!(
                "bar={i} atr_ready={} atr={:?} ema={:?}",
                atr.is_ready(),
                atr_row,
                ema_row
            );
        }
    }
}
