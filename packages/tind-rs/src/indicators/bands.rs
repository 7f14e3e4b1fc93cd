//! Envelope indicators: three outputs (lower, middle, upper).

use super::volatility::{rolling_moments, MovingMoments};
use crate::contract::{non_negative, period, Incremental, StreamKernel, Streaming};
use crate::error::{Result, TindError};

fn three_outputs<'a, 'b>(
    indicator: &'static str,
    outputs: &'a mut [&'b mut [f64]],
) -> Result<&'a mut [&'b mut [f64]; 3]> {
    let actual = outputs.len();
    outputs.try_into().map_err(|_| TindError::Arity {
        indicator,
        slot: "outputs",
        expected: 3,
        actual,
    })
}

// ===== bbands =====

pub fn bbands_start(options: &[f64]) -> Result<usize> {
    Ok(period(options, 0)? - 1)
}

pub fn bbands(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let period = period(options, 0)?;
    let k = options[1];
    let [lower, middle, upper] = three_outputs("bbands", outputs)?;
    rolling_moments(inputs[0], period, |i, mean, var| {
        let sd = var.max(0.0).sqrt();
        lower[i] = mean - k * sd;
        middle[i] = mean;
        upper[i] = mean + k * sd;
    });
    Ok(())
}

struct BbandsStream {
    k: f64,
    moments: MovingMoments,
}

impl Incremental for BbandsStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let (mean, var) = self.moments.push(bar[0]);
        let sd = var.max(0.0).sqrt();
        out[0] = mean - self.k * sd;
        out[1] = mean;
        out[2] = mean + self.k * sd;
    }
}

pub fn bbands_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let period = period(options, 0)?;
    Streaming::boxed(
        period - 1,
        BbandsStream {
            k: options[1],
            moments: MovingMoments::new(period)?,
        },
    )
}

// ===== kc =====

pub fn kc_start(options: &[f64]) -> Result<usize> {
    period(options, 0)?;
    non_negative(options, 1)?;
    Ok(0)
}

/// Keltner range: `max(high, prev_close) - min(low, prev_close)`.
#[inline]
fn kc_range(high: f64, low: f64, prev_close: f64) -> f64 {
    high.max(prev_close) - low.min(prev_close)
}

pub fn kc(inputs: &[&[f64]], options: &[f64], outputs: &mut [&mut [f64]]) -> Result<()> {
    let (high, low, close) = (inputs[0], inputs[1], inputs[2]);
    let per = 2.0 / (period(options, 0)? as f64 + 1.0);
    let multiple = non_negative(options, 1)?;
    let [lower, middle, upper] = three_outputs("kc", outputs)?;

    let mut price_ema = close[0];
    let mut tr_ema = high[0] - low[0];
    lower[0] = price_ema - multiple * tr_ema;
    middle[0] = price_ema;
    upper[0] = price_ema + multiple * tr_ema;
    for i in 1..close.len() {
        price_ema = (close[i] - price_ema) * per + price_ema;
        let range = kc_range(high[i], low[i], close[i - 1]);
        tr_ema = (range - tr_ema) * per + tr_ema;
        lower[i] = price_ema - multiple * tr_ema;
        middle[i] = price_ema;
        upper[i] = price_ema + multiple * tr_ema;
    }
    Ok(())
}

struct KcStream {
    per: f64,
    multiple: f64,
    // (price_ema, tr_ema, prev_close)
    state: Option<(f64, f64, f64)>,
}

impl Incremental for KcStream {
    fn push(&mut self, bar: &[f64], out: &mut [f64]) {
        let (high, low, close) = (bar[0], bar[1], bar[2]);
        let (price_ema, tr_ema) = match self.state {
            None => (close, high - low),
            Some((price_ema, tr_ema, prev_close)) => {
                let range = kc_range(high, low, prev_close);
                (
                    (close - price_ema) * self.per + price_ema,
                    (range - tr_ema) * self.per + tr_ema,
                )
            }
        };
        self.state = Some((price_ema, tr_ema, close));
        out[0] = price_ema - self.multiple * tr_ema;
        out[1] = price_ema;
        out[2] = price_ema + self.multiple * tr_ema;
    }
}

pub fn kc_stream_new(options: &[f64]) -> Result<Box<dyn StreamKernel>> {
    let per = 2.0 / (period(options, 0)? as f64 + 1.0);
    let multiple = non_negative(options, 1)?;
    Streaming::boxed(
        0,
        KcStream {
            per,
            multiple,
            state: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_util::{assert_close, batch, stream_chunked, stream_one_by_one};

    const CLOSE: [f64; 10] = [10.0, 10.5, 10.2, 10.8, 11.4, 11.1, 11.9, 12.3, 12.0, 12.6];

    #[test]
    fn bbands_middle_is_sma_and_bands_are_symmetric() {
        let out = batch(bbands, &[&CLOSE[..]], &[4.0, 2.0], 3, 3);
        let sma = batch(super::super::average::sma, &[&CLOSE[..]], &[4.0], 3, 1);
        assert_close(&out[1], &sma[0], 1e-12);
        for i in 0..out[1].len() {
            let up = out[2][i] - out[1][i];
            let down = out[1][i] - out[0][i];
            assert!((up - down).abs() < 1e-9);
            assert!(up >= 0.0);
        }
    }

    #[test]
    fn kc_first_row_uses_high_low_range() {
        let high = [11.0, 11.0];
        let low = [9.0, 10.0];
        let close = [10.0, 10.5];
        let out = batch(kc, &[&high[..], &low[..], &close[..]], &[3.0, 2.0], 0, 3);
        assert_close(&out[0][..1], &[6.0], 1e-12);
        assert_close(&out[1][..1], &[10.0], 1e-12);
        assert_close(&out[2][..1], &[14.0], 1e-12);
        // per = 0.5; ema 10.25; range max(11,10)-min(10,10) = 1, tr_ema 1.5
        assert_close(&out[1][1..], &[10.25], 1e-12);
        assert_close(&out[2][1..], &[13.25], 1e-12);
    }

    #[test]
    fn kc_rejects_negative_multiple() {
        assert!(kc_start(&[3.0, -0.1]).is_err());
        assert!(kc_start(&[0.0, 1.0]).is_err());
        assert!(kc_stream_new(&[3.0, -1.0]).is_err());
        assert_eq!(kc_start(&[3.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn wrong_output_count_is_an_arity_error() {
        let mut only = [0.0; 10];
        let e = bbands(&[&CLOSE[..]], &[3.0, 2.0], &mut [&mut only[..]]).unwrap_err();
        assert!(matches!(
            e,
            TindError::Arity { indicator: "bbands", slot: "outputs", expected: 3, actual: 1 }
        ));
        let e = kc(&[&CLOSE[..], &CLOSE[..], &CLOSE[..]], &[3.0, 1.0], &mut []).unwrap_err();
        assert!(matches!(e, TindError::Arity { indicator: "kc", actual: 0, .. }));
    }

    #[test]
    fn streams_agree_with_batch() {
        let b = batch(bbands, &[&CLOSE[..]], &[3.0, 1.5], 2, 3);
        let s = stream_chunked(bbands_stream_new, &[&CLOSE[..]], &[3.0, 1.5], 3, 4);
        for o in 0..3 {
            assert_close(&s[o], &b[o], 1e-9);
        }

        let high: Vec<f64> = CLOSE.iter().map(|c| c + 0.4).collect();
        let low: Vec<f64> = CLOSE.iter().map(|c| c - 0.3).collect();
        let inputs = [&high[..], &low[..], &CLOSE[..]];
        let b = batch(kc, &inputs, &[4.0, 1.0], 0, 3);
        let s = stream_one_by_one(kc_stream_new, &inputs, &[4.0, 1.0], 3);
        for o in 0..3 {
            assert_close(&s[o], &b[o], 1e-9);
        }
    }
}
