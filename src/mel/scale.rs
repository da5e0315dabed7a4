//! Slaney Mel scale: linear below 1 kHz, logarithmic above.

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;
// ln(6.4) / 27
const LOGSTEP: f64 = 0.068_751_777_420_949_12;

pub fn hz_to_mel(freq: f64) -> f64 {
    if freq < MIN_LOG_HZ {
        freq / F_SP
    } else {
        MIN_LOG_MEL + (freq / MIN_LOG_HZ).ln() / LOGSTEP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * ((mel - MIN_LOG_MEL) * LOGSTEP).exp()
    }
}

/// `n` frequencies evenly spaced on the Mel scale over `[fmin, fmax]`.
pub fn mel_frequencies(n: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    match n {
        0 => Vec::new(),
        1 => vec![fmin],
        _ => (0..n)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n - 1) as f64))
            .collect(),
    }
}

/// Centre frequency of each FFT bin, `0..=n_fft/2`.
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f64> {
    (0..=n_fft / 2)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mel_scale_roundtrip() {
        for freq in [0.0, 100.0, 500.0, 1000.0, 2000.0, 6000.0, 20000.0] {
            let back = mel_to_hz(hz_to_mel(freq));
            assert!((freq - back).abs() < 1e-6, "failed for {}", freq);
        }
    }

    #[test]
    fn breakpoint() {
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
        assert!((hz_to_mel(500.0) - 2.0 * hz_to_mel(250.0)).abs() < 1e-9);
    }

    #[test]
    fn mel_frequencies_endpoints() {
        let f = mel_frequencies(10, 1500.0, 6000.0);
        assert_eq!(f.len(), 10);
        assert!((f[0] - 1500.0).abs() < 1e-6);
        assert!((f[9] - 6000.0).abs() < 1e-6);
        assert!(f.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn fft_frequencies_span_dc_to_nyquist() {
        let f = fft_frequencies(44100, 2048);
        assert_eq!(f.len(), 1025);
        assert_eq!(f[0], 0.0);
        assert!((f[1024] - 22050.0).abs() < 1e-9);
    }
}
