use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pointwise compression applied to one band of Mel power.
///
/// Every variant is a monotone bijection on `x >= 0`, so `inverse(forward(x))`
/// recovers `x` up to rounding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// ln(1 + x)
    Log1p,
    /// sqrt(ln(1 + x))
    SqrtLog1p,
    /// x^0.75
    Pow075,
}

const POW_EXPONENT: f64 = 0.75;

impl Compression {
    pub const ALL: [Compression; 3] = [Compression::Log1p, Compression::SqrtLog1p, Compression::Pow075];

    pub fn forward(self, x: f64) -> f64 {
        match self {
            Compression::Log1p => x.ln_1p(),
            Compression::SqrtLog1p => x.ln_1p().sqrt(),
            Compression::Pow075 => x.powf(POW_EXPONENT),
        }
    }

    pub fn inverse(self, y: f64) -> f64 {
        match self {
            Compression::Log1p => y.exp_m1(),
            Compression::SqrtLog1p => (y * y).exp_m1(),
            Compression::Pow075 => y.powf(1.0 / POW_EXPONENT),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Compression::Log1p => "log1p",
            Compression::SqrtLog1p => "sqrt_log1p",
            Compression::Pow075 => "pow075",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Compression::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                Error::config(format!(
                    "Unsupported compression '{}'. Valid: log1p, sqrt_log1p, pow075",
                    s
                ))
            })
    }
}

/// One frequency band of an HR-Mel layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    pub fmin: f64,
    pub fmax: f64,
    pub bins: usize,
    pub compression: Compression,
}

impl BandSpec {
    pub fn new(fmin: f64, fmax: f64, bins: usize, compression: Compression) -> Self {
        Self {
            fmin,
            fmax,
            bins,
            compression,
        }
    }

    /// Upper edge after clipping to the global ceiling.
    pub fn effective_fmax(&self, global_fmax: f64) -> f64 {
        self.fmax.min(global_fmax)
    }

    /// Check the band against a global ceiling (already clipped to Nyquist).
    pub fn validate(&self, global_fmax: f64) -> Result<()> {
        if self.bins == 0 {
            return Err(Error::config(format!("band {} has zero bins", self)));
        }
        if !self.fmin.is_finite() || !self.fmax.is_finite() {
            return Err(Error::config(format!("band {} has non-finite bounds", self)));
        }
        if self.fmin < 0.0 {
            return Err(Error::config(format!("band {} has negative fmin", self)));
        }
        let fmax = self.effective_fmax(global_fmax);
        if self.fmin >= fmax {
            return Err(Error::config(format!(
                "band {} has fmin >= effective fmax ({:.1} Hz)",
                self, fmax
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.fmin, self.fmax, self.bins, self.compression)
    }
}

/// Parses `fmin:fmax:bins:compression`, e.g. `0:1500:40:log1p`.
impl FromStr for BandSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [fmin, fmax, bins, compression] = parts.as_slice() else {
            return Err(Error::config(format!(
                "band '{}' must look like fmin:fmax:bins:compression",
                s
            )));
        };
        let number = |field: &str, value: &str| -> Result<f64> {
            value
                .parse::<f64>()
                .map_err(|_| Error::config(format!("band '{}': bad {} '{}'", s, field, value)))
        };
        Ok(BandSpec {
            fmin: number("fmin", *fmin)?,
            fmax: number("fmax", *fmax)?,
            bins: bins
                .parse::<usize>()
                .map_err(|_| Error::config(format!("band '{}': bad bins '{}'", s, bins)))?,
            compression: compression.parse()?,
        })
    }
}

/// Ordered list of bands; band `i` owns a contiguous block of output rows.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BandSet {
    bands: Vec<BandSpec>,
}

impl BandSet {
    /// Validates everything that does not depend on the sample rate.
    pub fn new(bands: Vec<BandSpec>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::config("band set is empty"));
        }
        for band in &bands {
            band.validate(f64::INFINITY)?;
        }
        Ok(Self { bands })
    }

    /// 40/32/24 bins split at 1.5 kHz and 6 kHz, sqrt-log on the top band.
    pub fn hr_default() -> Self {
        Self {
            bands: vec![
                BandSpec::new(0.0, 1_500.0, 40, Compression::Log1p),
                BandSpec::new(1_500.0, 6_000.0, 32, Compression::Log1p),
                BandSpec::new(6_000.0, 20_000.0, 24, Compression::SqrtLog1p),
            ],
        }
    }

    /// Single band spanning `[0, fmax]`, the uniform Mel baseline.
    pub fn uniform(bins: usize, fmax: f64, compression: Compression) -> Result<Self> {
        Self::new(vec![BandSpec::new(0.0, fmax, bins, compression)])
    }

    pub fn validate(&self, global_fmax: f64) -> Result<()> {
        self.bands.iter().try_for_each(|b| b.validate(global_fmax))
    }

    pub fn bands(&self) -> &[BandSpec] {
        &self.bands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BandSpec> {
        self.bands.iter()
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn total_bins(&self) -> usize {
        self.bands.iter().map(|b| b.bins).sum()
    }

    /// Half-open row range owned by each band.
    pub fn row_ranges(&self) -> Vec<std::ops::Range<usize>> {
        let mut start = 0;
        self.bands
            .iter()
            .map(|b| {
                let range = start..start + b.bins;
                start = range.end;
                range
            })
            .collect()
    }

    /// Short human-readable layout, e.g. `40/32/24 bins (log1p/log1p/sqrt_log1p)`.
    pub fn describe(&self) -> String {
        let bins: Vec<String> = self.bands.iter().map(|b| b.bins.to_string()).collect();
        let comps: Vec<&str> = self.bands.iter().map(|b| b.compression.as_str()).collect();
        format!("{} bins ({})", bins.join("/"), comps.join("/"))
    }
}

impl Default for BandSet {
    fn default() -> Self {
        Self::hr_default()
    }
}

impl<'de> Deserialize<'de> for BandSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bands = Vec::<BandSpec>::deserialize(deserializer)?;
        BandSet::new(bands).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a BandSet {
    type Item = &'a BandSpec;
    type IntoIter = std::slice::Iter<'a, BandSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.bands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_roundtrip() {
        for c in Compression::ALL {
            for x in [0.0, 1e-9, 0.5, 1.0, 37.0, 1e4, 1e9] {
                let back = c.inverse(c.forward(x));
                let tol = 1e-9 * x.max(1.0);
                assert!((back - x).abs() <= tol, "{}: {} -> {}", c, x, back);
            }
        }
    }

    #[test]
    fn compression_monotone() {
        for c in Compression::ALL {
            let ys: Vec<f64> = [0.0, 0.1, 1.0, 10.0, 1000.0].iter().map(|&x| c.forward(x)).collect();
            assert!(ys.windows(2).all(|w| w[1] > w[0]), "{} not increasing", c);
            assert_eq!(c.forward(0.0), 0.0);
        }
    }

    #[test]
    fn compression_parse() {
        assert_eq!("log1p".parse::<Compression>().unwrap(), Compression::Log1p);
        assert_eq!("sqrt_log1p".parse::<Compression>().unwrap(), Compression::SqrtLog1p);
        assert_eq!("pow075".parse::<Compression>().unwrap(), Compression::Pow075);
        assert!("mu_law".parse::<Compression>().unwrap_err().is_configuration());
    }

    #[test]
    fn compression_serde_tags() {
        let json = serde_json::to_string(&Compression::SqrtLog1p).unwrap();
        assert_eq!(json, "\"sqrt_log1p\"");
        let back: Compression = serde_json::from_str("\"pow075\"").unwrap();
        assert_eq!(back, Compression::Pow075);
        assert!(serde_json::from_str::<Compression>("\"cube_root\"").is_err());
    }

    #[test]
    fn band_spec_parse() {
        let band: BandSpec = "1500:6000:32:log1p".parse().unwrap();
        assert_eq!(band, BandSpec::new(1500.0, 6000.0, 32, Compression::Log1p));
        assert!("1500:6000:32".parse::<BandSpec>().is_err());
        assert!("a:6000:32:log1p".parse::<BandSpec>().is_err());
        assert!("0:6000:-3:log1p".parse::<BandSpec>().is_err());
        assert!("0:6000:3:gzip".parse::<BandSpec>().is_err());
    }

    #[test]
    fn band_validation() {
        assert!(BandSpec::new(0.0, 1000.0, 0, Compression::Log1p).validate(8000.0).is_err());
        assert!(BandSpec::new(-1.0, 1000.0, 4, Compression::Log1p).validate(8000.0).is_err());
        assert!(BandSpec::new(2000.0, 1000.0, 4, Compression::Log1p).validate(8000.0).is_err());
        // Clipping the top edge below fmin invalidates the band
        assert!(BandSpec::new(6000.0, 20000.0, 4, Compression::Log1p).validate(4000.0).is_err());
        assert!(BandSpec::new(6000.0, 20000.0, 4, Compression::Log1p).validate(8000.0).is_ok());
    }

    #[test]
    fn band_set_rejects_empty() {
        assert!(BandSet::new(Vec::new()).is_err());
    }

    #[test]
    fn row_ranges_contiguous() {
        let set = BandSet::hr_default();
        let ranges = set.row_ranges();
        assert_eq!(ranges, vec![0..40, 40..72, 72..96]);
        assert_eq!(set.total_bins(), 96);
        assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn describe_lists_bins_and_compressions() {
        assert_eq!(
            BandSet::hr_default().describe(),
            "40/32/24 bins (log1p/log1p/sqrt_log1p)"
        );
    }

    #[test]
    fn deserialize_validates() {
        let ok: BandSet = serde_json::from_str(
            r#"[{"fmin": 0, "fmax": 4000, "bins": 8, "compression": "pow075"}]"#,
        )
        .unwrap();
        assert_eq!(ok.total_bins(), 8);

        let zero_bins = serde_json::from_str::<BandSet>(
            r#"[{"fmin": 0, "fmax": 4000, "bins": 0, "compression": "log1p"}]"#,
        );
        assert!(zero_bins.is_err());
    }
}
