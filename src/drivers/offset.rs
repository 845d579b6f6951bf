/// Baseline-corrected value of a raw sample. Applied once, at ingestion time.
#[inline]
pub fn corrected(raw: f64, offset: f64) -> f64 {
    raw - offset
}
