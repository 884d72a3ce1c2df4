use std::{f32::consts::PI, fmt, sync::Arc, time::Duration};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{track::DecodedTrack, Tuning};

const SMOOTHING: f32 = 0.8;
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Read-only snapshot of per-bin spectral magnitudes on a 0-255 scale.
///
/// One snapshot is produced per query and overwritten by the next; no
/// history is retained anywhere in the analysis path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencySample {
    bins: Vec<u8>,
}

impl FrequencySample {
    /// A zero-filled sample, the "no sound" value.
    pub fn silent(bin_count: usize) -> Self {
        Self {
            bins: vec![0; bin_count],
        }
    }

    /// Builds a sample from raw bin magnitudes. Mostly useful in tests and
    /// for collaborators that run their own analysis.
    pub fn from_bins(bins: Vec<u8>) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    /// Mean magnitude of the lowest `bass_bins` bins. A zero-filled sample
    /// always yields zero, so a disconnected feed can never produce a beat.
    pub fn bass_energy(&self, bass_bins: usize) -> f32 {
        let take = bass_bins.min(self.bins.len());
        if take == 0 {
            return 0.0;
        }
        let sum: u32 = self.bins[..take].iter().map(|&b| u32::from(b)).sum();
        sum as f32 / take as f32
    }

    fn fill_silent(&mut self) {
        self.bins.fill(0);
    }
}

/// Provider of live spectral data, implemented by whatever owns playback.
pub trait SpectrumSource {
    /// Writes the analysis window at playback time `at` into `bins`.
    fn fill(&mut self, at: Duration, bins: &mut [u8]);
}

/// Pull-based access point for the per-frame frequency snapshot.
///
/// With no source connected every query returns the silent sample, which the
/// beat detector treats as "no beat, ever" rather than an error.
pub struct AnalysisFeed {
    source: Option<Box<dyn SpectrumSource>>,
    snapshot: FrequencySample,
}

impl AnalysisFeed {
    pub fn new(bin_count: usize) -> Self {
        Self {
            source: None,
            snapshot: FrequencySample::silent(bin_count),
        }
    }

    pub fn connect(&mut self, source: Box<dyn SpectrumSource>) {
        self.source = Some(source);
    }

    pub fn disconnect(&mut self) {
        self.source = None;
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    /// Returns the most recent analysis window for playback time `at`,
    /// overwriting the previous snapshot in place.
    pub fn sample(&mut self, at: Duration) -> &FrequencySample {
        match self.source.as_mut() {
            Some(source) => source.fill(at, &mut self.snapshot.bins),
            None => self.snapshot.fill_silent(),
        }
        &self.snapshot
    }
}

impl fmt::Debug for AnalysisFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisFeed")
            .field("connected", &self.is_connected())
            .field("bins", &self.snapshot.bins.len())
            .finish()
    }
}

/// [`SpectrumSource`] over a fully decoded mono track.
///
/// Each query runs a Hann-windowed real FFT over the window ending at the
/// playback position, converts magnitudes to decibels and maps them onto the
/// familiar 0-255 byte range with temporal smoothing, so downstream consumers
/// see the same scale a browser analyser node would produce.
pub struct DecodedTrackSource {
    samples: Vec<f32>,
    sample_rate: u32,
    fft_size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    smoothed: Vec<f32>,
}

impl DecodedTrackSource {
    pub fn new(track: DecodedTrack, tuning: &Tuning) -> Self {
        let fft_size = tuning.fft_size;
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        Self {
            sample_rate: track.sample_rate,
            samples: track.samples,
            fft_size,
            plan,
            input,
            spectrum,
            scratch,
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    /// Total playable length of the wrapped track.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

impl SpectrumSource for DecodedTrackSource {
    fn fill(&mut self, at: Duration, bins: &mut [u8]) {
        let end = (at.as_secs_f64() * f64::from(self.sample_rate)) as usize;
        if end > self.samples.len() {
            bins.fill(0);
            return;
        }
        let start = end.saturating_sub(self.fft_size);
        let window = &self.samples[start..end];
        let pad = self.fft_size - window.len();

        self.input[..pad].fill(0.0);
        for (offset, value) in window.iter().enumerate() {
            let index = pad + offset;
            self.input[index] = *value * hann_value(index, self.fft_size);
        }

        if self
            .plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .is_err()
        {
            // Buffer lengths are fixed at construction, so this cannot fire;
            // degrade to silence rather than poisoning the frame loop.
            bins.fill(0);
            return;
        }

        let scale = 1.0 / self.fft_size as f32;
        for (k, slot) in bins.iter_mut().enumerate().take(self.smoothed.len()) {
            let magnitude = self.spectrum[k].norm() * scale;
            let smoothed = SMOOTHING * self.smoothed[k] + (1.0 - SMOOTHING) * magnitude;
            self.smoothed[k] = smoothed;
            *slot = byte_magnitude(smoothed);
        }
    }
}

impl fmt::Debug for DecodedTrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedTrackSource")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("fft_size", &self.fft_size)
            .finish()
    }
}

fn byte_magnitude(magnitude: f32) -> u8 {
    let db = 20.0 * magnitude.max(1e-10).log10();
    let normalized = ((db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS)).clamp(0.0, 1.0);
    (normalized * 255.0).round() as u8
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_feed_yields_silence() {
        let mut feed = AnalysisFeed::new(256);
        let sample = feed.sample(Duration::from_millis(16));
        assert!(sample.bins().iter().all(|&b| b == 0));
        assert_eq!(sample.bass_energy(10), 0.0);
    }

    #[test]
    fn bass_energy_averages_the_low_bins() {
        let mut bins = vec![0u8; 256];
        bins[..10].copy_from_slice(&[100; 10]);
        bins[10] = 255;
        let sample = FrequencySample::from_bins(bins);
        assert_eq!(sample.bass_energy(10), 100.0);
    }

    #[test]
    fn bass_energy_tolerates_short_samples() {
        let sample = FrequencySample::from_bins(vec![60, 80]);
        assert_eq!(sample.bass_energy(10), 70.0);
        assert_eq!(FrequencySample::silent(0).bass_energy(10), 0.0);
    }

    #[test]
    fn low_frequency_tone_lands_in_the_bass_bins() {
        let tuning = Tuning::default();
        let sample_rate = 48_000u32;
        let tone: Vec<f32> = (0..sample_rate)
            .map(|i| (2.0 * PI * 100.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        let track = DecodedTrack::new(sample_rate, tone).unwrap();
        let mut source = DecodedTrackSource::new(track, &tuning);

        let mut bins = vec![0u8; tuning.bin_count()];
        source.fill(Duration::from_millis(100), &mut bins);

        let sample = FrequencySample::from_bins(bins);
        assert!(sample.bass_energy(tuning.bass_bins) > 50.0);
    }

    #[test]
    fn silence_and_out_of_range_queries_stay_dark() {
        let tuning = Tuning::default();
        let track = DecodedTrack::new(48_000, vec![0.0; 48_000]).unwrap();
        let mut source = DecodedTrackSource::new(track, &tuning);

        let mut bins = vec![0u8; tuning.bin_count()];
        source.fill(Duration::from_millis(500), &mut bins);
        assert!(bins.iter().all(|&b| b == 0));

        source.fill(Duration::from_secs(5), &mut bins);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn feed_reads_through_the_connected_source() {
        struct Constant(u8);
        impl SpectrumSource for Constant {
            fn fill(&mut self, _at: Duration, bins: &mut [u8]) {
                bins.fill(self.0);
            }
        }

        let mut feed = AnalysisFeed::new(16);
        feed.connect(Box::new(Constant(90)));
        assert_eq!(feed.sample(Duration::ZERO).bass_energy(10), 90.0);

        feed.disconnect();
        assert_eq!(feed.sample(Duration::ZERO).bass_energy(10), 0.0);
    }
}
