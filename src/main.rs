// src/main.rs
use anyhow::{Context, Result};
use breakdown_locator::analysis::synth::{add_noise, event_meta, ramp, superpose, SyntheticPulse};
use breakdown_locator::{
    BreakdownLocalizer, BreakdownRateCurve, BreakdownRateEstimator, LocalizerConfig, PulseCountSeries, RateConfig,
    RateMethod, SignalPath, Waveform,
};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
const RECORD_LEN: usize = 2000;
const INCREMENT: f64 = 1.0;
const NOISE: f64 = 0.002;
const JITTER: f64 = 2.5;
#[derive(Serialize)]
struct RateReport {
    method: RateMethod,
    curve: BreakdownRateCurve,
}
fn noisy(samples: Vec<f64>, seed: u64) -> Result<Waveform> {
    let mut samples = samples;
    add_noise(&mut samples, NOISE, seed);
    Waveform::new(samples, 0.0, INCREMENT).context("building synthetic waveform")
}
/// Current pulse with a collapse on the transmitted channel and a reflected burst,
/// plus the previous pulse acquired `JITTER` later.
fn synthetic_event() -> Result<(SignalPath, SignalPath, Waveform, Waveform)> {
    let incident = SyntheticPulse::default();
    let transmitted = SyntheticPulse::default().with_onset(560.0);
    let reflected = SyntheticPulse::default().with_amplitude(0.05);
    let current = SignalPath::new(
        noisy(incident.samples(RECORD_LEN, INCREMENT), 1)?.with_meta(event_meta(1, true)),
        noisy(transmitted.with_collapse(900.0, 50.0).samples(RECORD_LEN, INCREMENT), 2)?,
        noisy(
            superpose(&[
                reflected.samples(RECORD_LEN, INCREMENT),
                ramp(RECORD_LEN, INCREMENT, 930.0, 50.0, 1.0),
            ]),
            3,
        )?,
    );
    let previous = SignalPath::new(
        noisy(incident.samples(RECORD_LEN, INCREMENT), 4)?,
        noisy(transmitted.samples(RECORD_LEN, INCREMENT), 5)?,
        noisy(reflected.samples(RECORD_LEN, INCREMENT), 6)?,
    )
    .shifted(JITTER);
    let sync = noisy(incident.samples(RECORD_LEN, INCREMENT), 7)?;
    let sync_ref = noisy(incident.samples(RECORD_LEN, INCREMENT), 8)?.shifted(JITTER);
    Ok((current, previous, sync, sync_ref))
}
/// Pulse counter at each breakdown for a rate that halves halfway through the run.
fn synthetic_counts() -> Result<PulseCountSeries> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut counts = Vec::with_capacity(400);
    let mut count = 0u64;
    for i in 0..400 {
        let mean_gap = if i < 200 { 1000.0 } else { 2000.0 };
        count += (mean_gap * rng.gen_range(0.5..1.5)) as u64;
        counts.push(count);
    }
    PulseCountSeries::new(counts).context("building pulse count series")
}
fn main() -> Result<()> {
    env_logger::init();
    let (current, previous, sync, sync_ref) = synthetic_event()?;
    let localizer = BreakdownLocalizer::new(LocalizerConfig::default())?;
    let location = localizer.evaluate(&current, &previous, &sync, &sync_ref);
    info!("breakdown event {} complete: {}", location.meta.event_id, location.is_complete());
    println!("{}", serde_json::to_string_pretty(&location)?);
    let series = synthetic_counts()?;
    let estimator = BreakdownRateEstimator::new(RateConfig {
        samples: 20,
        ..RateConfig::default()
    })?;
    let reports = [
        RateMethod::FixedStep { step: 10 },
        RateMethod::FixedBucket,
        RateMethod::MovingWindow,
    ]
    .into_iter()
    .map(|method| -> Result<RateReport> {
        let curve = estimator.estimate(&series, method)?;
        Ok(RateReport { method, curve })
    })
    .collect::<Result<Vec<_>>>()?;
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
