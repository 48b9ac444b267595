//! Simulation-validation harness
//!
//! Each trial samples true parameters, generates synthetic data from them,
//! fits an estimate back from that data and scores the discrepancy. The
//! harness owns no state between trials and never retries: the first
//! collaborator error ends the run and is handed back to the caller as-is.

use std::alloc::Layout;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::HarnessError;
use crate::params::{Dataset, ParameterVector};

/// Random stream owned by a single trial.
pub type TrialRng = ChaCha8Rng;

/// Outcome of one generate/fit/compare iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord<D = Vec<f64>> {
    /// 0-based trial index; equals the record's position in the output.
    pub trial: usize,
    pub true_parameters: ParameterVector,
    pub inferred_parameters: ParameterVector,
    pub error: D,
}

fn checked_trial_count(trial_count: i64) -> Result<usize, HarnessError> {
    if trial_count < 1 {
        return Err(HarnessError::InvalidTrialCount(trial_count));
    }
    usize::try_from(trial_count).map_err(|_| HarnessError::InvalidTrialCount(trial_count))
}

fn reserve_records<D>(
    count: usize,
    trial_count: i64,
) -> Result<Vec<TrialRecord<D>>, HarnessError> {
    let mut records = Vec::new();
    records
        .try_reserve_exact(count)
        .map_err(|_| HarnessError::CapacityExceeded(trial_count))?;
    Ok(records)
}

/// Random stream for `trial`: the seed picks the key, the trial index picks
/// the stream, so no two trials of one run share randomness.
pub fn trial_rng(seed: u64, trial: usize) -> TrialRng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(trial as u64);
    rng
}

fn evaluate<D, E, G, F, C>(
    trial: usize,
    true_parameters: ParameterVector,
    generate: G,
    fit: &F,
    compare: &C,
) -> Result<TrialRecord<D>, E>
where
    G: FnOnce(&ParameterVector) -> Result<Dataset, E>,
    F: Fn(&Dataset) -> Result<ParameterVector, E>,
    C: Fn(&ParameterVector, &ParameterVector) -> Result<D, E>,
{
    let data = generate(&true_parameters)?;
    let inferred_parameters = fit(&data)?;
    drop(data);
    let error = compare(&true_parameters, &inferred_parameters)?;

    debug!(
        trial,
        true_parameters = ?true_parameters.as_slice(),
        inferred_parameters = ?inferred_parameters.as_slice(),
        "trial complete"
    );

    Ok(TrialRecord {
        trial,
        true_parameters,
        inferred_parameters,
        error,
    })
}

/// Run `trial_count` independent generate/fit/compare trials in order.
///
/// The sampler and generator are `FnMut` so they can carry their own random
/// source. A non-positive `trial_count` fails before any collaborator runs.
pub fn run_trials<D, E, S, G, F, C>(
    trial_count: i64,
    mut sample_parameters: S,
    mut generate: G,
    fit: F,
    compare: C,
) -> Result<Vec<TrialRecord<D>>, E>
where
    E: From<HarnessError>,
    S: FnMut() -> Result<ParameterVector, E>,
    G: FnMut(&ParameterVector) -> Result<Dataset, E>,
    F: Fn(&Dataset) -> Result<ParameterVector, E>,
    C: Fn(&ParameterVector, &ParameterVector) -> Result<D, E>,
{
    let count = checked_trial_count(trial_count)?;
    info!(trials = count, "starting validation run");

    let mut records = reserve_records(count, trial_count)?;
    for trial in 0..count {
        let true_parameters = sample_parameters()?;
        records.push(evaluate(
            trial,
            true_parameters,
            |params| generate(params),
            &fit,
            &compare,
        )?);
    }

    info!(trials = records.len(), "validation run complete");
    Ok(records)
}

fn seeded_trial<D, E, S, G, F, C>(
    trial: usize,
    seed: u64,
    sample_parameters: &S,
    generate: &G,
    fit: &F,
    compare: &C,
) -> Result<TrialRecord<D>, E>
where
    S: Fn(&mut TrialRng) -> Result<ParameterVector, E>,
    G: Fn(&ParameterVector, &mut TrialRng) -> Result<Dataset, E>,
    F: Fn(&Dataset) -> Result<ParameterVector, E>,
    C: Fn(&ParameterVector, &ParameterVector) -> Result<D, E>,
{
    let mut rng = trial_rng(seed, trial);
    let true_parameters = sample_parameters(&mut rng)?;
    evaluate(
        trial,
        true_parameters,
        |params| generate(params, &mut rng),
        fit,
        compare,
    )
}

/// Like [`run_trials`], but every trial draws from its own [`trial_rng`]
/// stream. Two runs with the same seed produce identical records.
pub fn run_seeded_trials<D, E, S, G, F, C>(
    trial_count: i64,
    seed: u64,
    sample_parameters: S,
    generate: G,
    fit: F,
    compare: C,
) -> Result<Vec<TrialRecord<D>>, E>
where
    E: From<HarnessError>,
    S: Fn(&mut TrialRng) -> Result<ParameterVector, E>,
    G: Fn(&ParameterVector, &mut TrialRng) -> Result<Dataset, E>,
    F: Fn(&Dataset) -> Result<ParameterVector, E>,
    C: Fn(&ParameterVector, &ParameterVector) -> Result<D, E>,
{
    let count = checked_trial_count(trial_count)?;
    info!(trials = count, seed, "starting seeded validation run");

    let mut records = reserve_records(count, trial_count)?;
    for trial in 0..count {
        records.push(seeded_trial(
            trial,
            seed,
            &sample_parameters,
            &generate,
            &fit,
            &compare,
        )?);
    }

    info!(trials = records.len(), "validation run complete");
    Ok(records)
}

/// Parallel form of [`run_seeded_trials`]; returns the same records in the
/// same order. If several trials fail, which error is returned is unspecified.
pub fn run_parallel_trials<D, E, S, G, F, C>(
    trial_count: i64,
    seed: u64,
    sample_parameters: S,
    generate: G,
    fit: F,
    compare: C,
) -> Result<Vec<TrialRecord<D>>, E>
where
    D: Send,
    E: From<HarnessError> + Send,
    S: Fn(&mut TrialRng) -> Result<ParameterVector, E> + Sync,
    G: Fn(&ParameterVector, &mut TrialRng) -> Result<Dataset, E> + Sync,
    F: Fn(&Dataset) -> Result<ParameterVector, E> + Sync,
    C: Fn(&ParameterVector, &ParameterVector) -> Result<D, E> + Sync,
{
    let count = checked_trial_count(trial_count)?;
    // rayon sizes the output itself; only refuse counts no Vec could hold.
    Layout::array::<TrialRecord<D>>(count)
        .map_err(|_| HarnessError::CapacityExceeded(trial_count))?;
    info!(
        trials = count,
        seed,
        threads = rayon::current_num_threads(),
        "starting parallel validation run"
    );

    let records: Vec<TrialRecord<D>> = (0..count)
        .into_par_iter()
        .map(|trial| {
            seeded_trial(
                trial,
                seed,
                &sample_parameters,
                &generate,
                &fit,
                &compare,
            )
        })
        .collect::<Result<_, E>>()?;

    info!(trials = records.len(), "validation run complete");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use rand::Rng;

    use super::*;
    use crate::compare::squared_error;
    use crate::error::ModelError;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Harness(HarnessError),
        FitFailed(usize),
        FitRejected(f64),
    }

    impl From<HarnessError> for TestError {
        fn from(err: HarnessError) -> Self {
            TestError::Harness(err)
        }
    }

    fn mean_fit(data: &Dataset) -> Result<ParameterVector, ModelError> {
        Ok(ParameterVector::from([data.mean(), 0.0]))
    }

    #[derive(Debug)]
    enum ScenarioError {
        Harness(HarnessError),
        Model(ModelError),
    }

    impl From<HarnessError> for ScenarioError {
        fn from(err: HarnessError) -> Self {
            ScenarioError::Harness(err)
        }
    }

    impl From<ModelError> for ScenarioError {
        fn from(err: ModelError) -> Self {
            ScenarioError::Model(err)
        }
    }

    #[test]
    fn constant_scenario_yields_expected_record() {
        let records = run_trials(
            1,
            || Ok::<_, ScenarioError>(ParameterVector::from([0.5, 1.0])),
            |_| Ok(Dataset::new(vec![0.5, 0.5, 0.5])?),
            |data| Ok(mean_fit(data)?),
            |t, e| Ok(squared_error(t, e)?),
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.trial, 0);
        assert_eq!(record.true_parameters.as_slice(), &[0.5, 1.0]);
        assert_eq!(record.inferred_parameters.as_slice(), &[0.5, 0.0]);
        assert_eq!(record.error, vec![0.0, 1.0]);
    }

    #[test]
    fn returns_one_record_per_trial_in_order() {
        let next = Cell::new(0.0);
        let records = run_trials(
            25,
            || {
                let v = next.get();
                next.set(v + 1.0);
                Ok::<_, HarnessError>(ParameterVector::from([v]))
            },
            |params| Ok(Dataset::new(vec![params[0]; 3]).expect("non-empty")),
            |data| Ok(ParameterVector::from([data.mean()])),
            |t, e| Ok(t[0] - e[0]),
        )
        .unwrap();

        assert_eq!(records.len(), 25);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.trial, i);
            assert_eq!(record.true_parameters[0], i as f64);
            assert_eq!(record.error, 0.0);
        }
    }

    #[test]
    fn non_positive_trial_count_fails_before_collaborators_run() {
        for count in [0, -1, -50] {
            let calls = Cell::new(0usize);
            let result = run_trials(
                count,
                || {
                    calls.set(calls.get() + 1);
                    Ok::<_, HarnessError>(ParameterVector::from([1.0]))
                },
                |_| {
                    calls.set(calls.get() + 1);
                    Ok(Dataset::new(vec![1.0]).expect("non-empty"))
                },
                |_| {
                    calls.set(calls.get() + 1);
                    Ok(ParameterVector::from([1.0]))
                },
                |_, _| {
                    calls.set(calls.get() + 1);
                    Ok(0.0)
                },
            );
            assert_eq!(result, Err(HarnessError::InvalidTrialCount(count)));
            assert_eq!(calls.get(), 0);
        }
    }

    #[test]
    fn fit_failure_aborts_the_run_unchanged() {
        let fits = Cell::new(0usize);
        let result = run_trials(
            10,
            || Ok(ParameterVector::from([1.0])),
            |_| Ok(Dataset::new(vec![1.0]).expect("non-empty")),
            |_| {
                let n = fits.get();
                fits.set(n + 1);
                if n == 3 {
                    Err(TestError::FitFailed(n))
                } else {
                    Ok(ParameterVector::from([1.0]))
                }
            },
            |_, _| Ok(0.0),
        );

        assert_eq!(result, Err(TestError::FitFailed(3)));
        assert_eq!(fits.get(), 4);
    }

    fn uniform_sample(rng: &mut TrialRng) -> Result<ParameterVector, HarnessError> {
        Ok(ParameterVector::from([rng.gen_range(-1.0..1.0)]))
    }

    fn noisy_generate(
        params: &ParameterVector,
        rng: &mut TrialRng,
    ) -> Result<Dataset, HarnessError> {
        let values = (0..8).map(|_| params[0] + rng.gen_range(-0.1..0.1)).collect();
        Ok(Dataset::new(values).expect("non-empty"))
    }

    fn fit_mean(data: &Dataset) -> Result<ParameterVector, HarnessError> {
        Ok(ParameterVector::from([data.mean()]))
    }

    fn diff(t: &ParameterVector, e: &ParameterVector) -> Result<f64, HarnessError> {
        Ok((t[0] - e[0]).powi(2))
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let a = run_seeded_trials(40, 7, uniform_sample, noisy_generate, fit_mean, diff).unwrap();
        let b = run_seeded_trials(40, 7, uniform_sample, noisy_generate, fit_mean, diff).unwrap();
        assert_eq!(a, b);

        let c = run_seeded_trials(40, 8, uniform_sample, noisy_generate, fit_mean, diff).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn parallel_matches_sequential() {
        let sequential =
            run_seeded_trials(64, 11, uniform_sample, noisy_generate, fit_mean, diff).unwrap();
        let parallel =
            run_parallel_trials(64, 11, uniform_sample, noisy_generate, fit_mean, diff).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn trial_streams_are_independent() {
        let mut a = trial_rng(3, 0);
        let mut b = trial_rng(3, 1);
        let xa: u64 = a.gen();
        let xb: u64 = b.gen();
        assert_ne!(xa, xb);
    }

    #[test]
    fn seeded_and_parallel_runs_return_the_fit_error() {
        let clean =
            run_seeded_trials(32, 5, uniform_sample, noisy_generate, fit_mean, diff).unwrap();
        let rejected = clean[17].inferred_parameters[0];

        let sample = |rng: &mut TrialRng| uniform_sample(rng).map_err(TestError::from);
        let generate = |params: &ParameterVector, rng: &mut TrialRng| {
            noisy_generate(params, rng).map_err(TestError::from)
        };
        let fit = |data: &Dataset| {
            let mean = data.mean();
            if mean == rejected {
                Err(TestError::FitRejected(mean))
            } else {
                Ok(ParameterVector::from([mean]))
            }
        };
        let compare =
            |t: &ParameterVector, e: &ParameterVector| diff(t, e).map_err(TestError::from);

        let sequential = run_seeded_trials(32, 5, &sample, &generate, &fit, &compare);
        assert_eq!(sequential, Err(TestError::FitRejected(rejected)));

        let parallel = run_parallel_trials(32, 5, &sample, &generate, &fit, &compare);
        assert_eq!(parallel, Err(TestError::FitRejected(rejected)));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn unrepresentable_trial_count_fails_before_collaborators_run() {
        let calls = Cell::new(0usize);
        let result = run_trials(
            i64::MAX,
            || {
                calls.set(calls.get() + 1);
                Ok::<_, HarnessError>(ParameterVector::from([1.0]))
            },
            |_| Ok(Dataset::new(vec![1.0]).expect("non-empty")),
            |_| Ok(ParameterVector::from([1.0])),
            |_, _| Ok(0.0),
        );
        assert_eq!(result, Err(HarnessError::CapacityExceeded(i64::MAX)));
        assert_eq!(calls.get(), 0);

        let seeded: Result<Vec<TrialRecord<f64>>, HarnessError> =
            run_seeded_trials(i64::MAX, 1, uniform_sample, noisy_generate, fit_mean, diff);
        assert_eq!(seeded, Err(HarnessError::CapacityExceeded(i64::MAX)));

        let parallel: Result<Vec<TrialRecord<f64>>, HarnessError> =
            run_parallel_trials(i64::MAX, 1, uniform_sample, noisy_generate, fit_mean, diff);
        assert_eq!(parallel, Err(HarnessError::CapacityExceeded(i64::MAX)));
    }

    #[test]
    fn parallel_rejects_zero_trials() {
        let result: Result<Vec<TrialRecord<f64>>, HarnessError> =
            run_parallel_trials(0, 1, uniform_sample, noisy_generate, fit_mean, diff);
        assert_eq!(result, Err(HarnessError::InvalidTrialCount(0)));
    }
}
