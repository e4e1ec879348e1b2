//! Per-toolkit result synthesis.
//!
//! A [`ResultGenerator`] produces the opaque `results` payload of a job at
//! the moment it moves from `Running` to `Completed`. Generators are looked
//! up by toolkit name in a [`GeneratorRegistry`]; toolkits without a
//! dedicated generator fall back to [`GenericGenerator`].
//!
//! A generator error does not complete the job. The scheduler marks it
//! `Failed` with the error text as its reason.

use std::sync::Arc;

use rand::{Rng, RngCore};
use rustc_hash::FxHashMap;
use serde_json::{Value, json};

use crate::error::JobResult;
use crate::job::Job;

/// Produces the results payload for one toolkit.
pub trait ResultGenerator: Send + Sync {
    /// Toolkit name this generator serves.
    fn toolkit(&self) -> &str;

    /// Synthesize results for a job that just reached 100% progress.
    fn generate(&self, job: &Job, rng: &mut dyn RngCore) -> JobResult<Value>;
}

/// Fallback generator for toolkits with no dedicated generator.
#[derive(Debug, Clone, Default)]
pub struct GenericGenerator;

impl ResultGenerator for GenericGenerator {
    fn toolkit(&self) -> &str {
        "generic"
    }

    fn generate(&self, job: &Job, _rng: &mut dyn RngCore) -> JobResult<Value> {
        Ok(json!({
            "toolkit": job.toolkit,
            "summary": "execution finished",
            "input_files": job.input_files,
            "output_files": [format!("{}_output.json", job.id)],
        }))
    }
}

/// Protein structure prediction results.
#[derive(Debug, Clone, Default)]
pub struct StructurePredictionGenerator;

impl ResultGenerator for StructurePredictionGenerator {
    fn toolkit(&self) -> &str {
        "structure_prediction"
    }

    fn generate(&self, job: &Job, rng: &mut dyn RngCore) -> JobResult<Value> {
        let models: usize = rng.gen_range(1..=5);
        let mut confidences: Vec<f64> = (0..models)
            .map(|_| round2(rng.gen_range(60.0..95.0)))
            .collect();
        confidences.sort_by(|a, b| b.total_cmp(a));

        let ranked: Vec<Value> = confidences
            .iter()
            .enumerate()
            .map(|(rank, plddt)| {
                json!({
                    "rank": rank + 1,
                    "structure_file": format!("{}_model_{}.pdb", job.id, rank + 1),
                    "mean_plddt": plddt,
                })
            })
            .collect();

        Ok(json!({
            "best_model": ranked.first().cloned().unwrap_or(Value::Null),
            "ranked_models": ranked,
        }))
    }
}

/// Small-molecule docking results.
#[derive(Debug, Clone, Default)]
pub struct MolecularDockingGenerator;

impl ResultGenerator for MolecularDockingGenerator {
    fn toolkit(&self) -> &str {
        "molecular_docking"
    }

    fn generate(&self, job: &Job, rng: &mut dyn RngCore) -> JobResult<Value> {
        let poses: Vec<Value> = (1..=rng.gen_range(3..=9))
            .map(|pose| {
                json!({
                    "pose": pose,
                    "affinity_kcal_mol": round2(rng.gen_range(-12.0..-4.0)),
                    "rmsd": round2(rng.gen_range(0.0..3.0)),
                })
            })
            .collect();

        Ok(json!({
            "poses_file": format!("{}_poses.sdf", job.id),
            "poses": poses,
        }))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lookup table from toolkit name to generator.
#[derive(Clone)]
pub struct GeneratorRegistry {
    generators: FxHashMap<String, Arc<dyn ResultGenerator>>,
    fallback: Arc<dyn ResultGenerator>,
}

impl GeneratorRegistry {
    /// Create a registry with only the generic fallback.
    pub fn empty() -> Self {
        Self {
            generators: FxHashMap::default(),
            fallback: Arc::new(GenericGenerator),
        }
    }

    /// Create a registry with the built-in toolkit generators.
    pub fn with_defaults() -> Self {
        Self::empty()
            .with_generator(StructurePredictionGenerator)
            .with_generator(MolecularDockingGenerator)
    }

    /// Register a generator, replacing any previous one for its toolkit.
    pub fn with_generator(mut self, generator: impl ResultGenerator + 'static) -> Self {
        self.register(Arc::new(generator));
        self
    }

    /// Register a shared generator.
    pub fn register(&mut self, generator: Arc<dyn ResultGenerator>) {
        self.generators
            .insert(generator.toolkit().to_string(), generator);
    }

    /// Replace the fallback generator.
    pub fn with_fallback(mut self, generator: impl ResultGenerator + 'static) -> Self {
        self.fallback = Arc::new(generator);
        self
    }

    /// Whether a dedicated generator exists for `toolkit`.
    pub fn contains(&self, toolkit: &str) -> bool {
        self.generators.contains_key(toolkit)
    }

    /// Generator for `toolkit`, or the fallback.
    pub fn get(&self, toolkit: &str) -> &dyn ResultGenerator {
        self.generators
            .get(toolkit)
            .map_or(&*self.fallback, |g| &**g)
    }

    /// Synthesize results for `job` with its toolkit's generator.
    pub fn generate(&self, job: &Job, rng: &mut dyn RngCore) -> JobResult<Value> {
        self.get(&job.toolkit).generate(job, rng)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut toolkits: Vec<_> = self.generators.keys().collect();
        toolkits.sort();
        f.debug_struct("GeneratorRegistry")
            .field("toolkits", &toolkits)
            .field("fallback", &self.fallback.toolkit())
            .finish()
    }
}
