//! Command lines for the external trainer and evaluator

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::Invocation;
use crate::experiment::{RunConfig, MODEL_ARTIFACT};

/// Training split inside a dataset version directory.
pub const TRAIN_FILE: &str = "train.txt.json";
/// Validation split inside a dataset version directory.
pub const VALID_FILE: &str = "valid.txt.json";
/// Test split inside a dataset version directory.
pub const TEST_FILE: &str = "test.txt.json";

/// Fixed (non-swept) trainer hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerSettings {
    /// Interpreter or binary to execute
    pub program: String,
    /// Training entry point passed to `program`
    pub script: String,
    /// Working directory of the trainer (defaults to the driver's)
    pub working_dir: Option<PathBuf>,
    /// `--pretrained-model`
    pub pretrained_model: String,
    /// `--pooling`
    pub pooling: String,
    /// `--task`
    pub task: String,
    /// `--additive-margin`
    pub additive_margin: f64,
    /// `--print-freq`
    pub print_freq: u32,
    /// `--pre-batch`
    pub pre_batch: u32,
    /// `--max-to-keep`
    pub max_to_keep: u32,
    /// Cores left free when sizing `--workers`
    pub reserved_cores: usize,
    /// `--use-link-graph`
    pub use_link_graph: bool,
    /// `--use-amp`
    pub use_amp: bool,
    /// `--use-self-negative`
    pub use_self_negative: bool,
    /// `--finetune-t`
    pub finetune_t: bool,
    /// Appended verbatim after the generated arguments
    pub extra_args: Vec<String>,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script: "main.py".to_string(),
            working_dir: None,
            pretrained_model: "bert-base-uncased".to_string(),
            pooling: "mean".to_string(),
            task: "FB15k237".to_string(),
            additive_margin: 0.02,
            print_freq: 20,
            pre_batch: 2,
            max_to_keep: 5,
            reserved_cores: 4,
            use_link_graph: true,
            use_amp: true,
            use_self_negative: true,
            finetune_t: true,
            extra_args: Vec::new(),
        }
    }
}

impl TrainerSettings {
    /// Worker count for the trainer: available cores minus the reserve,
    /// at least one.
    #[must_use]
    pub fn workers(&self) -> usize {
        workers_for(num_cpus::get(), self.reserved_cores)
    }

    /// Build the training command for one run.
    ///
    /// # Arguments
    ///
    /// * `config` - Run to train
    /// * `model_dir` - Run output directory
    /// * `dataset_root` - Directory holding one sub-directory per version
    #[must_use]
    pub fn invocation(
        &self,
        config: &RunConfig,
        model_dir: &Path,
        dataset_root: &Path,
    ) -> Invocation {
        let data_dir = dataset_root.join(config.version());

        let mut invocation = Invocation::new(&self.program)
            .args(["-u", self.script.as_str()])
            .arg("--model-dir")
            .arg(model_dir.display().to_string())
            .arg("--pretrained-model")
            .arg(&self.pretrained_model)
            .arg("--pooling")
            .arg(&self.pooling)
            .arg("--lr")
            .arg(crate::experiment::format_learning_rate(config.learning_rate()))
            .flag("--use-link-graph", self.use_link_graph)
            .arg("--train-path")
            .arg(data_dir.join(TRAIN_FILE).display().to_string())
            .arg("--valid-path")
            .arg(data_dir.join(VALID_FILE).display().to_string())
            .arg("--task")
            .arg(&self.task)
            .arg("--batch-size")
            .arg(config.batch_size().to_string())
            .arg("--print-freq")
            .arg(self.print_freq.to_string())
            .arg("--additive-margin")
            .arg(self.additive_margin.to_string())
            .flag("--use-amp", self.use_amp)
            .flag("--use-self-negative", self.use_self_negative)
            .flag("--finetune-t", self.finetune_t)
            .arg("--pre-batch")
            .arg(self.pre_batch.to_string())
            .arg("--epochs")
            .arg(config.epochs().to_string())
            .arg("--workers")
            .arg(self.workers().to_string())
            .arg("--max-to-keep")
            .arg(self.max_to_keep.to_string())
            .args(&self.extra_args);

        if let Some(dir) = &self.working_dir {
            invocation = invocation.current_dir(dir);
        }
        invocation
    }
}

/// Fixed evaluator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// Interpreter or binary to execute
    pub program: String,
    /// Evaluation entry point passed to `program`
    pub script: String,
    /// Working directory of the evaluator (defaults to the driver's)
    pub working_dir: Option<PathBuf>,
    /// `--task`
    pub task: String,
    /// `--neighbor-weight`
    pub neighbor_weight: f64,
    /// `--rerank-n-hop`
    pub rerank_n_hop: u32,
    /// Appended verbatim after the generated arguments
    pub extra_args: Vec<String>,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            script: "evaluate.py".to_string(),
            working_dir: None,
            task: "FB15k237".to_string(),
            neighbor_weight: 0.0,
            rerank_n_hop: 5,
            extra_args: Vec::new(),
        }
    }
}

impl EvaluatorSettings {
    /// Build the test-set evaluation command for a finished run.
    ///
    /// The evaluator reads the test split through `--valid-path`.
    #[must_use]
    pub fn invocation(&self, version: &str, run_dir: &Path, dataset_root: &Path) -> Invocation {
        let data_dir = dataset_root.join(version);

        let mut invocation = Invocation::new(&self.program)
            .args(["-u", self.script.as_str()])
            .arg("--task")
            .arg(&self.task)
            .arg("--is-test")
            .arg("--eval-model-path")
            .arg(run_dir.join(MODEL_ARTIFACT).display().to_string())
            .arg("--neighbor-weight")
            .arg(self.neighbor_weight.to_string())
            .arg("--rerank-n-hop")
            .arg(self.rerank_n_hop.to_string())
            .arg("--train-path")
            .arg(data_dir.join(TRAIN_FILE).display().to_string())
            .arg("--valid-path")
            .arg(data_dir.join(TEST_FILE).display().to_string())
            .args(&self.extra_args);

        if let Some(dir) = &self.working_dir {
            invocation = invocation.current_dir(dir);
        }
        invocation
    }
}

/// `cores - reserved`, at least one.
#[must_use]
pub const fn workers_for(cores: usize, reserved: usize) -> usize {
    let free = cores.saturating_sub(reserved);
    if free == 0 {
        1
    } else {
        free
    }
}
