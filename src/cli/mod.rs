// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and hands the work
// to Layer 2 (application).
//
//   1. `train` - trains the Transformer on a problem file
//   2. `solve` - loads a checkpoint and solves a question
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, SolveArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "mwp-seq2seq",
    version = "0.1.0",
    about = "Train a Transformer to translate math word problems into equations, then solve questions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the use case; the CLI layer never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Solve(args) => run_solve(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on problems in: {}", args.data_path);

    let use_case = TrainUseCase::new(args.into());
    use_case.execute()?;

    println!("Training complete. Checkpoint saved.");
    Ok(())
}

fn run_solve(args: SolveArgs) -> Result<()> {
    use crate::application::solve_use_case::SolveUseCase;

    let use_case = SolveUseCase::new(args.checkpoint_dir, args.device, args.decoding_strategy);
    let solution = use_case.solve(&args.question, &args.numbers)?;

    println!("\nEquation: {}", solution.symbols.join(" "));
    println!("Expression: {}", solution.expression);
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{DeviceKind, TrainConfig};
    use crate::domain::equation::FixType;
    use crate::ml::decoding::DecodingStrategy;

    #[test]
    fn test_train_args_become_config() {
        let cli = Cli::try_parse_from([
            "mwp-seq2seq", "train",
            "--data-path", "p.json",
            "--equation-fix", "postfix",
            "--share-vocab",
            "--max-len", "40",
            "--decoding-strategy", "topk_sampling",
            "--device", "gpu",
        ])
        .unwrap();

        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.data_path, "p.json");
        assert_eq!(cfg.device, DeviceKind::Gpu);
        assert_eq!(cfg.data.equation_fix, FixType::Postfix);
        assert_eq!(cfg.data.max_len, Some(40));
        assert_eq!(cfg.data.max_equ_len, None);
        assert!(cfg.data.share_vocab && cfg.model.share_vocab);
        assert_eq!(cfg.model.decoding_strategy, DecodingStrategy::TopkSampling);
    }

    #[test]
    fn test_unknown_decoding_strategy_is_rejected() {
        let parsed = Cli::try_parse_from(["mwp-seq2seq", "train", "--decoding-strategy", "beam_search"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_solve_numbers_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "mwp-seq2seq", "solve", "--question", "a NUM_0 b NUM_1", "--numbers", "3,4",
        ])
        .unwrap();
        let Commands::Solve(args) = cli.command else { panic!("expected solve") };
        assert_eq!(args.numbers, vec!["3", "4"]);
        assert!(args.device.is_none());
    }
}
