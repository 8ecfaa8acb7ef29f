//! `compare` command: evaluate the fix comparator on two fixes.

use clap::Args;

use fixfinder::comparator::is_better;
use fixfinder::{Fix, FixSource, FixTime};

use super::common::SourceArg;
use crate::error::CliError;

/// Arguments for `fixfinder compare`.
///
/// Ages are seconds before "now"; a smaller age means a newer fix.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Accuracy of the candidate fix (meters)
    #[arg(long)]
    pub accuracy: f64,

    /// Age of the candidate fix (seconds)
    #[arg(long, default_value = "0")]
    pub age_secs: i64,

    /// Source of the candidate fix
    #[arg(long, value_enum, default_value = "precise")]
    pub source: SourceArg,

    /// Accuracy of the currently held fix (omit for "no fix held")
    #[arg(long)]
    pub current_accuracy: Option<f64>,

    /// Age of the currently held fix (seconds)
    #[arg(long, default_value = "0")]
    pub current_age_secs: i64,

    /// Source of the currently held fix
    #[arg(long, value_enum, default_value = "precise")]
    pub current_source: SourceArg,
}

fn fix_at(accuracy: f64, age_secs: i64, source: SourceArg) -> Fix {
    Fix::new(
        0.0,
        0.0,
        accuracy,
        FixSource::from(source),
        FixTime::from_millis(-age_secs.saturating_mul(1_000)),
    )
}

fn validate_accuracy(flag: &str, accuracy: f64) -> Result<(), CliError> {
    if accuracy.is_finite() && accuracy >= 0.0 {
        Ok(())
    } else {
        Err(CliError::InvalidArgument(format!(
            "{} must be a non-negative number of meters",
            flag
        )))
    }
}

/// Decide whether the candidate replaces the held fix.
pub fn verdict(args: &CompareArgs) -> Result<bool, CliError> {
    validate_accuracy("--accuracy", args.accuracy)?;
    let candidate = fix_at(args.accuracy, args.age_secs, args.source);

    let current = match args.current_accuracy {
        Some(accuracy) => {
            validate_accuracy("--current-accuracy", accuracy)?;
            Some(fix_at(accuracy, args.current_age_secs, args.current_source))
        }
        None => None,
    };

    Ok(is_better(&candidate, current.as_ref()))
}

/// Run the compare command.
pub fn run(args: CompareArgs) -> Result<(), CliError> {
    let better = verdict(&args)?;

    println!(
        "Candidate: {:>7.1} m  {:>5} s old  {}",
        args.accuracy,
        args.age_secs,
        FixSource::from(args.source)
    );
    match args.current_accuracy {
        Some(accuracy) => {
            println!(
                "Current:   {:>7.1} m  {:>5} s old  {}",
                accuracy,
                args.current_age_secs,
                FixSource::from(args.current_source)
            );
            println!();
            println!("  Δt: {:+} s", args.current_age_secs - args.age_secs);
            println!("  Δa: {:+.1} m", args.accuracy - accuracy);
        }
        None => println!("Current:   none"),
    }
    println!();
    println!(
        "Verdict: {}",
        if better {
            "candidate is better"
        } else {
            "keep current fix"
        }
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(accuracy: f64, age_secs: i64, current: Option<(f64, i64)>) -> CompareArgs {
        CompareArgs {
            accuracy,
            age_secs,
            source: SourceArg::Precise,
            current_accuracy: current.map(|(a, _)| a),
            current_age_secs: current.map(|(_, t)| t).unwrap_or(0),
            current_source: SourceArg::Precise,
        }
    }

    #[test]
    fn test_anything_beats_nothing() {
        assert!(verdict(&args(500.0, 3_600, None)).unwrap());
    }

    #[test]
    fn test_significantly_newer_wins() {
        // Candidate is three minutes newer but far less accurate.
        assert!(verdict(&args(900.0, 0, Some((5.0, 180)))).unwrap());
    }

    #[test]
    fn test_significantly_older_loses() {
        assert!(!verdict(&args(1.0, 300, Some((50.0, 0)))).unwrap());
    }

    #[test]
    fn test_cross_source_accuracy_loss_loses() {
        let mut a = args(40.0, 0, Some((10.0, 10)));
        a.current_source = SourceArg::Network;
        assert!(!verdict(&a).unwrap());
    }

    #[test]
    fn test_negative_accuracy_rejected() {
        assert!(matches!(
            verdict(&args(-1.0, 0, None)),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
