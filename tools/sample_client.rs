//! Sample Prediction Client
//!
//! Generates random clinical records and submits them to the JSON prediction
//! endpoint of a running predictor.

use health_profile_predictor::schema::{InputKind, FEATURE_SCHEMA};
use health_profile_predictor::types::record::{ClinicalRecord, Feature};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// Subset of the predictor's JSON response
#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction_id: String,
    alcohol: Card,
    smoke: Card,
}

#[derive(Debug, Deserialize)]
struct Card {
    status: String,
}

/// Record generator for testing
struct RecordGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RecordGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// A record drawn uniformly from every field's domain
    fn generate_typical(&mut self) -> ClinicalRecord {
        let mut record = ClinicalRecord::default();
        for spec in &FEATURE_SCHEMA {
            let value = match spec.input {
                InputKind::Integer { min, max, .. } => self.rng.gen_range(min..=max).round(),
                InputKind::Decimal { min, max, step, .. }
                | InputKind::Slider { min, max, step, .. } => {
                    let steps = ((max - min) / step).round() as u64;
                    min + self.rng.gen_range(0..=steps) as f64 * step
                }
                InputKind::Choice { options, .. } => {
                    options[self.rng.gen_range(0..options.len())].value
                }
            };
            record.set(spec.feature, value);
        }
        record
    }

    /// A record with elevated liver enzymes and blood pressure
    fn generate_elevated(&mut self) -> ClinicalRecord {
        let mut record = self.generate_typical();
        record.set(Feature::GammaGtp, self.rng.gen_range(80.0..400.0_f64).round());
        record.set(Feature::SgotAlt, self.rng.gen_range(45.0..150.0_f64).round());
        record.set(Feature::Triglyceride, self.rng.gen_range(200.0..600.0_f64).round());
        record.set(Feature::Sbp, self.rng.gen_range(140.0..190.0_f64).round());
        record.set(Feature::Hemoglobin, self.rng.gen_range(150.0..180.0_f64).round() / 10.0);
        record
    }
}

/// Probability argument, clamped into `[0, 1]`
fn parse_rate(arg: Option<&str>, default: f64) -> f64 {
    arg.and_then(|s| s.parse::<f64>().ok())
        .filter(|rate| rate.is_finite())
        .unwrap_or(default)
        .clamp(0.0, 1.0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_client=info".parse()?),
        )
        .init();

    info!("Starting Sample Prediction Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://localhost:8501".to_string());
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let elevated_rate = parse_rate(args.get(3).map(String::as_str), 0.3);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(200);

    info!(
        base_url = %base_url,
        count = count,
        elevated_rate = elevated_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::new();

    // Check the predictor is up before submitting
    match client.get(format!("{base_url}/health")).send().await {
        Ok(response) if response.status().is_success() => info!("Predictor is ready"),
        Ok(response) => {
            warn!(status = %response.status(), "Predictor has no models. Running in dry-run mode.");
            return run_dry_mode(count, elevated_rate, delay_ms).await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to reach predictor. Running in dry-run mode.");
            return run_dry_mode(count, elevated_rate, delay_ms).await;
        }
    }

    let mut generator = RecordGenerator::new();
    let mut rng = rand::thread_rng();
    let endpoint = format!("{base_url}/api/predict");

    info!("Submitting {} records...", count);

    let mut succeeded = 0;
    let mut failed = 0;

    for i in 0..count {
        let record = if rng.gen_bool(elevated_rate) {
            generator.generate_elevated()
        } else {
            generator.generate_typical()
        };

        let response = client.post(&endpoint).json(&record).send().await?;
        if response.status().is_success() {
            let prediction: PredictResponse = response.json().await?;
            succeeded += 1;
            info!(
                prediction_id = %prediction.prediction_id,
                alcohol = %prediction.alcohol.status,
                smoke = %prediction.smoke.status,
                "Prediction {}/{}",
                i + 1,
                count
            );
        } else {
            failed += 1;
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Prediction rejected");
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Submitted {} records ({} succeeded, {} failed)",
        count, succeeded, failed
    );

    Ok(())
}

async fn run_dry_mode(count: u64, elevated_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no predictor)");

    let mut generator = RecordGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let record = if rng.gen_bool(elevated_rate) {
            generator.generate_elevated()
        } else {
            generator.generate_typical()
        };

        let json = serde_json::to_string_pretty(&record)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample record {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_argument_is_clamped() {
        assert_eq!(parse_rate(None, 0.3), 0.3);
        assert_eq!(parse_rate(Some("0.5"), 0.3), 0.5);
        assert_eq!(parse_rate(Some("1.5"), 0.3), 1.0);
        assert_eq!(parse_rate(Some("-2"), 0.3), 0.0);
        assert_eq!(parse_rate(Some("NaN"), 0.3), 0.3);
        assert_eq!(parse_rate(Some("often"), 0.3), 0.3);
    }
}
