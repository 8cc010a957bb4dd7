//! Analyze a kolam/rangoli image and stream the results as line-delimited
//! JSON: progress records, one partial report per stage, then the final
//! composite report (or a single error record).

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use log::LevelFilter;

use kolam_analysis::{AnalysisEvent, AnalysisPipeline, PipelineParams};
use kolam_core::init_with_level;

#[derive(Parser, Debug)]
#[command(name = "kolam-analyze", about = "Kolam/rangoli pattern analysis")]
struct Args {
    /// Image file to analyze (any common raster format).
    image: PathBuf,

    /// Optional JSON file with pipeline parameters; defaults are used
    /// when omitted.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Print only the final composite report, pretty-printed.
    #[arg(long)]
    report_only: bool,

    /// Log level filter (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn load_params(path: Option<&PathBuf>) -> Result<PipelineParams, Box<dyn std::error::Error>> {
    match path {
        None => Ok(PipelineParams::default()),
        Some(p) => {
            let raw = std::fs::read_to_string(p)?;
            Ok(serde_json::from_str(&raw)?)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = LevelFilter::from_str(&args.log_level).unwrap_or(LevelFilter::Warn);
    init_with_level(level)?;

    let params = load_params(args.params.as_ref())?;
    let pipeline = AnalysisPipeline::new(params);

    let mut failure: Option<String> = None;
    for event in pipeline.run_path(&args.image) {
        match &event {
            AnalysisEvent::Error { error } => {
                failure = Some(error.clone());
                println!("{}", serde_json::to_string(&event)?);
            }
            AnalysisEvent::Final { report } if args.report_only => {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            }
            _ if args.report_only => {}
            _ => println!("{}", serde_json::to_string(&event)?),
        }
    }

    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_params_file_falls_back_to_defaults() {
        let params = load_params(None).expect("defaults");
        assert_eq!(PipelineParams::default().dots.merge_cap, params.dots.merge_cap);
    }

    #[test]
    fn params_file_overrides_defaults() {
        let mut defaults = PipelineParams::default();
        defaults.dots.max_dots = 42;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{}", serde_json::to_string(&defaults).expect("json")).expect("write");

        let loaded = load_params(Some(&file.path().to_path_buf())).expect("load");
        assert_eq!(42, loaded.dots.max_dots);
    }

    #[test]
    fn malformed_params_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");
        assert!(load_params(Some(&file.path().to_path_buf())).is_err());
    }
}
