use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use coco2mask::{process_split_dataset, Args};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("Starting the split process...");

    match process_split_dataset(&args) {
        Ok(tally) => {
            info!(
                "Split completed: {} of {} images placed.",
                tally.total_assigned(),
                tally.total_processed()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to process dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}
