use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use mediacleaner_core::converter::ConversionProgress;

const TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos:>3}% ({elapsed_precise})";

fn new_bar(job_id: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(job_id.to_string());
    pb
}

/// Draws one progress bar per transcoded file until the sender side closes.
pub fn spawn_progress(mut rx: mpsc::Receiver<ConversionProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current: Option<(String, ProgressBar)> = None;

        while let Some(update) = rx.recv().await {
            let same_job = matches!(&current, Some((id, _)) if *id == update.job_id);
            if !same_job {
                if let Some((_, pb)) = current.take() {
                    pb.abandon();
                }
                current = Some((update.job_id.clone(), new_bar(&update.job_id)));
            }

            if let Some((_, pb)) = &current {
                pb.set_position(update.percent.clamp(0.0, 100.0) as u64);
                if update.percent >= 100.0 {
                    pb.finish();
                }
            }
        }

        if let Some((_, pb)) = current {
            pb.abandon();
        }
    })
}
