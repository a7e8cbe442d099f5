use crate::ui::theme;
use crate::ui::Icons;
use crate::ImportMessage;
use indicatif::{HumanDuration, MultiProgress, ProgressBar};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Drives the progress display for a batch import.
///
/// Workers send [`ImportMessage`]s over the returned channel; a consumer
/// thread owned by this struct updates one overall progress bar as
/// datasets start, finish, or fail. Call [`ImportProgress::finish`] after
/// every sender is dropped to join the consumer and print the summary.
pub struct ImportProgress {
    mp: MultiProgress,
    handle: thread::JoinHandle<()>,
}

impl ImportProgress {
    pub fn new(total_datasets: usize) -> (Self, crossbeam::channel::Sender<ImportMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ImportMessage>();

        let mp = MultiProgress::new();
        let overall = mp.add(
            ProgressBar::new(total_datasets as u64).with_message("Importing datasets"),
        );
        let overall = if console::Term::stdout().is_term() {
            overall.enable_steady_tick(Duration::from_millis(100));
            overall
        } else {
            ProgressBar::hidden()
        };

        let mp_clone = mp.clone();
        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ImportMessage::Started { dataset } => {
                        overall.set_message(format!("Importing: {}", dataset));
                    }
                    ImportMessage::Finished {
                        dataset,
                        sources,
                        binaries,
                        ..
                    } => {
                        overall.inc(1);
                        mp_clone
                            .println(format!(
                                "{} {} ({} sources, {} binaries)",
                                Icons::CHECK, dataset, sources, binaries
                            ))
                            .ok();
                    }
                    ImportMessage::Failed { dataset, reason } => {
                        overall.inc(1);
                        mp_clone
                            .println(format!("{} {}: {}", Icons::CROSS, dataset, reason))
                            .ok();
                    }
                }
            }
            overall.finish_and_clear();
        });

        (Self { mp, handle }, tx)
    }

    /// Join the consumer thread and clear the display.
    /// Only returns once every message sender has been dropped.
    pub fn finish(self) {
        self.handle.join().ok();
        self.mp.clear().ok();
    }
}

/// Print the end-of-batch summary line
pub fn batch_summary(duration: Duration, imported: usize, failed: usize) {
    println!();
    println!(
        "{} {}",
        Icons::CHECK.style(theme().success.clone()),
        format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
    );
    if failed > 0 {
        println!(
            "  {} {} imported  {} {} failed",
            Icons::DATABASE.style(theme().info.clone()),
            imported,
            Icons::CROSS,
            failed
        );
    } else {
        println!(
            "  {} {} imported",
            Icons::DATABASE.style(theme().info.clone()),
            imported
        );
    }
}
