use indicatif::{ProgressBar, ProgressStyle};

pub fn create_progress_bar(total_elements: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_elements);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} elements ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}
