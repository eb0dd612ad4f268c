//! Progress bars for batch runs

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a progress bar counting processed images
pub fn image_progress(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} images ({eta}) {msg}")
            .expect("progress template is valid")
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a progress bar with a success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with an error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✗ {}", message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_progress() {
        let pb = image_progress(10);
        pb.inc(4);
        assert_eq!(pb.position(), 4);
        finish_success(&pb, "done");
        assert!(pb.is_finished());
    }
}
