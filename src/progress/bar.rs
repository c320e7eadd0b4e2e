use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Create a progress bar for tracking bytes through a compress or
/// decompress run.
///
/// Renders to stderr (not stdout) so piped output stays clean.
/// Returns a hidden bar if quiet mode is active.
pub fn create_byte_progress(total_bytes: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total_bytes);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
         {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})",
    ) {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}
