//! Progress indicators

use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{prefix:.bold} {spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// A bar counting `len` resources, labelled with `prefix`
pub fn bar(len: usize, prefix: &str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    let bar = ProgressBar::new(len as u64).with_style(style);
    bar.set_prefix(prefix.to_string());
    bar
}
