use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use ureq::{Agent, AgentBuilder};

pub const USER_AGENT: &str = concat!("geocompare/", env!("CARGO_PKG_VERSION"));

pub fn progress_bar(len: u64) -> ProgressBar {
    ProgressBar::new(len).with_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {prefix:>9} {human_pos}/{human_len} {percent}% ({per_sec})",
        )
        .expect("hardcoded"),
    )
}

pub fn agent(user_agent: &str, timeout: Duration) -> Agent {
    AgentBuilder::new()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}
