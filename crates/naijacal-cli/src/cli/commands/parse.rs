//! Parse command handler.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use naijacal_core::NaijaCal;
use naijacal_core::config::Config;
use naijacal_core::parse::{ParseState, SubmitOutcome};

use crate::render;

pub async fn run(config: &Config, text: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let raw_text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("read food log from {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("read food log from stdin")?;
            buf
        }
    };

    let app = NaijaCal::from_config(config)?;
    app.restore().await;

    match app.submit(&raw_text).await {
        SubmitOutcome::Completed(request) => match request.state {
            ParseState::Succeeded(result) => {
                print!("{}", render::parse_result(&result));
                Ok(())
            }
            ParseState::Failed(failure) => Err(failure.into()),
            state => anyhow::bail!("Unexpected parse state: {state:?}"),
        },
        SubmitOutcome::Rejected(failure) => Err(failure.into()),
        SubmitOutcome::Discarded => {
            anyhow::bail!("Session changed before the food log was parsed. Please try again.")
        }
    }
}
