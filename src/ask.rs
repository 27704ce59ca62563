//! `jrnl ask`: answer a question over the journal.
//!
//! Without `--from`/`--to` the summary path looks at the last seven days
//! (today included). The qa path ignores the range.

use anyhow::Result;
use chrono::Duration;

use journal_harness_core::engine::{QueryOutcome, QueryRequest};

use crate::app::{self, Needs};
use crate::config::Config;

const DEFAULT_RANGE_DAYS: i64 = 7;

pub async fn run_ask(
    config: &Config,
    owner: &str,
    query: &str,
    from: Option<String>,
    to: Option<String>,
    show_context: bool,
) -> Result<()> {
    let end = match to {
        Some(d) => app::parse_date(&d)?,
        None => app::today(),
    };
    let start = match from {
        Some(d) => app::parse_date(&d)?,
        None => end - Duration::days(DEFAULT_RANGE_DAYS - 1),
    };

    let engine = app::open_engine(
        config,
        Needs {
            embedding: true,
            llm: true,
        },
    )
    .await?;

    let request = QueryRequest::new(owner, query).with_range(start, end);
    match engine.answer(&request).await? {
        QueryOutcome::Answered(answer) => {
            if show_context {
                println!("--- context ({} intent) ---", answer.intent);
                println!("{}", answer.context);
                println!("---");
                println!();
            }
            println!("{}", answer.text);
        }
        QueryOutcome::Rejected { intent, reason } => {
            tracing::debug!(%intent, ?reason, "query rejected");
            println!("{}", reason.message());
        }
    }
    Ok(())
}
