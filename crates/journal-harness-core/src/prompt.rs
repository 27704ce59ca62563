//! Prompt templates for classification, answering, and summarization.

use crate::models::DateRange;

/// Instruction asking the model to label a query `summary` or `qa`.
pub fn classification_prompt(query: &str) -> String {
    format!(
        "Classify the following user query about their journal as either 'summary' or 'qa'.\n\
         - 'summary' queries ask for broad patterns, trends, or overviews \
         (e.g., 'How was my mood last month?', 'What was I focused on in May?').\n\
         - 'qa' queries ask for specific facts or events from particular days \
         (e.g., 'What did I do on my birthday?', 'Find the entry where I mentioned the new project').\n\
         \n\
         Query: '{query}'\n\
         Classification:"
    )
}

/// Grounding prompt for the fact-lookup path.
pub fn qa_prompt(context: &str, query: &str) -> String {
    format!(
        "You are an AI assistant answering questions based on specific journal entries. \
         Use only the information from the entries provided below to answer the user's query.\n\
         \n\
         Journal Entries:\n\
         ---\n\
         {context}\n\
         ---\n\
         \n\
         User's Query: {query}\n\
         \n\
         Answer:"
    )
}

/// Grounding prompt for the summary path.
pub fn summary_prompt(context: &str, query: &str, range: &DateRange) -> String {
    format!(
        "You are an AI assistant analyzing a personal journal. The context below covers \
         every day from {start} to {end} exactly once, using monthly summaries, weekly \
         summaries, and raw daily entries. Days with no content had no entries. \
         Answer the user's query using only this context.\n\
         \n\
         Journal Context:\n\
         ---\n\
         {context}\n\
         ---\n\
         \n\
         User's Query: {query}\n\
         \n\
         Answer:",
        start = range.start,
        end = range.end,
    )
}

/// Prompt used by the weekly summarization job.
pub fn weekly_summary_prompt(range: &DateRange, entries: &str) -> String {
    format!(
        "You are a reflective journaling assistant. Please read the following journal entries \
         from the past week ({start} to {end}) and create a cohesive summary. The summary should \
         be around 1500 characters and highlight key events, recurring thoughts, and overall \
         emotional trends.\n\
         \n\
         Weekly Entries:\n\
         {entries}\n\
         \n\
         Weekly Summary:",
        start = range.start,
        end = range.end,
    )
}

/// Prompt used by the monthly summarization job.
pub fn monthly_summary_prompt(range: &DateRange, entries: &str) -> String {
    let month = range.start.format("%B %Y");
    format!(
        "You are a highly insightful journaling analyst. Please perform a comprehensive review \
         of the following journal entries from the past month ({month}). Generate a detailed \
         summary of about 4000 characters. The summary should cover:\n\
         1. A high-level overview of the month.\n\
         2. Significant events, challenges, and achievements.\n\
         3. Recurring themes, habits, and emotional patterns.\n\
         4. Any notable changes or personal growth observed.\n\
         \n\
         Monthly Entries:\n\
         {entries}\n\
         \n\
         Comprehensive Monthly Summary:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_prompts_embed_literal_inputs() {
        let p = classification_prompt("How was May?");
        assert!(p.contains("Query: 'How was May?'"));

        let p = qa_prompt("I felt great today", "What did I do?");
        assert!(p.contains("I felt great today"));
        assert!(p.contains("User's Query: What did I do?"));

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        let p = summary_prompt("ctx", "q", &range);
        assert!(p.contains("2024-01-01 to 2024-01-31"));
        assert!(monthly_summary_prompt(&range, "e").contains("January 2024"));
        assert!(weekly_summary_prompt(&range, "e").contains("2024-01-31"));
    }
}
