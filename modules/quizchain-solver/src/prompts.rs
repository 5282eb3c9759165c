//! Prompt builders for the three LLM calls a chain iteration can make.

use ai_client::util::truncate_to_char_boundary;
use schemars::schema_for;

use crate::plan::Plan;

/// Page text beyond this is cut before prompting, to stay inside token limits.
const MAX_PROMPT_TEXT: usize = 30_000;
/// Markup gets a larger budget; answers sometimes hide in attributes.
const MAX_PROMPT_HTML: usize = 60_000;

/// First call: interpret the page and produce a `Plan`.
pub fn plan_prompt(text: &str, html: &str) -> String {
    let schema = serde_json::to_string_pretty(&schema_for!(Plan)).unwrap_or_default();
    let text = truncate_to_char_boundary(text, MAX_PROMPT_TEXT);
    let html = truncate_to_char_boundary(html, MAX_PROMPT_HTML);

    format!(
        r#"You are an automated agent. Output ONLY valid JSON with fields:
- needs_download: list of file URLs to download (or empty)
- answer: the value to submit (number/string/boolean/object)
- submit_url: optional (otherwise the page contains the submit URL)

The object must conform to this JSON Schema:
{schema}

PAGE_TEXT:
{text}

PAGE_HTML:
{html}
"#
    )
}

/// Second call, after downloads: refine the answer from file excerpts.
pub fn refine_prompt(excerpts: &[String], text: &str) -> String {
    let files = excerpts.join("\n");
    let text = truncate_to_char_boundary(text, MAX_PROMPT_TEXT);

    format!(
        r#"Use the following downloaded file contents and page text to compute the final answer.
FILES:
{files}

PAGE_TEXT:
{text}

Return only valid JSON: {{ "answer": <value> }}
"#
    )
}

/// Corrective call after a `correct: false` response.
pub fn correction_prompt(text: &str, html: &str) -> String {
    let text = truncate_to_char_boundary(text, MAX_PROMPT_TEXT);
    let html = truncate_to_char_boundary(html, MAX_PROMPT_HTML);

    format!(
        r#"Previous submission was incorrect. Using the same page content below, produce a corrected answer JSON.
PAGE_TEXT:
{text}
PAGE_HTML:
{html}
Return only: {{ "answer": <value> }}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_prompt_embeds_schema_and_page() {
        let p = plan_prompt("What is 2+2?", "<html><body>What is 2+2?</body></html>");
        assert!(p.contains("needs_download"));
        assert!(p.contains("PAGE_TEXT:\nWhat is 2+2?"));
        assert!(p.contains("PAGE_HTML:"));
    }

    #[test]
    fn oversized_page_text_is_truncated() {
        let text = "x".repeat(MAX_PROMPT_TEXT * 2);
        let p = plan_prompt(&text, "");
        assert!(p.len() < text.len() + 5_000);
    }

    #[test]
    fn refine_prompt_lists_all_excerpts() {
        let excerpts = vec![
            "FILE a.csv (csv sample):\ncol\n1".to_string(),
            "FILE b.pdf (pdf excerpt):\nhello".to_string(),
        ];
        let p = refine_prompt(&excerpts, "page");
        assert!(p.contains("a.csv"));
        assert!(p.contains("b.pdf"));
        assert!(p.contains(r#"{ "answer": <value> }"#));
    }
}
