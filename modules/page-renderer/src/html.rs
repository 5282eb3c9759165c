use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};

/// Reduce rendered HTML to the text a visitor would read.
///
/// Readability cleanup without main-content isolation: quiz pages put the
/// question, the data links and the submit target anywhere in the body, so
/// nothing may be cut.
pub fn readable_text(html: &str, url: &str) -> String {
    let parsed_url = url::Url::parse(url).ok();

    let config = TransformConfig {
        readability: true,
        main_content: false,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };

    transform_content_input(input, &config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_visible_text_from_markup() {
        let html = r#"<html><head><title>Quiz</title></head><body>
            <h1>Step 3</h1>
            <p>This step of the quiz asks a single question about the attached
            data file. Read the instructions carefully before answering, then
            compute the requested value from the rows of the file.</p>
            <p>What is the sum of the values column in the attached file?</p>
            <p>When you have the number, post it as JSON to the submission
            endpoint printed at the bottom of this page.</p>
            <a href="https://example.com/data.csv">data.csv</a>
        </body></html>"#;

        let text = readable_text(html, "https://example.com/quiz/3");
        assert!(text.contains("sum of the values column"));
    }

    #[test]
    fn empty_input_yields_empty_text() {
        assert!(readable_text("", "https://example.com/").trim().is_empty());
    }
}
