use scraper::Html;

/// Elements whose text is never visible.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style"];

/// Visible text of an HTML document: one fragment per line, whitespace runs
/// collapsed to a single space, control characters removed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines: Vec<String> = Vec::new();

    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let raw: &str = text;
        for line in raw.lines() {
            let collapsed = line
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .chars()
                .filter(|c| !c.is_control())
                .collect::<String>();
            if !collapsed.is_empty() {
                lines.push(collapsed);
            }
        }
    }

    lines.join("\n")
}
