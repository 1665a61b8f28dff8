use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use super::slide::{ChartSpec, ContentKind, Slide, SlideImage};

const MAX_AUTO_TERMS: usize = 3;
const MIN_AUTO_TERM_LEN: usize = 4;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "about", "your", "have", "will",
    "would", "there", "their", "been", "also", "were", "them", "they", "when", "what", "which",
    "where", "while", "such", "than", "then", "over", "more", "some", "here", "just", "very",
    "much", "many", "like", "only", "onto", "each", "most", "next", "once",
];

/// A run of rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "style", content = "text", rename_all = "snake_case")]
pub enum Span {
    Plain(String),
    Emphasis(String),
    Code(String),
}

impl Span {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Plain(text) | Self::Emphasis(text) | Self::Code(text) => text,
        }
    }
}

/// Render model of one slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedSlide {
    pub kind: ContentKind,
    pub title: Vec<Span>,
    pub body: Vec<Span>,
    pub items: Vec<Vec<Span>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    pub images: Vec<SlideImage>,
    pub terms: Vec<String>,
}

/// Case-insensitive term matcher preferring the longest term at each position.
#[derive(Debug, Clone)]
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    #[must_use]
    pub fn new(terms: &[String]) -> Self {
        let mut sorted: Vec<&str> = terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .collect();
        if sorted.is_empty() {
            return Self { pattern: None };
        }
        sorted.sort_by_key(|term| std::cmp::Reverse(term.chars().count()));

        let alternation = sorted
            .iter()
            .map(|term| regex::escape(term))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = match RegexBuilder::new(&alternation).case_insensitive(true).build() {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                tracing::warn!("Highlight pattern rejected: {err}");
                None
            }
        };
        Self { pattern }
    }

    /// Split plain text into plain and emphasis spans.
    #[must_use]
    pub fn spans(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        self.push_spans(text, &mut spans);
        spans
    }

    /// Highlight the text of a markdown body. Inline code and code blocks of any
    /// form become code spans and are never emphasized.
    #[must_use]
    pub fn markdown_spans(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut prose = String::new();
        let mut code_block: Option<String> = None;
        let mut pending_break = false;

        for event in Parser::new(text) {
            if let Some(block) = code_block.as_mut() {
                match event {
                    Event::Text(code) => block.push_str(&code),
                    Event::End(TagEnd::CodeBlock) => {
                        separate(&mut spans, &mut pending_break);
                        spans.push(Span::Code(std::mem::take(block)));
                        code_block = None;
                        pending_break = true;
                    }
                    _ => {}
                }
                continue;
            }

            // adjacent text events are matched as one run
            if let Event::Text(plain) = &event {
                if prose.is_empty() {
                    separate(&mut spans, &mut pending_break);
                }
                prose.push_str(plain);
                continue;
            }
            self.push_spans(&std::mem::take(&mut prose), &mut spans);

            match event {
                Event::Start(Tag::CodeBlock(_)) => code_block = Some(String::new()),
                Event::Code(code) => {
                    separate(&mut spans, &mut pending_break);
                    spans.push(Span::Code(code.into_string()));
                }
                Event::Html(raw) | Event::InlineHtml(raw) => {
                    separate(&mut spans, &mut pending_break);
                    push_plain(&mut spans, &raw);
                }
                Event::SoftBreak | Event::HardBreak => push_plain(&mut spans, "\n"),
                Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => pending_break = true,
                _ => {}
            }
        }
        self.push_spans(&prose, &mut spans);
        spans
    }

    fn push_spans(&self, text: &str, spans: &mut Vec<Span>) {
        if text.is_empty() {
            return;
        }
        let Some(pattern) = &self.pattern else {
            push_plain(spans, text);
            return;
        };

        let mut last = 0;
        for found in pattern.find_iter(text) {
            if found.start() > last {
                push_plain(spans, &text[last..found.start()]);
            }
            spans.push(Span::Emphasis(found.as_str().to_string()));
            last = found.end();
        }
        if last < text.len() {
            push_plain(spans, &text[last..]);
        }
    }
}

/// Terms to emphasize on `slide`: its own terms plus the active set, or up to three
/// keywords from the title when both are empty.
#[must_use]
pub fn terms_for(slide: &Slide, active: &[String]) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let candidates = slide
        .highlighted_terms
        .iter()
        .flatten()
        .chain(active.iter());
    for term in candidates {
        push_unique(&mut terms, term);
    }
    if terms.is_empty() {
        return auto_terms(&slide.title);
    }
    terms
}

/// Keywords from a title: lowercased ASCII words of at least four characters,
/// skipping stop words.
#[must_use]
pub fn auto_terms(title: &str) -> Vec<String> {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    let mut terms: Vec<String> = Vec::new();
    for word in cleaned.split_whitespace() {
        if word.len() < MIN_AUTO_TERM_LEN || STOP_WORDS.contains(&word) {
            continue;
        }
        if !terms.iter().any(|t| t == word) {
            terms.push(word.to_string());
        }
        if terms.len() == MAX_AUTO_TERMS {
            break;
        }
    }
    terms
}

#[must_use]
pub fn render(slide: &Slide, active: &[String]) -> RenderedSlide {
    let terms = terms_for(slide, active);
    let highlighter = Highlighter::new(&terms);

    let items = if slide.kind == ContentKind::List {
        slide
            .items
            .iter()
            .flatten()
            .map(|item| highlighter.spans(item))
            .collect()
    } else {
        Vec::new()
    };

    RenderedSlide {
        kind: slide.kind,
        title: highlighter.spans(&slide.title),
        body: highlighter.markdown_spans(&slide.body),
        items,
        chart: if slide.kind == ContentKind::Chart { slide.chart.clone() } else { None },
        images: slide.images.clone().unwrap_or_default(),
        terms,
    }
}

pub(crate) fn push_unique(terms: &mut Vec<String>, term: &str) {
    let term = term.trim();
    if term.is_empty() {
        return;
    }
    let lowered = term.to_lowercase();
    if !terms.iter().any(|t| t.to_lowercase() == lowered) {
        terms.push(term.to_string());
    }
}

fn push_plain(spans: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Span::Plain(previous)) = spans.last_mut() {
        previous.push_str(text);
    } else {
        spans.push(Span::Plain(text.to_string()));
    }
}

/// Blocks are separated by a single newline.
fn separate(spans: &mut Vec<Span>, pending_break: &mut bool) {
    if std::mem::take(pending_break) && !spans.is_empty() {
        push_plain(spans, "\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn slide(title: &str, body: &str) -> Slide {
        Slide {
            title: title.to_string(),
            body: body.to_string(),
            kind: ContentKind::Text,
            chart: None,
            items: None,
            images: None,
            highlighted_terms: None,
            created_at: Utc::now(),
        }
    }

    fn emphasized(spans: &[Span]) -> Vec<&str> {
        spans
            .iter()
            .filter_map(|span| match span {
                Span::Emphasis(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn matching_is_case_insensitive_and_keeps_source_casing() {
        let highlighter = Highlighter::new(&["energy".to_string()]);
        let spans = highlighter.spans("Energy in, ENERGY out");
        assert_eq!(emphasized(&spans), vec!["Energy", "ENERGY"]);
        let joined: String = spans.iter().map(Span::text).collect();
        assert_eq!(joined, "Energy in, ENERGY out");
    }

    #[test]
    fn longest_term_wins() {
        let highlighter = Highlighter::new(&["cell".to_string(), "cell wall".to_string()]);
        let spans = highlighter.spans("The cell wall protects the cell.");
        assert_eq!(emphasized(&spans), vec!["cell wall", "cell"]);
    }

    #[test]
    fn terms_are_regex_escaped() {
        let highlighter = Highlighter::new(&["c++".to_string()]);
        assert_eq!(emphasized(&highlighter.spans("Learn C++ today")), vec!["C++"]);
    }

    #[test]
    fn code_is_never_highlighted() {
        let highlighter = Highlighter::new(&["value".to_string()]);
        let spans = highlighter.markdown_spans("Set `value` then\n```rust\nlet value = 1;\n```\nuse value");
        assert_eq!(emphasized(&spans), vec!["value"]);
        assert!(spans.contains(&Span::Code("value".to_string())));
        assert!(spans.contains(&Span::Code("let value = 1;\n".to_string())));
    }

    #[test]
    fn every_code_form_is_skipped() {
        let highlighter = Highlighter::new(&["value".to_string()]);
        for body in [
            "Use ``value`` here",
            "Intro\n\n~~~\nvalue = 1\n~~~\n",
            "Intro\n\n    value = 1\n",
        ] {
            let spans = highlighter.markdown_spans(body);
            assert!(emphasized(&spans).is_empty(), "{body:?} -> {spans:?}");
            assert!(spans.iter().any(|span| matches!(span, Span::Code(code) if code.contains("value"))));
        }
    }

    #[test]
    fn unclosed_backtick_is_plain_text() {
        let highlighter = Highlighter::new(&[]);
        assert_eq!(
            highlighter.markdown_spans("costs 5` more"),
            vec![Span::Plain("costs 5` more".to_string())]
        );
    }

    #[test]
    fn markup_is_stripped_and_blocks_split_by_newlines() {
        let highlighter = Highlighter::new(&["light".to_string()]);
        let spans = highlighter.markdown_spans("Plants turn **light** into sugar.\n\n- water");
        assert_eq!(
            spans,
            vec![
                Span::Plain("Plants turn ".to_string()),
                Span::Emphasis("light".to_string()),
                Span::Plain(" into sugar.\nwater".to_string()),
            ]
        );
    }

    #[test]
    fn auto_terms_come_from_title() {
        assert_eq!(
            auto_terms("The Water Cycle: evaporation and condensation, rain"),
            vec!["water", "cycle", "evaporation"]
        );
        assert!(auto_terms("This is it").is_empty());
    }

    #[test]
    fn explicit_terms_suppress_auto_terms() {
        let mut s = slide("Photosynthesis Basics", "Plants use light.");
        assert_eq!(terms_for(&s, &[]), vec!["photosynthesis", "basics"]);

        s.highlighted_terms = Some(vec![" light ".to_string(), "LIGHT".to_string()]);
        assert_eq!(terms_for(&s, &["plants".to_string()]), vec!["light", "plants"]);
    }

    #[test]
    fn render_list_items_and_skips_chart_for_text() {
        let mut s = slide("Stages", "");
        s.kind = ContentKind::List;
        s.items = Some(vec!["Mitosis stage".to_string(), "Meiosis".to_string()]);
        let rendered = render(&s, &["stage".to_string()]);
        assert_eq!(rendered.items.len(), 2);
        assert_eq!(emphasized(&rendered.items[0]), vec!["stage"]);
        assert_eq!(emphasized(&rendered.title), vec!["Stage"]);
        assert!(rendered.body.is_empty());
        assert!(rendered.chart.is_none());
    }
}
