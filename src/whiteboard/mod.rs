//! Slide history driven by tool commands, plus a highlight-aware render model.

mod command;
mod render;
mod slide;

pub use command::{ClearWhiteboard, Command, CreateSection, DisplayContent, DisplayData, HighlightText};
pub use render::{auto_terms, render, terms_for, Highlighter, RenderedSlide, Span};
pub use slide::{ChartSpec, ChartType, ContentKind, DataPoint, Slide, SlideImage};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Append-only slide history with a movable cursor and an active highlight set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Whiteboard {
    slides: Vec<Slide>,
    current: Option<usize>,
    highlight: Vec<String>,
}

impl Whiteboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn current(&self) -> Option<&Slide> {
        self.current.and_then(|index| self.slides.get(index))
    }

    #[must_use]
    pub fn highlight(&self) -> &[String] {
        &self.highlight
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn apply(&mut self, command: &Command) {
        self.apply_at(command, Utc::now());
    }

    /// Apply `command`, stamping new slides with `now`.
    pub fn apply_at(&mut self, command: &Command, now: DateTime<Utc>) {
        match command {
            Command::DisplayContent(args) => {
                let slide = Slide {
                    title: args.title.clone().unwrap_or_default(),
                    body: args.content.clone().unwrap_or_default(),
                    kind: args.kind.unwrap_or_default(),
                    chart: args.chart.clone(),
                    items: args.items.clone(),
                    images: args.images.clone(),
                    highlighted_terms: args.terms(),
                    created_at: now,
                };
                self.push(slide);
            }
            Command::DisplayData(args) => {
                let slide = Slide {
                    title: args.title.clone().unwrap_or_default(),
                    body: args.text.clone().unwrap_or_default(),
                    kind: ContentKind::Chart,
                    chart: Some(args.chart_spec()),
                    items: None,
                    images: None,
                    highlighted_terms: None,
                    created_at: now,
                };
                self.push(slide);
            }
            Command::CreateSection(args) => {
                let slide = Slide {
                    title: args.section_title.clone(),
                    body: String::new(),
                    kind: ContentKind::Text,
                    chart: None,
                    items: None,
                    images: None,
                    highlighted_terms: None,
                    created_at: now,
                };
                self.push(slide);
            }
            Command::Highlight(args) => {
                let mut terms = Vec::new();
                render::push_unique(&mut terms, &args.text);
                for term in args.terms.iter().flatten() {
                    render::push_unique(&mut terms, term);
                }
                tracing::debug!(?terms, "Highlight set replaced");
                self.highlight = terms;
            }
            Command::Clear => {
                tracing::debug!(cleared = self.slides.len(), "Whiteboard cleared");
                self.slides.clear();
                self.current = None;
                self.highlight.clear();
            }
        }
    }

    fn push(&mut self, slide: Slide) {
        tracing::debug!(title = %slide.title, kind = ?slide.kind, "Slide added");
        self.slides.push(slide);
        self.current = Some(self.slides.len() - 1);
    }

    /// Move back one slide. Returns whether the cursor moved.
    pub fn previous(&mut self) -> bool {
        match self.current {
            Some(index) if index > 0 => {
                self.current = Some(index - 1);
                true
            }
            _ => false,
        }
    }

    /// Move forward one slide. Returns whether the cursor moved.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        match self.current {
            Some(index) if index + 1 < self.slides.len() => {
                self.current = Some(index + 1);
                true
            }
            _ => false,
        }
    }

    /// Jump to `index`, clamped to the available slides. No effect when empty.
    pub fn select(&mut self, index: usize) -> Option<usize> {
        if self.slides.is_empty() {
            return None;
        }
        let index = index.min(self.slides.len() - 1);
        self.current = Some(index);
        self.current
    }

    #[must_use]
    pub fn render_current(&self) -> Option<RenderedSlide> {
        self.current().map(|slide| render(slide, &self.highlight))
    }
}
