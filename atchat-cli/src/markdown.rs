use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::theme;

/// Parse a reply as markdown and return styled lines.
pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let mut renderer = MdRenderer::new();
    for event in Parser::new(text) {
        renderer.process(event);
    }
    renderer.flush_line();
    renderer.lines
}

/// Visual height of rendered markdown when wrapped at `width`.
pub fn markdown_height(text: &str, width: usize) -> usize {
    let lines = render_markdown(text);
    if width == 0 {
        return lines.len().max(1);
    }
    lines
        .iter()
        .map(|line| {
            let w = line.width();
            if w == 0 { 1 } else { w.div_ceil(width) }
        })
        .sum::<usize>()
        .max(1)
}

struct MdRenderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    in_code_block: bool,
    /// `Some(n)` for the next number of an ordered list, `None` for bullets.
    list_stack: Vec<Option<u64>>,
    item_prefix: Option<String>,
}

impl MdRenderer {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            spans: Vec::new(),
            style_stack: vec![theme::assistant_text()],
            in_code_block: false,
            list_stack: Vec::new(),
            item_prefix: None,
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack
            .last()
            .copied()
            .unwrap_or(theme::assistant_text())
    }

    fn push_style(&mut self, style: Style) {
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn flush_line(&mut self) {
        if !self.spans.is_empty() {
            let spans = std::mem::take(&mut self.spans);
            self.lines.push(Line::from(spans));
        }
    }

    fn blank_line(&mut self) {
        self.lines.push(Line::from(""));
    }

    fn push_text(&mut self, text: String, style: Style) {
        if let Some(prefix) = self.item_prefix.take() {
            self.spans.push(Span::styled(prefix, self.current_style()));
        }
        self.spans.push(Span::styled(text, style));
    }

    fn process(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                self.flush_line();
                self.push_style(theme::heading());
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush_line();
                self.pop_style();
                self.blank_line();
            }

            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                self.flush_line();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }

            Event::Start(Tag::Strong) => {
                let base = self.current_style();
                self.push_style(base.add_modifier(Modifier::BOLD));
            }
            Event::Start(Tag::Emphasis) => {
                let base = self.current_style();
                self.push_style(base.add_modifier(Modifier::ITALIC));
            }
            Event::End(TagEnd::Strong | TagEnd::Emphasis) => self.pop_style(),
            Event::Code(code) => self.push_text(code.to_string(), theme::inline_code()),

            Event::Start(Tag::CodeBlock(_)) => {
                self.flush_line();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                self.blank_line();
            }

            Event::Start(Tag::List(start)) => {
                self.flush_line();
                self.list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush_line();
                let indent = "  ".repeat(self.list_stack.len());
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "\u{2022} ".to_string(),
                };
                self.item_prefix = Some(format!("{indent}{marker}"));
            }
            Event::End(TagEnd::Item) => {
                self.item_prefix = None;
                self.flush_line();
            }

            Event::Text(text) => {
                if self.in_code_block {
                    for line in text.lines() {
                        self.lines.push(Line::from(vec![
                            Span::styled("\u{2502} ", theme::code_chrome()),
                            Span::styled(line.to_string(), theme::code_content()),
                        ]));
                    }
                } else {
                    let style = self.current_style();
                    self.push_text(text.to_string(), style);
                }
            }
            Event::SoftBreak => self.spans.push(Span::raw(" ")),
            Event::HardBreak => self.flush_line(),

            Event::Rule => {
                self.flush_line();
                self.lines.push(Line::from(Span::styled(
                    "\u{2500}".repeat(40),
                    theme::code_chrome(),
                )));
                self.blank_line();
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_text(lines: &[Line]) -> String {
        lines
            .iter()
            .flat_map(|l| l.spans.iter())
            .map(|s| s.content.as_ref())
            .collect()
    }

    #[test]
    fn render_plain_text() {
        let lines = render_markdown("hello world");
        let text: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn render_heading_is_bold() {
        let lines = render_markdown("# Title");
        assert!(lines.len() >= 2);
        let span = &lines[0].spans[0];
        assert_eq!(span.content, "Title");
        assert!(span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn render_bullet_and_numbered_lists() {
        let bullets = all_text(&render_markdown("- item one\n- item two"));
        assert!(bullets.contains("\u{2022} item one"));
        assert!(bullets.contains("item two"));

        let numbered = all_text(&render_markdown("3. three\n4. four"));
        assert!(numbered.contains("3. three"));
        assert!(numbered.contains("4. four"));
    }

    #[test]
    fn render_code_block_with_chrome() {
        let lines = render_markdown("```\nfn main() {}\n```");
        assert!(
            lines
                .iter()
                .any(|l| l.spans.iter().any(|s| s.content.contains('\u{2502}')))
        );
        assert!(all_text(&lines).contains("fn main()"));
    }

    #[test]
    fn inline_code_keeps_text() {
        let text = all_text(&render_markdown("run `cargo` now"));
        assert_eq!(text, "run cargo now");
    }

    #[test]
    fn markdown_height_wrapping() {
        let narrow = markdown_height("a long line of text", 5);
        let wide = markdown_height("a long line of text", 200);
        assert!(narrow > wide);
        assert!(markdown_height("", 80) >= 1);
    }
}
