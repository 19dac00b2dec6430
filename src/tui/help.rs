use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Enter", Style::default().fg(Color::Magenta)),
            Span::raw("       Run workflow"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Ctrl-L", Style::default().fg(Color::Magenta)),
            Span::raw("      Clear input"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Ctrl-K", Style::default().fg(Color::Magenta)),
            Span::raw("      Clear the stored DB (asks first)"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw("         Select result row"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Ctrl-Y", Style::default().fg(Color::Magenta)),
            Span::raw("      Copy selected row as JSON"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("tab", Style::default().fg(Color::Magenta)),
            Span::raw("         Switch tabs"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Esc", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        Line::from(""),
        Line::from("Dashboard tab:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("r", Style::default().fg(Color::Magenta)),
            Span::raw("           Refresh"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("t", Style::default().fg(Color::Magenta)),
            Span::raw("           Show/hide done tasks"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Navigate tasks"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("d", Style::default().fg(Color::Magenta)),
            Span::raw("           Mark selected task done"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw("           Quit"),
        ]),
        Line::from(""),
        Line::from("Theme:"),
        Line::from("  Set \"theme\": \"dark\" in settings.json or WF_THEME=dark."),
        Line::from(""),
        Line::from("Repository:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                "https://github.com/workflowgenie/workflowgenie-cli",
                Style::default().fg(Color::Cyan),
            ),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
