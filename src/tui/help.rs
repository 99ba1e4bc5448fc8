use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(format!("{}{what}", " ".repeat(pad))),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key_line("tab / ↓", 5, "Next field"),
        key_line("shift-tab / ↑", 1, "Previous field"),
        key_line("←/→", 9, "Change operation"),
        key_line("enter", 7, "Run operation"),
        key_line("F1", 10, "Toggle this help"),
        key_line("esc / Ctrl-C", 2, "Quit"),
        Line::from(""),
        Line::from("Engines:"),
        Line::from("  encrypt/decrypt     encrypt_tool <mode> <input> <output> <password>"),
        Line::from("  compress/decompress huffman_cli <mode> <input> <output>"),
        Line::from(""),
        Line::from("Only one operation runs at a time; Enter is ignored while one is running."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
