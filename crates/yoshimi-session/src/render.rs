//! Pure rendering of a session's current stage to a [`Frame`].

use yoshimi_core::Stage;
use yoshimi_terminal::{Align, Block, Color, Frame, Line, Span, Style};

use crate::machine::{Focus, MenuAction, SessionMachine};

/// Hint shown under results.
pub const EXIT_HINT: &str = "Press Ctrl+C to exit.";

const SUBMIT_BLURRED: &str = "->";
const SUBMIT_FOCUSED: &str = "!";
const SUBMIT_COLOR: &str = "#00FFCC";
const SUBMIT_FOCUSED_COLOR: &str = "#FF00AA";

/// Render the machine's current stage, centered when the terminal size is known.
pub fn render(machine: &SessionMachine) -> Frame {
    let block = match machine.stage() {
        Stage::AwaitingSecret => secret_view(machine),
        Stage::MenuSelection => menu_view(machine),
        Stage::EditingForm => form_view(machine),
        Stage::ShowingResult => result_view(machine),
    };
    Frame::place_center(block, machine.terminal_size())
}

fn secret_view(machine: &SessionMachine) -> Block {
    // Center the field inside a fixed-width box so typing does not shift it.
    let box_width = usize::from(machine.config().secret_box_width);
    let lines = machine
        .secret_field()
        .view()
        .into_iter()
        .map(|line| {
            let pad = box_width.saturating_sub(line.width()) / 2;
            let mut padded = Line::raw(" ".repeat(pad));
            padded.spans.extend(line.spans);
            padded
        })
        .collect();
    Block::new(lines, Align::Left)
}

fn menu_view(machine: &SessionMachine) -> Block {
    let lines = MenuAction::ALL
        .iter()
        .enumerate()
        .map(|(i, action)| {
            if i == machine.menu_cursor() {
                Line::styled(format!("> {}", action.label()), Style::new().bold())
            } else {
                Line::raw(format!("  {}", action.label()))
            }
        })
        .collect();
    Block::new(lines, Align::Left)
}

fn form_view(machine: &SessionMachine) -> Block {
    let mut lines = machine.title_field().view();
    lines.push(Line::empty());
    lines.extend(machine.body_field().view());
    lines.push(Line::empty());
    lines.push(Line::from(submit_span(machine.focus() == Some(Focus::Submit))));
    Block::new(lines, Align::Center)
}

fn submit_span(focused: bool) -> Span {
    if focused {
        let color = Color::hex(SUBMIT_FOCUSED_COLOR).unwrap_or(Color::Magenta);
        Span::styled(SUBMIT_FOCUSED, Style::new().fg(color).bold())
    } else {
        let color = Color::hex(SUBMIT_COLOR).unwrap_or(Color::Cyan);
        Span::styled(SUBMIT_BLURRED, Style::new().fg(color))
    }
}

fn result_view(machine: &SessionMachine) -> Block {
    let mut lines = Vec::new();
    if let Some(result) = machine.last_result() {
        if let Some(err) = result.error() {
            lines.push(Line::styled("Error:", Style::new().fg(Color::Red).bold()));
            lines.extend(Line::from_text(err));
            if !result.output.is_empty() {
                lines.push(Line::empty());
            }
        }
        if !result.output.is_empty() {
            lines.extend(Line::from_text(result.output.trim_end_matches('\n')));
        }
    }
    lines.push(Line::empty());
    lines.push(Line::styled(EXIT_HINT, Style::new().dim()));
    // Long output is cropped above the hint.
    Block::new(lines, Align::Left).with_footer(2)
}
