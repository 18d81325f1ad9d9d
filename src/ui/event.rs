/// Raw input delivered by the host page to the widget.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The composer text area now holds this text (typing, paste, deletion).
    Input(String),
    /// Enter pressed in the composer, with the modifiers that were held.
    Enter(Modifiers),
    /// The submit control was clicked.
    SubmitClicked,
    /// Conversation starter at this index was clicked.
    StarterClicked(usize),
    /// Escape: cancel the in-flight exchange.
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        meta: false,
    };

    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }

    pub fn any(self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// Parses one line of the demo host's input into an event.
///
/// `/cancel` → Escape, `/starter N` → StarterClicked(N - 1), `/send` →
/// SubmitClicked; anything else is typed into the composer and submitted
/// with a plain Enter.
pub fn parse_command_line(line: &str) -> Vec<HostEvent> {
    let trimmed = line.trim();
    if trimmed == "/cancel" {
        return vec![HostEvent::Escape];
    }
    if trimmed == "/send" {
        return vec![HostEvent::SubmitClicked];
    }
    if let Some(rest) = trimmed.strip_prefix("/starter ") {
        return match rest.trim().parse::<usize>() {
            Ok(n) if n > 0 => vec![HostEvent::StarterClicked(n - 1)],
            _ => {
                log::warn!("Ignoring malformed starter command: {:?}", trimmed);
                vec![]
            }
        };
    }
    vec![
        HostEvent::Input(line.trim_end_matches(['\r', '\n']).to_string()),
        HostEvent::Enter(Modifiers::NONE),
    ]
}
