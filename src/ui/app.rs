//! Main TUI application state and logic

use crate::program::Program;
use crate::snapshot::{HistoryError, Replay};
use crate::ui::panes::{
    render_frames_pane, render_memory_pane, render_status_bar, render_terminal_pane,
    FramesRenderData, MemoryRenderData, MemoryScrollState, StatusRenderData,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Memory,
    Frames,
    Terminal,
}

impl FocusedPane {
    /// Move focus to the next pane (memory -> frames -> terminal)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Memory => FocusedPane::Frames,
            FocusedPane::Frames => FocusedPane::Terminal,
            FocusedPane::Terminal => FocusedPane::Memory,
        }
    }
}

/// The main application state
pub struct App {
    /// Recorded run being replayed
    pub replay: Replay,

    /// Program the history came from, for frame labels
    pub program: Program,

    /// Error that ended the run, if any
    pub run_error: Option<String>,

    pub focused_pane: FocusedPane,

    pub memory_scroll: MemoryScrollState,
    pub frames_scroll: usize,
    pub terminal_scroll: usize,

    pub should_quit: bool,

    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Delay between auto-play steps
    pub play_interval: Duration,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,
}

impl App {
    pub fn new(replay: Replay, program: Program, run_error: Option<String>) -> Self {
        App {
            replay,
            program,
            run_error,
            focused_pane: FocusedPane::Memory,
            memory_scroll: MemoryScrollState::default(),
            frames_scroll: 0,
            terminal_scroll: usize::MAX,
            should_quit: false,
            status_message: String::from("Ready!"),
            is_playing: false,
            play_interval: Duration::from_millis(250),
            last_play_time: Instant::now(),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= self.play_interval {
                if self.replay.step_forward().is_ok() {
                    self.status_message = "Playing...".to_string();
                    self.follow();
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps running
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        // Memory (left) | Frames over Terminal (right)
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(main_chunks[0]);

        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[1]);

        render_memory_pane(
            frame,
            columns[0],
            MemoryRenderData {
                cells: self.replay.cells(),
                sp: self.replay.sp(),
                fp: self.replay.fp(),
            },
            self.focused_pane == FocusedPane::Memory,
            &mut self.memory_scroll,
        );

        let frames = self.replay.call_chain();
        render_frames_pane(
            frame,
            right_rows[0],
            FramesRenderData {
                frames: &frames,
                program: &self.program,
                cells: self.replay.cells(),
            },
            self.focused_pane == FocusedPane::Frames,
            &mut self.frames_scroll,
        );

        render_terminal_pane(
            frame,
            right_rows[1],
            self.replay.output(),
            self.focused_pane == FocusedPane::Terminal,
            &mut self.terminal_scroll,
        );

        render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                position: self.replay.position(),
                total: self.replay.len(),
                last_step: self.replay.last_step().map(|step| step.info.kind.to_string()),
                error: self.run_error.as_deref(),
                is_playing: self.is_playing,
                truncated: self.replay.is_truncated(),
            },
        );
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1) as usize;
                let stepped = (0..n)
                    .take_while(|_| self.replay.step_forward().is_ok())
                    .count();
                self.status_message = format!("Stepped forward {} step(s)", stepped);
                self.follow();
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Left => {
                self.is_playing = false;
                let result = self.replay.step_backward();
                self.report(result, "Stepped backward");
            }
            KeyCode::Right => {
                self.is_playing = false;
                let result = self.replay.step_forward();
                self.report(result, "Stepped forward");
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Memory => {
                    self.memory_scroll.follow_sp = false;
                    self.memory_scroll.offset = self.memory_scroll.offset.saturating_sub(1);
                }
                FocusedPane::Frames => {
                    self.frames_scroll = self.frames_scroll.saturating_sub(1);
                }
                FocusedPane::Terminal => {
                    self.terminal_scroll = self.terminal_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Memory => {
                    self.memory_scroll.follow_sp = false;
                    self.memory_scroll.offset = self.memory_scroll.offset.saturating_add(1);
                }
                FocusedPane::Frames => {
                    self.frames_scroll = self.frames_scroll.saturating_add(1);
                }
                FocusedPane::Terminal => {
                    self.terminal_scroll = self.terminal_scroll.saturating_add(1);
                }
            },
            KeyCode::Char(' ') => {
                self.is_playing = !self.is_playing;
                if self.is_playing {
                    self.last_play_time = Instant::now()
                        .checked_sub(self.play_interval)
                        .unwrap_or_else(Instant::now);
                    self.status_message = "Playing...".to_string();
                } else {
                    self.status_message = "Paused".to_string();
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.replay.jump_to_end();
                self.status_message = "Jumped to end".to_string();
                self.follow();
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                self.replay.rewind_to_start();
                self.status_message = "Jumped to start".to_string();
                self.follow();
            }
            _ => {}
        }
    }

    fn report(&mut self, result: Result<(), HistoryError>, done: &str) {
        match result {
            Ok(()) => {
                self.status_message = done.to_string();
                self.follow();
            }
            Err(e) => {
                self.status_message = format!("Cannot move: {}", e);
            }
        }
    }

    /// Re-attach scrolling to the moving parts after a step
    fn follow(&mut self) {
        self.memory_scroll.follow_sp = true;
        self.terminal_scroll = usize::MAX;
    }
}
