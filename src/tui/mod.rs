// Interactive picker: state, key handling, rendering and the terminal loop.
mod app_logic;
mod app_state;
mod event_handler;
mod terminal;
mod ui_renderer;

// Re-exports used by workflow.rs and glyphs.rs
pub use app_state::{Badge, Outcome};
pub use ui_renderer::FrameLayout;

pub use self::run_tui::{PickerOptions, run_picker};

// Terminal setup/teardown and the main loop
mod run_tui {
    use super::app_logic::PickerApp;
    use super::app_state::{Outcome, Refresh, Viewport};
    use super::event_handler::{KeyDecoder, handle_events};
    use super::terminal::{ByteSource, CursorDriver, StdinBytes};
    use super::ui_renderer::{FrameLayout, Renderer};
    use crate::glyphs::{self, IconStyle};
    use crate::tree_model::Tree;
    use anyhow::{Context, Result};
    use crossterm::{
        cursor::Show,
        execute,
        terminal::{self, disable_raw_mode, enable_raw_mode},
    };
    use log::{debug, warn};
    use std::io::{self, Write};
    use std::time::Duration;

    #[derive(Debug, Clone, Copy)]
    pub struct PickerOptions {
        pub icons: IconStyle,
        pub layout: FrameLayout,
        /// Upper bound on the wait for the terminal's cursor position reply.
        pub position_timeout: Duration,
    }

    impl Default for PickerOptions {
        fn default() -> Self {
            PickerOptions {
                icons: IconStyle::default(),
                layout: FrameLayout::default(),
                position_timeout: Duration::from_millis(500),
            }
        }
    }

    /// Puts the terminal in raw mode until dropped.
    struct RawModeGuard;

    impl RawModeGuard {
        fn enable() -> Result<Self> {
            enable_raw_mode().context("cannot switch the terminal to raw mode")?;
            Ok(RawModeGuard)
        }
    }

    impl Drop for RawModeGuard {
        fn drop(&mut self) {
            let _ = execute!(io::stderr(), Show);
            if let Err(e) = disable_raw_mode() {
                warn!("failed to restore terminal mode: {}", e);
            }
        }
    }

    fn current_viewport() -> Viewport {
        match terminal::size() {
            Ok((cols, rows)) => Viewport { cols, rows },
            Err(e) => {
                warn!("cannot read terminal size ({}), assuming 80x24", e);
                Viewport::default()
            }
        }
    }

    /// Runs the picker on the real terminal: keys from stdin, drawing on
    /// stderr. Raw mode is restored on every way out.
    pub fn run_picker(tree: Tree, options: &PickerOptions) -> Result<Outcome> {
        let _guard = RawModeGuard::enable()?;
        let input = StdinBytes::spawn();
        let mut driver = CursorDriver::new(io::stderr(), current_viewport());
        run_session(tree, options, &mut driver, input, current_viewport)
    }

    pub(super) fn run_session<W, S, F>(
        tree: Tree,
        options: &PickerOptions,
        driver: &mut CursorDriver<W>,
        mut input: S,
        fetch_viewport: F,
    ) -> Result<Outcome>
    where
        W: Write,
        S: ByteSource,
        F: Fn() -> Viewport,
    {
        driver.hide_cursor()?;
        let position = driver.query_position(&mut input, options.position_timeout)?;
        if position.is_none() {
            warn!("no cursor position from terminal, drawing from the top-left corner");
        }
        driver.anchor_at(position)?;
        debug!("anchored at row {}", driver.anchor_row());

        let mut app = PickerApp::new(tree, driver.viewport());
        let mut renderer = Renderer::new(glyphs::resolver_for(options.icons), options.layout);
        let mut keys = KeyDecoder::new(input);

        loop {
            let refresh = app.take_refresh();
            if refresh == Refresh::Screen {
                let viewport = fetch_viewport();
                app.resize(viewport);
                driver.set_viewport(viewport);
            }
            let frame = renderer.build_frame(&app);
            renderer
                .render(driver, frame, refresh)
                .context("failed to draw")?;

            handle_events(&mut app, &mut keys)?;
            if app.exit_requested().is_some() {
                break;
            }
        }

        renderer.clear(driver)?;
        driver.show_cursor()?;
        driver.flush()?;
        Ok(app.finish())
    }
}
