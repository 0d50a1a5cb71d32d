pub mod chart_pane;
pub mod dialog_layout;

use color_eyre::Result;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::Frame;
use ratatui::layout::{Rect, Size};
use tokio::sync::mpsc::UnboundedSender;

use crate::action::Action;
use crate::config::Config;

/// Base trait for interactive UI elements: dialogs and panes.
///
/// Components receive key events while focused and may emit an action for
/// the app to route. Backend work is never done inside a component; a
/// component that needs the backend emits an action and the app spawns the
/// task, reporting back through the registered channel.
pub trait Component {
    /// Hand the component the app's action channel
    fn register_action_handler(&mut self, _tx: UnboundedSender<Action>) -> Result<()> {
        Ok(())
    }

    /// Hand the component the loaded configuration
    fn register_config_handler(&mut self, _config: Config) -> Result<()> {
        Ok(())
    }

    /// Called once with the initial terminal size
    fn init(&mut self, _area: Size) -> Result<()> {
        Ok(())
    }

    /// Handle a key event while focused. Returns Some(action) to bubble an
    /// action up to the app, None when the event was consumed or ignored.
    fn handle_key_event(&mut self, _key: KeyEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    fn handle_mouse_event(&mut self, _mouse: MouseEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    /// React to a routed action (tick, completion, ...). May emit a
    /// follow-up action.
    fn update(&mut self, _action: Action) -> Result<Option<Action>> {
        Ok(None)
    }

    /// Render the component into the given area
    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()>;
}
