//! Convenient re-exports of the most commonly used types.

pub use crate::alarm::rules::{AlarmId, AlarmRule, Recurrence, calc_next_fire};
pub use crate::alarm::scheduler::{AlarmPhase, AlarmScheduler, AudioSink};
pub use crate::core::config::PanelConfig;
pub use crate::core::errors::{PanelError, Result};
pub use crate::display::interface::{BufferDisplay, CharDisplay, ScreenFrame};
pub use crate::display::transition::{TransitionCoordinator, TransitionRequest, TransitionState};
pub use crate::io::buttons::{ActionKey, ButtonMask, ButtonPress};
pub use crate::panel::dispatcher::Dispatcher;
pub use crate::panel::runtime::{PanelRuntime, SignalHandler};
pub use crate::panel::screens::Screen;
pub use crate::settings::navigator::ConfigNavigator;
pub use crate::settings::store::SettingsStore;
pub use crate::settings::tree::{SettingNode, SettingValue, SettingsTree};
