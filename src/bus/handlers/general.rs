use tracing::info;

use super::HandlerResult;
use crate::bus::{CommandError, WmEvent};
use crate::common::config::Config;
use crate::model::wm_state::WmState;

pub(super) struct GeneralCommandHandler;

impl GeneralCommandHandler {
    pub fn handle_redraw(state: &mut WmState) -> HandlerResult {
        for monitor in state.tree.monitors().to_vec() {
            state.mark_redraw(monitor);
        }
        Ok(None)
    }

    pub fn handle_reload_config(
        state: &mut WmState,
        config: &mut Config,
        new_config: Config,
    ) -> HandlerResult {
        new_config.validate().map_err(|err| CommandError::InvalidConfig(err.to_string()))?;
        *config = new_config;
        info!("config reloaded");
        Self::handle_redraw(state)?;
        state.emit(WmEvent::UserConfigReloaded);
        Ok(None)
    }
}
