mod buffer_tree;
mod input_box;
mod layout;
mod message_area;
mod mirc_colors;
mod status_bar;
mod theme;
mod topic_bar;
mod user_list;

use crate::app::state::AppState;
use ratatui::prelude::*;

pub fn render(frame: &mut Frame, state: &AppState) {
    let area = frame.area();
    let app_layout = layout::compute_layout(area);

    buffer_tree::render(frame, app_layout.buffer_tree, &state.client);
    topic_bar::render(frame, app_layout.topic_bar, state);
    message_area::render(frame, app_layout.message_area, &state.client);
    input_box::render(frame, app_layout.input_box, &state.client);
    user_list::render(frame, app_layout.user_list, state);
    status_bar::render(frame, app_layout.status_bar, state);
}
