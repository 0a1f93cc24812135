//! UI components for qd-workspace

pub mod inputs_panel;
pub mod outputs_panel;
pub mod parameters_panel;
pub mod settings_dialog;
pub mod viewer;
