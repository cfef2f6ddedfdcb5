pub mod ai_panel;
pub mod chat_area;
pub mod header;
pub mod login_form;
pub mod sidebar;
