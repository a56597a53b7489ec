pub mod comment_thread;
pub mod help_overlay;
