//! Thread rendering: comment tree → node tree → terminal rows.

pub mod layout;
pub mod replies;
pub mod view;

pub use layout::{layout_rows, HitTarget, Row, RowKind};
pub use replies::ReplyState;
pub use view::{render_thread, RenderContext, ThreadNode};
