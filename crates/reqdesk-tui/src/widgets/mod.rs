//! Widgets for the chat workbench

pub mod cards;
pub mod input_box;
pub mod markdown;
pub mod message_list;
pub mod selector;
pub mod side_panel;
pub mod spinner;

pub use input_box::InputBox;
pub use message_list::MessageList;
pub use selector::{Selector, SelectorItem, SelectorState};
pub use side_panel::{PanelTab, SidePanel};
pub use spinner::Spinner;
