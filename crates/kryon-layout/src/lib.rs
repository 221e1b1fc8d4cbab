// crates/kryon-layout/src/lib.rs

//! Three-dimensional measure/arrange layout for UI element trees.

pub mod alignment;
pub mod attributes;
pub mod canvas;
pub mod constraints;
pub mod content_control;
pub mod element;
pub mod grid;
pub mod grid_base;
pub mod layout;
pub mod panel;
pub mod stack_panel;
pub mod strip_definition;
pub mod thickness;
pub mod tree;
pub mod uniform_grid;

pub use alignment::*;
pub use canvas::*;
pub use constraints::*;
pub use content_control::*;
pub use element::*;
pub use grid::*;
pub use grid_base::*;
pub use layout::*;
pub use panel::*;
pub use stack_panel::*;
pub use strip_definition::*;
pub use thickness::*;
pub use tree::*;
pub use uniform_grid::*;
