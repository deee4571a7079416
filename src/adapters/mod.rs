// Adapters layer: concrete implementations of the domain ports for external
// systems (SharePoint REST, Microsoft Forms, parent-frame bridge).

pub mod forms;
pub mod frame_bridge;
pub mod memory;
pub mod sharepoint;
pub mod token;
