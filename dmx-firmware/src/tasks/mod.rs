// Task-Modul: Enthält alle Embassy Tasks
//
// Jeder Task läuft asynchron und unabhängig.
// Tasks kommunizieren über Embassy Channels (Button/Transport → DMX).

pub mod button;
pub mod dmx_output;

// Re-export Tasks für einfachen Import
pub use button::button_task;
pub use dmx_output::dmx_output_task;
