//! PTY module - backend side of the command protocol

mod supervisor;

pub use supervisor::{open_link, PtySupervisor};
