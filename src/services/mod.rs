//! In-process services shared by commands and the dispatcher.

pub mod cache;
