//! Integration tests

mod common;
mod combined_view;
mod lifecycle;
mod sessions;
