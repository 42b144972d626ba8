pub mod error;
pub mod formatter;
pub mod jsonl;
pub mod models;
pub mod providers;
pub mod pty;
pub mod text;
